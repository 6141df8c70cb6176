//! Rate and data-quality limits: entry caps per cycle and per day, stale feed
//! and wide spread.

use super::{GateContext, GateOutcome};
use crate::domain::bar::display_price;

pub fn evaluate(gc: &GateContext<'_>) -> GateOutcome {
    let gates = &gc.cfg.gates;
    let counters = &gc.state.counters;
    let flat = gc.state.position.is_flat();

    if flat
        && gates.max_entries_per_cycle > 0
        && counters.entries_in_cycle >= gates.max_entries_per_cycle
    {
        return GateOutcome::blocked(format!(
            "rate_safety: max entries per cycle reached ({})",
            gates.max_entries_per_cycle
        ));
    }

    // Counters roll over before the chain runs, so `entries_today` belongs to
    // this bar's UTC day.
    if flat
        && gates.max_entries_per_day > 0
        && counters.entries_today >= gates.max_entries_per_day
    {
        return GateOutcome::blocked(format!(
            "rate_safety: max entries per day reached ({})",
            gates.max_entries_per_day
        ));
    }

    if gates.stale_block_enable {
        match gc.ctx.feed_age_ms {
            None => return GateOutcome::blocked("rate_safety: feed age missing"),
            Some(age) if age > gates.stale_max_age_ms => {
                return GateOutcome::blocked(format!("rate_safety: stale data age_ms={age}"));
            }
            Some(_) => {}
        }
    }

    if gates.spread_guard_enable {
        match gc.ctx.spread_pct {
            None => return GateOutcome::blocked("rate_safety: spread missing"),
            Some(spread) if !spread.is_finite() || spread > gates.spread_max_pct => {
                return GateOutcome::blocked(format!(
                    "rate_safety: spread_pct={} above max",
                    display_price(spread)
                ));
            }
            Some(_) => {}
        }
    }

    GateOutcome::pass()
}

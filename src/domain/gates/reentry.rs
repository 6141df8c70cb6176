//! Re-entry hygiene: spacing from the last entry and exit, repeated reasons
//! and price drift from the last entry. Only applies while flat.

use super::{GateContext, GateOutcome};
use crate::domain::bar::display_price;

pub fn evaluate(gc: &GateContext<'_>) -> GateOutcome {
    let gates = &gc.cfg.gates;
    let history = &gc.state.history;
    if gc.state.position.is_open() {
        return GateOutcome::pass();
    }
    let now = gc.bar.index;

    if gates.reentry_entry_cooldown_bars > 0 {
        if let Some(last) = history.last_entry_bar {
            if now.saturating_sub(last) < gates.reentry_entry_cooldown_bars {
                return GateOutcome::blocked(format!(
                    "reentry: within {} bars of last entry",
                    gates.reentry_entry_cooldown_bars
                ));
            }
        }
    }

    if gates.reentry_exit_cooldown_bars > 0 {
        if let Some(last) = history.last_exit_bar {
            if now.saturating_sub(last) < gates.reentry_exit_cooldown_bars {
                return GateOutcome::blocked(format!(
                    "reentry: within {} bars of last exit",
                    gates.reentry_exit_cooldown_bars
                ));
            }
        }
    }

    if gates.reentry_same_reason_block {
        let latest = gc.state.candidates.latest().map(|c| c.reason.as_str());
        if let (Some(last), Some(current)) = (history.last_entry_reason.as_deref(), latest) {
            if last == current {
                return GateOutcome::blocked(format!("reentry: same reason as last entry ({last})"));
            }
        }
    }

    if gates.reentry_price_tol_enable {
        if let Some(last_price) = history.last_entry_price.filter(|p| *p > 0.0) {
            let diff_pct = (gc.bar.close - last_price).abs() / last_price * 100.0;
            if diff_pct > gates.reentry_price_tol_pct {
                return GateOutcome::blocked(format!(
                    "reentry: price moved {}% from last entry",
                    display_price(diff_pct)
                ));
            }
        }
    }

    GateOutcome::pass()
}

//! Reference-slope gate.
//!
//! `slope_pct = (ref[-1] - ref[-1-lookback]) / ref[-1-lookback] * 100`.
//! With a threshold `<= 0` the slope must be non-positive, otherwise it must
//! be at most `-|threshold|`.

use super::{GateContext, GateOutcome};
use crate::domain::bar::display_price;

pub fn evaluate(gc: &GateContext<'_>) -> GateOutcome {
    let gates = &gc.cfg.gates;
    if !gates.slope_enabled() {
        return GateOutcome::pass_with("disabled");
    }

    let lookback = gates.slope_lookback_bars as usize;
    let Some((past, current)) = gc.state.window.reference_span(lookback) else {
        return GateOutcome::blocked(format!(
            "slope: reference series too short ({} < {})",
            gc.state.window.reference_len(),
            lookback + 1
        ));
    };
    if past == 0.0 {
        return GateOutcome::blocked("slope: reference value invalid");
    }

    let slope_pct = slope_pct(past, current);
    let ok = if gates.slope_min_pct <= 0.0 {
        slope_pct <= 0.0
    } else {
        slope_pct <= -gates.slope_min_pct.abs()
    };

    if ok {
        GateOutcome::pass_with(format!("slope_pct={}", display_price(slope_pct)))
    } else {
        GateOutcome::blocked(format!(
            "slope: slope_pct={} above limit",
            display_price(slope_pct)
        ))
    }
}

pub fn slope_pct(past: f64, current: f64) -> f64 {
    (current - past) / past * 100.0
}

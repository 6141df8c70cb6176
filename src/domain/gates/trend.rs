//! Trend-bias gate: shorts only while the reference instrument trades below
//! its daily open.

use super::{GateContext, GateOutcome};
use crate::domain::bar::display_price;

pub fn evaluate(gc: &GateContext<'_>) -> GateOutcome {
    if !gc.cfg.gates.trend_bias_enable {
        return GateOutcome::pass();
    }
    let Some(trend) = gc.ctx.trend else {
        return GateOutcome::blocked("trend_bias: reference context missing");
    };
    if !trend.price.is_finite() || !trend.daily_open.is_finite() {
        return GateOutcome::blocked("trend_bias: reference context invalid");
    }
    if trend.price < trend.daily_open {
        GateOutcome::pass()
    } else {
        GateOutcome::blocked(format!(
            "trend_bias: price {} >= daily open {}",
            display_price(trend.price),
            display_price(trend.daily_open)
        ))
    }
}

//! Volatility gate over the engine's high/low window.

use super::{GateContext, GateOutcome};
use crate::domain::bar::display_price;

pub fn evaluate(gc: &GateContext<'_>) -> GateOutcome {
    let gates = &gc.cfg.gates;
    if !gates.volatility_enable {
        return GateOutcome::pass();
    }
    let Some(range_pct) = gc.state.window.range_pct(gc.bar.close) else {
        return GateOutcome::blocked("volatility: range unavailable");
    };
    if range_pct > gates.volatility_max_pct {
        return GateOutcome::blocked(format!(
            "volatility: range {}% > max {}%",
            display_price(range_pct),
            display_price(gates.volatility_max_pct)
        ));
    }
    GateOutcome::pass()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gates::test_support::{bar, Fixture};

    fn fixture(max_pct: f64) -> Fixture {
        let mut fx = Fixture::new();
        fx.cfg.gates.volatility_enable = true;
        fx.cfg.gates.volatility_max_pct = max_pct;
        fx.cfg.gates.volatility_window_bars = 3;
        fx.rebuild_state();
        fx
    }

    fn push(fx: &mut Fixture, index: u64, high: f64, low: f64) {
        let mut b = bar(index, low);
        b.high = high;
        fx.state.window.push(&b);
    }

    #[test]
    fn off_passes() {
        let fx = Fixture::new();
        assert!(fx.run(&bar(1, 1.0), evaluate).pass);
    }

    #[test]
    fn blocks_wide_range() {
        let mut fx = fixture(3.0);
        push(&mut fx, 1, 102.0, 100.0);
        push(&mut fx, 2, 101.0, 98.0);
        let out = fx.run(&bar(2, 100.0), evaluate);
        assert!(!out.pass);
        assert!(out.reason_or("").starts_with("volatility"));
    }

    #[test]
    fn passes_narrow_range() {
        let mut fx = fixture(5.0);
        push(&mut fx, 1, 102.0, 100.0);
        push(&mut fx, 2, 101.0, 98.0);
        assert!(fx.run(&bar(2, 100.0), evaluate).pass);
    }

    #[test]
    fn empty_window_blocks() {
        let fx = fixture(5.0);
        assert!(!fx.run(&bar(1, 100.0), evaluate).pass);
    }
}

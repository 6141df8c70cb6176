//! Post-exit cooldown gate.

use super::{GateContext, GateOutcome};

pub fn evaluate(gc: &GateContext<'_>) -> GateOutcome {
    let gates = &gc.cfg.gates;
    if !gates.cooldown_enable || gates.cooldown_bars == 0 {
        return GateOutcome::pass();
    }
    let Some(last_exit) = gc.state.history.last_exit_bar else {
        return GateOutcome::pass();
    };
    let elapsed = gc.bar.index.saturating_sub(last_exit);
    if elapsed < gates.cooldown_bars {
        return GateOutcome::blocked(format!(
            "cooldown: {} bars remaining",
            gates.cooldown_bars - elapsed
        ));
    }
    GateOutcome::pass()
}

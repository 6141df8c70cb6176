//! Equity drawdown circuit breaker, checked once per bar.

use crate::domain::config::{CapitalConfig, FailSafeMode};
use crate::domain::state::EngineState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailSafeAction {
    WithinLimit,
    /// Hard stop: the engine is halted.
    Halt { loss: f64, limit: f64 },
    /// Notify-only: first bar of an excursion beyond the limit.
    Notify { loss: f64, limit: f64 },
    /// Beyond the limit but nothing to report (ignored, or already notified).
    Suppressed,
}

pub fn loss_limit(cfg: &CapitalConfig, initial_equity: f64) -> f64 {
    initial_equity * cfg.max_loss_pct / 100.0
}

pub fn check(cfg: &CapitalConfig, state: &mut EngineState) -> FailSafeAction {
    let loss = state.ledger.loss();
    let limit = loss_limit(cfg, state.ledger.initial_equity);

    if loss <= limit {
        state.fail_safe_tripped = false;
        return FailSafeAction::WithinLimit;
    }

    match cfg.fail_safe {
        FailSafeMode::HardStop => {
            state.halted = true;
            FailSafeAction::Halt { loss, limit }
        }
        FailSafeMode::NotifyOnly if !state.fail_safe_tripped => {
            state.fail_safe_tripped = true;
            FailSafeAction::Notify { loss, limit }
        }
        FailSafeMode::NotifyOnly | FailSafeMode::Ignore => FailSafeAction::Suppressed,
    }
}

//! Time-axis locked entry execution.
//!
//! A permit opens the position only on its `valid_bar`. Earlier bars wait;
//! any later bar expires it unused.

use super::EntryPermit;
use crate::domain::bar::MarketBar;
use crate::domain::config::EngineConfig;
use crate::domain::exit::levels::{ExitLevels, TrailingStop};
use crate::domain::position::{OpenPosition, PositionState};
use crate::domain::state::EngineState;

pub const PERMIT_EXPIRED: &str = "expired";

#[derive(Debug, Clone, PartialEq)]
pub enum EntryExecution {
    Idle,
    Waiting { valid_bar: u64 },
    Opened(OpenPosition),
    Expired { permit: EntryPermit, reason: String },
}

pub fn execute_entry(
    cfg: &EngineConfig,
    state: &mut EngineState,
    bar: &MarketBar,
) -> EntryExecution {
    let Some(permit) = state.permit.clone() else {
        return EntryExecution::Idle;
    };

    if bar.index < permit.valid_bar {
        return EntryExecution::Waiting {
            valid_bar: permit.valid_bar,
        };
    }

    state.permit = None;
    if bar.index > permit.valid_bar {
        return EntryExecution::Expired {
            permit,
            reason: PERMIT_EXPIRED.into(),
        };
    }
    if state.position.is_open() {
        return EntryExecution::Expired {
            permit,
            reason: "position already open".into(),
        };
    }
    let capital = state.ledger.capital;
    if capital <= 0.0 || bar.close <= 0.0 {
        return EntryExecution::Expired {
            permit,
            reason: "no capital available".into(),
        };
    }

    let entry_price = bar.close;
    let position = OpenPosition {
        entry_bar: bar.index,
        entry_time: bar.time,
        entry_price,
        capital,
        reason: permit.reason.clone(),
        levels: ExitLevels::at_entry(entry_price, &cfg.exit),
        trailing: TrailingStop::at_entry(entry_price, cfg.exit.trailing_pct),
        tp_touched: false,
    };

    state.counters.entries_in_cycle += 1;
    state.counters.entries_today += 1;
    state.history.last_entry_bar = Some(bar.index);
    state.history.last_entry_price = Some(entry_price);
    state.history.last_entry_reason = Some(permit.reason);
    state.candidates.clear();
    state.confirmer.reset();
    state.position = PositionState::Open(position.clone());

    EntryExecution::Opened(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::test_config;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn bar(index: u64, close: f64) -> MarketBar {
        MarketBar {
            index,
            time: Utc.timestamp_opt(index as i64 * 300, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            reference: Some(close),
        }
    }

    fn state_with_permit(granted_bar: u64, valid_bar: u64) -> (EngineConfig, EngineState) {
        let cfg = test_config();
        let mut state = EngineState::new(&cfg);
        state.permit = Some(EntryPermit {
            granted_bar,
            valid_bar,
            reason: "reference_penetration".into(),
        });
        (cfg, state)
    }

    #[test]
    fn idle_without_permit() {
        let cfg = test_config();
        let mut state = EngineState::new(&cfg);
        assert_eq!(execute_entry(&cfg, &mut state, &bar(1, 10.0)), EntryExecution::Idle);
    }

    #[test]
    fn waits_on_granting_bar() {
        let (cfg, mut state) = state_with_permit(5, 6);
        assert_eq!(
            execute_entry(&cfg, &mut state, &bar(5, 10.0)),
            EntryExecution::Waiting { valid_bar: 6 }
        );
        assert!(state.position.is_flat());
        assert!(state.permit.is_some());
    }

    #[test]
    fn opens_on_valid_bar() {
        let (cfg, mut state) = state_with_permit(5, 6);
        let EntryExecution::Opened(pos) = execute_entry(&cfg, &mut state, &bar(6, 100.0)) else {
            panic!("expected open");
        };
        assert_eq!(pos.entry_bar, 6);
        assert_eq!(pos.capital, 60.0);
        assert_relative_eq!(pos.levels.stop_loss, 100.6, epsilon = 1e-9);
        assert_relative_eq!(pos.levels.take_profit, 99.2, epsilon = 1e-9);
        assert!(state.position.is_open());
        assert!(state.permit.is_none());
        assert!(state.candidates.is_empty());
        assert_eq!(state.counters.entries_in_cycle, 1);
        assert_eq!(state.counters.entries_today, 1);
        assert_eq!(state.history.last_entry_price, Some(100.0));
        assert_eq!(
            state.history.last_entry_reason.as_deref(),
            Some("reference_penetration")
        );
    }

    #[test]
    fn expires_after_valid_bar() {
        let (cfg, mut state) = state_with_permit(5, 6);
        let out = execute_entry(&cfg, &mut state, &bar(7, 100.0));
        assert!(matches!(
            out,
            EntryExecution::Expired { ref reason, .. } if reason == PERMIT_EXPIRED
        ));
        assert!(state.position.is_flat());
        assert!(state.permit.is_none());
    }

    #[test]
    fn zero_capital_does_not_open() {
        let (cfg, mut state) = state_with_permit(5, 6);
        state.ledger.capital = 0.0;
        let out = execute_entry(&cfg, &mut state, &bar(6, 100.0));
        assert!(matches!(out, EntryExecution::Expired { .. }));
        assert!(state.position.is_flat());
    }
}

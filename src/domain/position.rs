//! Short position tracking.
//!
//! The engine holds at most one position. Entry price and exit levels live
//! inside [`OpenPosition`], so an open position always carries them and a flat
//! one never does.

use crate::domain::exit::levels::{ExitLevels, TrailingStop};
use crate::domain::exit::confirm::ExitSignal;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_bar: u64,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    /// Capital committed at entry; P&L for this trade is scaled by it.
    pub capital: f64,
    pub reason: String,
    pub levels: ExitLevels,
    pub trailing: TrailingStop,
    /// Set once the close has reached take-profit; arms the trailing exit.
    pub tp_touched: bool,
}

impl OpenPosition {
    /// Unscaled quantity implied by the committed capital.
    pub fn quantity(&self) -> f64 {
        self.capital / self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        short_pnl(self.entry_price, price, self.capital)
    }

    pub fn should_stop_loss(&self, close: f64) -> bool {
        close >= self.levels.stop_loss
    }

    pub fn should_take_profit(&self, close: f64) -> bool {
        close <= self.levels.take_profit
    }

    pub fn should_trail(&self, close: f64) -> bool {
        self.tp_touched && close >= self.trailing.stop
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open(_))
    }

    pub fn is_flat(&self) -> bool {
        !self.is_open()
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Open(p) => Some(p),
            PositionState::Flat => None,
        }
    }

    pub fn open_mut(&mut self) -> Option<&mut OpenPosition> {
        match self {
            PositionState::Open(p) => Some(p),
            PositionState::Flat => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub cycle_id: u64,
    pub entry_bar: u64,
    pub exit_bar: u64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub capital: f64,
    pub signal: ExitSignal,
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn bars_held(&self) -> u64 {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}

/// `(entry - exit) / entry * capital`; zero for degenerate inputs.
pub fn short_pnl(entry_price: f64, exit_price: f64, capital: f64) -> f64 {
    if entry_price <= 0.0 || capital <= 0.0 {
        return 0.0;
    }
    (entry_price - exit_price) / entry_price * capital
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn sample_position() -> OpenPosition {
        OpenPosition {
            entry_bar: 12,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            entry_price: 100.0,
            capital: 60.0,
            reason: "reference_penetration".into(),
            levels: ExitLevels {
                stop_loss: 100.6,
                take_profit: 99.2,
            },
            trailing: TrailingStop::at_entry(100.0, 0.4),
            tp_touched: false,
        }
    }

    #[test]
    fn short_pnl_profit_and_loss() {
        assert_relative_eq!(short_pnl(100.0, 99.0, 60.0), 0.6, epsilon = 1e-9);
        assert_relative_eq!(short_pnl(100.0, 101.0, 60.0), -0.6, epsilon = 1e-9);
    }

    #[test]
    fn short_pnl_degenerate_inputs() {
        assert_eq!(short_pnl(0.0, 99.0, 60.0), 0.0);
        assert_eq!(short_pnl(100.0, 99.0, 0.0), 0.0);
    }

    #[test]
    fn quantity_from_capital() {
        assert_relative_eq!(sample_position().quantity(), 0.6, epsilon = 1e-9);
    }

    #[test]
    fn unrealized_pnl_short() {
        let pos = sample_position();
        assert_relative_eq!(pos.unrealized_pnl(98.0), 1.2, epsilon = 1e-9);
        assert_relative_eq!(pos.unrealized_pnl(102.0), -1.2, epsilon = 1e-9);
    }

    #[test]
    fn stop_loss_triggers_at_or_above() {
        let pos = sample_position();
        assert!(pos.should_stop_loss(100.6));
        assert!(pos.should_stop_loss(101.0));
        assert!(!pos.should_stop_loss(100.5));
    }

    #[test]
    fn take_profit_triggers_at_or_below() {
        let pos = sample_position();
        assert!(pos.should_take_profit(99.2));
        assert!(pos.should_take_profit(98.0));
        assert!(!pos.should_take_profit(99.3));
    }

    #[test]
    fn trail_requires_tp_touch() {
        let mut pos = sample_position();
        assert!(!pos.should_trail(101.0));
        pos.tp_touched = true;
        assert!(pos.should_trail(101.0));
    }

    #[test]
    fn position_state_accessors() {
        let mut state = PositionState::Flat;
        assert!(state.is_flat());
        assert!(state.open().is_none());
        state = PositionState::Open(sample_position());
        assert!(state.is_open());
        assert_eq!(state.open().unwrap().entry_bar, 12);
        state.open_mut().unwrap().tp_touched = true;
        assert!(state.open().unwrap().tp_touched);
    }

    #[test]
    fn closed_trade_bars_held() {
        let pos = sample_position();
        let trade = ClosedTrade {
            cycle_id: 0,
            entry_bar: 12,
            exit_bar: 20,
            entry_time: pos.entry_time,
            exit_time: pos.entry_time,
            entry_price: 100.0,
            exit_price: 99.0,
            capital: 60.0,
            signal: ExitSignal::TakeProfit,
            pnl: 0.6,
        };
        assert_eq!(trade.bars_held(), 8);
    }
}

//! Stop-loss / take-profit levels and the trailing stop of a short.
//!
//! SL/TP are fixed at entry. The trailing anchor is the running minimum of
//! the entry price and every later low; the stop derived from it can only
//! move down.

use crate::domain::bar::MarketBar;
use crate::domain::config::ExitConfig;
use crate::domain::position::OpenPosition;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl ExitLevels {
    /// `sl = entry * (1 + sl_pct/100)`, `tp = entry * (1 - tp_pct/100)`.
    pub fn at_entry(entry_price: f64, cfg: &ExitConfig) -> Self {
        ExitLevels {
            stop_loss: entry_price * (1.0 + cfg.sl_pct / 100.0),
            take_profit: entry_price * (1.0 - cfg.tp_pct / 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStop {
    pub anchor: f64,
    pub stop: f64,
    pct: f64,
}

impl TrailingStop {
    pub fn at_entry(entry_price: f64, trailing_pct: f64) -> Self {
        TrailingStop {
            anchor: entry_price,
            stop: entry_price * (1.0 + trailing_pct / 100.0),
            pct: trailing_pct,
        }
    }

    /// Fold a new low into the anchor. Returns true if the stop tightened.
    pub fn update(&mut self, low: f64) -> bool {
        if low.is_finite() && low < self.anchor {
            self.anchor = low;
        }
        let candidate = self.anchor * (1.0 + self.pct / 100.0);
        if candidate < self.stop {
            self.stop = candidate;
            return true;
        }
        false
    }
}

/// Per-bar SL/TP/trailing snapshot kept for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSnapshot {
    pub bar: u64,
    pub time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub anchor: f64,
    pub trailing_stop: f64,
    pub close: f64,
    /// Mark-to-close P&L of the open short.
    pub unrealized_pnl: f64,
}

/// Update the trailing stop for `bar` and snapshot the levels. Does nothing
/// on the bar the position was opened.
pub fn update_levels(position: &mut OpenPosition, bar: &MarketBar) -> Option<LevelSnapshot> {
    if bar.index <= position.entry_bar {
        return None;
    }
    position.trailing.update(bar.low);
    Some(LevelSnapshot {
        bar: bar.index,
        time: bar.time,
        entry_price: position.entry_price,
        stop_loss: position.levels.stop_loss,
        take_profit: position.levels.take_profit,
        anchor: position.trailing.anchor,
        trailing_stop: position.trailing.stop,
        close: bar.close,
        unrealized_pnl: position.unrealized_pnl(bar.close),
    })
}

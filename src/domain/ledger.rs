//! Realised P&L and equity tracking.

use chrono::{DateTime, Utc};

use super::position::ClosedTrade;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub bar: u64,
    pub time: DateTime<Utc>,
    pub equity: f64,
}

/// Equity is derived, never stored, so `equity == initial_equity + realized_pnl`
/// holds by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub initial_equity: f64,
    /// Capital committed to the next entry.
    pub capital: f64,
    pub realized_pnl: f64,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            initial_equity: initial_capital,
            capital: initial_capital,
            realized_pnl: 0.0,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn equity(&self) -> f64 {
        self.initial_equity + self.realized_pnl
    }

    /// Drawdown from the initial equity, floored at zero.
    pub fn loss(&self) -> f64 {
        (self.initial_equity - self.equity()).max(0.0)
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.realized_pnl += trade.pnl;
        self.closed_trades.push(trade);
    }

    pub fn record_equity(&mut self, bar: u64, time: DateTime<Utc>) {
        let equity = self.equity();
        self.equity_curve.push(EquityPoint { bar, time, equity });
    }
}

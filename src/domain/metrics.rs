//! Trade statistics over a finished run.

use super::ledger::{EquityPoint, Ledger};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_pnl: f64,
    /// Final equity relative to the initial equity, as a fraction.
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous equity peak.
    pub max_drawdown_bars: u64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
}

impl Metrics {
    pub fn compute(ledger: &Ledger) -> Self {
        let trades = &ledger.closed_trades;
        let initial = ledger.initial_equity;

        let total_return = if initial > 0.0 {
            (ledger.equity() - initial) / initial
        } else {
            0.0
        };
        let (max_drawdown, max_drawdown_bars) = compute_drawdown(initial, &ledger.equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars_held = 0u64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            total_bars_held += trade.bars_held();
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };
        let avg_bars_held = if total_trades > 0 {
            total_bars_held as f64 / total_trades as f64
        } else {
            0.0
        };

        Metrics {
            total_pnl: ledger.realized_pnl,
            total_return,
            max_drawdown,
            max_drawdown_bars,
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_bars_held,
        }
    }
}

/// Peak-to-trough drawdown as a fraction of the peak, starting from the
/// initial equity.
fn compute_drawdown(initial: f64, equity_curve: &[EquityPoint]) -> (f64, u64) {
    let mut peak = initial;
    let mut max_dd = 0.0_f64;
    let mut current_bars = 0u64;
    let mut max_bars = 0u64;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_bars = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            current_bars += 1;
            max_bars = max_bars.max(current_bars);
        }
    }

    (max_dd, max_bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exit::confirm::ExitSignal;
    use crate::domain::position::ClosedTrade;
    use chrono::{TimeZone, Utc};

    fn make_trade(pnl: f64, bars: u64) -> ClosedTrade {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ClosedTrade {
            cycle_id: 0,
            entry_bar: 10,
            exit_bar: 10 + bars,
            entry_time: t,
            exit_time: t,
            entry_price: 100.0,
            exit_price: 100.0,
            capital: 100.0,
            signal: ExitSignal::TakeProfit,
            pnl,
        }
    }

    fn make_ledger(initial: f64, trades: Vec<ClosedTrade>) -> Ledger {
        let mut ledger = Ledger::new(initial);
        for trade in trades {
            ledger.record_trade(trade);
        }
        ledger
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                bar: i as u64 + 1,
                time: t,
                equity,
            })
            .collect()
    }

    #[test]
    fn metrics_empty_ledger() {
        let metrics = Metrics::compute(&Ledger::new(60.0));
        assert_eq!(metrics.total_trades, 0);
        assert!((metrics.total_return - 0.0).abs() < f64::EPSILON);
        assert!((metrics.win_rate - 0.0).abs() < f64::EPSILON);
        assert!((metrics.profit_factor - 0.0).abs() < f64::EPSILON);
        assert!((metrics.avg_bars_held - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn metrics_trade_stats_wins_and_losses() {
        let ledger = make_ledger(
            100.0,
            vec![
                make_trade(1.0, 5),
                make_trade(-0.5, 3),
                make_trade(2.0, 10),
                make_trade(0.0, 2),
            ],
        );
        let metrics = Metrics::compute(&ledger);
        assert_eq!(metrics.trades_won, 2);
        assert_eq!(metrics.trades_lost, 1);
        assert_eq!(metrics.trades_breakeven, 1);
        assert!((metrics.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((metrics.profit_factor - 6.0).abs() < 1e-9);
        assert!((metrics.total_pnl - 2.5).abs() < 1e-9);
        assert!((metrics.total_return - 0.025).abs() < 1e-9);
        assert!((metrics.avg_bars_held - 5.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_avg_and_largest() {
        let ledger = make_ledger(
            100.0,
            vec![
                make_trade(1.0, 1),
                make_trade(-0.6, 1),
                make_trade(3.0, 1),
                make_trade(-0.4, 1),
            ],
        );
        let metrics = Metrics::compute(&ledger);
        assert!((metrics.avg_win - 2.0).abs() < 1e-9);
        assert!((metrics.avg_loss - 0.5).abs() < 1e-9);
        assert!((metrics.largest_win - 3.0).abs() < 1e-9);
        assert!((metrics.largest_loss - 0.6).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_infinite_without_losses() {
        let ledger = make_ledger(100.0, vec![make_trade(1.0, 1)]);
        assert!(Metrics::compute(&ledger).profit_factor.is_infinite());
    }

    #[test]
    fn max_drawdown_from_peak() {
        let (dd, bars) = compute_drawdown(100.0, &curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]));
        assert!((dd - (110.0 - 80.0) / 110.0).abs() < 1e-9);
        assert_eq!(bars, 4);
    }

    #[test]
    fn drawdown_counts_from_initial_equity() {
        let (dd, bars) = compute_drawdown(100.0, &curve(&[95.0, 100.0]));
        assert!((dd - 0.05).abs() < 1e-9);
        assert_eq!(bars, 1);
    }
}

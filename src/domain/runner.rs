//! Sequential replay loop: feed → engine → order port.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::domain::bar::display_price;
use crate::domain::engine::{BarStatus, Engine};
use crate::domain::error::EngineError;
use crate::ports::data_port::{BarFeed, FeedPoll};
use crate::ports::order_port::OrderPort;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub bars_seen: u64,
    pub evaluated: u64,
    pub gaps: u64,
    pub duplicates: u64,
    pub trades: usize,
    pub orders_submitted: u64,
    pub orders_simulated: u64,
    pub halted: bool,
    /// Ended because the stop flag was raised.
    pub stopped: bool,
}

pub struct Runner {
    stop: Arc<AtomicBool>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; storing `true` ends the run before the next bar.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn run(
        &self,
        engine: &mut Engine,
        feed: &mut dyn BarFeed,
        orders: &mut dyn OrderPort,
    ) -> Result<RunSummary, EngineError> {
        let mut summary = RunSummary::default();
        let live = engine.config().entry_exec_enable;
        let symbol = engine.config().symbol.clone();

        loop {
            if self.stop.load(Ordering::SeqCst) {
                info!(bars = summary.bars_seen, "Stop requested");
                summary.stopped = true;
                break;
            }

            let (bar, ctx) = match feed.poll()? {
                FeedPoll::Bar(bar, ctx) => (bar, ctx),
                FeedPoll::Gap => {
                    debug!("Feed gap, skipping cycle");
                    summary.gaps += 1;
                    continue;
                }
                FeedPoll::Exhausted => break,
            };
            summary.bars_seen += 1;

            let report = engine.on_bar(&bar, &ctx);
            match report.status {
                BarStatus::Evaluated(_) => summary.evaluated += 1,
                BarStatus::Duplicate => summary.duplicates += 1,
                BarStatus::Halted => {}
            }

            for intent in &report.intents {
                if live {
                    orders.submit(&symbol, intent)?;
                    summary.orders_submitted += 1;
                } else {
                    info!(
                        bar = intent.bar,
                        side = %intent.side,
                        capital = intent.capital,
                        price = display_price(intent.reference_price),
                        "SIM order not sent"
                    );
                    summary.orders_simulated += 1;
                }
            }

            if engine.is_halted() {
                warn!(bar = engine.state().bar, "Run ended by fail-safe");
                summary.halted = true;
                break;
            }
        }

        summary.trades = engine.state().ledger.closed_trades.len();
        info!(
            bars = summary.bars_seen,
            evaluated = summary.evaluated,
            gaps = summary.gaps,
            duplicates = summary.duplicates,
            trades = summary.trades,
            halted = summary.halted,
            "Run finished"
        );
        Ok(summary)
    }
}

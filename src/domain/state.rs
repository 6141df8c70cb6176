//! The engine's single mutable aggregate.
//!
//! Every pipeline stage receives `&mut EngineState` (or `&EngineState` for
//! the gates) explicitly; nothing else holds engine data between bars.

use crate::domain::bar::MarketBar;
use crate::domain::candidate::CandidatePool;
use crate::domain::config::EngineConfig;
use crate::domain::entry::EntryPermit;
use crate::domain::exit::confirm::{ExitConfirmer, FireLock};
use crate::domain::gates::GateOutcome;
use crate::domain::ledger::Ledger;
use crate::domain::position::PositionState;
use chrono::NaiveDate;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryCounters {
    pub cycle_id: u64,
    pub entries_in_cycle: u32,
    pub entries_today: u32,
    pub day: Option<NaiveDate>,
}

impl EntryCounters {
    /// Reset the per-day counter when the bar's UTC day differs from the last
    /// one seen. Returns true on rollover.
    pub fn roll_day(&mut self, day: NaiveDate) -> bool {
        if self.day == Some(day) {
            return false;
        }
        let rolled = self.day.is_some();
        self.day = Some(day);
        self.entries_today = 0;
        rolled
    }
}

/// Last executed entry and exit; survives the flat reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeHistory {
    pub last_entry_bar: Option<u64>,
    pub last_entry_price: Option<f64>,
    pub last_entry_reason: Option<String>,
    pub last_exit_bar: Option<u64>,
    pub last_exit_price: Option<f64>,
}

/// Bounded rolling windows derived from the bars the engine has seen.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketWindow {
    references: VecDeque<f64>,
    reference_cap: usize,
    ranges: VecDeque<(f64, f64)>,
    range_cap: usize,
}

impl MarketWindow {
    pub fn new(reference_cap: usize, range_cap: usize) -> Self {
        MarketWindow {
            references: VecDeque::new(),
            reference_cap: reference_cap.max(1),
            ranges: VecDeque::new(),
            range_cap: range_cap.max(1),
        }
    }

    pub fn push(&mut self, bar: &MarketBar) {
        if let Some(reference) = bar.reference.filter(|r| r.is_finite()) {
            self.references.push_back(reference);
            while self.references.len() > self.reference_cap {
                self.references.pop_front();
            }
        }
        self.ranges.push_back((bar.high, bar.low));
        while self.ranges.len() > self.range_cap {
            self.ranges.pop_front();
        }
    }

    /// `(value lookback bars ago, current value)`, or `None` while the
    /// history is shorter than `lookback + 1`.
    pub fn reference_span(&self, lookback: usize) -> Option<(f64, f64)> {
        let len = self.references.len();
        if lookback >= len {
            return None;
        }
        let current = *self.references.back()?;
        let past = *self.references.get(len - 1 - lookback)?;
        Some((past, current))
    }

    /// `(max high - min low) / close * 100` over the window.
    pub fn range_pct(&self, close: f64) -> Option<f64> {
        if close <= 0.0 || self.ranges.is_empty() {
            return None;
        }
        let high = self
            .ranges
            .iter()
            .map(|(h, _)| *h)
            .fold(f64::NEG_INFINITY, f64::max);
        let low = self
            .ranges
            .iter()
            .map(|(_, l)| *l)
            .fold(f64::INFINITY, f64::min);
        Some((high - low) / close * 100.0)
    }

    pub fn reference_len(&self) -> usize {
        self.references.len()
    }
}

#[derive(Debug, Clone)]
pub struct EngineState {
    pub bar: u64,
    pub candidates: CandidatePool,
    pub gate: GateOutcome,
    pub permit: Option<EntryPermit>,
    pub position: PositionState,
    pub confirmer: ExitConfirmer,
    /// Lock of the last executed exit; executing the same lock again is a no-op.
    pub executed_lock: Option<FireLock>,
    pub counters: EntryCounters,
    pub history: TradeHistory,
    pub ledger: Ledger,
    pub window: MarketWindow,
    pub halted: bool,
    /// Latched while loss exceeds the limit in notify-only mode.
    pub fail_safe_tripped: bool,
}

impl EngineState {
    pub fn new(cfg: &EngineConfig) -> Self {
        EngineState {
            bar: 0,
            candidates: CandidatePool::new(),
            gate: GateOutcome::pass(),
            permit: None,
            position: PositionState::Flat,
            confirmer: ExitConfirmer::new(),
            executed_lock: None,
            counters: EntryCounters::default(),
            history: TradeHistory::default(),
            ledger: Ledger::new(cfg.capital.base),
            window: MarketWindow::new(
                cfg.reference_history_len(),
                cfg.gates.volatility_window_bars,
            ),
            halted: false,
            fail_safe_tripped: false,
        }
    }

    pub fn exit_in_progress(&self) -> bool {
        self.confirmer.is_in_progress()
    }

    /// Return every entry/exit/candidate field to its flat value. Equity,
    /// realised P&L, counters, history and the executed lock are kept.
    pub fn reset_to_flat(&mut self) {
        self.position = PositionState::Flat;
        self.permit = None;
        self.confirmer.reset();
        self.candidates.clear();
    }
}

//! Candidate events and their bounded, aging pool.
//!
//! A candidate only records that the raw trigger fired. It has no effect on
//! gates or position state.

use crate::domain::bar::MarketBar;
use crate::domain::config::CandidateConfig;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

pub const REFERENCE_PENETRATION: &str = "reference_penetration";

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub bar: u64,
    pub time: DateTime<Utc>,
    pub trigger_price: f64,
    pub reference: f64,
    pub reason: String,
}

impl Candidate {
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.bar)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: VecDeque<Candidate>,
    last_created_bar: Option<u64>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a candidate when `bar.low < bar.reference`, at most once per bar
    /// and no sooner than `min_gap_bars` after the previous one.
    pub fn observe(&mut self, bar: &MarketBar, cfg: &CandidateConfig) -> Option<&Candidate> {
        if !cfg.body_below_reference {
            return None;
        }
        let reference = bar.reference?;

        if let Some(last) = self.last_created_bar {
            if last == bar.index {
                return None;
            }
            if cfg.min_gap_bars > 0 && bar.index.saturating_sub(last) < cfg.min_gap_bars {
                return None;
            }
        }

        if bar.low < reference {
            self.last_created_bar = Some(bar.index);
            self.candidates.push_back(Candidate {
                bar: bar.index,
                time: bar.time,
                trigger_price: bar.low,
                reference,
                reason: REFERENCE_PENETRATION.to_string(),
            });
            return self.candidates.back();
        }
        None
    }

    /// Drop entries older than `pool_ttl_bars`, then keep only the newest
    /// `pool_max_size`. A zero limit disables that rule.
    pub fn prune(&mut self, now: u64, cfg: &CandidateConfig) -> usize {
        let before = self.candidates.len();
        if cfg.pool_ttl_bars > 0 {
            self.candidates.retain(|c| c.age(now) <= cfg.pool_ttl_bars);
        }
        if cfg.pool_max_size > 0 {
            while self.candidates.len() > cfg.pool_max_size {
                self.candidates.pop_front();
            }
        }
        before - self.candidates.len()
    }

    /// Most recent candidate whose age is within `lookback` bars (0 = no limit).
    pub fn latest_valid(&self, now: u64, lookback: u64) -> Option<&Candidate> {
        self.candidates
            .back()
            .filter(|c| lookback == 0 || c.age(now) <= lookback)
    }

    pub fn latest(&self) -> Option<&Candidate> {
        self.candidates.back()
    }

    /// Forget every candidate, including the per-bar creation marker.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.last_created_bar = None;
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn last_created_bar(&self) -> Option<u64> {
        self.last_created_bar
    }
}

//! Typed engine configuration.
//!
//! Built once by [`crate::domain::config_validation::build_engine_config`] and
//! never mutated afterwards. Gate parameters of a disabled gate hold zero
//! values; they are only required from the config source once the gate is
//! switched on.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub symbol: String,
    /// Master switch; [`crate::domain::engine::Engine::new`] refuses a disabled engine.
    pub engine_enable: bool,
    pub candidate_enable: bool,
    pub entry_exec_enable: bool,
    pub entry_timing: EntryTiming,
    pub capital: CapitalConfig,
    pub candidate: CandidateConfig,
    pub gates: GateConfig,
    pub entry: EntryConfig,
    pub exit: ExitConfig,
    pub log: LogConfig,
}

impl EngineConfig {
    /// Number of reference values the slope gate needs: the current value plus
    /// `slope_lookback_bars` prior ones.
    pub fn reference_history_len(&self) -> usize {
        usize::try_from(self.gates.slope_lookback_bars)
            .unwrap_or(usize::MAX)
            .saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapitalConfig {
    pub base: f64,
    pub use_fixed: bool,
    pub max_loss_pct: f64,
    pub fail_safe: FailSafeMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateConfig {
    pub body_below_reference: bool,
    pub min_gap_bars: u64,
    pub pool_ttl_bars: u64,
    pub pool_max_size: usize,
    pub entry_lookback_bars: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub trend_bias_enable: bool,

    pub slope_min_pct: f64,
    pub slope_lookback_bars: u64,

    pub cooldown_enable: bool,
    pub cooldown_bars: u64,

    pub max_entries_per_cycle: u32,
    pub max_entries_per_day: u32,
    pub stale_block_enable: bool,
    pub stale_max_age_ms: i64,
    pub spread_guard_enable: bool,
    pub spread_max_pct: f64,

    pub reentry_entry_cooldown_bars: u64,
    pub reentry_exit_cooldown_bars: u64,
    pub reentry_same_reason_block: bool,
    pub reentry_price_tol_enable: bool,
    pub reentry_price_tol_pct: f64,

    pub volatility_enable: bool,
    pub volatility_max_pct: f64,
    pub volatility_window_bars: usize,
}

impl GateConfig {
    /// The slope gate is off when both its threshold and its lookback are zero.
    pub fn slope_enabled(&self) -> bool {
        !(self.slope_min_pct == 0.0 && self.slope_lookback_bars == 0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryConfig {
    pub min_price_move_pct: f64,
    pub only_on_new_low: bool,
    pub reference_distance_enable: bool,
    /// Fraction of the reference value, e.g. `0.002` for 0.2%.
    pub reference_tolerance: f64,
    pub reference_epsilon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitConfig {
    pub sl_pct: f64,
    pub tp_pct: f64,
    pub trailing_pct: f64,
    pub confirm_bars: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub log_candidates: bool,
    pub log_executions: bool,
}

/// Bar offset at which an entry permit may be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTiming {
    /// Permit granted at bar B opens only at B+1.
    NextBar,
    /// Permit granted at bar B opens at B.
    SameBar,
}

impl EntryTiming {
    pub fn offset(self) -> u64 {
        match self {
            EntryTiming::NextBar => 1,
            EntryTiming::SameBar => 0,
        }
    }
}

impl FromStr for EntryTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "next_bar" => Ok(EntryTiming::NextBar),
            "same_bar" => Ok(EntryTiming::SameBar),
            other => Err(format!("expected next_bar or same_bar, got '{other}'")),
        }
    }
}

impl fmt::Display for EntryTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryTiming::NextBar => write!(f, "next_bar"),
            EntryTiming::SameBar => write!(f, "same_bar"),
        }
    }
}

/// What happens once the drawdown limit is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailSafeMode {
    HardStop,
    NotifyOnly,
    Ignore,
}

impl FailSafeMode {
    /// Collapse the legacy `fail_fast_enable` / `fail_notify_only` pair.
    ///
    /// | fail_fast | notify_only | mode       |
    /// |-----------|-------------|------------|
    /// | true      | any         | HardStop   |
    /// | false     | false       | NotifyOnly |
    /// | false     | true        | Ignore     |
    pub fn from_legacy_flags(fail_fast: bool, notify_only: bool) -> Self {
        match (fail_fast, notify_only) {
            (true, _) => FailSafeMode::HardStop,
            (false, false) => FailSafeMode::NotifyOnly,
            (false, true) => FailSafeMode::Ignore,
        }
    }
}

impl FromStr for FailSafeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hard_stop" => Ok(FailSafeMode::HardStop),
            "notify_only" => Ok(FailSafeMode::NotifyOnly),
            "ignore" => Ok(FailSafeMode::Ignore),
            other => Err(format!(
                "expected hard_stop, notify_only or ignore, got '{other}'"
            )),
        }
    }
}

impl fmt::Display for FailSafeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailSafeMode::HardStop => write!(f, "hard_stop"),
            FailSafeMode::NotifyOnly => write!(f, "notify_only"),
            FailSafeMode::Ignore => write!(f, "ignore"),
        }
    }
}

/// Fully permissive configuration used by unit tests across the domain.
#[cfg(test)]
pub(crate) fn test_config() -> EngineConfig {
    EngineConfig {
        symbol: "WOOUSDT".into(),
        engine_enable: true,
        candidate_enable: true,
        entry_exec_enable: false,
        entry_timing: EntryTiming::NextBar,
        capital: CapitalConfig {
            base: 60.0,
            use_fixed: true,
            max_loss_pct: 100.0,
            fail_safe: FailSafeMode::HardStop,
        },
        candidate: CandidateConfig {
            body_below_reference: true,
            min_gap_bars: 0,
            pool_ttl_bars: 100,
            pool_max_size: 100,
            entry_lookback_bars: 100,
        },
        gates: GateConfig {
            trend_bias_enable: false,
            slope_min_pct: 0.0,
            slope_lookback_bars: 0,
            cooldown_enable: false,
            cooldown_bars: 0,
            max_entries_per_cycle: 2,
            max_entries_per_day: 20,
            stale_block_enable: false,
            stale_max_age_ms: 0,
            spread_guard_enable: false,
            spread_max_pct: 0.0,
            reentry_entry_cooldown_bars: 0,
            reentry_exit_cooldown_bars: 0,
            reentry_same_reason_block: false,
            reentry_price_tol_enable: false,
            reentry_price_tol_pct: 0.0,
            volatility_enable: false,
            volatility_max_pct: 0.0,
            volatility_window_bars: 0,
        },
        entry: EntryConfig {
            min_price_move_pct: 0.0,
            only_on_new_low: false,
            reference_distance_enable: false,
            reference_tolerance: 0.0,
            reference_epsilon: 0.0,
        },
        exit: ExitConfig {
            sl_pct: 0.6,
            tp_pct: 0.8,
            trailing_pct: 0.4,
            confirm_bars: 3,
        },
        log: LogConfig {
            log_candidates: true,
            log_executions: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_flag_truth_table() {
        assert_eq!(FailSafeMode::from_legacy_flags(true, true), FailSafeMode::HardStop);
        assert_eq!(FailSafeMode::from_legacy_flags(true, false), FailSafeMode::HardStop);
        assert_eq!(FailSafeMode::from_legacy_flags(false, false), FailSafeMode::NotifyOnly);
        assert_eq!(FailSafeMode::from_legacy_flags(false, true), FailSafeMode::Ignore);
    }

    #[test]
    fn fail_safe_mode_parses() {
        assert_eq!("hard_stop".parse::<FailSafeMode>(), Ok(FailSafeMode::HardStop));
        assert_eq!(" Notify_Only ".parse::<FailSafeMode>(), Ok(FailSafeMode::NotifyOnly));
        assert!("halt".parse::<FailSafeMode>().is_err());
    }

    #[test]
    fn entry_timing_offsets() {
        assert_eq!("next_bar".parse::<EntryTiming>().unwrap().offset(), 1);
        assert_eq!("same_bar".parse::<EntryTiming>().unwrap().offset(), 0);
        assert!("later".parse::<EntryTiming>().is_err());
    }

    #[test]
    fn slope_disabled_only_when_both_zero() {
        let mut gates = test_config().gates;
        assert!(!gates.slope_enabled());
        gates.slope_lookback_bars = 1;
        assert!(gates.slope_enabled());
        gates.slope_lookback_bars = 0;
        gates.slope_min_pct = 0.1;
        assert!(gates.slope_enabled());
    }

    #[test]
    fn reference_history_covers_lookback() {
        let mut cfg = test_config();
        cfg.gates.slope_lookback_bars = 3;
        assert_eq!(cfg.reference_history_len(), 4);
    }
}

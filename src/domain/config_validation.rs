//! Configuration validation.
//!
//! Reads every key through [`ConfigPort`], rejects anything missing or
//! mistyped, and produces the immutable [`EngineConfig`]. Gate enable flags
//! may be absent (off); once a gate is on, its parameters are required.

use crate::domain::config::{
    CandidateConfig, CapitalConfig, EngineConfig, EntryConfig, EntryTiming, ExitConfig,
    FailSafeMode, GateConfig, LogConfig,
};
use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;
use tracing::warn;

const KNOWN_KEYS: &[(&str, &[&str])] = &[
    (
        "engine",
        &[
            "symbol",
            "engine_enable",
            "candidate_enable",
            "entry_exec_enable",
            "entry_timing",
        ],
    ),
    (
        "capital",
        &[
            "base",
            "use_fixed",
            "max_loss_pct",
            "fail_safe_mode",
            "fail_fast_enable",
            "fail_notify_only",
        ],
    ),
    (
        "candidate",
        &[
            "body_below_reference",
            "min_gap_bars",
            "pool_ttl_bars",
            "pool_max_size",
            "entry_lookback_bars",
        ],
    ),
    (
        "gates",
        &[
            "trend_bias_enable",
            "slope_min_pct",
            "slope_lookback_bars",
            "cooldown_enable",
            "cooldown_bars",
            "max_entries_per_cycle",
            "max_entries_per_day",
            "stale_block_enable",
            "stale_max_age_ms",
            "spread_guard_enable",
            "spread_max_pct",
            "reentry_entry_cooldown_bars",
            "reentry_exit_cooldown_bars",
            "reentry_same_reason_block",
            "reentry_price_tol_enable",
            "reentry_price_tol_pct",
            "volatility_enable",
            "volatility_max_pct",
            "volatility_window_bars",
        ],
    ),
    (
        "entry",
        &[
            "min_price_move_pct",
            "only_on_new_low",
            "reference_distance_enable",
            "reference_tolerance",
            "reference_epsilon",
        ],
    ),
    ("exit", &["sl_pct", "tp_pct", "trailing_pct", "confirm_bars"]),
    ("log", &["log_candidates", "log_executions"]),
];

/// Validate the whole config source and build the typed configuration.
///
/// `engine_enable` is carried, not enforced, here; [`crate::domain::engine::Engine::new`]
/// refuses to start a disabled engine.
pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    warn_unknown_keys(config);

    Ok(EngineConfig {
        symbol: require_string(config, "engine", "symbol")?,
        engine_enable: require_bool(config, "engine", "engine_enable")?,
        candidate_enable: require_bool(config, "engine", "candidate_enable")?,
        entry_exec_enable: require_bool(config, "engine", "entry_exec_enable")?,
        entry_timing: require_parsed::<EntryTiming>(config, "engine", "entry_timing")?,
        capital: build_capital(config)?,
        candidate: build_candidate(config)?,
        gates: build_gates(config)?,
        entry: build_entry(config)?,
        exit: build_exit(config)?,
        log: LogConfig {
            log_candidates: require_bool(config, "log", "log_candidates")?,
            log_executions: require_bool(config, "log", "log_executions")?,
        },
    })
}

fn build_capital(config: &dyn ConfigPort) -> Result<CapitalConfig, EngineError> {
    let base = require_f64(config, "capital", "base")?;
    if base <= 0.0 {
        return Err(EngineError::invalid("capital", "base", "base must be positive"));
    }
    let max_loss_pct = require_f64(config, "capital", "max_loss_pct")?;
    if max_loss_pct < 0.0 {
        return Err(EngineError::invalid(
            "capital",
            "max_loss_pct",
            "max_loss_pct must be non-negative",
        ));
    }
    Ok(CapitalConfig {
        base,
        use_fixed: require_bool(config, "capital", "use_fixed")?,
        max_loss_pct,
        fail_safe: resolve_fail_safe(config)?,
    })
}

fn resolve_fail_safe(config: &dyn ConfigPort) -> Result<FailSafeMode, EngineError> {
    if config.has_key("capital", "fail_safe_mode") {
        if config.has_key("capital", "fail_fast_enable")
            || config.has_key("capital", "fail_notify_only")
        {
            warn!("[capital] fail_safe_mode set; legacy fail_fast_enable/fail_notify_only ignored");
        }
        return require_parsed::<FailSafeMode>(config, "capital", "fail_safe_mode");
    }
    let fail_fast = require_bool(config, "capital", "fail_fast_enable")?;
    let notify_only = require_bool(config, "capital", "fail_notify_only")?;
    Ok(FailSafeMode::from_legacy_flags(fail_fast, notify_only))
}

fn build_candidate(config: &dyn ConfigPort) -> Result<CandidateConfig, EngineError> {
    Ok(CandidateConfig {
        body_below_reference: require_bool(config, "candidate", "body_below_reference")?,
        min_gap_bars: require_u64(config, "candidate", "min_gap_bars")?,
        pool_ttl_bars: require_u64(config, "candidate", "pool_ttl_bars")?,
        pool_max_size: require_u64(config, "candidate", "pool_max_size")? as usize,
        entry_lookback_bars: require_u64(config, "candidate", "entry_lookback_bars")?,
    })
}

/// Upper bound on the rolling windows the gates keep in memory.
pub const MAX_WINDOW_BARS: u64 = 100_000;

fn build_gates(config: &dyn ConfigPort) -> Result<GateConfig, EngineError> {
    const S: &str = "gates";

    let slope_min_pct = require_f64(config, S, "slope_min_pct")?;
    let slope_lookback_bars = require_u64(config, S, "slope_lookback_bars")?;
    if slope_lookback_bars == 0 && slope_min_pct != 0.0 {
        return Err(EngineError::invalid(
            S,
            "slope_lookback_bars",
            "slope_lookback_bars must be at least 1 when slope_min_pct is set",
        ));
    }
    if slope_lookback_bars > MAX_WINDOW_BARS {
        return Err(EngineError::invalid(
            S,
            "slope_lookback_bars",
            format!("slope_lookback_bars must be at most {MAX_WINDOW_BARS}"),
        ));
    }

    let cooldown_enable = flag_or_off(config, S, "cooldown_enable")?;
    let stale_block_enable = flag_or_off(config, S, "stale_block_enable")?;
    let spread_guard_enable = flag_or_off(config, S, "spread_guard_enable")?;
    let reentry_price_tol_enable = flag_or_off(config, S, "reentry_price_tol_enable")?;
    let volatility_enable = flag_or_off(config, S, "volatility_enable")?;

    let stale_max_age_ms = if stale_block_enable {
        let v = require_u64(config, S, "stale_max_age_ms")?;
        i64::try_from(v).map_err(|_| EngineError::invalid(S, "stale_max_age_ms", "too large"))?
    } else {
        0
    };

    let spread_max_pct = if spread_guard_enable {
        require_non_negative(config, S, "spread_max_pct")?
    } else {
        0.0
    };

    let reentry_price_tol_pct = if reentry_price_tol_enable {
        require_non_negative(config, S, "reentry_price_tol_pct")?
    } else {
        0.0
    };

    let (volatility_max_pct, volatility_window_bars) = if volatility_enable {
        let max_pct = require_non_negative(config, S, "volatility_max_pct")?;
        let window = require_u64(config, S, "volatility_window_bars")?;
        if window == 0 {
            return Err(EngineError::invalid(
                S,
                "volatility_window_bars",
                "volatility_window_bars must be at least 1",
            ));
        }
        if window > MAX_WINDOW_BARS {
            return Err(EngineError::invalid(
                S,
                "volatility_window_bars",
                format!("volatility_window_bars must be at most {MAX_WINDOW_BARS}"),
            ));
        }
        (max_pct, window as usize)
    } else {
        (0.0, 0)
    };

    Ok(GateConfig {
        trend_bias_enable: flag_or_off(config, S, "trend_bias_enable")?,
        slope_min_pct,
        slope_lookback_bars,
        cooldown_enable,
        cooldown_bars: if cooldown_enable {
            require_u64(config, S, "cooldown_bars")?
        } else {
            0
        },
        max_entries_per_cycle: require_u32(config, S, "max_entries_per_cycle")?,
        max_entries_per_day: require_u32(config, S, "max_entries_per_day")?,
        stale_block_enable,
        stale_max_age_ms,
        spread_guard_enable,
        spread_max_pct,
        reentry_entry_cooldown_bars: require_u64(config, S, "reentry_entry_cooldown_bars")?,
        reentry_exit_cooldown_bars: require_u64(config, S, "reentry_exit_cooldown_bars")?,
        reentry_same_reason_block: require_bool(config, S, "reentry_same_reason_block")?,
        reentry_price_tol_enable,
        reentry_price_tol_pct,
        volatility_enable,
        volatility_max_pct,
        volatility_window_bars,
    })
}

fn build_entry(config: &dyn ConfigPort) -> Result<EntryConfig, EngineError> {
    const S: &str = "entry";
    let min_price_move_pct = require_non_negative(config, S, "min_price_move_pct")?;
    let reference_distance_enable = flag_or_off(config, S, "reference_distance_enable")?;
    let (reference_tolerance, reference_epsilon) = if reference_distance_enable {
        (
            require_non_negative(config, S, "reference_tolerance")?,
            require_non_negative(config, S, "reference_epsilon")?,
        )
    } else {
        (0.0, 0.0)
    };
    Ok(EntryConfig {
        min_price_move_pct,
        only_on_new_low: require_bool(config, S, "only_on_new_low")?,
        reference_distance_enable,
        reference_tolerance,
        reference_epsilon,
    })
}

fn build_exit(config: &dyn ConfigPort) -> Result<ExitConfig, EngineError> {
    const S: &str = "exit";
    let sl_pct = require_positive(config, S, "sl_pct")?;
    let tp_pct = require_positive(config, S, "tp_pct")?;
    if tp_pct >= 100.0 {
        return Err(EngineError::invalid(S, "tp_pct", "tp_pct must be below 100"));
    }
    let trailing_pct = require_positive(config, S, "trailing_pct")?;
    let confirm_bars = require_u32(config, S, "confirm_bars")?;
    if confirm_bars < 1 {
        return Err(EngineError::invalid(
            S,
            "confirm_bars",
            "confirm_bars must be at least 1",
        ));
    }
    Ok(ExitConfig {
        sl_pct,
        tp_pct,
        trailing_pct,
        confirm_bars,
    })
}

fn warn_unknown_keys(config: &dyn ConfigPort) {
    for (section, known) in KNOWN_KEYS {
        for key in config.keys(section) {
            if !known.contains(&key.as_str()) {
                warn!(section = *section, key = %key, "unrecognised config key");
            }
        }
    }
}

fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, EngineError> {
    config
        .get_string(section, key)
        .ok_or_else(|| EngineError::missing(section, key))
}

fn require_parsed<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<T, EngineError>
where
    T: FromStr,
    T::Err: ToString,
{
    let raw = require_string(config, section, key)?;
    raw.parse::<T>()
        .map_err(|e| EngineError::invalid(section, key, e.to_string()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn require_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<bool, EngineError> {
    let raw = require_string(config, section, key)?;
    parse_bool(&raw)
        .ok_or_else(|| EngineError::invalid(section, key, format!("expected boolean, got '{raw}'")))
}

/// A gate's own enable flag: absent means off, present must be a boolean.
fn flag_or_off(config: &dyn ConfigPort, section: &str, key: &str) -> Result<bool, EngineError> {
    match config.get_string(section, key) {
        None => Ok(false),
        Some(raw) => parse_bool(&raw).ok_or_else(|| {
            EngineError::invalid(section, key, format!("expected boolean, got '{raw}'"))
        }),
    }
}

fn require_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, EngineError> {
    let raw = require_string(config, section, key)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(EngineError::invalid(
            section,
            key,
            format!("expected number, got '{raw}'"),
        )),
    }
}

fn require_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<f64, EngineError> {
    let v = require_f64(config, section, key)?;
    if v < 0.0 {
        return Err(EngineError::invalid(
            section,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(v)
}

fn require_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, EngineError> {
    let v = require_f64(config, section, key)?;
    if v <= 0.0 {
        return Err(EngineError::invalid(
            section,
            key,
            format!("{key} must be positive"),
        ));
    }
    Ok(v)
}

fn require_u64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<u64, EngineError> {
    let raw = require_string(config, section, key)?;
    raw.parse::<u64>().map_err(|_| {
        EngineError::invalid(
            section,
            key,
            format!("expected non-negative integer, got '{raw}'"),
        )
    })
}

fn require_u32(config: &dyn ConfigPort, section: &str, key: &str) -> Result<u32, EngineError> {
    let v = require_u64(config, section, key)?;
    u32::try_from(v).map_err(|_| EngineError::invalid(section, key, format!("{key} is too large")))
}

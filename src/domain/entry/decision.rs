//! Entry permit decision.
//!
//! Preconditions, checked in order, first failure wins:
//!
//! 1. no exit in progress
//! 2. gate chain passed
//! 3. a candidate within `entry_lookback_bars`
//! 4. position flat
//! 5. close within `tolerance + epsilon` of the reference (if enabled)
//! 6. close moved at least `min_price_move_pct` below the trigger
//! 7. close at or below the trigger (if `only_on_new_low`)
//!
//! A pending permit is re-checked every bar until consumed. It is kept as
//! granted while the preconditions hold and revoked as soon as one fails.

use super::EntryPermit;
use crate::domain::bar::{display_price, MarketBar};
use crate::domain::config::EngineConfig;
use crate::domain::gates::GateVerdict;
use crate::domain::state::EngineState;

pub const NO_VALID_CANDIDATE: &str = "no valid candidate";
pub const EXIT_IN_PROGRESS: &str = "exit in progress";
pub const POSITION_OPEN: &str = "position open";

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Granted(EntryPermit),
    /// A pending permit still holds.
    Kept(EntryPermit),
    Revoked { permit: EntryPermit, reason: String },
    Blocked(String),
}

/// Returns the reason of the entry candidate on success.
pub fn check_preconditions(
    cfg: &EngineConfig,
    state: &EngineState,
    bar: &MarketBar,
    gate: &GateVerdict,
) -> Result<String, String> {
    if state.exit_in_progress() {
        return Err(EXIT_IN_PROGRESS.into());
    }
    if !gate.passed() {
        return Err(gate.outcome.reason_or("gate blocked").to_string());
    }
    let Some(candidate) = state
        .candidates
        .latest_valid(bar.index, cfg.candidate.entry_lookback_bars)
    else {
        return Err(NO_VALID_CANDIDATE.into());
    };
    if state.position.is_open() {
        return Err(POSITION_OPEN.into());
    }

    let close = bar.close;
    let entry = &cfg.entry;

    if entry.reference_distance_enable {
        let Some(reference) = bar.reference.filter(|r| *r > 0.0) else {
            return Err("reference missing for distance check".into());
        };
        let distance = (close - reference).abs() / reference;
        if distance > entry.reference_tolerance + entry.reference_epsilon {
            return Err(format!(
                "too far from reference: distance={}",
                display_price(distance)
            ));
        }
    }

    if entry.min_price_move_pct > 0.0 {
        let trigger = candidate.trigger_price;
        if trigger <= 0.0 {
            return Err("trigger price missing".into());
        }
        let move_pct = (trigger - close) / trigger * 100.0;
        if move_pct < entry.min_price_move_pct {
            return Err(format!(
                "price move too small: move_pct={}",
                display_price(move_pct)
            ));
        }
    }

    if entry.only_on_new_low && close > candidate.trigger_price {
        return Err("not a new low".into());
    }

    Ok(candidate.reason.clone())
}

pub fn decide(
    cfg: &EngineConfig,
    state: &mut EngineState,
    bar: &MarketBar,
    gate: &GateVerdict,
) -> Decision {
    let verdict = check_preconditions(cfg, state, bar, gate);
    match (state.permit.clone(), verdict) {
        (Some(permit), Ok(_)) => Decision::Kept(permit),
        (Some(permit), Err(reason)) => {
            state.permit = None;
            Decision::Revoked { permit, reason }
        }
        (None, Ok(reason)) => {
            let permit = EntryPermit {
                granted_bar: bar.index,
                valid_bar: bar.index + cfg.entry_timing.offset(),
                reason,
            };
            state.permit = Some(permit.clone());
            Decision::Granted(permit)
        }
        (None, Err(reason)) => Decision::Blocked(reason),
    }
}

//! Entry gate chain.
//!
//! Each gate is a pure function of the config, the bar, the collaborator
//! context and a read-only view of the engine state. Gates run in the fixed
//! order of [`GateKind::ORDER`] and the chain stops at the first block,
//! keeping that gate's reason. A gate switched off still runs and passes.

pub mod cooldown;
pub mod reentry;
pub mod safety;
pub mod slope;
pub mod trend;
pub mod volatility;

use crate::domain::bar::{BarContext, MarketBar};
use crate::domain::config::EngineConfig;
use crate::domain::state::EngineState;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    TrendBias,
    Slope,
    Cooldown,
    RateSafety,
    Reentry,
    Volatility,
}

impl GateKind {
    pub const ORDER: [GateKind; 6] = [
        GateKind::TrendBias,
        GateKind::Slope,
        GateKind::Cooldown,
        GateKind::RateSafety,
        GateKind::Reentry,
        GateKind::Volatility,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GateKind::TrendBias => "trend_bias",
            GateKind::Slope => "slope",
            GateKind::Cooldown => "cooldown",
            GateKind::RateSafety => "rate_safety",
            GateKind::Reentry => "reentry",
            GateKind::Volatility => "volatility",
        }
    }

    pub fn evaluate(self, gc: &GateContext<'_>) -> GateOutcome {
        match self {
            GateKind::TrendBias => trend::evaluate(gc),
            GateKind::Slope => slope::evaluate(gc),
            GateKind::Cooldown => cooldown::evaluate(gc),
            GateKind::RateSafety => safety::evaluate(gc),
            GateKind::Reentry => reentry::evaluate(gc),
            GateKind::Volatility => volatility::evaluate(gc),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub pass: bool,
    pub reason: Option<String>,
}

impl GateOutcome {
    pub fn pass() -> Self {
        GateOutcome {
            pass: true,
            reason: None,
        }
    }

    /// Passing outcome that still carries a note, e.g. `"disabled"`.
    pub fn pass_with(reason: impl Into<String>) -> Self {
        GateOutcome {
            pass: true,
            reason: Some(reason.into()),
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        GateOutcome {
            pass: false,
            reason: Some(reason.into()),
        }
    }

    pub fn reason_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.reason.as_deref().unwrap_or(fallback)
    }
}

/// Read-only inputs shared by every gate for one bar.
pub struct GateContext<'a> {
    pub cfg: &'a EngineConfig,
    pub bar: &'a MarketBar,
    pub ctx: &'a BarContext,
    pub state: &'a EngineState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateVerdict {
    pub outcome: GateOutcome,
    pub blocked_by: Option<GateKind>,
    /// Every gate that ran this bar, in order.
    pub trace: Vec<(GateKind, GateOutcome)>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.outcome.pass
    }
}

pub fn evaluate_chain(gc: &GateContext<'_>) -> GateVerdict {
    let mut trace = Vec::with_capacity(GateKind::ORDER.len());
    for kind in GateKind::ORDER {
        let outcome = kind.evaluate(gc);
        trace.push((kind, outcome.clone()));
        if !outcome.pass {
            return GateVerdict {
                outcome,
                blocked_by: Some(kind),
                trace,
            };
        }
    }
    GateVerdict {
        outcome: GateOutcome::pass(),
        blocked_by: None,
        trace,
    }
}

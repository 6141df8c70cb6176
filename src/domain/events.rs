//! Decision events and order intents produced by the engine.

use crate::domain::exit::confirm::ExitSignal;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    CandidateCreated {
        bar: u64,
        trigger_price: f64,
        reference: f64,
    },
    EntryPermitGranted {
        bar: u64,
        valid_bar: u64,
        reason: String,
    },
    EntryPermitExpired {
        granted_bar: u64,
        reason: String,
    },
    PositionOpened {
        bar: u64,
        price: f64,
        capital: f64,
        quantity: f64,
    },
    ExitConfirmed {
        bar: u64,
        signal: ExitSignal,
    },
    PositionClosed {
        bar: u64,
        exit_price: f64,
        pnl: f64,
    },
    EngineHalted {
        reason: String,
    },
    FailSafeTripped {
        loss: f64,
        limit: f64,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::CandidateCreated { .. } => "CandidateCreated",
            EngineEvent::EntryPermitGranted { .. } => "EntryPermitGranted",
            EngineEvent::EntryPermitExpired { .. } => "EntryPermitExpired",
            EngineEvent::PositionOpened { .. } => "PositionOpened",
            EngineEvent::ExitConfirmed { .. } => "ExitConfirmed",
            EngineEvent::PositionClosed { .. } => "PositionClosed",
            EngineEvent::EngineHalted { .. } => "EngineHalted",
            EngineEvent::FailSafeTripped { .. } => "FailSafeTripped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    /// Open the short.
    Open,
    /// Buy back the short.
    Close,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Open => write!(f, "OPEN"),
            OrderSide::Close => write!(f, "CLOSE"),
        }
    }
}

/// What the order collaborator should do. Quantity rounding and submission
/// belong to the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub bar: u64,
    pub side: OrderSide,
    pub reduce_only: bool,
    /// Capital committed to the position; the adapter derives quantity.
    pub capital: f64,
    pub reference_price: f64,
}

impl OrderIntent {
    pub fn open(bar: u64, capital: f64, price: f64) -> Self {
        OrderIntent {
            bar,
            side: OrderSide::Open,
            reduce_only: false,
            capital,
            reference_price: price,
        }
    }

    pub fn close(bar: u64, capital: f64, price: f64) -> Self {
        OrderIntent {
            bar,
            side: OrderSide::Close,
            reduce_only: true,
            capital,
            reference_price: price,
        }
    }
}

//! Append-only audit trail. Never read back by engine logic.

use crate::domain::exit::confirm::ExitSignal;
use crate::domain::exit::levels::LevelSnapshot;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub bar: u64,
    pub time: DateTime<Utc>,
    pub granted_bar: u64,
    pub entry_price: f64,
    pub capital: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitRecord {
    pub bar: u64,
    pub time: DateTime<Utc>,
    pub signal: ExitSignal,
    pub close: f64,
    pub confirm_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLog {
    pub executions: Vec<ExecutionRecord>,
    pub exits: Vec<ExitRecord>,
    pub levels: Vec<LevelSnapshot>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty() && self.exits.is_empty() && self.levels.is_empty()
    }
}

//! Audit trail output port.

use crate::domain::audit::AuditLog;
use crate::domain::error::EngineError;
use crate::domain::position::ClosedTrade;

/// Port for persisting the audit trail at the end of a run.
pub trait AuditPort {
    fn write(&self, audit: &AuditLog, trades: &[ClosedTrade]) -> Result<(), EngineError>;
}

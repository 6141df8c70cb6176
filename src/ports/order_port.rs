//! Order submission port.

use crate::domain::error::EngineError;
use crate::domain::events::OrderIntent;

/// Owns quantity normalisation and submission. The engine only hands over
/// intents.
pub trait OrderPort {
    fn submit(&mut self, symbol: &str, intent: &OrderIntent) -> Result<(), EngineError>;
}

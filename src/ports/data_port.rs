//! Bar source port.

use crate::domain::bar::{BarContext, ClosedBar};
use crate::domain::error::EngineError;

/// Result of one poll of the bar source.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPoll {
    /// A closed bar plus whatever context the source can supply for it.
    Bar(ClosedBar, BarContext),
    /// Nothing available this cycle; the engine skips it.
    Gap,
    /// The source has no more bars.
    Exhausted,
}

pub trait BarFeed {
    fn poll(&mut self) -> Result<FeedPoll, EngineError>;
}

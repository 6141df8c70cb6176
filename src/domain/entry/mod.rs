//! Entry side of the pipeline: permit decision and time-locked execution.

pub mod decision;
pub mod executor;

/// One-bar authorisation to open a short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPermit {
    pub granted_bar: u64,
    /// The only bar at which the permit may be consumed.
    pub valid_bar: u64,
    pub reason: String,
}

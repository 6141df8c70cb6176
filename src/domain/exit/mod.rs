//! Exit side of the pipeline: levels, N-bar confirmation, execution.

pub mod confirm;
pub mod executor;
pub mod levels;

//! Port traits for the engine's collaborators.

pub mod config_port;
pub mod data_port;
pub mod order_port;
pub mod report_port;

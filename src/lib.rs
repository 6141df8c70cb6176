//! bargate: bar-synchronous short-entry engine with gated entries and
//! confirmed exits.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line wiring in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

//! Core domain types and the bar-synchronous short-entry engine.

pub mod audit;
pub mod bar;
pub mod candidate;
pub mod clock;
pub mod config;
pub mod config_validation;
pub mod ema;
pub mod engine;
pub mod entry;
pub mod error;
pub mod events;
pub mod exit;
pub mod failsafe;
pub mod gates;
pub mod ledger;
pub mod metrics;
pub mod position;
pub mod runner;
pub mod state;

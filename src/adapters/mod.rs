//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_audit_adapter;
pub mod file_config_adapter;
pub mod paper_order_adapter;

//! Shared domain model and audit events for the Courier delivery engine.
//!
//! Everything the engine persists lives here: campaigns and their delivery
//! logs, subscribers and suppression entries, transport provider
//! configuration, bulk mutation jobs, and the global quota counters. The
//! store, transport, delivery, and job crates all speak these types.

pub mod audit;
pub mod campaign;
pub mod catalog;
pub mod job;
pub mod log;
pub mod provider;
pub mod quota;
pub mod subscriber;

pub use tracing;

/// Shutdown signalling between long-running components.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
    Finalised,
}

//! Backing store implementations.
//!
//! Currently in-memory only; the traits in [`crate::r#trait`] are the seam
//! a database-backed implementation plugs into.

pub mod memory;

pub use memory::{MemoryPayloadStore, MemoryStore};

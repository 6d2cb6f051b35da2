//! Storage abstraction for the Courier delivery engine.
//!
//! The data store is the single source of truth: the engine holds no
//! durable state of its own beyond what it writes back, which is what makes
//! crash recovery possible (a crashed run simply leaves a campaign
//! `sending` or a job `running` and stale).
//!
//! Mutual exclusion between concurrent invocations is provided exclusively
//! by conditional single-row updates ([`Store::transition_campaign`],
//! [`Store::claim_due_job`]) — no lock service, no multi-row transactions.

pub mod backends;
pub mod error;
pub mod r#trait;

pub use backends::{MemoryPayloadStore, MemoryStore};
pub use error::{Result, StoreError};
pub use r#trait::{PayloadStore, QuotaStore, Store};

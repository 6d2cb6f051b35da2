//! Typed error handling for delivery operations.
//!
//! Per-recipient transport failures are not represented here: they are
//! recovered by the provider chain and recorded in delivery log rows. What
//! remains is fatal for the whole run — the store being unreachable, or
//! configuration that retrying cannot fix.

use courier_common::campaign::CampaignStatus;
use courier_store::StoreError;
use thiserror::Error;

/// Fatal errors for a dispatcher or scheduler run.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Missing or invalid configuration. Surfaced immediately; never
    /// retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The data store failed; the run cannot proceed or record outcomes.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The campaign is in a state the dispatcher may not enter.
    #[error("Campaign '{campaign_id}' is {status}, refusing to dispatch")]
    InvalidState {
        campaign_id: String,
        status: CampaignStatus,
    },
}

impl DeliveryError {
    /// Returns `true` for configuration failures (no providers, no limits).
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` when another invocation already owns the campaign or
    /// it has finished — not a failure of this run, just nothing to do.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

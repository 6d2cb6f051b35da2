//! Append-only delivery log rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

/// One row per (campaign, recipient) attempt.
///
/// Rows are never updated after creation — a retried send appends a new row,
/// preserving the full attempt history. The presence of a row for a
/// recipient is what distinguishes "sent" from "not yet sent" across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLog {
    /// Row identifier (lexicographically sortable by creation time).
    pub id: Ulid,
    pub campaign_id: String,
    pub recipient: String,
    pub status: DeliveryOutcome,
    /// Name of the provider that accepted the message, when one did.
    #[serde(default)]
    pub provider_used: Option<String>,
    /// Failure description after the chain was exhausted.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

impl DeliveryLog {
    /// Row for a successful send.
    #[must_use]
    pub fn sent(
        campaign_id: impl Into<String>,
        recipient: impl Into<String>,
        provider: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            campaign_id: campaign_id.into(),
            recipient: recipient.into(),
            status: DeliveryOutcome::Sent,
            provider_used: Some(provider.into()),
            error: None,
            sent_at: Some(at),
        }
    }

    /// Row for a send whose provider chain was exhausted.
    #[must_use]
    pub fn failed(
        campaign_id: impl Into<String>,
        recipient: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            campaign_id: campaign_id.into(),
            recipient: recipient.into(),
            status: DeliveryOutcome::Failed,
            provider_used: None,
            error: Some(error.into()),
            sent_at: None,
        }
    }
}

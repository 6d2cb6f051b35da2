//! Campaign lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a campaign.
///
/// The only transition the engine performs under contention is
/// `Approved` → `Sending`, executed as a conditional single-row update so
/// that exactly one dispatcher invocation wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Authored but not yet released for sending.
    Draft,
    /// Released; eligible for dispatch once `scheduled_at` has passed.
    Approved,
    /// A dispatcher invocation holds this campaign.
    Sending,
    /// All recipients processed, none failed.
    Completed,
    /// All recipients processed, at least one failed.
    CompletedWithErrors,
    /// The run could not proceed at all.
    Failed,
}

impl CampaignStatus {
    /// Returns `true` for statuses no dispatcher may re-enter.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed
        )
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Sending => "sending",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        })
    }
}

/// An outbound email campaign.
///
/// Authored by an external flow; the engine only ever moves its status
/// forward and accumulates the sent/failed counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign identifier.
    pub id: String,
    /// Subject line; `{{name}}` is substituted per recipient.
    pub subject: String,
    /// HTML body; `{{name}}` and `{{email}}` are substituted per recipient.
    pub content: String,
    /// Current lifecycle status.
    pub status: CampaignStatus,
    /// When the campaign becomes due. `None` means "send now" only.
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Number of recipients with a successful delivery log row.
    #[serde(default)]
    pub sent_count: u32,
    /// Number of recipients with a failed delivery log row.
    #[serde(default)]
    pub failed_count: u32,
}

impl Campaign {
    /// Create a draft campaign.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            content: content.into(),
            status: CampaignStatus::Draft,
            scheduled_at: None,
            sent_count: 0,
            failed_count: 0,
        }
    }

    /// Whether the campaign is approved and its scheduled time has arrived.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Approved
            && self.scheduled_at.is_some_and(|at| at <= now)
    }
}

/// Outcome of one dispatcher invocation, as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Campaign the invocation operated on.
    pub campaign_id: String,
    /// Status the campaign was left in.
    pub status: CampaignStatus,
    /// Total successful sends recorded so far (across runs).
    pub sent: u32,
    /// Total failed sends recorded so far (across runs).
    pub failed: u32,
    /// Recipients left unsent because admission was partial or denied.
    pub deferred: u32,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "campaign {}: {} (sent {}, failed {}, deferred {})",
            self.campaign_id, self.status, self.sent, self.failed, self.deferred
        )
    }
}

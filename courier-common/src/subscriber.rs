//! Subscriber model types.

use serde::{Deserialize, Serialize};

/// Subscription status. Only `Active` subscribers are candidate recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    Active,
    Unsubscribed,
    Bounced,
}

/// A mailing-list subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    /// Subscriber identifier.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Subscription status.
    pub status: SubscriberStatus,
    /// Display name used for personalization, when known.
    #[serde(default)]
    pub name: Option<String>,
}

impl Subscriber {
    /// Create an active subscriber.
    #[must_use]
    pub fn active(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            status: SubscriberStatus::Active,
            name: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, SubscriberStatus::Active)
    }
}

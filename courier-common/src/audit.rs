//! Audit records and structured audit events.
//!
//! Two layers: durable [`OperationAudit`] rows written to the store for
//! bulk jobs (what changed, keyed by natural id, with field-level diffs),
//! and structured `tracing` events for the message lifecycle. Recipient
//! addresses can be redacted from the event stream via [`AuditConfig`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A single field change applied by a bulk job row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDiff {
    /// Natural key of the changed row (SKU, invoice number, ...).
    pub key: String,
    pub field: String,
    /// Previous value; `None` for inserts.
    #[serde(default)]
    pub old: Option<String>,
    pub new: String,
}

impl RowDiff {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        field: impl Into<String>,
        old: Option<String>,
        new: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            field: field.into(),
            old,
            new: new.into(),
        }
    }
}

/// One row per completed job run that changed anything, regardless of the
/// run's success/failure mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationAudit {
    pub id: Ulid,
    pub job_id: String,
    pub changed_table: String,
    pub changed_ids: Vec<String>,
    pub diffs: Vec<RowDiff>,
    pub recorded_at: DateTime<Utc>,
}

/// Audit event configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit events for the message lifecycle.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Redact recipient addresses from audit events (PII protection).
    #[serde(default)]
    pub redact_recipients: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_recipients: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

static AUDIT_CONFIG: std::sync::OnceLock<Arc<AuditConfig>> = std::sync::OnceLock::new();

/// Initialize audit logging with configuration.
pub fn init(config: AuditConfig) {
    AUDIT_CONFIG.get_or_init(|| Arc::new(config));
}

/// Get the current audit configuration.
#[must_use]
pub fn config() -> Arc<AuditConfig> {
    AUDIT_CONFIG
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(AuditConfig::default()))
}

/// Redact the local part of an address if redaction is enabled.
#[must_use]
pub fn redact_email(email: &str, redact: bool) -> String {
    if redact {
        email.split_once('@').map_or_else(
            || "[REDACTED]".to_string(),
            |(_, domain)| format!("[REDACTED]@{domain}"),
        )
    } else {
        email.to_string()
    }
}

/// Log a successful delivery.
pub fn log_delivery_success(campaign_id: &str, recipient: &str, provider: &str) {
    let config = config();
    if !config.enabled {
        return;
    }

    let recipient = redact_email(recipient, config.redact_recipients);
    tracing::event!(
        tracing::Level::INFO,
        event = "DeliverySuccess",
        campaign_id = %campaign_id,
        recipient = %recipient,
        provider = %provider,
        "Audit: delivery successful"
    );
}

/// Log a delivery whose provider chain was exhausted.
pub fn log_delivery_failure(campaign_id: &str, recipient: &str, error: &str) {
    let config = config();
    if !config.enabled {
        return;
    }

    let recipient = redact_email(recipient, config.redact_recipients);
    tracing::event!(
        tracing::Level::WARN,
        event = "DeliveryFailure",
        campaign_id = %campaign_id,
        recipient = %recipient,
        error = %error,
        "Audit: delivery failed"
    );
}

/// Log a campaign reaching a terminal status.
pub fn log_campaign_finished(campaign_id: &str, status: &str, sent: u32, failed: u32) {
    let config = config();
    if !config.enabled {
        return;
    }

    tracing::event!(
        tracing::Level::INFO,
        event = "CampaignFinished",
        campaign_id = %campaign_id,
        status = %status,
        sent = sent,
        failed = failed,
        "Audit: campaign finished"
    );
}

/// Log a bulk job run reaching a terminal status for this invocation.
pub fn log_job_finished(job_id: &str, status: &str, processed: u32, failed: u32) {
    let config = config();
    if !config.enabled {
        return;
    }

    tracing::event!(
        tracing::Level::INFO,
        event = "JobFinished",
        job_id = %job_id,
        status = %status,
        processed = processed,
        failed = failed,
        "Audit: bulk job finished"
    );
}

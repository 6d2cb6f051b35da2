//! Bulk mutation job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed (possibly waiting out a retry backoff).
    Pending,
    /// Claimed by a processor invocation.
    Running,
    /// All rows applied, none failed.
    Completed,
    /// All rows attempted, at least one failed.
    CompletedWithErrors,
    /// The job itself failed (payload unreadable, store unavailable); a
    /// retry is scheduled via `next_run`.
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        })
    }
}

/// Which row handler a job's payload is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Stock-level upserts by SKU (insert allowed for unknown SKUs).
    Inventory,
    /// Price updates by SKU (unknown SKUs fail the row).
    Pricing,
    /// Order status updates by invoice number.
    OrderStatus,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Inventory => "inventory",
            Self::Pricing => "pricing",
            Self::OrderStatus => "order_status",
        })
    }
}

/// A generic bulk data-mutation job sourced from an uploaded payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJob {
    pub id: String,
    pub operation_type: OperationType,
    pub status: JobStatus,
    /// Reference into the payload store.
    pub payload_ref: String,
    /// Number of times the job itself has failed.
    #[serde(default)]
    pub attempts: u32,
    /// Earliest time a retry may be claimed. `None` until a failure
    /// schedules one.
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_records: u32,
    #[serde(default)]
    pub successful_records: u32,
    #[serde(default)]
    pub failed_records: u32,
    /// Row-level failure descriptions plus job-level error messages.
    #[serde(default)]
    pub error_log: Vec<String>,
}

impl BulkJob {
    /// Create a pending job.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        operation_type: OperationType,
        payload_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            operation_type,
            status: JobStatus::Pending,
            payload_ref: payload_ref.into(),
            attempts: 0,
            next_run: None,
            processed_records: 0,
            successful_records: 0,
            failed_records: 0,
            error_log: Vec::new(),
        }
    }

    /// Whether the job may be claimed at `now`: pending jobs whose
    /// `next_run` is unset or past, and failed jobs whose retry backoff has
    /// elapsed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            JobStatus::Pending => self.next_run.is_none_or(|at| at <= now),
            JobStatus::Failed => self.next_run.is_some_and(|at| at <= now),
            JobStatus::Running | JobStatus::Completed | JobStatus::CompletedWithErrors => false,
        }
    }
}

/// Outcome of one processor invocation, as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub processed: u32,
    pub successful: u32,
    pub failed: u32,
}

impl JobSummary {
    #[must_use]
    pub fn of(job: &BulkJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            processed: job.processed_records,
            successful: job.successful_records,
            failed: job.failed_records,
        }
    }
}

impl std::fmt::Display for JobSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "job {}: {} (processed {}, ok {}, failed {})",
            self.job_id, self.status, self.processed, self.successful, self.failed
        )
    }
}

//! The bulk job processor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courier_common::{
    audit::{self, OperationAudit},
    job::{BulkJob, JobStatus, JobSummary},
};
use courier_store::{PayloadStore, Store};
use ulid::Ulid;

use crate::{
    HandlerError, JobError, RowChange, backoff::next_run_at, handler_for, parse_records,
};

/// Claims and executes at most one due bulk job per invocation.
///
/// Intended to be invoked on a fixed interval by an external scheduler;
/// the conditional `pending → running` claim makes overlapping invocations
/// safe.
#[derive(Debug)]
pub struct BulkJobProcessor {
    store: Arc<dyn Store>,
    payloads: Arc<dyn PayloadStore>,
}

impl BulkJobProcessor {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, payloads: Arc<dyn PayloadStore>) -> Self {
        Self { store, payloads }
    }

    /// Claim and process at most one due job.
    ///
    /// Returns `None` when no job is due. Job-level failures do not raise:
    /// the job is marked failed with a scheduled retry, and the summary
    /// reports it — every path ends in a status write.
    ///
    /// # Errors
    /// `JobError::Store` only, when even the outcome cannot be persisted.
    pub async fn process_one(&self) -> Result<Option<JobSummary>, JobError> {
        self.process_one_at(Utc::now()).await
    }

    /// [`Self::process_one`] as of an explicit instant (used to test the
    /// retry schedule).
    ///
    /// # Errors
    /// See [`Self::process_one`].
    pub async fn process_one_at(&self, now: DateTime<Utc>) -> Result<Option<JobSummary>, JobError> {
        let Some(mut job) = self.store.claim_due_job(now).await? else {
            return Ok(None);
        };

        tracing::info!(
            job_id = %job.id,
            operation = %job.operation_type,
            attempt = job.attempts + 1,
            "claimed bulk job"
        );

        match self.run(&mut job).await {
            Ok(()) => {}
            Err(JobError::Store(e)) => return Err(JobError::Store(e)),
            Err(error) => {
                // Payload-level failure: reschedule with quadratic backoff.
                job.attempts += 1;
                job.status = JobStatus::Failed;
                job.next_run = Some(next_run_at(job.attempts, now));
                job.error_log.push(error.to_string());
                tracing::error!(
                    job_id = %job.id,
                    error = %error,
                    attempts = job.attempts,
                    next_run = ?job.next_run,
                    "bulk job failed; retry scheduled"
                );
            }
        }

        self.store.update_job(&job).await?;
        audit::log_job_finished(
            &job.id,
            &job.status.to_string(),
            job.processed_records,
            job.failed_records,
        );

        Ok(Some(JobSummary::of(&job)))
    }

    /// Execute the job body: fetch, parse, per-row dispatch, audit.
    async fn run(&self, job: &mut BulkJob) -> Result<(), JobError> {
        let payload = self.payloads.fetch(&job.payload_ref).await.map_err(|e| {
            JobError::Payload(format!("payload '{}' unreadable: {e}", job.payload_ref))
        })?;
        let records = parse_records(&payload)?;
        let handler = handler_for(job.operation_type);

        let mut changes: Vec<RowChange> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for record in &records {
            match handler.apply(self.store.as_ref(), record).await {
                Ok(Some(change)) => changes.push(change),
                Ok(None) => {}
                Err(HandlerError::Row(message)) => {
                    errors.push(format!("line {}: {message}", record.line));
                }
                Err(HandlerError::Store(e)) => return Err(e.into()),
            }
        }

        #[allow(clippy::cast_possible_truncation, reason = "Payloads are far below u32::MAX rows")]
        {
            job.processed_records = records.len() as u32;
            job.failed_records = errors.len() as u32;
        }
        job.successful_records = job.processed_records - job.failed_records;
        job.error_log = errors;
        job.status = if job.failed_records == 0 {
            JobStatus::Completed
        } else {
            JobStatus::CompletedWithErrors
        };

        if !changes.is_empty() {
            let audit = OperationAudit {
                id: Ulid::new(),
                job_id: job.id.clone(),
                changed_table: handler.table().to_string(),
                changed_ids: changes.iter().map(|c| c.id.clone()).collect(),
                diffs: changes.into_iter().flat_map(|c| c.diffs).collect(),
                recorded_at: Utc::now(),
            };
            self.store.record_audit(audit).await?;
        }

        tracing::info!(
            job_id = %job.id,
            status = %job.status,
            processed = job.processed_records,
            failed = job.failed_records,
            "bulk job run finished"
        );
        Ok(())
    }
}

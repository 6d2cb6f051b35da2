//! Error types for bulk job processing.

use courier_store::StoreError;
use thiserror::Error;

/// Job-level failures. These mark the job `failed` and schedule a retry —
/// deliberately different from row-level failures, which are terminal for
/// the row but not for the job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The payload could not be fetched or decoded.
    #[error("Payload error: {0}")]
    Payload(String),

    /// The data store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

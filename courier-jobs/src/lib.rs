//! Generic retry-capable batch executor for bulk mutation jobs.
//!
//! Independent of the email path but sharing its failure philosophy:
//! row-level failures are collected and never abort the remaining rows,
//! while job-level failures (payload unreadable, store unavailable) mark
//! the job failed and schedule a quadratic-backoff retry.

mod backoff;
mod error;
mod handlers;
mod payload;
mod processor;

pub use backoff::{backoff_minutes, next_run_at};
pub use error::JobError;
pub use handlers::{HandlerError, RowChange, RowHandler, handler_for};
pub use payload::{PayloadRecord, parse_records};
pub use processor::BulkJobProcessor;

//! Campaign delivery pipeline.
//!
//! This crate turns an approved campaign into individually delivered,
//! logged operations:
//! - [`RateLimiter`] grants admission against global hourly/daily quotas
//! - [`SuppressionFilter`] removes addresses that must never receive mail
//! - [`CampaignDispatcher`] orchestrates one campaign end to end
//! - [`CampaignScheduler`] fires due campaigns and the "send now" path

mod dispatcher;
mod error;
mod quota;
mod scheduler;
mod suppression;

pub use dispatcher::{CampaignDispatcher, DispatcherConfig};
pub use error::DeliveryError;
pub use quota::RateLimiter;
pub use scheduler::CampaignScheduler;
pub use suppression::SuppressionFilter;

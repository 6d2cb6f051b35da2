//! Time-triggered campaign scheduling.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courier_common::campaign::DispatchSummary;
use courier_store::Store;

use crate::{CampaignDispatcher, DeliveryError};

/// Finds due campaigns and hands each to the dispatcher.
///
/// Concurrent ticks are safe: the dispatcher's conditional lock means a
/// campaign fired by two overlapping ticks is handled exactly once.
#[derive(Debug)]
pub struct CampaignScheduler {
    store: Arc<dyn Store>,
    dispatcher: Arc<CampaignDispatcher>,
}

impl CampaignScheduler {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<CampaignDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Dispatch every approved campaign whose scheduled time has arrived.
    ///
    /// # Errors
    /// `DeliveryError::Store` and `DeliveryError::Config` abort the tick;
    /// a campaign lost to another invocation is skipped silently.
    pub async fn tick(&self) -> Result<Vec<DispatchSummary>, DeliveryError> {
        self.tick_at(Utc::now()).await
    }

    /// [`Self::tick`] as of an explicit instant.
    ///
    /// # Errors
    /// See [`Self::tick`].
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<Vec<DispatchSummary>, DeliveryError> {
        let due = self.store.due_campaigns(now).await?;
        if due.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(due = due.len(), "scheduler tick");

        let mut summaries = Vec::with_capacity(due.len());
        for campaign in due {
            match self.dispatcher.dispatch(&campaign.id).await {
                Ok(summary) => summaries.push(summary),
                Err(error) if error.is_invalid_state() => {
                    tracing::debug!(
                        campaign_id = %campaign.id,
                        "campaign already handled by another invocation"
                    );
                }
                Err(error) => return Err(error),
            }
        }

        Ok(summaries)
    }

    /// The unconditional "send now" path: the same dispatcher invoked
    /// synchronously on explicit request rather than on a time trigger.
    ///
    /// # Errors
    /// See [`CampaignDispatcher::dispatch`].
    pub async fn send_now(&self, campaign_id: &str) -> Result<DispatchSummary, DeliveryError> {
        self.dispatcher.dispatch(campaign_id).await
    }
}

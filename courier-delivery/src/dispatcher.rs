//! Per-campaign dispatch orchestration.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use courier_common::{
    audit,
    campaign::{Campaign, CampaignStatus, DispatchSummary},
    log::DeliveryLog,
    subscriber::Subscriber,
};
use courier_store::Store;
use courier_transport::{OutboundMessage, ProviderChain};
use serde::{Deserialize, Serialize};

use crate::{DeliveryError, RateLimiter, SuppressionFilter};

/// Dispatcher tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Sender address placed on every message.
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Delay between successive per-recipient sends, to avoid bursting a
    /// transport provider. Not correctness-relevant.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sender: default_sender(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

fn default_sender() -> String {
    "campaigns@localhost".to_string()
}

const fn default_pacing_ms() -> u64 {
    50
}

/// Orchestrates one campaign: lock, filter, admit, send, record.
///
/// State machine per campaign: `approved →(lock)→ sending →(all recipients
/// processed)→ completed | completed_with_errors`. The lock is a
/// conditional update on the campaign row — the sole concurrency-safety
/// mechanism, sufficient because invocation frequency is low relative to
/// run duration.
///
/// Delivery is at-least-once: a recipient is only skipped when a delivery
/// log row for this campaign already exists, so a crash between a provider
/// accept and the log write can still yield a duplicate on re-run.
#[derive(Debug)]
pub struct CampaignDispatcher {
    store: Arc<dyn Store>,
    limiter: RateLimiter,
    chain: Arc<ProviderChain>,
    filter: SuppressionFilter,
    config: DispatcherConfig,
}

impl CampaignDispatcher {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        limiter: RateLimiter,
        chain: Arc<ProviderChain>,
        config: DispatcherConfig,
    ) -> Self {
        let filter = SuppressionFilter::new(store.clone());
        Self {
            store,
            limiter,
            chain,
            filter,
            config,
        }
    }

    /// Dispatch one campaign.
    ///
    /// Exactly one caller wins the `approved → sending` transition; losers
    /// get [`DeliveryError::InvalidState`] unless the campaign was left
    /// `sending` by an interrupted or partially admitted run, in which case
    /// the call resumes it (recipients with an existing log row are never
    /// re-sent by resumption).
    ///
    /// # Errors
    /// - [`DeliveryError::Config`] when no transport providers are enabled
    /// - [`DeliveryError::InvalidState`] when the campaign is not
    ///   dispatchable
    /// - [`DeliveryError::Store`] when the data store fails mid-run
    pub async fn dispatch(&self, campaign_id: &str) -> Result<DispatchSummary, DeliveryError> {
        if self.chain.is_empty() {
            return Err(DeliveryError::Config(
                "no enabled transport providers".to_string(),
            ));
        }

        let locked = self
            .store
            .transition_campaign(campaign_id, CampaignStatus::Approved, CampaignStatus::Sending)
            .await?;

        let campaign = self.store.campaign(campaign_id).await?;
        if !locked {
            if campaign.status == CampaignStatus::Sending {
                tracing::info!(campaign_id, "resuming campaign left in sending state");
            } else {
                return Err(DeliveryError::InvalidState {
                    campaign_id: campaign_id.to_string(),
                    status: campaign.status,
                });
            }
        }

        self.run(&campaign).await
    }

    async fn run(&self, campaign: &Campaign) -> Result<DispatchSummary, DeliveryError> {
        let recipients = self.filter.recipients().await?;

        // Already-logged recipients are what "sent" means across runs; the
        // remainder is exactly what a resumed run still owes.
        let logged: std::collections::HashSet<String> = self
            .store
            .delivery_logs(&campaign.id)
            .await?
            .into_iter()
            .map(|log| log.recipient.to_lowercase())
            .collect();
        let pending: Vec<Subscriber> = recipients
            .into_iter()
            .filter(|s| !logged.contains(&s.email.to_lowercase()))
            .collect();

        let mut sent = campaign.sent_count;
        let mut failed = campaign.failed_count;

        if pending.is_empty() {
            return self.finalize(campaign, sent, failed, 0).await;
        }

        #[allow(clippy::cast_possible_truncation, reason = "Recipient lists are far below u32::MAX")]
        let requested = pending.len() as u32;
        let admission = self.limiter.reserve(requested).await?;
        if !admission.allowed {
            tracing::info!(
                campaign_id = %campaign.id,
                requested,
                "admission denied; campaign deferred to a later run"
            );
            self.store
                .record_campaign_progress(&campaign.id, CampaignStatus::Sending, sent, failed)
                .await?;
            return Ok(DispatchSummary {
                campaign_id: campaign.id.clone(),
                status: CampaignStatus::Sending,
                sent,
                failed,
                deferred: requested,
            });
        }

        let admitted = &pending[..admission.allow_count as usize];
        #[allow(clippy::cast_possible_truncation, reason = "Recipient lists are far below u32::MAX")]
        let deferred = (pending.len() - admitted.len()) as u32;

        tracing::info!(
            campaign_id = %campaign.id,
            admitted = admitted.len(),
            deferred,
            "dispatching campaign"
        );

        let pacing = Duration::from_millis(self.config.pacing_ms);
        for (index, recipient) in admitted.iter().enumerate() {
            if index > 0 && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }

            let message = personalize(campaign, recipient, &self.config.sender);
            match self.chain.send(&message).await {
                Ok(delivery) => {
                    sent += 1;
                    audit::log_delivery_success(&campaign.id, &recipient.email, &delivery.provider);
                    self.store
                        .append_delivery_log(DeliveryLog::sent(
                            &campaign.id,
                            &recipient.email,
                            &delivery.provider,
                            Utc::now(),
                        ))
                        .await?;
                }
                Err(error) => {
                    // Chain exhaustion is local to the recipient; the batch
                    // continues.
                    failed += 1;
                    let detail = error.detail();
                    audit::log_delivery_failure(&campaign.id, &recipient.email, &detail);
                    self.store
                        .append_delivery_log(DeliveryLog::failed(
                            &campaign.id,
                            &recipient.email,
                            detail,
                        ))
                        .await?;
                }
            }

            self.store
                .record_campaign_progress(&campaign.id, CampaignStatus::Sending, sent, failed)
                .await?;
        }

        self.finalize(campaign, sent, failed, deferred).await
    }

    /// Write the terminal (or still-sending) status and counters.
    async fn finalize(
        &self,
        campaign: &Campaign,
        sent: u32,
        failed: u32,
        deferred: u32,
    ) -> Result<DispatchSummary, DeliveryError> {
        let status = if deferred > 0 {
            CampaignStatus::Sending
        } else if failed > 0 {
            CampaignStatus::CompletedWithErrors
        } else {
            CampaignStatus::Completed
        };

        self.store
            .record_campaign_progress(&campaign.id, status, sent, failed)
            .await?;

        if status.is_terminal() {
            audit::log_campaign_finished(&campaign.id, &status.to_string(), sent, failed);
        }

        Ok(DispatchSummary {
            campaign_id: campaign.id.clone(),
            status,
            sent,
            failed,
            deferred,
        })
    }
}

/// Substitute the recipient into the campaign template.
fn personalize(campaign: &Campaign, recipient: &Subscriber, sender: &str) -> OutboundMessage {
    let name = recipient.name.as_deref().unwrap_or(&recipient.email);
    OutboundMessage {
        from: sender.to_string(),
        to: recipient.email.clone(),
        subject: campaign.subject.replace("{{name}}", name),
        html_body: campaign
            .content
            .replace("{{name}}", name)
            .replace("{{email}}", &recipient.email),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personalization_substitutes_name_and_email() {
        let campaign = Campaign::new("c1", "Hi {{name}}", "<p>{{name}} — {{email}}</p>");
        let mut recipient = Subscriber::active("s1", "user@example.com");
        recipient.name = Some("Ada".to_string());

        let message = personalize(&campaign, &recipient, "campaigns@example.com");
        assert_eq!(message.subject, "Hi Ada");
        assert_eq!(message.html_body, "<p>Ada — user@example.com</p>");
        assert_eq!(message.from, "campaigns@example.com");
    }

    #[test]
    fn personalization_falls_back_to_email() {
        let campaign = Campaign::new("c1", "Hi {{name}}", "<p>x</p>");
        let recipient = Subscriber::active("s1", "user@example.com");

        let message = personalize(&campaign, &recipient, "campaigns@example.com");
        assert_eq!(message.subject, "Hi user@example.com");
    }
}

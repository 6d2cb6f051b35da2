//! End-to-end dispatch tests over the in-memory store and fake transports.

#![allow(clippy::unwrap_used)]

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use courier_common::{
    campaign::{Campaign, CampaignStatus},
    log::{DeliveryLog, DeliveryOutcome},
    quota::QuotaLimits,
    subscriber::Subscriber,
};
use courier_delivery::{CampaignDispatcher, CampaignScheduler, DispatcherConfig, RateLimiter};
use courier_store::{MemoryStore, Store};
use courier_transport::{OutboundMessage, ProviderChain, Transport, TransportError};

#[derive(Debug)]
struct FakeTransport {
    name: String,
    succeed: bool,
    calls: Arc<AtomicU32>,
}

impl FakeTransport {
    fn new(name: &str, succeed: bool) -> (Box<dyn Transport>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Box::new(Self {
                name: name.to_string(),
                succeed,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _message: &OutboundMessage) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            Ok(())
        } else {
            Err(TransportError::Connection("connection refused".to_string()))
        }
    }
}

fn limits(hourly: u32, daily: u32) -> QuotaLimits {
    QuotaLimits {
        hourly: Some(hourly),
        daily: Some(daily),
    }
}

fn dispatcher_with(
    store: &Arc<MemoryStore>,
    chain: ProviderChain,
    quota: QuotaLimits,
) -> Arc<CampaignDispatcher> {
    let limiter = RateLimiter::new(quota, store.clone());
    let config = DispatcherConfig {
        sender: "campaigns@example.com".to_string(),
        pacing_ms: 0,
    };
    Arc::new(CampaignDispatcher::new(
        store.clone(),
        limiter,
        Arc::new(chain),
        config,
    ))
}

async fn approved_campaign(store: &MemoryStore, id: &str) {
    let mut campaign = Campaign::new(id, "Hello {{name}}", "<p>Hi {{name}}</p>");
    campaign.status = CampaignStatus::Approved;
    store.insert_campaign(campaign).await.unwrap();
}

#[tokio::test]
async fn failover_produces_one_sent_row_and_stops() {
    let store = Arc::new(MemoryStore::new());
    approved_campaign(&store, "c1").await;
    store
        .insert_subscriber(Subscriber::active("s1", "user@example.org"))
        .await
        .unwrap();

    let (a, a_calls) = FakeTransport::new("a", false);
    let (b, b_calls) = FakeTransport::new("b", true);
    let (c, c_calls) = FakeTransport::new("c", true);
    let chain = ProviderChain::new(vec![a, b, c]);

    let dispatcher = dispatcher_with(&store, chain, limits(100, 100));
    let summary = dispatcher.dispatch("c1").await.unwrap();

    assert_eq!(summary.status, CampaignStatus::Completed);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 0);

    let logs = store.delivery_logs("c1").await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryOutcome::Sent);
    assert_eq!(logs[0].provider_used.as_deref(), Some("b"));

    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_chain_records_one_failed_row() {
    let store = Arc::new(MemoryStore::new());
    approved_campaign(&store, "c1").await;
    store
        .insert_subscriber(Subscriber::active("s1", "user@example.org"))
        .await
        .unwrap();

    let (a, _) = FakeTransport::new("a", false);
    let (b, _) = FakeTransport::new("b", false);
    let chain = ProviderChain::new(vec![a, b]);

    let dispatcher = dispatcher_with(&store, chain, limits(100, 100));
    let summary = dispatcher.dispatch("c1").await.unwrap();

    assert_eq!(summary.status, CampaignStatus::CompletedWithErrors);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.failed, 1);

    let logs = store.delivery_logs("c1").await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryOutcome::Failed);
    assert!(logs[0].provider_used.is_none());
    assert!(logs[0].error.as_deref().unwrap().contains("a: "));

    let campaign = store.campaign("c1").await.unwrap();
    assert_eq!(campaign.failed_count, 1);
}

#[tokio::test]
async fn non_approved_campaign_is_never_locked() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_campaign(Campaign::new("c1", "Draft", "<p>x</p>"))
        .await
        .unwrap();

    let (a, a_calls) = FakeTransport::new("a", true);
    let dispatcher = dispatcher_with(&store, ProviderChain::new(vec![a]), limits(100, 100));

    let error = dispatcher.dispatch("c1").await.unwrap_err();
    assert!(error.is_invalid_state());
    assert_eq!(
        store.campaign("c1").await.unwrap().status,
        CampaignStatus::Draft
    );
    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn terminal_campaign_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let mut campaign = Campaign::new("c1", "Done", "<p>x</p>");
    campaign.status = CampaignStatus::Completed;
    store.insert_campaign(campaign).await.unwrap();

    let (a, _) = FakeTransport::new("a", true);
    let dispatcher = dispatcher_with(&store, ProviderChain::new(vec![a]), limits(100, 100));

    assert!(dispatcher.dispatch("c1").await.unwrap_err().is_invalid_state());
}

#[tokio::test]
async fn partial_admission_sends_a_strict_prefix() {
    let store = Arc::new(MemoryStore::new());
    approved_campaign(&store, "c1").await;

    // 120 active subscribers, the first 10 suppressed: 110 candidates.
    for i in 0..120 {
        store
            .insert_subscriber(Subscriber::active(
                format!("s{i:03}"),
                format!("user{i:03}@example.org"),
            ))
            .await
            .unwrap();
    }
    for i in 0..10 {
        store
            .insert_suppression(&format!("user{i:03}@example.org"))
            .await
            .unwrap();
    }

    let (a, _) = FakeTransport::new("a", true);
    let dispatcher = dispatcher_with(&store, ProviderChain::new(vec![a]), limits(200, 50));

    let summary = dispatcher.dispatch("c1").await.unwrap();
    assert_eq!(summary.status, CampaignStatus::Sending);
    assert_eq!(summary.sent, 50);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.deferred, 60);

    // Exactly 50 log rows; 60 candidates untouched for a future run.
    let logs = store.delivery_logs("c1").await.unwrap();
    assert_eq!(logs.len(), 50);

    let campaign = store.campaign("c1").await.unwrap();
    assert_eq!(campaign.status, CampaignStatus::Sending);
    assert_eq!(campaign.sent_count, 50);

    // Suppressed addresses never get a row.
    assert!(
        logs.iter()
            .all(|log| log.recipient.as_str() >= "user010@example.org")
    );
}

#[tokio::test]
async fn resumption_skips_already_logged_recipients() {
    let store = Arc::new(MemoryStore::new());

    // A crashed run left the campaign sending with one recipient logged.
    let mut campaign = Campaign::new("c1", "Hello", "<p>Hi</p>");
    campaign.status = CampaignStatus::Sending;
    campaign.sent_count = 1;
    store.insert_campaign(campaign).await.unwrap();

    for (id, email) in [
        ("s1", "a@example.org"),
        ("s2", "b@example.org"),
        ("s3", "c@example.org"),
    ] {
        store
            .insert_subscriber(Subscriber::active(id, email))
            .await
            .unwrap();
    }
    store
        .append_delivery_log(DeliveryLog::sent("c1", "a@example.org", "a", Utc::now()))
        .await
        .unwrap();

    let (a, a_calls) = FakeTransport::new("a", true);
    let dispatcher = dispatcher_with(&store, ProviderChain::new(vec![a]), limits(100, 100));

    let summary = dispatcher.dispatch("c1").await.unwrap();
    assert_eq!(summary.status, CampaignStatus::Completed);
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.deferred, 0);

    // Only the two unlogged recipients were sent.
    assert_eq!(a_calls.load(Ordering::SeqCst), 2);
    let logs = store.delivery_logs("c1").await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(
        logs.iter()
            .filter(|log| log.recipient == "a@example.org")
            .count(),
        1
    );
}

#[tokio::test]
async fn scheduler_fires_only_due_campaigns() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();

    let mut due = Campaign::new("due", "Hello", "<p>Hi</p>");
    due.status = CampaignStatus::Approved;
    due.scheduled_at = Some(now - TimeDelta::minutes(5));
    store.insert_campaign(due).await.unwrap();

    let mut future = Campaign::new("future", "Later", "<p>Hi</p>");
    future.status = CampaignStatus::Approved;
    future.scheduled_at = Some(now + TimeDelta::hours(1));
    store.insert_campaign(future).await.unwrap();

    store
        .insert_subscriber(Subscriber::active("s1", "user@example.org"))
        .await
        .unwrap();

    let (a, _) = FakeTransport::new("a", true);
    let dispatcher = dispatcher_with(&store, ProviderChain::new(vec![a]), limits(100, 100));
    let scheduler = CampaignScheduler::new(store.clone(), dispatcher);

    let summaries = scheduler.tick_at(now).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].campaign_id, "due");
    assert_eq!(summaries[0].status, CampaignStatus::Completed);

    assert_eq!(
        store.campaign("future").await.unwrap().status,
        CampaignStatus::Approved
    );

    // A second tick finds nothing left to do.
    assert!(scheduler.tick_at(now).await.unwrap().is_empty());
}

#[tokio::test]
async fn send_now_ignores_schedule() {
    let store = Arc::new(MemoryStore::new());
    let mut campaign = Campaign::new("c1", "Hello", "<p>Hi</p>");
    campaign.status = CampaignStatus::Approved;
    campaign.scheduled_at = Some(Utc::now() + TimeDelta::days(1));
    store.insert_campaign(campaign).await.unwrap();

    store
        .insert_subscriber(Subscriber::active("s1", "user@example.org"))
        .await
        .unwrap();

    let (a, _) = FakeTransport::new("a", true);
    let dispatcher = dispatcher_with(&store, ProviderChain::new(vec![a]), limits(100, 100));
    let scheduler = CampaignScheduler::new(store.clone(), dispatcher);

    let summary = scheduler.send_now("c1").await.unwrap();
    assert_eq!(summary.status, CampaignStatus::Completed);
    assert_eq!(summary.sent, 1);
}

//! Object-safe traits the engine uses to reach its external stores.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::{
    audit::OperationAudit,
    campaign::{Campaign, CampaignStatus},
    catalog::{Order, Product},
    job::BulkJob,
    log::DeliveryLog,
    provider::Provider,
    quota::QuotaState,
    subscriber::Subscriber,
};

use crate::Result;

/// Narrow accessor for the singleton quota row.
///
/// Injected into the rate limiter on its own so tests can substitute a
/// fake with controllable window behavior without faking the whole store.
#[async_trait]
pub trait QuotaStore: Send + Sync + std::fmt::Debug {
    /// Load the quota counters. `None` means no sends have been recorded.
    async fn load_quota(&self) -> Result<Option<QuotaState>>;

    /// Write back the quota counters. This is the reservation: it commits
    /// the caller's delta relative to the state it loaded.
    async fn store_quota(&self, state: QuotaState) -> Result<()>;
}

/// Read access to uploaded bulk-job payloads.
#[async_trait]
pub trait PayloadStore: Send + Sync + std::fmt::Debug {
    /// Fetch a payload by reference.
    ///
    /// # Errors
    /// `StoreError::NotFound` if no payload exists under the reference.
    async fn fetch(&self, payload_ref: &str) -> Result<Vec<u8>>;
}

/// Primary data-store surface.
///
/// Every method is a single get/update/insert; the only synchronization
/// primitives are the conditional updates, which succeed for exactly one
/// caller when invocations race.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    // Campaigns

    async fn insert_campaign(&self, campaign: Campaign) -> Result<()>;

    async fn campaign(&self, id: &str) -> Result<Campaign>;

    /// Approved campaigns whose scheduled time has arrived, ordered by id.
    async fn due_campaigns(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>>;

    /// Conditional transition: moves the campaign from `expected` to `next`
    /// only if it is still in `expected`. Returns whether this caller won.
    async fn transition_campaign(
        &self,
        id: &str,
        expected: CampaignStatus,
        next: CampaignStatus,
    ) -> Result<bool>;

    /// Write back status and running counters after (part of) a run.
    async fn record_campaign_progress(
        &self,
        id: &str,
        status: CampaignStatus,
        sent: u32,
        failed: u32,
    ) -> Result<()>;

    // Subscribers and suppression

    async fn insert_subscriber(&self, subscriber: Subscriber) -> Result<()>;

    /// Subscribers with active status, ordered by id.
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>>;

    async fn insert_suppression(&self, email: &str) -> Result<()>;

    async fn suppression_list(&self) -> Result<HashSet<String>>;

    // Providers

    async fn insert_provider(&self, provider: Provider) -> Result<()>;

    async fn providers(&self) -> Result<Vec<Provider>>;

    // Delivery logs (append-only)

    async fn append_delivery_log(&self, log: DeliveryLog) -> Result<()>;

    async fn delivery_logs(&self, campaign_id: &str) -> Result<Vec<DeliveryLog>>;

    // Bulk jobs

    async fn insert_job(&self, job: BulkJob) -> Result<()>;

    async fn job(&self, id: &str) -> Result<BulkJob>;

    /// Claim at most one due pending job: the first (by id) pending job
    /// whose `next_run` is unset or past is conditionally moved to
    /// `Running` and returned.
    async fn claim_due_job(&self, now: DateTime<Utc>) -> Result<Option<BulkJob>>;

    async fn update_job(&self, job: &BulkJob) -> Result<()>;

    async fn record_audit(&self, audit: OperationAudit) -> Result<()>;

    async fn audits_for_job(&self, job_id: &str) -> Result<Vec<OperationAudit>>;

    // Bulk mutation targets

    async fn product(&self, sku: &str) -> Result<Option<Product>>;

    async fn upsert_product(&self, product: Product) -> Result<()>;

    async fn order(&self, invoice: &str) -> Result<Option<Order>>;

    /// Update an order's status by invoice number. Returns `false` when the
    /// invoice is unknown.
    async fn update_order_status(&self, invoice: &str, status: &str) -> Result<bool>;
}

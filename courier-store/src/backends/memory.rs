//! In-memory backing store implementation.
//!
//! Stores every table in a [`DashMap`] (append-only tables in an `RwLock`ed
//! vector). Primarily intended for testing, but also usable for transient
//! single-process deployments.
//!
//! # Concurrency
//! `DashMap` holds a shard lock for the duration of a `get_mut`, which is
//! what makes [`Store::transition_campaign`] and [`Store::claim_due_job`]
//! atomic check-and-set operations — the same guarantee a database-backed
//! store provides with a conditional `WHERE` clause.

use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};

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
use dashmap::{DashMap, DashSet};

use crate::{
    StoreError,
    r#trait::{PayloadStore, QuotaStore, Store},
};

/// In-memory data store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    campaigns: Arc<DashMap<String, Campaign>>,
    subscribers: Arc<DashMap<String, Subscriber>>,
    suppression: Arc<DashSet<String>>,
    providers: Arc<DashMap<String, Provider>>,
    delivery_logs: Arc<RwLock<Vec<DeliveryLog>>>,
    jobs: Arc<DashMap<String, BulkJob>>,
    audits: Arc<RwLock<Vec<OperationAudit>>>,
    products: Arc<DashMap<String, Product>>,
    orders: Arc<DashMap<String, Order>>,
    quota: Arc<RwLock<Option<QuotaState>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn load_quota(&self) -> crate::Result<Option<QuotaState>> {
        Ok(self.quota.read()?.clone())
    }

    async fn store_quota(&self, state: QuotaState) -> crate::Result<()> {
        *self.quota.write()? = Some(state);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_campaign(&self, campaign: Campaign) -> crate::Result<()> {
        self.campaigns.insert(campaign.id.clone(), campaign);
        Ok(())
    }

    async fn campaign(&self, id: &str) -> crate::Result<Campaign> {
        self.campaigns
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("campaign '{id}'")))
    }

    async fn due_campaigns(&self, now: DateTime<Utc>) -> crate::Result<Vec<Campaign>> {
        let mut due: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|entry| entry.value().is_due(now))
            .map(|entry| entry.value().clone())
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(due)
    }

    async fn transition_campaign(
        &self,
        id: &str,
        expected: CampaignStatus,
        next: CampaignStatus,
    ) -> crate::Result<bool> {
        let Some(mut entry) = self.campaigns.get_mut(id) else {
            return Err(StoreError::NotFound(format!("campaign '{id}'")));
        };
        let campaign = entry.value_mut();
        if campaign.status == expected {
            campaign.status = next;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn record_campaign_progress(
        &self,
        id: &str,
        status: CampaignStatus,
        sent: u32,
        failed: u32,
    ) -> crate::Result<()> {
        let Some(mut entry) = self.campaigns.get_mut(id) else {
            return Err(StoreError::NotFound(format!("campaign '{id}'")));
        };
        let campaign = entry.value_mut();
        campaign.status = status;
        campaign.sent_count = sent;
        campaign.failed_count = failed;
        Ok(())
    }

    async fn insert_subscriber(&self, subscriber: Subscriber) -> crate::Result<()> {
        self.subscribers.insert(subscriber.id.clone(), subscriber);
        Ok(())
    }

    async fn active_subscribers(&self) -> crate::Result<Vec<Subscriber>> {
        let mut active: Vec<Subscriber> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().is_active())
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active)
    }

    async fn insert_suppression(&self, email: &str) -> crate::Result<()> {
        self.suppression.insert(email.to_string());
        Ok(())
    }

    async fn suppression_list(&self) -> crate::Result<HashSet<String>> {
        Ok(self.suppression.iter().map(|e| e.key().clone()).collect())
    }

    async fn insert_provider(&self, provider: Provider) -> crate::Result<()> {
        self.providers.insert(provider.name.clone(), provider);
        Ok(())
    }

    async fn providers(&self) -> crate::Result<Vec<Provider>> {
        let mut providers: Vec<Provider> = self
            .providers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        providers.sort_by_key(|p| p.priority);
        Ok(providers)
    }

    async fn append_delivery_log(&self, log: DeliveryLog) -> crate::Result<()> {
        self.delivery_logs.write()?.push(log);
        Ok(())
    }

    async fn delivery_logs(&self, campaign_id: &str) -> crate::Result<Vec<DeliveryLog>> {
        Ok(self
            .delivery_logs
            .read()?
            .iter()
            .filter(|log| log.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn insert_job(&self, job: BulkJob) -> crate::Result<()> {
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn job(&self, id: &str) -> crate::Result<BulkJob> {
        self.jobs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("job '{id}'")))
    }

    async fn claim_due_job(&self, now: DateTime<Utc>) -> crate::Result<Option<BulkJob>> {
        let mut due_ids: Vec<String> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().is_due(now))
            .map(|entry| entry.key().clone())
            .collect();
        due_ids.sort();

        for id in due_ids {
            if let Some(mut entry) = self.jobs.get_mut(&id) {
                let job = entry.value_mut();
                // Re-check under the entry lock; another caller may have
                // claimed it between the scan and here.
                if job.is_due(now) {
                    job.status = courier_common::job::JobStatus::Running;
                    return Ok(Some(job.clone()));
                }
            }
        }

        Ok(None)
    }

    async fn update_job(&self, job: &BulkJob) -> crate::Result<()> {
        let Some(mut entry) = self.jobs.get_mut(&job.id) else {
            return Err(StoreError::NotFound(format!("job '{}'", job.id)));
        };
        *entry.value_mut() = job.clone();
        Ok(())
    }

    async fn record_audit(&self, audit: OperationAudit) -> crate::Result<()> {
        self.audits.write()?.push(audit);
        Ok(())
    }

    async fn audits_for_job(&self, job_id: &str) -> crate::Result<Vec<OperationAudit>> {
        Ok(self
            .audits
            .read()?
            .iter()
            .filter(|audit| audit.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn product(&self, sku: &str) -> crate::Result<Option<Product>> {
        Ok(self.products.get(sku).map(|entry| entry.value().clone()))
    }

    async fn upsert_product(&self, product: Product) -> crate::Result<()> {
        self.products.insert(product.sku.clone(), product);
        Ok(())
    }

    async fn order(&self, invoice: &str) -> crate::Result<Option<Order>> {
        Ok(self.orders.get(invoice).map(|entry| entry.value().clone()))
    }

    async fn update_order_status(&self, invoice: &str, status: &str) -> crate::Result<bool> {
        match self.orders.get_mut(invoice) {
            Some(mut entry) => {
                entry.value_mut().status = status.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl MemoryStore {
    /// Seed an order (orders are created by an external flow in production).
    pub fn seed_order(&self, order: Order) {
        self.orders.insert(order.invoice.clone(), order);
    }
}

/// In-memory payload store for uploaded bulk-job payloads.
#[derive(Debug, Clone, Default)]
pub struct MemoryPayloadStore {
    payloads: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryPayloadStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload under a reference.
    pub fn put(&self, payload_ref: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.payloads.insert(payload_ref.into(), bytes.into());
    }
}

#[async_trait]
impl PayloadStore for MemoryPayloadStore {
    async fn fetch(&self, payload_ref: &str) -> crate::Result<Vec<u8>> {
        self.payloads
            .get(payload_ref)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("payload '{payload_ref}'")))
    }
}

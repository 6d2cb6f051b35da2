//! Engine wiring and lifecycle.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use courier_common::{
    Signal, audit,
    campaign::DispatchSummary,
    job::JobSummary,
    quota::Admission,
};
use courier_control::{ControlServer, EngineStatus};
use courier_delivery::{CampaignDispatcher, CampaignScheduler, DeliveryError, RateLimiter};
use courier_jobs::{BulkJobProcessor, JobError};
use courier_store::{MemoryPayloadStore, MemoryStore, Store};
use courier_transport::ProviderChain;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    config::{Config, Fixtures},
    control_handler::EngineControlHandler,
};

/// The assembled delivery engine.
///
/// Every component is a stateless function over the shared store; the
/// engine just owns the wiring and the control surface.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    store: Arc<MemoryStore>,
    payloads: Arc<MemoryPayloadStore>,
    limiter: RateLimiter,
    scheduler: CampaignScheduler,
    jobs: BulkJobProcessor,
    started_at: Instant,
}

impl Engine {
    /// Assemble the engine from configuration.
    ///
    /// # Errors
    /// Returns an error for fatal configuration problems, notably an empty
    /// provider list — retrying cannot fix missing configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        audit::init(config.audit.clone());

        let store = Arc::new(MemoryStore::new());
        let payloads = Arc::new(MemoryPayloadStore::new());

        let chain = Arc::new(ProviderChain::from_providers(
            &config.providers,
            &config.transport,
        )?);
        info!(providers = chain.len(), "provider chain assembled");

        let limiter = RateLimiter::new(config.quota, store.clone());
        let dispatcher = Arc::new(CampaignDispatcher::new(
            store.clone(),
            limiter.clone(),
            chain,
            config.dispatcher.clone(),
        ));
        let scheduler = CampaignScheduler::new(store.clone(), dispatcher);
        let jobs = BulkJobProcessor::new(store.clone(), payloads.clone());

        Ok(Self {
            config,
            store,
            payloads,
            limiter,
            scheduler,
            jobs,
            started_at: Instant::now(),
        })
    }

    /// Load the configured fixture file into the store, if any.
    ///
    /// # Errors
    /// Returns an error when the fixture file or a referenced payload file
    /// cannot be read.
    pub async fn load_fixtures(&self) -> anyhow::Result<()> {
        let Some(path) = &self.config.fixtures else {
            return Ok(());
        };

        let fixtures: Fixtures = ron::from_str(&std::fs::read_to_string(path)?)?;
        let counts = (
            fixtures.campaigns.len(),
            fixtures.subscribers.len(),
            fixtures.jobs.len(),
        );

        for campaign in fixtures.campaigns {
            self.store.insert_campaign(campaign).await?;
        }
        for subscriber in fixtures.subscribers {
            self.store.insert_subscriber(subscriber).await?;
        }
        for email in &fixtures.suppression {
            self.store.insert_suppression(email).await?;
        }
        for product in fixtures.products {
            self.store.upsert_product(product).await?;
        }
        for order in fixtures.orders {
            self.store.seed_order(order);
        }
        for job in fixtures.jobs {
            self.store.insert_job(job).await?;
        }
        for payload in fixtures.payloads {
            let bytes = std::fs::read(&payload.file)?;
            self.payloads.put(payload.reference, bytes);
        }

        info!(
            campaigns = counts.0,
            subscribers = counts.1,
            jobs = counts.2,
            "fixtures loaded from {}",
            path.display()
        );
        Ok(())
    }

    /// The shared data store (external triggers and tests inspect it).
    #[must_use]
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Reserve send admission.
    ///
    /// # Errors
    /// See [`RateLimiter::reserve`].
    pub async fn reserve(&self, requested: u32) -> Result<Admission, DeliveryError> {
        self.limiter.reserve(requested).await
    }

    /// Dispatch one campaign unconditionally ("send now").
    ///
    /// # Errors
    /// See [`CampaignScheduler::send_now`].
    pub async fn dispatch(&self, campaign_id: &str) -> Result<DispatchSummary, DeliveryError> {
        self.scheduler.send_now(campaign_id).await
    }

    /// Dispatch every due campaign.
    ///
    /// # Errors
    /// See [`CampaignScheduler::tick`].
    pub async fn tick(&self) -> Result<Vec<DispatchSummary>, DeliveryError> {
        self.scheduler.tick().await
    }

    /// Claim and process at most one due bulk job.
    ///
    /// # Errors
    /// See [`BulkJobProcessor::process_one`].
    pub async fn process_job(&self) -> Result<Option<JobSummary>, JobError> {
        self.jobs.process_one().await
    }

    /// Engine status for the control surface.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            limits_configured: self.config.quota.configured(),
            providers: self.config.providers.iter().filter(|p| p.enabled).count(),
        }
    }

    /// Run the control server (and the internal scheduler interval, when
    /// configured) until SIGINT.
    ///
    /// # Errors
    /// Returns an error when the control socket cannot be bound.
    pub async fn run(self: &Arc<Self>) -> anyhow::Result<()> {
        let (shutdown_tx, _) = broadcast::channel::<Signal>(8);

        let handler = Arc::new(EngineControlHandler::new(self.clone()));
        let server = ControlServer::new(self.config.control_socket.clone(), handler);
        let server_shutdown = shutdown_tx.subscribe();
        let server_task = tokio::spawn(async move { server.serve(server_shutdown).await });

        let mut tick_timer = self
            .config
            .tick_interval_secs
            .map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
        if let Some(timer) = tick_timer.as_mut() {
            // The first tick completes immediately; consume it so the
            // engine does not fire the moment it starts.
            timer.tick().await;
        }

        loop {
            if let Some(timer) = tick_timer.as_mut() {
                tokio::select! {
                    _ = timer.tick() => self.on_tick().await,
                    _ = tokio::signal::ctrl_c() => break,
                }
            } else {
                tokio::signal::ctrl_c().await?;
                break;
            }
        }

        info!("Shutting down");
        let _ = shutdown_tx.send(Signal::Shutdown);
        server_task.await??;

        Ok(())
    }

    /// One internal scheduler beat: due campaigns, then at most one job.
    async fn on_tick(&self) {
        match self.tick().await {
            Ok(summaries) => {
                for summary in summaries {
                    info!("{summary}");
                }
            }
            Err(e) => error!("Scheduler tick failed: {e}"),
        }

        match self.process_job().await {
            Ok(Some(summary)) => info!("{summary}"),
            Ok(None) => {}
            Err(e) => error!("Bulk job processing failed: {e}"),
        }
    }
}

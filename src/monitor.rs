//! Startup wiring: builds every component once and hands out shared handles.

use crate::channels::{DeliveryTransport, Dispatcher, OneBotTransport};
use crate::commands::CommandSurface;
use crate::config::{CronTimezone, MonitorConfig};
use crate::error::Result;
use crate::scheduler::{CycleOutcome, JobScheduler, PollContext};
use crate::sites::{self, LoadReport, SiteAdapter};
use crate::snapshot::{FsSnapshotStore, SnapshotStore};
use crate::subscriptions::{SubscriptionRegistry, SubscriptionStore};
use std::sync::Arc;

/// The running site monitor.
pub struct Monitor {
    scheduler: JobScheduler,
    subscriptions: Arc<SubscriptionRegistry>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl Monitor {
    /// Open the persistent stores named by `config` and wire them to `transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription store cannot be opened.
    pub fn new(config: &MonitorConfig, transport: Arc<dyn DeliveryTransport>) -> Result<Self> {
        let snapshot_dir = config.storage.snapshot_path();
        let subscriptions_file = config.storage.subscriptions_path();
        tracing::info!(
            snapshots = %snapshot_dir.display(),
            subscriptions = %subscriptions_file.display(),
            "opening stores"
        );

        let snapshots: Arc<dyn SnapshotStore> = Arc::new(FsSnapshotStore::new(snapshot_dir));
        let subscriptions = Arc::new(SubscriptionRegistry::open(SubscriptionStore::at(
            subscriptions_file,
        ))?);
        Ok(Self::with_parts(
            snapshots,
            subscriptions,
            transport,
            config.schedule.timezone,
        ))
    }

    /// Wire pre-built components.
    pub fn with_parts(
        snapshots: Arc<dyn SnapshotStore>,
        subscriptions: Arc<SubscriptionRegistry>,
        transport: Arc<dyn DeliveryTransport>,
        timezone: CronTimezone,
    ) -> Self {
        let context = Arc::new(PollContext {
            snapshots: Arc::clone(&snapshots),
            subscriptions: Arc::clone(&subscriptions),
            dispatcher: Dispatcher::new(transport),
        });
        Self {
            scheduler: JobScheduler::new(context, timezone),
            subscriptions,
            snapshots,
        }
    }

    /// Build a monitor from `config` alone: OneBot transport, on-disk stores
    /// and the built-in sites the config enables.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport or a store cannot be set up.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let transport = Arc::new(OneBotTransport::new(&config.transport)?);
        let mut monitor = Self::new(config, transport)?;
        let adapters = sites::builtin_adapters(config, &*monitor.snapshots);
        monitor.load_sites(adapters);
        Ok(monitor)
    }

    /// Validate and register `adapters`.
    pub fn load_sites(
        &mut self,
        adapters: impl IntoIterator<Item = Arc<dyn SiteAdapter>>,
    ) -> LoadReport {
        sites::load_sites(&mut self.scheduler, adapters)
    }

    /// Start every site's timer job.
    pub fn start(&mut self) {
        self.scheduler.start();
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionRegistry> {
        &self.subscriptions
    }

    pub fn snapshots(&self) -> &Arc<dyn SnapshotStore> {
        &self.snapshots
    }

    /// Command handlers over the currently registered sites.
    pub fn commands(&self) -> CommandSurface<'_> {
        CommandSurface::new(&self.scheduler, &self.subscriptions)
    }

    /// Poll one site immediately.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MonitorError::UnknownSite`] for an unregistered id.
    pub async fn run_now(&self, site_id: &str) -> Result<CycleOutcome> {
        self.scheduler.run_now(site_id).await
    }

    /// Stop all timers and wait for running cycles to finish.
    pub async fn shutdown(&mut self) {
        self.scheduler.shutdown().await;
    }
}

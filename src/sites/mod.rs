//! Site adapters: the per-site fetch / compare / format contract.
//!
//! Sites are registered statically at startup through [`loader::load_sites`].
//! Ids and display names are checked by
//! [`JobScheduler::register`](crate::scheduler::JobScheduler::register).

pub mod example;
pub mod function;
pub mod http_json;
pub mod loader;

use crate::config::MonitorConfig;
use crate::snapshot::SnapshotStore;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use example::ExampleSite;
pub use function::{FnSite, SiteBuilder};
pub use http_json::HttpJsonSite;
pub use loader::{LoadReport, load_sites};

/// Opaque, JSON-serializable data fetched from a site.
pub type Payload = serde_json::Value;

/// Site adapter contract. New sites only need to implement this trait.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Stable identifier. Also names the site's snapshot file.
    fn id(&self) -> &str;

    /// Name shown to users and accepted by the subscribe command.
    fn display_name(&self) -> &str {
        self.id()
    }

    /// One-line description for subscription listings.
    fn description(&self) -> &str {
        ""
    }

    /// `interval:<secs>` or a five-field cron expression.
    fn schedule(&self) -> &str;

    /// Fetch the latest payload from the source.
    async fn fetch(&self) -> anyhow::Result<Payload>;

    /// Return `true` when `latest` should trigger a notification.
    /// `previous` is `None` when the site has no snapshot yet.
    fn compare(&self, previous: Option<&Payload>, latest: &Payload) -> bool;

    /// Render the notification text for `latest`.
    fn format(&self, latest: &Payload) -> String;
}

/// A registered site: its metadata plus the adapter behind it.
#[derive(Clone)]
pub struct SiteDescriptor {
    id: String,
    display_name: String,
    description: String,
    schedule: String,
    adapter: Arc<dyn SiteAdapter>,
}

impl SiteDescriptor {
    /// Capture an adapter's metadata. An empty display name falls back to the id.
    pub fn from_adapter(adapter: Arc<dyn SiteAdapter>) -> Self {
        let id = adapter.id().trim().to_owned();
        let display_name = match adapter.display_name().trim() {
            "" => id.clone(),
            name => name.to_owned(),
        };
        Self {
            description: adapter.description().trim().to_owned(),
            schedule: adapter.schedule().trim().to_owned(),
            display_name,
            id,
            adapter,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    pub async fn fetch(&self) -> anyhow::Result<Payload> {
        self.adapter.fetch().await
    }

    pub fn compare(&self, previous: Option<&Payload>, latest: &Payload) -> bool {
        self.adapter.compare(previous, latest)
    }

    pub fn format(&self, latest: &Payload) -> String {
        self.adapter.format(latest)
    }
}

impl fmt::Debug for SiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// Build the adapters enabled in `config`.
///
/// The example site resumes its counter from its last snapshot. HTTP sites
/// whose client cannot be built are logged and skipped.
pub fn builtin_adapters(
    config: &MonitorConfig,
    snapshots: &dyn SnapshotStore,
) -> Vec<Arc<dyn SiteAdapter>> {
    let mut adapters: Vec<Arc<dyn SiteAdapter>> = Vec::new();

    if config.sites.example {
        let previous = match snapshots.load(ExampleSite::ID) {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(site = ExampleSite::ID, error = %e, "could not read example snapshot, counter starts at 0");
                None
            }
        };
        adapters.push(Arc::new(ExampleSite::resume_from(previous.as_ref())));
    }

    for site in &config.sites.http_json {
        match HttpJsonSite::new(site.clone()) {
            Ok(adapter) => adapters.push(Arc::new(adapter)),
            Err(e) => tracing::error!(site = %site.id, error = %e, "skipping http site"),
        }
    }

    adapters
}

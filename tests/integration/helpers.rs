//! Shared helpers for integration tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use sitewatch::channels::{DeliveryError, DeliveryTransport, TargetKind};
use sitewatch::config::{MonitorConfig, StorageConfig};
use sitewatch::sites::{SiteAdapter, SiteBuilder};
use sitewatch::Monitor;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A message accepted by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sent {
    pub kind: TargetKind,
    pub id: String,
    pub text: String,
}

/// Transport with a fixed set of valid groups and users. Records every
/// attempt, including the ones it refuses.
pub(crate) struct RecordingTransport {
    groups: HashSet<String>,
    users: HashSet<String>,
    sent: Mutex<Vec<Sent>>,
    attempts: Mutex<Vec<(TargetKind, String)>>,
}

impl RecordingTransport {
    pub(crate) fn new(groups: &[&str], users: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            groups: groups.iter().map(|s| (*s).to_owned()).collect(),
            users: users.iter().map(|s| (*s).to_owned()).collect(),
            sent: Mutex::default(),
            attempts: Mutex::default(),
        })
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn attempts(&self) -> Vec<(TargetKind, String)> {
        self.attempts.lock().unwrap().clone()
    }

    fn record(
        &self,
        kind: TargetKind,
        valid: &HashSet<String>,
        id: &str,
        text: &str,
    ) -> Result<(), DeliveryError> {
        self.attempts.lock().unwrap().push((kind, id.to_owned()));
        if !valid.contains(id) {
            return Err(DeliveryError::InvalidTarget {
                kind,
                id: id.to_owned(),
            });
        }
        self.sent.lock().unwrap().push(Sent {
            kind,
            id: id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }
}

#[async_trait]
impl DeliveryTransport for RecordingTransport {
    fn id(&self) -> &'static str {
        "recording"
    }

    async fn send_group_message(&self, group_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.record(TargetKind::Group, &self.groups, group_id, text)
    }

    async fn send_individual_message(
        &self,
        user_id: &str,
        text: &str,
    ) -> Result<(), DeliveryError> {
        self.record(TargetKind::User, &self.users, user_id, text)
    }
}

/// Config whose stores live under `dir`, with no built-in sites.
pub(crate) fn config_in(dir: &Path) -> MonitorConfig {
    MonitorConfig {
        storage: StorageConfig {
            subscriptions_file: Some(dir.join("subscriptions.json")),
            snapshot_dir: Some(dir.join("snapshots")),
        },
        ..MonitorConfig::default()
    }
}

/// Monitor over on-disk stores under `dir`.
pub(crate) fn monitor_in(dir: &Path, transport: Arc<RecordingTransport>) -> Monitor {
    Monitor::new(&config_in(dir), transport).expect("monitor")
}

/// The `demo` site: fetch returns `{"count": <counter>}`, compare is
/// inequality, format is `Update #<count>`.
pub(crate) fn demo_site(counter: Arc<AtomicU64>, schedule: &str) -> Arc<dyn SiteAdapter> {
    Arc::new(
        SiteBuilder::new("demo")
            .display_name("Demo")
            .description("counter-backed demo feed")
            .schedule(schedule)
            .fetch(move || {
                let counter = Arc::clone(&counter);
                async move { Ok(json!({ "count": counter.load(Ordering::SeqCst) })) }
            })
            .compare(|previous: Option<&Value>, latest: &Value| previous != Some(latest))
            .format(|latest: &Value| format!("Update #{}", latest["count"]))
            .build()
            .expect("demo site"),
    )
}

//! One poll cycle: fetch, compare, notify, persist.

use crate::channels::{DispatchReport, Dispatcher};
use crate::sites::SiteDescriptor;
use crate::snapshot::SnapshotStore;
use crate::subscriptions::SubscriptionRegistry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Shared collaborators every cycle needs.
pub struct PollContext {
    pub snapshots: Arc<dyn SnapshotStore>,
    pub subscriptions: Arc<SubscriptionRegistry>,
    pub dispatcher: Dispatcher,
}

/// What a single firing did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A cycle for the same site was already running; this firing was dropped.
    Skipped,
    /// The fetch failed; the snapshot is untouched.
    FetchFailed(String),
    /// Nothing new since the last snapshot.
    Unchanged,
    /// A change was announced to the site's subscribers.
    Notified {
        report: DispatchReport,
        snapshot_saved: bool,
    },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => f.write_str("skipped: previous cycle still running"),
            Self::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
            Self::Unchanged => f.write_str("no change"),
            Self::Notified {
                report,
                snapshot_saved,
            } => {
                write!(
                    f,
                    "notified {} recipient(s), {} failed",
                    report.delivered.len(),
                    report.failed.len()
                )?;
                if !snapshot_saved {
                    f.write_str(", snapshot NOT saved")?;
                }
                Ok(())
            }
        }
    }
}

/// Runs cycles for one site, at most one at a time.
pub(crate) struct SiteRunner {
    site: SiteDescriptor,
    context: Arc<PollContext>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SiteRunner {
    pub(crate) fn new(
        site: SiteDescriptor,
        context: Arc<PollContext>,
        in_flight: Arc<AtomicBool>,
    ) -> Self {
        Self {
            site,
            context,
            in_flight,
        }
    }

    pub(crate) fn site(&self) -> &SiteDescriptor {
        &self.site
    }

    pub(crate) fn in_flight_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.in_flight)
    }

    /// Run a cycle unless one is already in flight for this site.
    pub(crate) async fn fire(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(site = self.site.id(), "previous cycle still running, firing dropped");
            return CycleOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);
        self.poll_once().await
    }

    async fn poll_once(&self) -> CycleOutcome {
        let site_id = self.site.id();
        let ctx = &self.context;

        let previous = match ctx.snapshots.load(site_id) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(site = site_id, error = %e, "snapshot unreadable, treating as first run");
                None
            }
        };

        let latest = match self.site.fetch().await {
            Ok(latest) => latest,
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(site = site_id, error = %reason, "fetch failed");
                return CycleOutcome::FetchFailed(reason);
            }
        };

        if !self.site.compare(previous.as_ref(), &latest) {
            debug!(site = site_id, "no change");
            return CycleOutcome::Unchanged;
        }

        let text = self.site.format(&latest);
        let recipients = ctx.subscriptions.subscribers_of(site_id);
        info!(site = site_id, recipients = recipients.len(), "change detected");
        let report = ctx.dispatcher.dispatch(site_id, &text, &recipients).await;

        let snapshot_saved = match ctx.snapshots.save(site_id, &latest) {
            Ok(()) => true,
            Err(e) => {
                error!(site = site_id, error = %e, "failed to save snapshot");
                false
            }
        };

        CycleOutcome::Notified {
            report,
            snapshot_saved,
        }
    }
}

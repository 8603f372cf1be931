//! Bulk registration of adapters with the scheduler.

use super::{SiteAdapter, SiteDescriptor};
use crate::error::MonitorError;
use crate::scheduler::JobScheduler;
use std::sync::Arc;

/// Outcome of a [`load_sites`] call.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Sites registered with a running schedule.
    pub loaded: Vec<String>,
    /// Sites registered (so subscribable) whose schedule failed to parse.
    pub unscheduled: Vec<(String, MonitorError)>,
    /// Adapters that were not registered at all.
    pub rejected: Vec<(String, MonitorError)>,
}

/// Register each adapter with `scheduler`, sorting the results into a report.
///
/// A rejected adapter never affects the others. Registering an id that is
/// already known replaces the earlier site.
pub fn load_sites(
    scheduler: &mut JobScheduler,
    adapters: impl IntoIterator<Item = Arc<dyn SiteAdapter>>,
) -> LoadReport {
    let mut report = LoadReport::default();

    for adapter in adapters {
        let site = SiteDescriptor::from_adapter(adapter);
        let id = site.id().to_owned();

        match scheduler.register(site) {
            Ok(()) => {
                tracing::info!(site = %id, "site loaded");
                report.loaded.push(id);
            }
            Err(e @ MonitorError::Schedule(_)) => report.unscheduled.push((id, e)),
            Err(e) => {
                tracing::warn!(site = %id, error = %e, "site rejected");
                report.rejected.push((id, e));
            }
        }
    }

    tracing::info!(
        loaded = report.loaded.len(),
        unscheduled = report.unscheduled.len(),
        rejected = report.rejected.len(),
        "site loading finished"
    );
    report
}

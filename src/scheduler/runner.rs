//! Per-site timer jobs.

use super::poll::{CycleOutcome, PollContext, SiteRunner};
use super::schedule::ScheduleSpec;
use crate::config::CronTimezone;
use crate::error::{MonitorError, Result};
use crate::sites::SiteDescriptor;
use crate::subscriptions::{ALL_SITES_KEY, ALL_SITES_TOKEN};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

struct Job {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Entry {
    runner: Arc<SiteRunner>,
    schedule: Option<Arc<ScheduleSpec>>,
    job: Option<Job>,
}

impl Entry {
    fn stop(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel.cancel();
            job.handle.abort();
        }
    }
}

/// Owns every registered site and the timer job that polls it.
///
/// Sites can be registered before or after [`start`](Self::start); jobs are
/// only spawned once the scheduler is started.
pub struct JobScheduler {
    context: Arc<PollContext>,
    timezone: CronTimezone,
    sites: BTreeMap<String, Entry>,
    shutdown: CancellationToken,
    cycles: TaskTracker,
    started: bool,
}

impl JobScheduler {
    pub fn new(context: Arc<PollContext>, timezone: CronTimezone) -> Self {
        Self {
            context,
            timezone,
            sites: BTreeMap::new(),
            shutdown: CancellationToken::new(),
            cycles: TaskTracker::new(),
            started: false,
        }
    }

    pub fn context(&self) -> &Arc<PollContext> {
        &self.context
    }

    /// Register `site`, replacing any site with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::AdapterLoad`] and registers nothing if the id
    /// is empty, reserved, or not made of ASCII letters, digits, `-` and `_`,
    /// or if another site already uses the display name.
    ///
    /// Returns [`MonitorError::Schedule`] if the site's schedule does not
    /// parse. The site is still registered, just never polled by a timer.
    pub fn register(&mut self, site: SiteDescriptor) -> Result<()> {
        self.check_identity(&site)?;
        let id = site.id().to_owned();

        // A replacement shares the old in-flight flag so an old cycle that is
        // still running blocks the new job's first firing.
        let in_flight = match self.sites.remove(&id) {
            Some(mut old) => {
                old.stop();
                info!(site = %id, "replacing registered site");
                old.runner.in_flight_flag()
            }
            None => Arc::default(),
        };

        let parsed = ScheduleSpec::parse(site.schedule());
        let runner = Arc::new(SiteRunner::new(site, Arc::clone(&self.context), in_flight));
        let (schedule, result) = match parsed {
            Ok(spec) => {
                debug!(site = %id, schedule = %spec, "schedule parsed");
                (Some(Arc::new(spec)), Ok(()))
            }
            Err(e) => {
                error!(site = %id, error = %e, "invalid schedule, site will not be polled");
                (None, Err(e))
            }
        };

        let mut entry = Entry {
            runner,
            schedule,
            job: None,
        };
        if self.started {
            entry.job = self.spawn_job(&entry);
        }
        self.sites.insert(id, entry);
        result
    }

    // The id names the snapshot file, so it must stay a plain file stem.
    fn check_identity(&self, site: &SiteDescriptor) -> Result<()> {
        let id = site.id();
        if id.is_empty() {
            return Err(MonitorError::AdapterLoad("site id is empty".into()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(MonitorError::AdapterLoad(format!(
                "site id `{id}` may only contain ASCII letters, digits, `-` and `_`"
            )));
        }
        if id == ALL_SITES_KEY {
            return Err(MonitorError::AdapterLoad(format!(
                "site id `{id}` is reserved"
            )));
        }

        let name = site.display_name();
        if name == ALL_SITES_TOKEN || name == ALL_SITES_KEY {
            return Err(MonitorError::AdapterLoad(format!(
                "display name `{name}` is reserved"
            )));
        }
        match self.resolve(name) {
            Some(other) if other != id => Err(MonitorError::AdapterLoad(format!(
                "display name `{name}` is already used by site `{other}`"
            ))),
            _ => Ok(()),
        }
    }

    /// Spawn a timer job for every scheduled site. Calling it again is a no-op.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let mut jobs = 0;
        let ids: Vec<String> = self.sites.keys().cloned().collect();
        for id in ids {
            let job = self.sites.get(&id).and_then(|entry| self.spawn_job(entry));
            if let Some(entry) = self.sites.get_mut(&id) {
                jobs += usize::from(job.is_some());
                entry.job = job;
            }
        }
        info!(sites = self.sites.len(), jobs, "scheduler started");
    }

    fn spawn_job(&self, entry: &Entry) -> Option<Job> {
        let schedule = entry.schedule.clone()?;
        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(run_job(
            Arc::clone(&entry.runner),
            schedule,
            self.timezone,
            cancel.clone(),
            self.cycles.clone(),
        ));
        Some(Job { cancel, handle })
    }

    pub fn site(&self, id: &str) -> Option<&SiteDescriptor> {
        self.sites.get(id).map(|entry| entry.runner.site())
    }

    /// Registered sites, ordered by id.
    pub fn sites(&self) -> impl Iterator<Item = &SiteDescriptor> {
        self.sites.values().map(|entry| entry.runner.site())
    }

    /// Site id for a display name, or for an id typed directly.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.sites()
            .find(|site| site.display_name() == name)
            .or_else(|| self.site(name))
            .map(SiteDescriptor::id)
    }

    /// Whether the site's schedule parsed.
    pub fn is_scheduled(&self, id: &str) -> bool {
        self.sites
            .get(id)
            .is_some_and(|entry| entry.schedule.is_some())
    }

    pub fn schedule_of(&self, id: &str) -> Option<&ScheduleSpec> {
        self.sites.get(id)?.schedule.as_deref()
    }

    /// Number of timer jobs currently spawned.
    pub fn job_count(&self) -> usize {
        self.sites.values().filter(|entry| entry.job.is_some()).count()
    }

    /// Poll `id` immediately, outside its schedule. Still skipped if a cycle
    /// for the site is already running.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownSite`] if no site has that id.
    pub async fn run_now(&self, id: &str) -> Result<CycleOutcome> {
        let entry = self
            .sites
            .get(id)
            .ok_or_else(|| MonitorError::UnknownSite(id.to_owned()))?;
        Ok(entry.runner.fire().await)
    }

    /// Stop all timers and wait for cycles that are already running.
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        for (id, entry) in &mut self.sites {
            let Some(job) = entry.job.take() else {
                continue;
            };
            match job.handle.await {
                Err(e) if e.is_panic() => warn!(site = %id, "job panicked"),
                _ => {}
            }
        }
        self.cycles.close();
        self.cycles.wait().await;
        info!("scheduler stopped");
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_job(
    runner: Arc<SiteRunner>,
    schedule: Arc<ScheduleSpec>,
    timezone: CronTimezone,
    cancel: CancellationToken,
    cycles: TaskTracker,
) {
    let site_id = runner.site().id().to_owned();
    debug!(site = %site_id, schedule = %schedule, "job started");

    match schedule.as_ref() {
        ScheduleSpec::Interval(period) => {
            let mut ticker = tokio::time::interval_at(Instant::now() + *period, *period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => fire_detached(&runner, &cycles),
                }
            }
        }
        ScheduleSpec::Cron(cron) => {
            let mut after = Utc::now();
            loop {
                let next = match cron.next_after(after, timezone) {
                    Ok(next) => next,
                    Err(e) => {
                        error!(site = %site_id, error = %e, "cron job stopping");
                        break;
                    }
                };
                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => fire_detached(&runner, &cycles),
                }
                // Never evaluate from before the occurrence that just fired.
                after = next.max(Utc::now());
            }
        }
    }

    debug!(site = %site_id, "job stopped");
}

/// Run a cycle without holding up the timer, so later firings can observe
/// (and drop themselves against) a cycle that is still in flight.
fn fire_detached(runner: &Arc<SiteRunner>, cycles: &TaskTracker) {
    let runner = Arc::clone(runner);
    cycles.spawn(async move {
        runner.fire().await;
    });
}

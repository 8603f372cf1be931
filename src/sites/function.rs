//! Closure-backed sites, for adapters that are easier to write as a handful
//! of functions than as a type.

use super::{Payload, SiteAdapter};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type FetchFuture = Pin<Box<dyn Future<Output = anyhow::Result<Payload>> + Send>>;
type FetchFn = Arc<dyn Fn() -> FetchFuture + Send + Sync>;
type CompareFn = Arc<dyn Fn(Option<&Payload>, &Payload) -> bool + Send + Sync>;
type FormatFn = Arc<dyn Fn(&Payload) -> String + Send + Sync>;

/// A site assembled from closures by [`SiteBuilder`].
pub struct FnSite {
    id: String,
    display_name: String,
    description: String,
    schedule: String,
    fetch: FetchFn,
    compare: CompareFn,
    format: FormatFn,
}

#[async_trait]
impl SiteAdapter for FnSite {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn fetch(&self) -> anyhow::Result<Payload> {
        (self.fetch)().await
    }

    fn compare(&self, previous: Option<&Payload>, latest: &Payload) -> bool {
        (self.compare)(previous, latest)
    }

    fn format(&self, latest: &Payload) -> String {
        (self.format)(latest)
    }
}

/// Builder for [`FnSite`]. Every operation and the schedule are required.
#[derive(Default)]
pub struct SiteBuilder {
    id: String,
    display_name: Option<String>,
    description: String,
    schedule: Option<String>,
    fetch: Option<FetchFn>,
    compare: Option<CompareFn>,
    format: Option<FormatFn>,
}

impl SiteBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    pub fn fetch<F, Fut>(mut self, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Payload>> + Send + 'static,
    {
        self.fetch = Some(Arc::new(move || Box::pin(fetch()) as FetchFuture));
        self
    }

    pub fn compare<F>(mut self, compare: F) -> Self
    where
        F: Fn(Option<&Payload>, &Payload) -> bool + Send + Sync + 'static,
    {
        self.compare = Some(Arc::new(compare));
        self
    }

    pub fn format<F>(mut self, format: F) -> Self
    where
        F: Fn(&Payload) -> String + Send + Sync + 'static,
    {
        self.format = Some(Arc::new(format));
        self
    }

    /// Finish the site.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::AdapterLoad`] naming the first missing piece.
    pub fn build(self) -> Result<FnSite> {
        let missing =
            |what: &str| MonitorError::AdapterLoad(format!("site `{}` has no {what}", self.id));
        let schedule = self.schedule.ok_or_else(|| missing("schedule"))?;
        let fetch = self.fetch.ok_or_else(|| missing("fetch operation"))?;
        let compare = self.compare.ok_or_else(|| missing("compare operation"))?;
        let format = self.format.ok_or_else(|| missing("format operation"))?;

        Ok(FnSite {
            display_name: self.display_name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description,
            schedule,
            fetch,
            compare,
            format,
        })
    }
}

//! Generic JSON endpoint site, configured from `[[sites.http_json]]`.
//!
//! The endpoint is fetched with a plain GET. Change detection compares the
//! value at `watch_pointer` (or the whole document) against the snapshot.

use super::{Payload, SiteAdapter};
use crate::config::HttpJsonSiteConfig;
use crate::error::{MonitorError, Result};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;

const MAX_HEADLINE_CHARS: usize = 200;

/// A site backed by a JSON HTTP endpoint.
#[derive(Debug)]
pub struct HttpJsonSite {
    config: HttpJsonSiteConfig,
    client: reqwest::Client,
}

impl HttpJsonSite {
    /// Build the site and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::AdapterLoad`] if the client cannot be built.
    pub fn new(config: HttpJsonSiteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sitewatch/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| {
                MonitorError::AdapterLoad(format!(
                    "site `{}`: failed to build HTTP client: {e}",
                    config.id
                ))
            })?;
        Ok(Self { config, client })
    }

    fn watched<'a>(&self, payload: &'a Payload) -> Option<&'a Payload> {
        match &self.config.watch_pointer {
            Some(pointer) => payload.pointer(pointer),
            None => Some(payload),
        }
    }

    fn headline(&self, latest: &Payload) -> String {
        let value = self
            .config
            .title_pointer
            .as_deref()
            .and_then(|pointer| latest.pointer(pointer))
            .or_else(|| self.watched(latest));
        match value {
            Some(Payload::String(text)) => truncate(text),
            Some(other) => truncate(&other.to_string()),
            None => "(no value)".to_owned(),
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_HEADLINE_CHARS {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(MAX_HEADLINE_CHARS).collect();
    short.push('…');
    short
}

#[async_trait]
impl SiteAdapter for HttpJsonSite {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn display_name(&self) -> &str {
        &self.config.display_name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    fn schedule(&self) -> &str {
        &self.config.schedule
    }

    async fn fetch(&self) -> anyhow::Result<Payload> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.config.url))?
            .error_for_status()?;
        let payload = response
            .json::<Payload>()
            .await
            .with_context(|| format!("decoding JSON from {}", self.config.url))?;
        Ok(payload)
    }

    fn compare(&self, previous: Option<&Payload>, latest: &Payload) -> bool {
        match previous {
            None => self.config.notify_on_first,
            Some(previous) => self.watched(previous) != self.watched(latest),
        }
    }

    fn format(&self, latest: &Payload) -> String {
        let name = match self.config.display_name.trim() {
            "" => self.config.id.as_str(),
            name => name,
        };
        format!("[{name}]\n{}\n{}", self.headline(latest), self.config.url)
    }
}

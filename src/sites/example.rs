//! Counter-backed demo site. Every fetch is a new update.

use super::{Payload, SiteAdapter};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

/// Demo site that produces a new numbered update on every fetch.
#[derive(Debug, Default)]
pub struct ExampleSite {
    count: AtomicU64,
}

impl ExampleSite {
    pub const ID: &'static str = "example";

    /// Continue counting from `previous["update_count"]`, or from zero.
    pub fn resume_from(previous: Option<&Payload>) -> Self {
        let count = previous
            .and_then(|p| p.get("update_count"))
            .and_then(Payload::as_u64)
            .unwrap_or(0);
        Self {
            count: AtomicU64::new(count),
        }
    }
}

fn update_count(payload: &Payload) -> u64 {
    payload
        .get("update_count")
        .and_then(Payload::as_u64)
        .unwrap_or(0)
}

#[async_trait]
impl SiteAdapter for ExampleSite {
    fn id(&self) -> &str {
        Self::ID
    }

    fn display_name(&self) -> &str {
        "Example"
    }

    fn description(&self) -> &str {
        "Demo site that posts an update every 10 seconds"
    }

    fn schedule(&self) -> &str {
        "interval:10"
    }

    async fn fetch(&self) -> anyhow::Result<Payload> {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(json!({
            "timestamp": chrono::Utc::now().timestamp(),
            "update_count": n,
            "title": format!("Example update #{n}"),
            "content": format!("This is the body of update #{n}."),
        }))
    }

    fn compare(&self, previous: Option<&Payload>, latest: &Payload) -> bool {
        match previous {
            None => true,
            Some(previous) => update_count(latest) > update_count(previous),
        }
    }

    fn format(&self, latest: &Payload) -> String {
        let title = latest.get("title").and_then(Payload::as_str).unwrap_or("");
        let content = latest
            .get("content")
            .and_then(Payload::as_str)
            .unwrap_or("");
        format!("[Example]\n{title}\n{content}")
    }
}

use crate::helpers::{RecordingTransport, demo_site, monitor_in};
use async_trait::async_trait;
use serde_json::{Value, json};
use sitewatch::commands::Recipient;
use sitewatch::{MonitorError, SiteAdapter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

async fn advance(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn timer_driven_cycles_notify_only_on_change() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = RecordingTransport::new(&["1001"], &[]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    let counter = Arc::new(AtomicU64::new(1));
    monitor.load_sites([demo_site(Arc::clone(&counter), "interval:5")]);
    monitor
        .commands()
        .subscribe(&Recipient::group("1001"), "Demo");
    monitor.start();

    advance(4.0).await;
    assert!(transport.sent().is_empty(), "no firing before one full period");

    advance(2.0).await;
    assert_eq!(transport.sent().len(), 1);

    advance(5.0).await;
    assert_eq!(transport.sent().len(), 1, "unchanged payload is not resent");

    counter.store(2, Ordering::SeqCst);
    advance(5.0).await;
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].text, "Update #2");

    monitor.shutdown().await;
}

/// Fails every other fetch.
struct Flaky {
    calls: AtomicUsize,
}

#[async_trait]
impl SiteAdapter for Flaky {
    fn id(&self) -> &str {
        "flaky"
    }

    fn schedule(&self) -> &str {
        "interval:10"
    }

    async fn fetch(&self) -> anyhow::Result<Value> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 2 == 1 {
            anyhow::bail!("upstream returned 503");
        }
        Ok(json!({ "call": n }))
    }

    fn compare(&self, previous: Option<&Value>, latest: &Value) -> bool {
        previous != Some(latest)
    }

    fn format(&self, latest: &Value) -> String {
        format!("call {}", latest["call"])
    }
}

#[tokio::test(start_paused = true)]
async fn fetch_failures_do_not_stop_future_firings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = RecordingTransport::new(&["1001"], &[]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    let flaky = Arc::new(Flaky {
        calls: AtomicUsize::new(0),
    });
    monitor.load_sites([flaky.clone() as Arc<dyn SiteAdapter>]);
    monitor
        .commands()
        .subscribe(&Recipient::group("1001"), "flaky");
    monitor.start();

    advance(10.5).await;
    assert!(transport.sent().is_empty());
    assert!(monitor.snapshots().load("flaky").unwrap().is_none());

    advance(10.0).await;
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(transport.sent()[0].text, "call 2");
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);

    monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unscheduled_site_stays_subscribable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = RecordingTransport::new(&["1001"], &[]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    let report = monitor.load_sites([
        demo_site(Arc::new(AtomicU64::new(1)), "0 12 * *"),
    ]);
    assert!(report.loaded.is_empty());
    assert!(matches!(report.unscheduled[0].1, MonitorError::Schedule(_)));

    let reply = monitor
        .commands()
        .subscribe(&Recipient::group("1001"), "Demo");
    assert_eq!(reply, "group 1001 subscribed to Demo");
    monitor.start();
    assert_eq!(monitor.scheduler().job_count(), 0);

    advance(3600.0).await;
    assert!(transport.sent().is_empty());
    monitor.shutdown().await;
}

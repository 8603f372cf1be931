use crate::helpers::{RecordingTransport, Sent, demo_site, monitor_in};
use serde_json::json;
use sitewatch::channels::TargetKind;
use sitewatch::commands::Recipient;
use sitewatch::CycleOutcome;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[tokio::test]
async fn demo_site_notifies_once_per_change() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = RecordingTransport::new(&["1001"], &["2002"]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    let counter = Arc::new(AtomicU64::new(1));
    let report = monitor.load_sites([demo_site(Arc::clone(&counter), "interval:60")]);
    assert_eq!(report.loaded, ["demo"]);

    let commands = monitor.commands();
    commands.subscribe(&Recipient::group("1001"), "Demo");
    commands.subscribe(&Recipient::user("2002"), "Demo");

    // No snapshot yet: {"count":1} is new.
    assert!(monitor.snapshots().load("demo").unwrap().is_none());
    let outcome = monitor.run_now("demo").await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Notified { snapshot_saved: true, .. }));

    assert_eq!(
        transport.sent(),
        [
            Sent {
                kind: TargetKind::User,
                id: "2002".into(),
                text: "Update #1".into()
            },
            Sent {
                kind: TargetKind::Group,
                id: "1001".into(),
                text: "Update #1".into()
            },
        ]
    );
    // Users are listed before groups; 2002 is tried as a group first, then as a user.
    assert_eq!(
        transport.attempts(),
        [
            (TargetKind::Group, "2002".to_owned()),
            (TargetKind::User, "2002".to_owned()),
            (TargetKind::Group, "1001".to_owned()),
        ]
    );
    let snapshot_file = dir.path().join("snapshots").join("demo_subscription.json");
    let saved = std::fs::read_to_string(&snapshot_file).unwrap();
    assert_eq!(monitor.snapshots().load("demo").unwrap(), Some(json!({ "count": 1 })));

    // Same payload again: nothing sent, snapshot untouched.
    assert_eq!(monitor.run_now("demo").await.unwrap(), CycleOutcome::Unchanged);
    assert_eq!(transport.sent().len(), 2);
    assert_eq!(std::fs::read_to_string(&snapshot_file).unwrap(), saved);

    // A real change notifies again.
    counter.store(2, Ordering::SeqCst);
    monitor.run_now("demo").await.unwrap();
    let texts: Vec<String> = transport.sent().into_iter().map(|s| s.text).collect();
    assert_eq!(texts[2..], ["Update #2", "Update #2"]);

    monitor.shutdown().await;
}

#[tokio::test]
async fn snapshot_survives_restart_so_old_news_is_not_resent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let counter = Arc::new(AtomicU64::new(7));

    {
        let transport = RecordingTransport::new(&["1001"], &[]);
        let mut monitor = monitor_in(dir.path(), transport.clone());
        monitor.load_sites([demo_site(Arc::clone(&counter), "interval:60")]);
        monitor.commands().subscribe(&Recipient::group("1001"), "Demo");
        monitor.run_now("demo").await.unwrap();
        assert_eq!(transport.sent().len(), 1);
    }

    let transport = RecordingTransport::new(&["1001"], &[]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    monitor.load_sites([demo_site(Arc::clone(&counter), "interval:60")]);
    assert_eq!(monitor.run_now("demo").await.unwrap(), CycleOutcome::Unchanged);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn change_without_subscribers_still_updates_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = RecordingTransport::new(&[], &[]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(3)), "interval:60")]);

    let outcome = monitor.run_now("demo").await.unwrap();
    let CycleOutcome::Notified { report, .. } = &outcome else {
        panic!("expected notification, got {outcome:?}");
    };
    assert!(report.delivered.is_empty());
    assert!(transport.attempts().is_empty());
    assert_eq!(monitor.snapshots().load("demo").unwrap(), Some(json!({ "count": 3 })));
}

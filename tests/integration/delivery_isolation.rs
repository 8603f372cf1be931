use crate::helpers::{RecordingTransport, demo_site, monitor_in};
use sitewatch::channels::{DeliveryError, TargetKind};
use sitewatch::commands::Recipient;
use sitewatch::{ALL_SITES_TOKEN, CycleOutcome};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

#[tokio::test]
async fn invalid_recipient_is_logged_and_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = RecordingTransport::new(&["1001"], &["2002"]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(1)), "interval:60")]);

    let commands = monitor.commands();
    commands.subscribe(&Recipient::group("1001"), "Demo");
    commands.subscribe(&Recipient::user("9999"), "Demo");
    commands.subscribe(&Recipient::user("2002"), "Demo");

    let outcome = monitor.run_now("demo").await.unwrap();
    let CycleOutcome::Notified {
        report,
        snapshot_saved,
    } = &outcome
    else {
        panic!("expected notification, got {outcome:?}");
    };

    let delivered: Vec<&str> = report
        .delivered
        .iter()
        .map(|d| d.recipient.as_str())
        .collect();
    assert_eq!(delivered, ["2002", "1001"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].recipient, "9999");
    assert_eq!(
        report.failed[0].error,
        DeliveryError::InvalidTarget {
            kind: TargetKind::User,
            id: "9999".into()
        }
    );
    assert!(*snapshot_saved);
}

#[tokio::test]
async fn all_sites_subscribers_hear_about_every_site() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = RecordingTransport::new(&["4004"], &[]);
    let mut monitor = monitor_in(dir.path(), transport.clone());
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(1)), "interval:60")]);

    let reply = monitor
        .commands()
        .subscribe(&Recipient::group("4004"), ALL_SITES_TOKEN);
    assert!(reply.contains("subscribed"), "{reply}");

    monitor.run_now("demo").await.unwrap();
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, "4004");
    assert_eq!(sent[0].text, "Update #1");
}

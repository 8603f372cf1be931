use crate::helpers::{RecordingTransport, demo_site, monitor_in};
use sitewatch::commands::Recipient;
use sitewatch::{ALL_SITES_KEY, ALL_SITES_TOKEN};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

#[test]
fn subscriptions_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let mut monitor = monitor_in(dir.path(), RecordingTransport::new(&[], &[]));
        monitor.load_sites([demo_site(Arc::new(AtomicU64::new(0)), "interval:60")]);
        let commands = monitor.commands();
        commands.subscribe(&Recipient::group("1001"), "Demo");
        commands.subscribe(&Recipient::user("2002"), "Demo");
        commands.subscribe(&Recipient::user("3003"), ALL_SITES_TOKEN);
    }

    let mut monitor = monitor_in(dir.path(), RecordingTransport::new(&[], &[]));
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(0)), "interval:60")]);
    assert_eq!(
        monitor.subscriptions().subscribers_of("demo"),
        ["2002", "1001", "3003"]
    );

    let listing = monitor
        .commands()
        .list_subscriptions(&Recipient::group("1001"));
    assert_eq!(
        listing.render(),
        "Subscribed:\n✓ Demo - counter-backed demo feed"
    );
}

#[test]
fn document_on_disk_uses_site_keyed_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut monitor = monitor_in(dir.path(), RecordingTransport::new(&[], &[]));
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(0)), "interval:60")]);
    let commands = monitor.commands();
    commands.subscribe(&Recipient::group("1001"), "Demo");
    commands.subscribe(&Recipient::user("3003"), ALL_SITES_TOKEN);

    let raw = std::fs::read_to_string(dir.path().join("subscriptions.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["demo"]["groups"][0], "1001");
    assert_eq!(doc["demo"]["users"].as_array().unwrap().len(), 0);
    assert_eq!(doc[ALL_SITES_KEY]["users"][0], "3003");
    assert!(doc.get(ALL_SITES_TOKEN).is_none());
}

#[test]
fn unsubscribing_everyone_prunes_site_but_keeps_all_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut monitor = monitor_in(dir.path(), RecordingTransport::new(&[], &[]));
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(0)), "interval:60")]);
    let commands = monitor.commands();
    let user = Recipient::user("2002");

    commands.subscribe(&user, "Demo");
    commands.subscribe(&user, ALL_SITES_TOKEN);
    commands.unsubscribe(&user, "Demo");
    commands.unsubscribe(&user, ALL_SITES_TOKEN);

    let raw = std::fs::read_to_string(dir.path().join("subscriptions.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(doc.get("demo").is_none());
    assert_eq!(doc[ALL_SITES_KEY], serde_json::json!({ "users": [], "groups": [] }));
}

#[test]
fn legacy_recipient_keyed_file_is_migrated_on_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("subscriptions.json"),
        r#"{ "2002": ["demo"], "3003": ["全部"] }"#,
    )
    .unwrap();

    let mut monitor = monitor_in(dir.path(), RecordingTransport::new(&[], &[]));
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(0)), "interval:60")]);
    assert_eq!(
        monitor.subscriptions().subscribers_of("demo"),
        ["2002", "3003"]
    );
    let listing = monitor
        .commands()
        .list_subscriptions(&Recipient::user("3003"));
    assert!(listing.all_sites);
}

use crate::helpers::{config_in, demo_site};
use serde_json::json;
use sitewatch::channels::OneBotTransport;
use sitewatch::commands::Recipient;
use sitewatch::{CycleOutcome, Monitor};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "retcode": 0, "data": {} }))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "failed",
        "retcode": 100,
        "wording": "group not found"
    }))
}

#[tokio::test]
async fn group_then_private_fallback_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send_group_msg"))
        .and(body_partial_json(json!({ "group_id": 1001 })))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send_group_msg"))
        .and(body_partial_json(json!({ "group_id": 2002 })))
        .respond_with(not_found())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send_private_msg"))
        .and(body_partial_json(json!({ "user_id": 2002, "message": "Update #1" })))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path());
    config.transport.onebot_url = server.uri();
    let transport = Arc::new(OneBotTransport::new(&config.transport).unwrap());
    let mut monitor = Monitor::new(&config, transport).unwrap();
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(1)), "interval:60")]);
    monitor
        .commands()
        .subscribe(&Recipient::group("1001"), "Demo");
    monitor
        .commands()
        .subscribe(&Recipient::user("2002"), "Demo");

    let outcome = monitor.run_now("demo").await.unwrap();
    let CycleOutcome::Notified { report, .. } = &outcome else {
        panic!("expected notification, got {outcome:?}");
    };
    assert!(report.is_complete());
    assert_eq!(report.delivered.len(), 2);
}

#[tokio::test]
async fn unreachable_transport_still_saves_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path());
    // Nothing listens on the discard port.
    config.transport.onebot_url = "http://127.0.0.1:9".to_owned();
    config.transport.timeout_secs = 2;
    let transport = Arc::new(OneBotTransport::new(&config.transport).unwrap());
    let mut monitor = Monitor::new(&config, transport).unwrap();
    monitor.load_sites([demo_site(Arc::new(AtomicU64::new(1)), "interval:60")]);
    monitor
        .commands()
        .subscribe(&Recipient::group("1001"), "Demo");

    let outcome = monitor.run_now("demo").await.unwrap();
    let CycleOutcome::Notified {
        report,
        snapshot_saved,
    } = &outcome
    else {
        panic!("expected notification, got {outcome:?}");
    };
    assert_eq!(report.failed.len(), 1);
    assert!(*snapshot_saved);
    assert_eq!(
        monitor.snapshots().load("demo").unwrap(),
        Some(json!({ "count": 1 }))
    );
}

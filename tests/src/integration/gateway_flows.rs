//! # Gateway Flows
//!
//! Cluster nodes and administrative clients against one running gateway:
//!
//! 1. **Relay**: node pushes `systemInfo`, admin pulls the latest snapshot
//! 2. **Authentication**: rejections reply, publish and terminate
//! 3. **Dispatch**: parse failures reply without closing; cluster failures
//!    reach the bus
//! 4. **Lifecycle**: delayed `authonload`, disconnect events, abrupt drops

use super::harness::{TestGateway, READY_DELAY, WAIT};
use mcu_bus::{EventChannel, EventFilter, EventKind};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::time::timeout;

// =============================================================================
// RELAY
// =============================================================================

#[tokio::test]
async fn test_cluster_push_admin_pull() {
    let gw = TestGateway::start().await;
    let snapshot = json!({"cpu": 37, "mem": {"used": 512, "total": 2048}, "rooms": ["a", "b"]});

    let mut node = gw.node().await;
    node.send_json(json!({"event": "systemInfo", "message": snapshot})).await;
    gw.wait_for_snapshot("systemInfo", &snapshot).await;

    let mut admin = gw.admin().await;
    admin
        .send_json(json!({"event": "systemInfo", "message": null}))
        .await;
    assert_eq!(
        admin.next_envelope().await,
        json!({"event": "systemInfo", "message": snapshot})
    );

    gw.stop().await;
}

#[tokio::test]
async fn test_last_write_wins() {
    let gw = TestGateway::start().await;
    let mut first = gw.node().await;
    let mut second = gw.node().await;

    first
        .send_json(json!({"event": "systemInfo", "message": {"from": 1}}))
        .await;
    gw.wait_for_snapshot("systemInfo", &json!({"from": 1})).await;
    second
        .send_json(json!({"event": "systemInfo", "message": {"from": 2}}))
        .await;
    gw.wait_for_snapshot("systemInfo", &json!({"from": 2})).await;

    let mut admin = gw.admin().await;
    admin
        .send_json(json!({"event": "systemInfo", "message": {}}))
        .await;
    assert_eq!(admin.next_envelope().await["message"], json!({"from": 2}));

    gw.stop().await;
}

#[tokio::test]
async fn test_pull_before_any_push() {
    let gw = TestGateway::start().await;
    let mut admin = gw.admin().await;

    for _ in 0..2 {
        admin
            .send_json(json!({"event": "systemInfo", "message": null}))
            .await;
        assert_eq!(
            admin.next_envelope().await,
            json!({"event": "ERR_MESSAGE_PARSE", "message": "could not retrieve system info"})
        );
    }

    gw.stop().await;
}

#[tokio::test]
async fn test_binary_push() {
    let gw = TestGateway::start().await;
    let mut node = gw.node().await;

    node.send_binary(br#"{"event":"systemInfo","message":{"via":"binary"}}"#.to_vec())
        .await;
    gw.wait_for_snapshot("systemInfo", &json!({"via": "binary"}))
        .await;

    gw.stop().await;
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn test_wrong_password_rejected() {
    let gw = TestGateway::start().await;
    let mut sub = gw.bus.subscribe(EventFilter::channel(EventChannel::Info));

    let mut client = gw
        .connect("/socket", Some("username=admin; password=wrong"))
        .await;
    assert_eq!(
        client.next_envelope().await,
        json!({"event": "ERR_AUTHENTICATION_FAILED", "message": "authentication rejected"})
    );
    client.expect_closed().await;

    let event = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::UnauthorizedConnection);
    assert_eq!(event.event, "unauthorized websocket connection: 127.0.0.1");
    assert_eq!(event.message, "authentication rejected");
    assert_eq!(gw.metrics.connections_rejected.load(Ordering::Relaxed), 1);

    gw.stop().await;
}

#[tokio::test]
async fn test_rejection_reasons() {
    let gw = TestGateway::start().await;

    let cases = [
        ("/socket", None, "connection carries no token"),
        ("/socket", Some("username=admin"), "connection carries no token"),
        ("/socket", Some("username=nobody; password=x"), "user not found"),
        ("/admin", Some("username=admin; password=s3cret"), "access not permitted"),
        ("/", None, "access not permitted"),
    ];

    for (path, cookie, reason) in cases {
        let mut client = gw.connect(path, cookie).await;
        assert_eq!(
            client.next_envelope().await,
            json!({"event": "ERR_AUTHENTICATION_FAILED", "message": reason}),
            "path {path} cookie {cookie:?}"
        );
        client.expect_closed().await;
    }

    gw.stop().await;
}

#[tokio::test]
async fn test_cookies_on_separate_headers() {
    let gw = TestGateway::start().await;

    let mut client = gw
        .connect_with_cookies("/socket", &["username=admin", "password=s3cret"])
        .await;
    client.expect_authonload().await;

    gw.stop().await;
}

#[tokio::test]
async fn test_unregistered_cluster_rejected() {
    let gw = TestGateway::start().await;
    assert!(gw.registry.deregister("127.0.0.1"));

    let mut client = gw.connect("/cluster", None).await;
    assert_eq!(
        client.next_envelope().await["event"],
        "ERR_AUTHENTICATION_FAILED"
    );
    client.expect_closed().await;

    gw.stop().await;
}

#[tokio::test]
async fn test_configured_cluster_path() {
    let gw = TestGateway::start_with(|config| config.routes.cluster_path = "/node".into()).await;

    let mut old = gw.connect("/cluster", None).await;
    assert_eq!(
        old.next_envelope().await["message"],
        "access not permitted"
    );

    let mut node = gw.connect("/node/edge-1", None).await;
    node.expect_authonload().await;

    gw.stop().await;
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn test_cluster_parse_error_keeps_connection() {
    let gw = TestGateway::start().await;
    let mut sub = gw.bus.subscribe(EventFilter::kinds(vec![EventKind::MessageParseFailure]));
    let mut node = gw.node().await;

    node.send_raw("{not json").await;
    let reply = node.next_envelope().await;
    assert_eq!(reply["event"], "ERR_MESSAGE_PARSE");

    let event = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.channel, EventChannel::Error);
    assert!(event.inprotype);
    assert_eq!(event.event, "cluster node [ 127.0.0.1 ] message parse error");
    let details: serde_json::Value = serde_json::from_str(&event.message).unwrap();
    assert_eq!(details["remoteAddress"], "127.0.0.1");
    assert_eq!(details["remoteFamily"], "IPv4");
    assert_eq!(details["error"], reply["message"]);

    // Still open and still routed.
    node.send_json(json!({"event": "systemInfo", "message": {"ok": true}}))
        .await;
    gw.wait_for_snapshot("systemInfo", &json!({"ok": true})).await;

    gw.stop().await;
}

#[tokio::test]
async fn test_web_parse_error_not_published() {
    let gw = TestGateway::start().await;
    let mut sub = gw.bus.subscribe(EventFilter::channel(EventChannel::Error));
    let mut admin = gw.admin().await;

    admin.send_json(json!({"event": "systemInfo"})).await;
    let reply = admin.next_envelope().await;
    assert_eq!(reply["event"], "ERR_MESSAGE_PARSE");

    admin.close().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sub.try_recv().unwrap().is_none());

    gw.stop().await;
}

#[tokio::test]
async fn test_unrouted_events_ignored() {
    let gw = TestGateway::start().await;
    let mut node = gw.node().await;
    let mut admin = gw.admin().await;

    node.send_json(json!({"event": "restart", "message": 1})).await;
    node.send_raw("garbage").await;
    // The only reply is for the garbage frame.
    assert_eq!(node.next_envelope().await["event"], "ERR_MESSAGE_PARSE");

    admin.send_json(json!({"event": "restart", "message": 1})).await;
    admin.expect_silence(Duration::from_millis(150)).await;
    assert!(gw.cache.peek("systemInfo").is_none());

    gw.stop().await;
}

#[tokio::test]
async fn test_oversized_frame_rejected() {
    let gw = TestGateway::start_with(|config| config.session.max_message_size = 64).await;
    let mut node = gw.node().await;

    let payload = "x".repeat(128);
    node.send_json(json!({"event": "systemInfo", "message": payload}))
        .await;
    let reply = node.next_envelope().await;
    assert_eq!(reply["event"], "ERR_MESSAGE_PARSE");
    assert!(reply["message"]
        .as_str()
        .unwrap()
        .starts_with("frame too large"));
    assert!(gw.cache.peek("systemInfo").is_none());

    gw.stop().await;
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[tokio::test]
async fn test_authonload_respects_delay() {
    let delay = Duration::from_millis(200);
    let gw = TestGateway::start_with(|config| config.session.ready_delay = delay).await;

    let started = Instant::now();
    let mut node = gw.connect("/cluster", None).await;
    node.expect_authonload().await;
    assert!(started.elapsed() >= delay);

    // Exactly one.
    node.expect_silence(delay * 2).await;

    gw.stop().await;
}

#[tokio::test]
async fn test_cluster_disconnect_published() {
    let gw = TestGateway::start().await;
    let mut sub = gw.bus.subscribe(EventFilter::kinds(vec![EventKind::ClusterDisconnected]));

    let admin = gw.admin().await;
    admin.close().await;
    let node = gw.node().await;
    node.close().await;

    let event = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.channel, EventChannel::Error);
    assert!(event.inprotype);
    assert_eq!(event.event, "cluster node [ 127.0.0.1 ] disconnected");

    tokio::time::sleep(READY_DELAY).await;
    assert!(sub.try_recv().unwrap().is_none());

    gw.stop().await;
}

#[tokio::test]
async fn test_abrupt_disconnect_is_not_an_error() {
    let gw = TestGateway::start().await;
    let mut sub = gw.bus.subscribe(EventFilter::channel(EventChannel::Error));

    let node = gw.node().await;
    node.abort();

    let event = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::ClusterDisconnected);
    assert_eq!(event.event, "cluster node [ 127.0.0.1 ] disconnected");

    tokio::time::sleep(READY_DELAY).await;
    assert!(sub.try_recv().unwrap().is_none());

    gw.stop().await;
}

// =============================================================================
// STATUS ENDPOINTS
// =============================================================================

#[tokio::test]
async fn test_status_endpoints() {
    let gw = TestGateway::start().await;
    let _node = gw.node().await;

    let health = gw.http_get("/health").await;
    assert!(health.starts_with("HTTP/1.1 200"));
    assert!(health.contains("healthy"));

    let metrics = gw.http_get("/metrics").await;
    assert!(metrics.starts_with("HTTP/1.1 200"));
    assert!(metrics.contains("\"accepted\":1"));

    gw.stop().await;
}

#[tokio::test]
async fn test_status_endpoints_disabled() {
    let gw = TestGateway::start_with(|config| config.server.expose_status = false).await;

    let mut client = gw.connect("/health", None).await;
    assert_eq!(
        client.next_envelope().await,
        json!({"event": "ERR_AUTHENTICATION_FAILED", "message": "access not permitted"})
    );

    gw.stop().await;
}

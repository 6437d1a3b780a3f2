//! # Audit Flow
//!
//! Operational events raised by the gateway land in the audit log through
//! the bus, and can be paged, marked read and deleted.

use super::harness::{TestGateway, WAIT};
use mcu_bus::{AuditError, AuditLog, AuditSink, EventChannel, EventKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

async fn wait_for_entries(log: &AuditLog, count: usize) {
    timeout(WAIT, async {
        while log.len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("audit entries never arrived");
}

#[tokio::test]
async fn test_gateway_events_are_audited() {
    let gw = TestGateway::start().await;
    let log = Arc::new(AuditLog::new());
    let _sink = AuditSink::spawn(&gw.bus, log.clone());

    // One rejected connection (info), one cluster parse failure and one
    // cluster disconnect (error).
    let mut rejected = gw.connect("/socket", None).await;
    rejected.next_envelope().await;
    rejected.expect_closed().await;

    let mut node = gw.node().await;
    node.send_raw("[]").await;
    assert_eq!(node.next_envelope().await["event"], "ERR_MESSAGE_PARSE");
    node.close().await;

    wait_for_entries(&log, 3).await;

    let counts = log.unread_counts();
    assert_eq!(counts.get(&EventChannel::Info), Some(&1));
    assert_eq!(counts.get(&EventChannel::Error), Some(&2));

    let errors = log.unread_errors(1).unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|entry| entry.inprotype && !entry.read));
    let kinds: Vec<EventKind> = errors.iter().map(|entry| entry.kind).collect();
    assert!(kinds.contains(&EventKind::MessageParseFailure));
    assert!(kinds.contains(&EventKind::ClusterDisconnected));

    // Reading an entry removes it from the unread view only.
    log.mark_read(errors[0].id).unwrap();
    assert_eq!(log.unread_errors(1).unwrap().len(), 1);
    assert_eq!(log.all(1).unwrap().len(), 3);

    log.delete(errors[0].id).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(
        log.delete(errors[0].id),
        Err(AuditError::NotFound(errors[0].id))
    );
    assert_eq!(log.all(0), Err(AuditError::InvalidPage(0)));

    gw.stop().await;
}

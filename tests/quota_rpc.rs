mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use common::{MemoryLedger, RecordingTransport};
use serde_json::json;
use subscriptions::rpc::{
    start_quota_worker, InboundRequest, QuotaRpcHandler, RpcErrorCode,
};
use tokio::sync::mpsc::unbounded_channel;
use uuid::Uuid;

fn payload(quota: f64, resource_type_id: Uuid, subscription_id: Uuid) -> Bytes {
    Bytes::from(
        json!({
            "quota": {
                "quota": quota,
                "resourceType": { "uuid": resource_type_id.to_string(), "name": "cpu.hours" },
                "subscriptionId": subscription_id.to_string(),
            }
        })
        .to_string(),
    )
}

// key: quota-rpc-tests -> override existing quota,echo identifiers
#[tokio::test]
async fn updates_existing_quota_and_echoes_request() {
    let cpu_hours = Uuid::new_v4();
    let subscription = Uuid::new_v4();
    let ledger = Arc::new(MemoryLedger::with_quota(cpu_hours, subscription, 1000.0));
    let handler = QuotaRpcHandler::new(ledger.clone());

    let response = handler
        .process(&payload(2000.0, cpu_hours, subscription))
        .await;

    assert!(response.error.is_none());
    let quota = response.quota.expect("quota payload");
    assert_eq!(quota.quota, 2000.0);
    assert_eq!(quota.resource_type.uuid, cpu_hours.to_string());
    assert_eq!(quota.resource_type.name.as_deref(), Some("cpu.hours"));
    assert_eq!(quota.subscription_id, subscription.to_string());
    assert_eq!(*ledger.upserts.lock().unwrap(), vec![(true, 2000.0)]);
}

#[tokio::test]
async fn inserts_when_no_override_exists() {
    let resource_type = Uuid::new_v4();
    let subscription = Uuid::new_v4();
    let ledger = Arc::new(MemoryLedger::default());
    let handler = QuotaRpcHandler::new(ledger.clone());

    let response = handler
        .process(&payload(42.5, resource_type, subscription))
        .await;

    assert_eq!(response.quota.map(|quota| quota.quota), Some(42.5));
    assert_eq!(*ledger.upserts.lock().unwrap(), vec![(false, 42.5)]);
    assert_eq!(ledger.rows.lock().unwrap().len(), 1);
    // read, write, re-read
    assert_eq!(ledger.calls(), 3);
}

#[tokio::test]
async fn invalid_requests_never_reach_the_ledger() {
    let ledger = Arc::new(MemoryLedger::default());
    let handler = QuotaRpcHandler::new(ledger.clone());

    let malformed = handler.process(b"{not json").await;
    let missing = handler.process(br#"{}"#).await;
    let bad_uuid = handler
        .process(
            json!({
                "quota": {
                    "quota": 1.0,
                    "resourceType": { "uuid": "cpu.hours" },
                    "subscriptionId": Uuid::new_v4().to_string(),
                }
            })
            .to_string()
            .as_bytes(),
        )
        .await;

    for response in [malformed, missing, bad_uuid] {
        assert!(response.quota.is_none());
        let error = response.error.expect("error payload");
        assert_eq!(error.error_code, RpcErrorCode::BadRequest);
        assert_eq!(error.status_code, 400);
    }
    assert_eq!(ledger.calls(), 0);
}

#[tokio::test]
async fn storage_failures_become_internal_errors() {
    let ledger = Arc::new(MemoryLedger::failing());
    let handler = QuotaRpcHandler::new(ledger);

    let response = handler
        .process(&payload(10.0, Uuid::new_v4(), Uuid::new_v4()))
        .await;

    assert!(response.quota.is_none());
    let error = response.error.expect("error payload");
    assert_eq!(error.error_code, RpcErrorCode::Internal);
    assert_eq!(error.status_code, 500);
    assert!(error.message.starts_with("database error"));
}

#[tokio::test]
async fn worker_replies_once_per_request_to_its_reply_address() {
    let resource_type = Uuid::new_v4();
    let ledger = Arc::new(MemoryLedger::default());
    let handler = Arc::new(QuotaRpcHandler::new(ledger));
    let (reply_tx, mut reply_rx) = unbounded_channel();
    let transport = Arc::new(RecordingTransport::new(reply_tx));
    let inbound = start_quota_worker(handler, transport.clone(), 8);

    let subscriptions: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    for (index, subscription) in subscriptions.iter().enumerate() {
        inbound
            .send(InboundRequest {
                subject: "qms.user.quota.add".into(),
                reply: format!("_INBOX.{index}"),
                payload: payload(100.0 * (index as f64 + 1.0), resource_type, *subscription),
            })
            .await
            .unwrap();
    }
    inbound
        .send(InboundRequest {
            subject: "qms.user.quota.add".into(),
            reply: "_INBOX.bad".into(),
            payload: Bytes::from_static(b"[]"),
        })
        .await
        .unwrap();

    let mut replies = Vec::new();
    for _ in 0..4 {
        replies.push(reply_rx.recv().await.expect("reply"));
    }
    replies.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(replies[0].0, "_INBOX.0");
    assert_eq!(replies[0].1.quota.as_ref().unwrap().quota, 100.0);
    assert_eq!(
        replies[0].1.quota.as_ref().unwrap().subscription_id,
        subscriptions[0].to_string()
    );
    assert_eq!(replies[2].0, "_INBOX.2");
    assert_eq!(replies[2].1.quota.as_ref().unwrap().quota, 300.0);
    assert_eq!(replies[3].0, "_INBOX.bad");
    assert_eq!(
        replies[3].1.error.as_ref().unwrap().error_code,
        RpcErrorCode::BadRequest
    );
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn failed_reply_is_not_retried() {
    let (reply_tx, _reply_rx) = unbounded_channel();
    let mut transport = RecordingTransport::new(reply_tx);
    transport.fail = true;
    let handler = QuotaRpcHandler::new(Arc::new(MemoryLedger::default()));

    handler
        .handle(
            InboundRequest {
                subject: "qms.user.quota.add".into(),
                reply: "_INBOX.1".into(),
                payload: payload(5.0, Uuid::new_v4(), Uuid::new_v4()),
            },
            &transport,
        )
        .await;

    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
}

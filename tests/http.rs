mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{routing::get, Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use common::MemoryLedger;
use serde_json::json;
use subscriptions::routes::api_routes;
use subscriptions::rpc::{QuotaResponse, QuotaRpcHandler, RpcErrorCode};
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

fn app(ledger: Arc<MemoryLedger>) -> Router {
    let handler = Arc::new(QuotaRpcHandler::new(ledger));
    api_routes().layer(Extension(handler))
}

async fn post_quota(app: Router, body: String) -> (StatusCode, QuotaResponse) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/quotas")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn set_quota_endpoint_returns_stored_value() {
    let resource_type = Uuid::new_v4();
    let subscription = Uuid::new_v4();
    let ledger = Arc::new(MemoryLedger::with_quota(resource_type, subscription, 1000.0));

    let (status, response) = post_quota(
        app(ledger),
        json!({
            "quota": {
                "quota": 2000.0,
                "resourceType": { "uuid": resource_type.to_string() },
                "subscriptionId": subscription.to_string(),
            }
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let quota = response.quota.expect("quota payload");
    assert_eq!(quota.quota, 2000.0);
    assert_eq!(quota.subscription_id, subscription.to_string());
}

#[tokio::test]
async fn set_quota_endpoint_maps_validation_to_bad_request() {
    let ledger = Arc::new(MemoryLedger::default());

    let (status, response) = post_quota(app(ledger.clone()), "{\"quota\": null}".into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error.map(|error| error.error_code),
        Some(RpcErrorCode::BadRequest)
    );
    assert_eq!(ledger.calls(), 0);
}

#[tokio::test]
async fn metrics_returns_ok() {
    let (layer, handle) = PrometheusMetricLayer::pair();
    let app = Router::new()
        .route("/metrics", get(move || async move { handle.render() }))
        .layer(layer);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

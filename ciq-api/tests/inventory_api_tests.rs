//! HTTP surface tests for the inventory API, driven through `oneshot`
//! against a cache backed by the mock snapshot source.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use ciq_api::{create_api_router, AppState, SNAPSHOT_GENERATION_HEADER, SNAPSHOT_STALE_HEADER};
use ciq_test_utils::fixtures::*;
use ciq_test_utils::{CacheConfig, Inventory, InventoryCache, MockSnapshotSource, RetrievalError};
use serde_json::Value;
use tower::ServiceExt;

fn app(inventory: &Inventory) -> (Arc<MockSnapshotSource>, Router) {
    let (source, cache) = mock_cache(inventory, CacheConfig::default());
    let router = create_api_router(AppState::new(Arc::new(cache)));
    (source, router)
}

fn empty_app() -> (Arc<MockSnapshotSource>, Router) {
    let source = Arc::new(MockSnapshotSource::new());
    let cache = InventoryCache::with_defaults(source.clone());
    (source, create_api_router(AppState::new(Arc::new(cache))))
}

async fn get(router: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn header_str<'a>(response: &'a Response, name: &header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

// ============================================================================
// LISTS
// ============================================================================

#[tokio::test]
async fn test_list_endpoints_report_counts() {
    let (_source, router) = app(&single_account_inventory());

    let body = json_body(get(&router, "/accounts").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["accounts"][0]["name"], "acct1");

    let body = json_body(get(&router, "/clusters").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["clusters"][0]["name"], "clusterA");

    let body = json_body(get(&router, "/instances").await).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["instances"][0]["id"], "i-1");
    assert_eq!(body["instances"][1]["id"], "i-2");
}

#[tokio::test]
async fn test_empty_store_lists_are_empty_arrays() {
    let (_source, router) = empty_app();

    let response = get(&router, "/instances").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, &SNAPSHOT_STALE_HEADER), Some("true"));
    assert_eq!(header_str(&response, &SNAPSHOT_GENERATION_HEADER), Some("0"));

    let body = json_body(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["instances"], Value::Array(Vec::new()));
}

// ============================================================================
// LOOKUPS
// ============================================================================

#[tokio::test]
async fn test_account_by_name() {
    let (_source, router) = app(&single_account_inventory());

    let response = get(&router, "/accounts/acct1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "acct1");
    assert_eq!(body["provider"], "AWS");
    assert!(body["clusters"]["clusterA"].is_object());
}

#[tokio::test]
async fn test_unknown_account_is_404() {
    let (_source, router) = app(&single_account_inventory());

    let response = get(&router, "/accounts/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], "ACCOUNT_NOT_FOUND");
    assert_eq!(body["message"], "Account 'nope' not found");
}

#[tokio::test]
async fn test_clusters_by_name_spans_accounts() {
    let (_source, router) = app(&shared_cluster_name_inventory());

    let body = json_body(get(&router, "/clusters/shared").await).await;
    assert_eq!(body["count"], 2);

    let response = get(&router, "/clusters/missing").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["clusters"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_source, router) = app(&single_account_inventory());

    let response = get(&router, "/nowhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "ROUTE_NOT_FOUND");
}

// ============================================================================
// FRESHNESS
// ============================================================================

#[tokio::test]
async fn test_snapshot_headers_track_refreshes() {
    let (source, router) = app(&single_account_inventory());

    let response = get(&router, "/accounts").await;
    assert_eq!(header_str(&response, &SNAPSHOT_GENERATION_HEADER), Some("1"));
    assert_eq!(header_str(&response, &SNAPSHOT_STALE_HEADER), Some("false"));

    source.set_error(RetrievalError::Connect {
        address: "127.0.0.1:6379".to_string(),
        reason: "Connection refused".to_string(),
    });

    let response = get(&router, "/accounts").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, &SNAPSHOT_GENERATION_HEADER), Some("1"));
    assert_eq!(header_str(&response, &SNAPSHOT_STALE_HEADER), Some("true"));
    assert_eq!(json_body(response).await["count"], 1);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let (_source, router) = app(&single_account_inventory());

    let request = Request::builder()
        .uri("/clusters")
        .header(header::ORIGIN, "https://console.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(
        header_str(&response, &header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("*")
    );
}

// ============================================================================
// HEALTH + METRICS
// ============================================================================

#[tokio::test]
async fn test_ping() {
    let (_source, router) = empty_app();

    let response = get(&router, "/health/ping").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"pong");
}

#[tokio::test]
async fn test_readiness_waits_for_first_load() {
    let (source, router) = empty_app();

    let response = get(&router, "/health/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["details"]["snapshot"]["generation"], 0);

    source.set_inventory(&single_account_inventory());
    // Readiness never refreshes; a query does.
    assert_eq!(get(&router, "/instances").await.status(), StatusCode::OK);

    let response = get(&router, "/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["snapshot"]["generation"], 1);
    assert_eq!(body["details"]["snapshot"]["refresh_policy"], "coalesced");
}

#[tokio::test]
async fn test_health_does_not_fetch() {
    let (source, router) = app(&single_account_inventory());

    get(&router, "/health/live").await;
    get(&router, "/health/ready").await;
    get(&router, "/metrics").await;
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_metrics_exposes_refresh_series() {
    let (_source, router) = app(&single_account_inventory());
    get(&router, "/accounts").await;

    let response = get(&router, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("ciq_http_requests_total"));
    assert!(text.contains("ciq_snapshot_generation"));
}

#[tokio::test]
async fn test_metrics_label_requests_by_route_template() {
    let (_source, router) = app(&shared_cluster_name_inventory());
    get(&router, "/clusters/shared").await;
    get(&router, "/clusters/solo").await;

    let response = get(&router, "/metrics").await;
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(r#"route="/clusters/:name""#), "{}", text);
    assert!(!text.contains(r#"route="/clusters/shared""#));
    assert!(!text.contains(r#"route="/clusters/solo""#));
}

// ============================================================================
// PROPERTIES
// ============================================================================

mod properties {
    use super::*;
    use ciq_test_utils::generators::arb_inventory;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_list_counts_match_snapshot(inventory in arb_inventory()) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (_source, router) = app(&inventory);

                let accounts = json_body(get(&router, "/accounts").await).await;
                prop_assert_eq!(accounts["count"].as_u64(), Some(inventory.account_count() as u64));

                let clusters = json_body(get(&router, "/clusters").await).await;
                prop_assert_eq!(clusters["count"].as_u64(), Some(inventory.cluster_count() as u64));

                let instances = json_body(get(&router, "/instances").await).await;
                prop_assert_eq!(instances["count"].as_u64(), Some(inventory.instance_count() as u64));
                prop_assert_eq!(
                    instances["instances"].as_array().map(Vec::len),
                    Some(inventory.instance_count())
                );

                Ok(())
            })?;
        }
    }
}

//! Integration tests for the tier API server.

use std::sync::{Arc, OnceLock};

use api::auth::{JwtVerifier, Role, sign_token};
use api::routes::orders::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::Tier;
use domain::{Money, Product, ProductId};
use fulfillment::{
    API_KEY_HEADER, InMemoryAcceptanceNotifier, InMemoryPeerGateway, TierOrderService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{MemoryTierStore, TierStore};
use tower::ServiceExt;

const JWT_SECRET: &str = "integration-test-secret";
const INBOUND_KEY: &str = "integration-test-key";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestHarness {
    app: axum::Router,
    store: MemoryTierStore,
    gateway: InMemoryPeerGateway,
    notifier: InMemoryAcceptanceNotifier,
}

/// Distributor-tier app backed by memory storage and in-memory peers.
async fn setup() -> TestHarness {
    let store = MemoryTierStore::new();
    store
        .upsert_product(&Product::new(
            "SKU-001",
            "Widget",
            Money::from_cents(1000),
            25,
        ))
        .await
        .unwrap();
    store
        .upsert_product(
            &Product::new("SKU-002", "Gadget", Money::from_cents(2000), 3)
                .with_reorder_policy(2, 5, 50),
        )
        .await
        .unwrap();

    let gateway = InMemoryPeerGateway::new(Tier::Manufacturer);
    let notifier = InMemoryAcceptanceNotifier::new();
    let service = TierOrderService::new(Tier::Distributor, store.clone())
        .with_gateway(Arc::new(gateway.clone()))
        .with_notifier(Arc::new(notifier.clone()));

    let state = Arc::new(AppState {
        service,
        tier: Tier::Distributor,
        verifier: JwtVerifier::new(JWT_SECRET),
        inbound_api_key: INBOUND_KEY.to_string(),
    });

    TestHarness {
        app: api::create_app(state, get_metrics_handle()),
        store,
        gateway,
        notifier,
    }
}

fn token(role: Role) -> String {
    sign_token(JWT_SECRET, "tester", role, 60)
}

fn request(
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn peer_order_body() -> serde_json::Value {
    serde_json::json!({
        "counterparty_order_number": "SEL-20260806-AAAA1111",
        "items": [
            { "product_id": "SKU-001", "quantity": 5 },
            { "product_id": "SKU-002", "quantity": 3 }
        ],
        "shipping_address": "1 Main St"
    })
}

#[tokio::test]
async fn test_health_reports_tier() {
    let harness = setup().await;

    let response = harness
        .app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["tier"], "Distributor");
}

#[tokio::test]
async fn test_orders_require_bearer_token() {
    let harness = setup().await;

    let response = harness
        .app
        .oneshot(request("GET", "/orders", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_from_peer_prices_from_own_list() {
    let harness = setup().await;

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/orders/from-peer",
            Some(&token(Role::Seller)),
            Some(peer_order_body()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Pending");
    // 5 * $10 + 3 * $20, from the distributor's own price list.
    assert_eq!(json["total_cents"], 11_000);
    assert!(
        json["order_number"]
            .as_str()
            .unwrap()
            .starts_with("DIS-")
    );
}

#[tokio::test]
async fn test_create_from_peer_unknown_product_is_404() {
    let harness = setup().await;

    let body = serde_json::json!({
        "counterparty_order_number": "SEL-20260806-AAAA1111",
        "items": [{ "product_id": "SKU-404", "quantity": 1 }],
        "shipping_address": null
    });
    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/orders/from-peer",
            Some(&token(Role::Seller)),
            Some(body),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_accept_flow_decrements_stock_and_notifies() {
    let harness = setup().await;

    let created = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/orders/from-peer",
            Some(&token(Role::Seller)),
            Some(peer_order_body()),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = json_body(created).await;
    let order_number = created["order_number"].as_str().unwrap();

    // Look the order up to learn its ID.
    let listed = harness
        .app
        .clone()
        .oneshot(request(
            "GET",
            "/orders",
            Some(&token(Role::Distributor)),
            None,
        ))
        .await
        .unwrap();
    let listed = json_body(listed).await;
    let order_id = listed[0]["id"].as_str().unwrap().to_string();
    assert_eq!(listed[0]["order_number"], order_number);

    let response = harness
        .app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            Some(&token(Role::Distributor)),
            Some(serde_json::json!({ "status": "Accepted" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Accepted");

    let product = harness
        .store
        .product(&ProductId::new("SKU-001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.current_stock, 20);

    // The seller (order origin) was notified with its own order number.
    assert_eq!(harness.notifier.notified_count(), 1);
    assert_eq!(
        harness.notifier.last_notified().unwrap().as_str(),
        "SEL-20260806-AAAA1111"
    );

    // Second accept must fail without double-decrementing.
    let response = harness
        .app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            Some(&token(Role::Distributor)),
            Some(serde_json::json!({ "status": "Accepted" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let product = harness
        .store
        .product(&ProductId::new("SKU-001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.current_stock, 20);
}

#[tokio::test]
async fn test_status_update_requires_operator_role() {
    let harness = setup().await;

    let created = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/orders/from-peer",
            Some(&token(Role::Seller)),
            Some(peer_order_body()),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let listed = harness
        .app
        .clone()
        .oneshot(request(
            "GET",
            "/orders",
            Some(&token(Role::Administrator)),
            None,
        ))
        .await
        .unwrap();
    let listed = json_body(listed).await;
    let order_id = listed[0]["id"].as_str().unwrap().to_string();

    // A seller token cannot operate distributor orders.
    let response = harness
        .app
        .oneshot(request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            Some(&token(Role::Seller)),
            Some(serde_json::json!({ "status": "Accepted" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancel_keeps_stock() {
    let harness = setup().await;

    let created = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/orders/from-peer",
            Some(&token(Role::Seller)),
            Some(peer_order_body()),
        ))
        .await
        .unwrap();
    let created = json_body(created).await;

    let listed = harness
        .app
        .clone()
        .oneshot(request(
            "GET",
            "/orders",
            Some(&token(Role::Distributor)),
            None,
        ))
        .await
        .unwrap();
    let listed = json_body(listed).await;
    let order_id = listed[0]["id"].as_str().unwrap().to_string();

    let response = harness
        .app
        .oneshot(request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            Some(&token(Role::Distributor)),
            Some(serde_json::json!({ "status": "Cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Cancelled");
    assert_eq!(json["total_cents"], created["total_cents"]);

    let product = harness
        .store
        .product(&ProductId::new("SKU-001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.current_stock, 25);
}

#[tokio::test]
async fn test_create_order_forwards_upstream() {
    let harness = setup().await;

    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/orders",
            Some(&token(Role::Distributor)),
            Some(serde_json::json!({
                "items": [{ "product_id": "SKU-001", "quantity": 10 }],
                "shipping_address": "Depot 7"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["origin"], "Local");
    // The manufacturer's assigned number came back on the ack.
    assert!(
        json["counterparty_order_number"]
            .as_str()
            .unwrap()
            .starts_with("MAN-")
    );
    assert_eq!(harness.gateway.forward_count(), 1);
}

#[tokio::test]
async fn test_create_order_upstream_rejection_is_502_and_rolled_back() {
    let harness = setup().await;
    harness.gateway.set_reject_on_forward(true);

    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some(&token(Role::Distributor)),
            Some(serde_json::json!({
                "items": [{ "product_id": "SKU-001", "quantity": 10 }],
                "shipping_address": null
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let listed = harness
        .app
        .oneshot(request(
            "GET",
            "/orders",
            Some(&token(Role::Distributor)),
            None,
        ))
        .await
        .unwrap();
    let listed = json_body(listed).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_accepted_notification_requires_api_key() {
    let harness = setup().await;

    // Missing key.
    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/orders/DIS-20260806-XXXX0000/accepted-notification",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong key.
    let mut bad = request(
        "POST",
        "/orders/DIS-20260806-XXXX0000/accepted-notification",
        None,
        None,
    );
    bad.headers_mut()
        .insert(API_KEY_HEADER, "wrong".parse().unwrap());
    let response = harness.app.clone().oneshot(bad).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Right key, unknown order number.
    let mut unknown = request(
        "POST",
        "/orders/DIS-20260806-XXXX0000/accepted-notification",
        None,
        None,
    );
    unknown
        .headers_mut()
        .insert(API_KEY_HEADER, INBOUND_KEY.parse().unwrap());
    let response = harness.app.oneshot(unknown).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_accepted_notification_reconciles_replenishment() {
    let harness = setup().await;

    // Replenishment order, forwarded to the (mock) manufacturer.
    let created = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some(&token(Role::Distributor)),
            Some(serde_json::json!({
                "items": [{ "product_id": "SKU-001", "quantity": 40 }],
                "shipping_address": null
            })),
        ))
        .await
        .unwrap();
    let created = json_body(created).await;
    let order_number = created["order_number"].as_str().unwrap().to_string();

    // The manufacturer calls back quoting our order number.
    let mut callback = request(
        "POST",
        &format!("/orders/{order_number}/accepted-notification"),
        None,
        None,
    );
    callback
        .headers_mut()
        .insert(API_KEY_HEADER, INBOUND_KEY.parse().unwrap());
    let response = harness.app.oneshot(callback).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Accepted");

    // Goods booked in.
    let product = harness
        .store
        .product(&ProductId::new("SKU-001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.current_stock, 65);
}

#[tokio::test]
async fn test_check_stock() {
    let harness = setup().await;

    let response = harness
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/products/check-stock",
            Some(&token(Role::Seller)),
            Some(serde_json::json!({
                "product_id": "SKU-001",
                "quantity_requested": 5
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["is_available"], true);
    assert_eq!(json["available_stock"], 25);
    assert!(json.get("suggested_reorder_quantity").is_none());

    // SKU-002 sits below its reorder point.
    let response = harness
        .app
        .oneshot(request(
            "POST",
            "/products/check-stock",
            Some(&token(Role::Seller)),
            Some(serde_json::json!({
                "product_id": "SKU-002",
                "quantity_requested": 10
            })),
        ))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["is_available"], false);
    assert_eq!(json["available_stock"], 3);
    assert_eq!(json["suggested_reorder_quantity"], 50);
}

#[tokio::test]
async fn test_invalid_order_id_is_400() {
    let harness = setup().await;

    let response = harness
        .app
        .oneshot(request(
            "GET",
            "/orders/not-a-uuid",
            Some(&token(Role::Distributor)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let harness = setup().await;

    let response = harness
        .app
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

//! HTTP API server for one tier of the order system.
//!
//! The same binary serves any of the three tiers; configuration selects the
//! tier, its datastore, and its peer wiring. User-facing routes authenticate
//! with a bearer JWT, peer callbacks with the static `X-API-Key` header.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use fulfillment::{
    DisabledNotifier, HttpAcceptanceNotifier, HttpPeerGateway, ServiceAuth, TierOrderService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::TierStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::JwtVerifier;
use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: TierStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/from-peer", post(routes::orders::create_from_peer::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route(
            "/orders/{order_number}/accepted-notification",
            post(routes::orders::accepted_notification::<S>),
        )
        .route("/products/check-stock", post(routes::products::check_stock::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the application state for the configured tier, wiring the
/// cross-tier gateway and acceptance notifier from the peer URLs.
pub fn build_state<S: TierStore>(store: S, config: &Config) -> Arc<AppState<S>> {
    let mut service = TierOrderService::new(config.tier, store);

    if let Some(upstream) = &config.upstream_url {
        let auth = match (&config.peer_bearer_token, &config.peer_api_key) {
            (Some(token), _) => ServiceAuth::Bearer(token.clone()),
            (None, Some(key)) => ServiceAuth::ApiKey(key.clone()),
            (None, None) => ServiceAuth::ApiKey(config.notify_api_key.clone()),
        };
        service = service.with_gateway(Arc::new(HttpPeerGateway::new(upstream.clone(), auth)));
    }

    match &config.notify_url {
        Some(notify) => {
            service = service.with_notifier(Arc::new(HttpAcceptanceNotifier::new(
                notify.clone(),
                config.notify_api_key.clone(),
            )));
        }
        None => {
            service = service.with_notifier(Arc::new(DisabledNotifier));
        }
    }

    Arc::new(AppState {
        service,
        tier: config.tier,
        verifier: JwtVerifier::new(&config.jwt_secret),
        inbound_api_key: config.inbound_api_key.clone(),
    })
}

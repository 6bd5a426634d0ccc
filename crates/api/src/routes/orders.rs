//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::{OrderId, OrderNumber, Tier};
use domain::{Order, ProductId};
use fulfillment::{
    API_KEY_HEADER, ForwardOrderRequest, NewOrder, NewOrderLine, PeerOrderAck, TierOrderService,
};
use serde::{Deserialize, Serialize};
use store::TierStore;

use crate::auth::{AuthUser, JwtVerifier};
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: TierStore> {
    pub service: TierOrderService<S>,
    pub tier: Tier,
    pub verifier: JwtVerifier,
    pub inbound_api_key: String,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// Fixed tagged status-update payload; only the two legal targets exist.
#[derive(Debug, Deserialize)]
pub enum StatusAction {
    Accepted,
    Cancelled,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: StatusAction,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub tier: String,
    pub origin: String,
    pub counterparty_order_number: Option<String>,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub shipping_address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        OrderResponse {
            id: order.id().to_string(),
            order_number: order.order_number().to_string(),
            tier: order.tier().to_string(),
            origin: order.origin().to_string(),
            counterparty_order_number: order
                .counterparty_order_number()
                .map(|n| n.to_string()),
            status: order.status().to_string(),
            items: order
                .line_items()
                .iter()
                .map(|line| OrderItemResponse {
                    product_id: line.product_id.to_string(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    line_total_cents: line.line_total().cents(),
                })
                .collect(),
            total_cents: order.total_amount().cents(),
            shipping_address: order.shipping_address().map(String::from),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — originate an order on this tier.
///
/// When an upstream gateway is wired, the counterpart order is created
/// upstream synchronously before anything is persisted here.
#[tracing::instrument(skip(state, user, req))]
pub async fn create<S: TierStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    user.require_operator(state.tier)?;

    let order = state
        .service
        .create_forwarded(NewOrder {
            items: to_lines(&req.items),
            shipping_address: req.shipping_address,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// POST /orders/from-peer — create the counterpart of a downstream tier's
/// order. The response shape is the wire contract the peer gateway parses.
#[tracing::instrument(skip(state, _user, req))]
pub async fn create_from_peer<S: TierStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
    Json(req): Json<ForwardOrderRequest>,
) -> Result<(StatusCode, Json<PeerOrderAck>), ApiError> {
    let items = req
        .items
        .iter()
        .map(|line| NewOrderLine::new(line.product_id.clone(), line.quantity))
        .collect();
    let order = state
        .service
        .create_from_peer(items, req.counterparty_order_number, req.shipping_address)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PeerOrderAck {
            order_number: order.order_number().clone(),
            status: order.status().to_string(),
            total_cents: order.total_amount().cents(),
        }),
    ))
}

/// GET /orders — list this tier's orders, oldest first.
#[tracing::instrument(skip(state, _user))]
pub async fn list<S: TierStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.service.list_orders().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id} — load one order.
#[tracing::instrument(skip(state, _user))]
pub async fn get<S: TierStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .service
        .order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/{id}/status — operator decision: accept or cancel.
#[tracing::instrument(skip(state, user, req))]
pub async fn update_status<S: TierStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    user.require_operator(state.tier)?;

    let order_id = parse_order_id(&id)?;
    let order = match req.status {
        StatusAction::Accepted => state.service.accept(order_id).await?,
        StatusAction::Cancelled => state.service.cancel(order_id).await?,
    };
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{order_number}/accepted-notification — the downstream tier
/// reports that the counterpart order was accepted. Authenticated by the
/// static shared-secret header, not a user token.
#[tracing::instrument(skip(state, headers))]
pub async fn accepted_notification<S: TierStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_number): Path<String>,
    headers: HeaderMap,
) -> Result<Json<OrderResponse>, ApiError> {
    require_api_key(&state, &headers)?;

    let order = state
        .service
        .reconcile_acceptance(&OrderNumber::from_string(order_number))
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn require_api_key<S: TierStore>(state: &AppState<S>, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing API key".to_string()))?;
    if presented != state.inbound_api_key {
        return Err(ApiError::Unauthorized("Invalid API key".to_string()));
    }
    Ok(())
}

fn to_lines(items: &[OrderItemRequest]) -> Vec<NewOrderLine> {
    items
        .iter()
        .map(|item| NewOrderLine::new(ProductId::new(item.product_id.as_str()), item.quantity))
        .collect()
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

//! Stock availability endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::ProductId;
use serde::{Deserialize, Serialize};
use store::TierStore;

use super::orders::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CheckStockRequest {
    pub product_id: String,
    pub quantity_requested: i64,
}

#[derive(Serialize)]
pub struct CheckStockResponse {
    pub is_available: bool,
    pub available_stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_reorder_quantity: Option<i64>,
}

/// POST /products/check-stock — pure availability read; no side effect.
#[tracing::instrument(skip(state, _user, req))]
pub async fn check_stock<S: TierStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
    Json(req): Json<CheckStockRequest>,
) -> Result<Json<CheckStockResponse>, ApiError> {
    let check = state
        .service
        .check_stock(&ProductId::new(req.product_id), req.quantity_requested)
        .await?;

    Ok(Json(CheckStockResponse {
        is_available: check.is_available,
        available_stock: check.available_stock,
        suggested_reorder_quantity: check.suggested_reorder_quantity,
    }))
}

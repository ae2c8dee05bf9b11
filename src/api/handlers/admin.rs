//! Admin command handlers (C11): provision traders, place administrative
//! orders, seed a treasury ladder. Grounded on
//! `examples/original_source/backend/api/admin.py`'s three command shapes
//! and the teacher's handler/response idiom. Admin *authentication* is an
//! external collaborator per SPEC_FULL §1 — this surface trusts its
//! caller (an internal operator tool), the same way the admin scripts in
//! the original source run with direct database access.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OrderType, Side};
use crate::services::admin::AdminError;
use crate::utils::response::{ApiResponse, AppError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTraderRequest {
    pub initial_cash_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateTraderResponse {
    pub trader_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AdminPlaceOrderRequest {
    pub trader_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: i64,
    pub limit_price: Option<i64>,
    pub tif_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminPlaceOrderResponse {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SeedTreasuryRequest {
    pub symbol: String,
    pub par_price: i64,
    pub total_shares: i64,
    pub ladder_levels: i64,
    pub ladder_step: i64,
}

#[derive(Debug, Serialize)]
pub struct SeedTreasuryResponse {
    pub treasury_id: Uuid,
}

pub async fn create_trader(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTraderRequest>,
) -> Result<Json<ApiResponse<CreateTraderResponse>>, AppError> {
    let trader_id = state
        .admin
        .create_trader(request.initial_cash_cents)
        .await
        .map_err(admin_error_response)?;
    Ok(Json(ApiResponse::success(CreateTraderResponse { trader_id })))
}

/// Places an administrative order. Per SPEC_FULL §6, admin buys carry
/// unlimited cash (the treasury's funding is effectively inexhaustible);
/// admin sells still require the treasury to hold the shares, same as any
/// other trader.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminPlaceOrderRequest>,
) -> Result<Json<ApiResponse<AdminPlaceOrderResponse>>, AppError> {
    let order_id = state
        .admin
        .place_order(
            request.trader_id,
            &request.symbol,
            request.side,
            request.order_type,
            request.quantity,
            request.limit_price,
            request.tif_seconds,
        )
        .await
        .map_err(admin_error_response)?;
    Ok(Json(ApiResponse::success(AdminPlaceOrderResponse { order_id })))
}

pub async fn seed_treasury(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SeedTreasuryRequest>,
) -> Result<Json<ApiResponse<SeedTreasuryResponse>>, AppError> {
    let treasury_id = state
        .admin
        .seed_treasury(
            &request.symbol,
            request.par_price,
            request.total_shares,
            request.ladder_levels,
            request.ladder_step,
        )
        .await
        .map_err(admin_error_response)?;
    Ok(Json(ApiResponse::success(SeedTreasuryResponse { treasury_id })))
}

fn admin_error_response(error: AdminError) -> AppError {
    match error {
        AdminError::InvalidLadder => AppError::bad_request("ladder_levels and ladder_step must both be positive"),
        AdminError::Repository(e) => AppError::internal(&e.to_string()),
        AdminError::Exchange(e) => AppError::bad_request(&e.to_string()),
    }
}

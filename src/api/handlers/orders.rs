//! Order submission/cancellation/lookup handlers — the thin HTTP shim
//! over the external interfaces in SPEC_FULL §6 (`submit_order`,
//! `cancel_order`, `get_order`). Grounded on the teacher's
//! `api/handlers/order.rs` for the axum handler shape (`State<Arc<AppState>>`,
//! `Json`/`Path` extractors, `AppError` responses), with the EIP-712
//! signature verification and on-chain order fields stripped: this system
//! has no wallet-signed orders, trader identity is the caller-supplied
//! `trader_id`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OrderType, OrderView, Side};
use crate::services::exchange::ExchangeError;
use crate::utils::response::{ApiResponse, AppError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitOrderRequest {
    pub trader_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: i64,
    pub limit_price: Option<i64>,
    pub tif_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct SubmitOrderResponse {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub trader_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub cancelled: bool,
}

pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<Json<ApiResponse<SubmitOrderResponse>>, AppError> {
    let order_id = state
        .exchange
        .submit_order(
            request.trader_id,
            &request.symbol,
            request.side,
            request.order_type,
            request.quantity,
            request.limit_price,
            request.tif_seconds,
        )
        .await
        .map_err(exchange_error_response)?;

    Ok(Json(ApiResponse::success(SubmitOrderResponse { order_id })))
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<ApiResponse<CancelOrderResponse>>, AppError> {
    let cancelled = state
        .exchange
        .cancel_order(request.trader_id, order_id)
        .await
        .map_err(exchange_error_response)?;

    Ok(Json(ApiResponse::success(CancelOrderResponse { cancelled })))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderView>>, AppError> {
    let order = state.exchange.get_order(order_id).await.map_err(exchange_error_response)?;
    Ok(Json(ApiResponse::success(order)))
}

fn exchange_error_response(error: ExchangeError) -> AppError {
    match error {
        ExchangeError::UnknownSymbol(symbol) => {
            AppError::bad_request(&format!("unknown symbol: {symbol}"))
        }
        ExchangeError::InvalidQuantity => AppError::bad_request("order quantity must be positive"),
        ExchangeError::MissingLimitPrice => AppError::bad_request("LIMIT orders require a limit price"),
        ExchangeError::InvalidTrader(id) => AppError::bad_request(&format!("invalid or inactive trader: {id}")),
        ExchangeError::InsufficientFunds { have, need } => {
            AppError::new(
                axum::http::StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_FUNDS",
                &format!("insufficient cash: have {have}, need {need}"),
            )
        }
        ExchangeError::InsufficientShares { symbol, have, need } => AppError::new(
            axum::http::StatusCode::UNPROCESSABLE_ENTITY,
            "INSUFFICIENT_SHARES",
            &format!("insufficient shares of {symbol}: have {have}, need {need}"),
        ),
        ExchangeError::OrderNotFound(id) => AppError::not_found(&format!("order {id} not found")),
        ExchangeError::NotOwner { order_id, trader_id } => AppError::new(
            axum::http::StatusCode::FORBIDDEN,
            "NOT_OWNER",
            &format!("order {order_id} is not owned by trader {trader_id}"),
        ),
        ExchangeError::Repository(e) => AppError::internal(&e.to_string()),
        ExchangeError::Router(e) => AppError::internal(&e.to_string()),
    }
}

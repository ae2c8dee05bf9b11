//! Portfolio and per-trader history handlers (C9). Grounded on the
//! teacher's `api/handlers/account.rs` for the handler/response shape,
//! trimmed to the reads SPEC_FULL §6 actually names: portfolio (cash +
//! non-zero positions), a trader's live orders, and a trader's trade
//! history.

use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Order, Trade};
use crate::repositories::{OrderRepository, RepositoryError, TradeRepository};
use crate::services::read::{Portfolio, ReadError};
use crate::utils::response::{ApiResponse, AppError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TradeHistoryQuery {
    pub limit: Option<i64>,
}

pub async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    Path(trader_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Portfolio>>, AppError> {
    let portfolio = state.read.get_portfolio(trader_id).await.map_err(read_error_response)?;
    Ok(Json(ApiResponse::success(portfolio)))
}

pub async fn get_trader_orders(
    State(state): State<Arc<AppState>>,
    Path(trader_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    let orders = OrderRepository::get_trader_unfilled(&state.db.pool, trader_id)
        .await
        .map_err(repository_error_response)?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_trader_trades(
    State(state): State<Arc<AppState>>,
    Path(trader_id): Path<Uuid>,
    Query(query): Query<TradeHistoryQuery>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, AppError> {
    let trades = TradeRepository::by_trader(&state.db.pool, trader_id, query.limit.unwrap_or(100))
        .await
        .map_err(repository_error_response)?;
    Ok(Json(ApiResponse::success(trades)))
}

fn read_error_response(error: ReadError) -> AppError {
    match error {
        ReadError::OrderNotFound(id) => AppError::not_found(&format!("order {id} not found")),
        ReadError::Repository(e) => repository_error_response(e),
        ReadError::Router(e) => AppError::internal(&e.to_string()),
    }
}

fn repository_error_response(error: RepositoryError) -> AppError {
    AppError::internal(&error.to_string())
}

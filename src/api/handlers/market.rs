//! Public market-data handlers (C9): depth snapshot, current price, recent
//! trades, OHLC. Grounded on the teacher's `api/handlers/market.rs` for the
//! handler shape; the actual data comes from `ReadService`, which reads
//! only committed state (SPEC_FULL §4.9).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::models::{OhlcCandle, Trade};
use crate::services::book::DepthSnapshot;
use crate::services::read::{CurrentPrice, ReadError};
use crate::utils::response::{ApiResponse, AppError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentTradesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OhlcQuery {
    pub range: Option<String>,
}

pub async fn list_symbols(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.router.list_symbols()))
}

pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<DepthSnapshot>>, AppError> {
    let book = state.read.get_book(&symbol).await.map_err(read_error_response)?;
    Ok(Json(ApiResponse::success(book)))
}

pub async fn get_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<CurrentPrice>>, AppError> {
    let price = state.read.get_price(&symbol).await.map_err(read_error_response)?;
    Ok(Json(ApiResponse::success(price)))
}

pub async fn get_recent_trades(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<RecentTradesQuery>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let trades = state
        .read
        .get_recent_trades(&symbol, limit)
        .await
        .map_err(read_error_response)?;
    Ok(Json(ApiResponse::success(trades)))
}

pub async fn get_ohlc(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<OhlcQuery>,
) -> Result<Json<ApiResponse<Vec<OhlcCandle>>>, AppError> {
    let range = query.range.as_deref().unwrap_or("1d");
    let candles = state.read.get_ohlc(&symbol, range).await.map_err(read_error_response)?;
    Ok(Json(ApiResponse::success(candles)))
}

fn read_error_response(error: ReadError) -> AppError {
    match error {
        ReadError::OrderNotFound(id) => AppError::not_found(&format!("order {id} not found")),
        ReadError::Repository(e) => AppError::internal(&e.to_string()),
        ReadError::Router(e) => AppError::bad_request(&e.to_string()),
    }
}

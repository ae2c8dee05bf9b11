//! Admin HTTP surface (C11, the thin surface mentioned in SPEC_FULL §1).
//! Grounded on the teacher's `api/routes/mod.rs` nesting shape, trimmed to
//! the commands and reads SPEC_FULL §6 actually names: order
//! submit/cancel/lookup, portfolio/book/price/trades/OHLC reads, and the
//! three admin commands (create trader, place order, seed treasury).
//! There is no public trading surface beyond this — external agents are
//! assumed to call these same routes directly; authentication in front of
//! them is an external collaborator (SPEC_FULL §1).

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::api::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let order_routes = Router::new()
        .route("/orders", post(handlers::orders::submit_order))
        .route("/orders/:order_id", get(handlers::orders::get_order))
        .route("/orders/:order_id/cancel", post(handlers::orders::cancel_order));

    let account_routes = Router::new()
        .route("/traders/:trader_id/portfolio", get(handlers::account::get_portfolio))
        .route("/traders/:trader_id/orders", get(handlers::account::get_trader_orders))
        .route("/traders/:trader_id/trades", get(handlers::account::get_trader_trades));

    let market_routes = Router::new()
        .route("/symbols", get(handlers::market::list_symbols))
        .route("/markets/:symbol/book", get(handlers::market::get_book))
        .route("/markets/:symbol/price", get(handlers::market::get_price))
        .route("/markets/:symbol/trades", get(handlers::market::get_recent_trades))
        .route("/markets/:symbol/ohlc", get(handlers::market::get_ohlc));

    let admin_routes = Router::new()
        .route("/admin/traders", post(handlers::admin::create_trader))
        .route("/admin/orders", post(handlers::admin::place_order))
        .route("/admin/treasury/seed", post(handlers::admin::seed_treasury));

    Router::new()
        .merge(order_routes)
        .merge(account_routes)
        .merge(market_routes)
        .merge(admin_routes)
        .with_state(state)
}

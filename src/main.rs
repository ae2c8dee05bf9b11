//! Process bootstrap (C10, ambient). Grounded on the teacher's `main.rs`
//! sequence — tracing init, `.env`/`AppConfig` load, pool and cache
//! construction, ordered startup, ordered shutdown — trimmed to the
//! services this system actually runs: the Router (which rebuilds every
//! symbol's book and starts its processors), the Expiration Daemon, one or
//! more Outbox Publisher workers, and the thin admin/read HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router as AxumRouter;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clob_exchange::cache::{Publisher, RedisClient};
use clob_exchange::config::AppConfig;
use clob_exchange::db::Database;
use clob_exchange::services::{AdminService, ExchangeService, ExpirationDaemon, OutboxPublisher, ReadService, Router};
use clob_exchange::{api, metrics, AppState};

const OUTBOX_PUBLISHER_WORKERS: usize = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clob_exchange=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting clob-exchange");

    let prometheus_handle = metrics::init_metrics();

    let db = Database::connect(&config.database_url).await?;
    tracing::info!("database connected");

    let redis_client = Arc::new(RedisClient::from_url(&config.redis_url).await?);
    let publisher = Arc::new(Publisher::new(redis_client.clone()));
    tracing::info!(available = redis_client.is_available().await, "redis connected");

    // Router::start rebuilds every symbol's in-memory book from durable
    // PENDING/PARTIAL orders and launches one processor task per symbol
    // before this call returns, so no order can be accepted until every
    // book is in its exact pre-restart price-time-priority state.
    let router = Arc::new(Router::start(db.pool.clone(), &config.symbols).await?);
    tracing::info!(symbols = ?config.symbols, "router started, books rebuilt");

    let exchange = ExchangeService::new(db.pool.clone(), router.clone());
    let admin = AdminService::new(db.pool.clone(), router.clone());
    let read = ReadService::new(db.pool.clone(), router.clone());

    let daemon = ExpirationDaemon::new(db.pool.clone(), router.clone(), config.expiration_check_interval());
    let daemon_handle = tokio::spawn(daemon.run());
    tracing::info!(interval_ms = config.expiration_check_interval_ms, "expiration daemon started");

    // Multiple workers may claim from the outbox concurrently: skip-locked
    // claims guarantee no two workers publish the same row.
    let mut outbox_handles = Vec::with_capacity(OUTBOX_PUBLISHER_WORKERS);
    for worker in 0..OUTBOX_PUBLISHER_WORKERS {
        let outbox = OutboxPublisher::new(
            db.pool.clone(),
            publisher.clone(),
            config.outbox_batch_size,
            config.outbox_max_backoff(),
        );
        outbox_handles.push(tokio::spawn(outbox.run()));
        tracing::info!(worker, "outbox publisher worker started");
    }

    let state = Arc::new(AppState { config: config.clone(), db, router: router.clone(), exchange, admin, read });

    let app = AxumRouter::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes::create_router(state.clone()))
        .layer(axum::middleware::from_fn(api::middleware::metrics_middleware))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let metrics_app = AxumRouter::new().route(
        "/metrics",
        get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
            tracing::error!(error = %e, "metrics server exited");
        }
    });
    tracing::info!(addr = %metrics_addr, "metrics server listening");

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!(addr = %addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    // The HTTP surface has stopped accepting submit/cancel requests. Drop
    // this process's AppState so its Router/ExchangeService/AdminService/
    // ReadService clones release their Arc<Router> handles, then reclaim
    // sole ownership to drain every processor. The daemon and publisher
    // workers are aborted only after the drain completes, so any
    // cancellation they enqueue mid-drain is still observed by a live
    // processor rather than lost against a closed inbox.
    drop(state);
    match Arc::try_unwrap(router) {
        Ok(router) => router.shutdown().await,
        Err(_) => tracing::warn!("router still has outstanding references at shutdown; skipping drain"),
    }
    daemon_handle.abort();
    for handle in outbox_handles {
        handle.abort();
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining");
}

async fn health_check() -> &'static str {
    "OK"
}

//! Operational metrics (ambient, Prometheus-compatible).
//!
//! Grounded on the teacher's `metrics/mod.rs`: a `names`/`labels` constant
//! table, a `PrometheusBuilder` with per-metric histogram buckets, and one
//! free function per recorded event. Trimmed to the surfaces this system
//! actually has — HTTP, matching/settlement, the outbox, and the
//! expiration daemon — dropping the teacher's market-probability,
//! cache, websocket, oracle, and on-chain-settlement metrics, which have
//! no counterpart here.

#![allow(dead_code)]

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";

    pub const ORDERS_SUBMITTED_TOTAL: &str = "orders_submitted_total";
    pub const ORDERS_CANCELLED_TOTAL: &str = "orders_cancelled_total";
    pub const ORDER_MATCH_DURATION_SECONDS: &str = "order_match_duration_seconds";
    pub const TRADES_EXECUTED_TOTAL: &str = "trades_executed_total";
    pub const TRADE_VOLUME_CENTS: &str = "trade_volume_cents";

    pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";
    pub const DB_CONNECTIONS_ACTIVE: &str = "db_connections_active";
    pub const DB_CONNECTIONS_IDLE: &str = "db_connections_idle";

    pub const OUTBOX_EVENTS_PUBLISHED_TOTAL: &str = "outbox_events_published_total";
    pub const OUTBOX_UNPUBLISHED: &str = "outbox_unpublished";
    pub const ORDERS_EXPIRED_TOTAL: &str = "orders_expired_total";
}

pub mod labels {
    pub const METHOD: &str = "method";
    pub const ENDPOINT: &str = "endpoint";
    pub const STATUS: &str = "status";
    pub const SYMBOL: &str = "symbol";
    pub const ORDER_SIDE: &str = "side";
    pub const ORDER_TYPE: &str = "order_type";
    pub const QUERY_TYPE: &str = "query_type";
}

/// Installs the Prometheus recorder with per-metric histogram buckets
/// tuned for this system's latency scale (matching is sub-millisecond;
/// HTTP and DB queries are tens of milliseconds).
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::ORDER_MATCH_DURATION_SECONDS.to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::DB_QUERY_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0],
        )
        .unwrap();

    builder
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

// HTTP

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str.clone()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str
    )
    .record(duration_secs);
}

pub fn set_http_requests_in_flight(count: i64) {
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).set(count as f64);
}

// Matching & settlement (C2/C3)

pub fn record_order_submitted(symbol: &str, side: &str, order_type: &str) {
    counter!(
        names::ORDERS_SUBMITTED_TOTAL,
        labels::SYMBOL => symbol.to_string(),
        labels::ORDER_SIDE => side.to_string(),
        labels::ORDER_TYPE => order_type.to_string()
    )
    .increment(1);
}

pub fn record_order_cancelled(symbol: &str) {
    counter!(names::ORDERS_CANCELLED_TOTAL, labels::SYMBOL => symbol.to_string()).increment(1);
}

pub fn record_order_match_duration(duration_secs: f64) {
    histogram!(names::ORDER_MATCH_DURATION_SECONDS).record(duration_secs);
}

pub fn record_trade_executed(symbol: &str, quantity: i64, price_cents: i64) {
    counter!(names::TRADES_EXECUTED_TOTAL, labels::SYMBOL => symbol.to_string()).increment(1);
    counter!(names::TRADE_VOLUME_CENTS, labels::SYMBOL => symbol.to_string())
        .increment((quantity.max(0) as u64).saturating_mul(price_cents.max(0) as u64));
}

// Database

pub fn record_db_query(query_type: &str, duration_secs: f64) {
    histogram!(names::DB_QUERY_DURATION_SECONDS, labels::QUERY_TYPE => query_type.to_string())
        .record(duration_secs);
}

pub fn set_db_connections(active: i64, idle: i64) {
    gauge!(names::DB_CONNECTIONS_ACTIVE).set(active as f64);
    gauge!(names::DB_CONNECTIONS_IDLE).set(idle as f64);
}

// Outbox publisher (C8) & expiration daemon (C7)

pub fn record_outbox_events_published(count: i64) {
    counter!(names::OUTBOX_EVENTS_PUBLISHED_TOTAL).increment(count.max(0) as u64);
}

pub fn set_outbox_unpublished(count: i64) {
    gauge!(names::OUTBOX_UNPUBLISHED).set(count as f64);
}

pub fn record_orders_expired(count: i64) {
    counter!(names::ORDERS_EXPIRED_TOTAL).increment(count.max(0) as u64);
}

/// Wall-clock timer for measuring operation durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_reports_elapsed_seconds() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.elapsed_secs();
        assert!(elapsed >= 0.01);
        assert!(elapsed < 0.5);
    }

    #[test]
    fn metric_names_are_stable_strings() {
        assert_eq!(names::HTTP_REQUESTS_TOTAL, "http_requests_total");
        assert_eq!(names::ORDERS_SUBMITTED_TOTAL, "orders_submitted_total");
        assert_eq!(names::OUTBOX_EVENTS_PUBLISHED_TOTAL, "outbox_events_published_total");
    }
}

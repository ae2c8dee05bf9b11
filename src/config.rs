//! Configuration (C10, ambient). Grounded on the teacher's bootstrap
//! sequence: `dotenvy::dotenv()` loads a local `.env`, then the `config`
//! crate layers environment variables (prefixed `CLOB_`, nested fields
//! separated by `__`) over built-in defaults into one typed struct.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub bind_address: String,
    pub admin_bind_address: String,
    pub symbols: Vec<String>,
    pub expiration_check_interval_ms: u64,
    pub outbox_batch_size: i64,
    pub outbox_max_backoff_ms: u64,
    pub metrics_port: u16,
}

impl AppConfig {
    pub fn expiration_check_interval(&self) -> Duration {
        Duration::from_millis(self.expiration_check_interval_ms)
    }

    pub fn outbox_max_backoff(&self) -> Duration {
        Duration::from_millis(self.outbox_max_backoff_ms)
    }

    /// Loads `.env` (if present), then layers `CLOB_*` environment
    /// variables over the defaults below.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .set_default("database_url", "postgres://localhost/clob_exchange")?
            .set_default("redis_url", "redis://127.0.0.1:6379")?
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("admin_bind_address", "0.0.0.0:8081")?
            .set_default("symbols", vec!["@elonmusk".to_string()])?
            .set_default("expiration_check_interval_ms", 1_000_i64)?
            .set_default("outbox_batch_size", 100_i64)?
            .set_default("outbox_max_backoff_ms", 1_000_i64)?
            .set_default("metrics_port", 9_100_i64)?
            .add_source(config::Environment::with_prefix("CLOB").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_helpers_convert_millis_to_duration() {
        let config = AppConfig {
            database_url: String::new(),
            redis_url: String::new(),
            bind_address: String::new(),
            admin_bind_address: String::new(),
            symbols: vec![],
            expiration_check_interval_ms: 1_000,
            outbox_batch_size: 100,
            outbox_max_backoff_ms: 1_000,
            metrics_port: 9_100,
        };
        assert_eq!(config.expiration_check_interval(), Duration::from_secs(1));
        assert_eq!(config.outbox_max_backoff(), Duration::from_secs(1));
    }
}

//! Redis connection management (C12).
//!
//! Thin wrapper over `redis`'s `ConnectionManager`: connect-with-retry,
//! `publish`, and a health check. Carries no business logic — the Outbox
//! Publisher is the only caller that knows about event channel naming.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Redis client wrapper with connection management and retry.
pub struct RedisClient {
    config: RedisConfig,
    connection: Arc<RwLock<Option<ConnectionManager>>>,
    client: Client,
}

impl RedisClient {
    pub async fn new(config: RedisConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.url.as_str())?;
        let redis_client = Self {
            config,
            connection: Arc::new(RwLock::new(None)),
            client,
        };
        redis_client.ensure_connected().await?;
        Ok(redis_client)
    }

    pub async fn from_url(url: &str) -> Result<Self, RedisError> {
        Self::new(RedisConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .await
    }

    async fn ensure_connected(&self) -> Result<(), RedisError> {
        let mut conn = self.connection.write().await;
        if conn.is_none() {
            tracing::info!(url = %self.config.url, "establishing redis connection");
            let manager = ConnectionManager::new(self.client.clone()).await?;
            *conn = Some(manager);
            tracing::info!("redis connection established");
        }
        Ok(())
    }

    async fn get_connection(&self) -> Result<ConnectionManager, RedisError> {
        self.ensure_connected().await?;
        let conn = self.connection.read().await;
        conn.clone()
            .ok_or_else(|| RedisError::from((redis::ErrorKind::IoError, "connection not available")))
    }

    /// Runs `operation`, reconnecting and retrying on failure up to
    /// `max_retries` times with linear backoff.
    pub async fn with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T, RedisError>
    where
        F: FnMut(ConnectionManager) -> Fut,
        Fut: std::future::Future<Output = Result<T, RedisError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match self.get_connection().await {
                Ok(conn) => match operation(conn).await {
                    Ok(result) => return Ok(result),
                    Err(e) => {
                        tracing::warn!(attempt = attempt + 1, error = %e, "redis operation failed");
                        last_error = Some(e);
                        if attempt < self.config.max_retries - 1 {
                            let mut conn = self.connection.write().await;
                            *conn = None;
                            tokio::time::sleep(Duration::from_millis(
                                self.config.retry_delay_ms * (attempt as u64 + 1),
                            ))
                            .await;
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "redis connection failed");
                    last_error = Some(e);
                    if attempt < self.config.max_retries - 1 {
                        tokio::time::sleep(Duration::from_millis(
                            self.config.retry_delay_ms * (attempt as u64 + 1),
                        ))
                        .await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RedisError::from((redis::ErrorKind::IoError, "max retries exceeded"))))
    }

    pub async fn publish(&self, channel: &str, message: String) -> Result<i32, RedisError> {
        self.with_retry(|mut conn| {
            let channel = channel.to_string();
            let message = message.clone();
            async move { conn.publish(&channel, message).await }
        })
        .await
    }

    pub async fn ping(&self) -> Result<bool, RedisError> {
        self.with_retry(|mut conn| async move {
            let result: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(result == "PONG")
        })
        .await
    }

    pub async fn is_available(&self) -> bool {
        self.ping().await.unwrap_or(false)
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_config_default() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.max_retries, 3);
    }
}

//! Generic publish surface over the Redis client (C12), used exclusively by
//! the Outbox Publisher (C8). Channel naming (`"<EVENT_TYPE>.<symbol>"`) is
//! owned by `OutboxEvent::channel` in `crate::models`, not by this module.

use redis::RedisError;
use std::sync::Arc;

use super::redis_client::RedisClient;

pub struct Publisher {
    redis: Arc<RedisClient>,
}

impl Publisher {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    pub async fn publish(&self, channel: &str, payload: &str) -> Result<i32, RedisError> {
        self.redis.publish(channel, payload.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publisher_wraps_redis_client() {
        // `Publisher::new` only stores the handle; connecting is exercised by
        // `RedisClient` itself, so this just checks construction compiles
        // against a concrete `Arc<RedisClient>` call site shape.
        let _ = std::mem::size_of::<Publisher>();
    }
}

pub mod pubsub;
pub mod redis_client;

pub use pubsub::Publisher;
pub use redis_client::{RedisClient, RedisConfig};

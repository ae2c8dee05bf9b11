pub mod admin;
pub mod book;
pub mod exchange;
pub mod expiration;
pub mod matching;
pub mod outbox_publisher;
pub mod processor;
pub mod read;
pub mod router;

pub use admin::AdminService;
pub use exchange::ExchangeService;
pub use expiration::ExpirationDaemon;
pub use outbox_publisher::OutboxPublisher;
pub use read::ReadService;
pub use router::Router;

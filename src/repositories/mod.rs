pub mod error;
pub mod ledger;
pub mod orders;
pub mod outbox;
pub mod positions;
pub mod traders;
pub mod trades;

pub use error::RepositoryError;
pub use ledger::LedgerRepository;
pub use orders::OrderRepository;
pub use outbox::OutboxRepository;
pub use positions::PositionRepository;
pub use traders::TraderRepository;
pub use trades::TradeRepository;

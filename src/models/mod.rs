pub mod enums;
pub mod ledger;
pub mod order;
pub mod outbox;
pub mod position;
pub mod trade;
pub mod trader;

pub use enums::*;
pub use ledger::*;
pub use order::*;
pub use outbox::*;
pub use position::*;
pub use trade::*;
pub use trader::*;

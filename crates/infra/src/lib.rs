//! Infrastructure layer: the transactional store boundary and the services
//! that run ledger and credit decisions against it.

pub mod allocator;
pub mod error;
pub mod holds;
pub mod recorder;
pub mod store;
pub mod tally;


pub use allocator::CreditAllocator;
pub use error::ServiceError;
pub use holds::HoldManager;
pub use recorder::TransactionRecorder;
pub use store::{InMemoryLedgerStore, LedgerStore};
pub use tally::BalanceTally;

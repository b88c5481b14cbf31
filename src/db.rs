pub mod ledger;
pub use ledger::{CommitOp, LedgerStore, RecordKind};
pub mod memory;
pub use memory::InMemoryLedgerStore;
pub mod postgres;
pub use postgres::PgLedgerStore;

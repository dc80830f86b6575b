//! Task ledger: the durable record of per-torrent upload and archival state.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTaskLedger;
pub use store::TaskLedger;
pub use types::{LedgerError, Task, TaskStatus};

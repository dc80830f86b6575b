//! Upload and cleanup orchestration.
//!
//! - **Upload**: one task per invocation, triggered when a download completes.
//! - **Cleanup**: a periodic pass over every torrent in the client.
//!
//! Both passes run their steps sequentially and share the ledger.

mod cleanup;
mod config;
mod types;
mod upload;

pub use cleanup::CleanupOrchestrator;
pub use config::OrchestratorSettings;
pub use types::{
    ClientRemoval, IngestOutcome, OrchestratorError, ReconcileReport, SkipReason, SkippedTask,
};
pub use upload::UploadOrchestrator;

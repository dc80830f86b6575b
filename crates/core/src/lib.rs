pub mod config;
pub mod ledger;
pub mod local_content;
pub mod metrics;
pub mod orchestrator;
pub mod policy;
pub mod remote_storage;
pub mod testing;
pub mod torrent_client;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use ledger::{LedgerError, SqliteTaskLedger, Task, TaskLedger, TaskStatus};
pub use orchestrator::{
    CleanupOrchestrator, ClientRemoval, IngestOutcome, OrchestratorError, OrchestratorSettings,
    ReconcileReport, SkipReason, SkippedTask, UploadOrchestrator,
};
pub use policy::{PolicyDecision, SeedingPolicy};

//! Types for the upload and cleanup orchestrators.

use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::remote_storage::RemoteStorageError;
use crate::torrent_client::TorrentClientError;

/// Errors that abort an orchestrator pass.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The torrent client rejected the session.
    #[error("torrent client login failed: {0}")]
    Auth(#[source] TorrentClientError),

    /// The torrent client failed after login.
    #[error("torrent client error: {0}")]
    TorrentClient(#[from] TorrentClientError),

    /// Remote storage failed for the task being ingested.
    #[error("remote storage error: {0}")]
    Gateway(#[from] RemoteStorageError),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result of a successful `ingest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The payload was uploaded and the task is now `success`.
    Uploaded,
    /// A previous run already uploaded this task; nothing was done.
    AlreadyUploaded,
    /// The task was already cleaned up; nothing was done.
    AlreadyArchived,
}

/// Why a cleanup candidate was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The torrent name would resolve outside its save path.
    UnsafePath,
    /// The remote existence check errored or timed out.
    VerifyFailed,
    /// The remote copy is not there.
    RemoteMissing,
    /// The local payload could not be deleted.
    LocalDeleteFailed,
    /// The local payload is gone but the task could not be archived.
    LedgerFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnsafePath => "unsafe_path",
            SkipReason::VerifyFailed => "verify_failed",
            SkipReason::RemoteMissing => "remote_missing",
            SkipReason::LocalDeleteFailed => "local_delete_failed",
            SkipReason::LedgerFailed => "ledger_failed",
        }
    }
}

/// A candidate that stayed in the client this pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTask {
    pub id: String,
    pub name: String,
    pub reason: SkipReason,
    pub detail: String,
}

/// Outcome of the single batched removal from the torrent client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClientRemoval {
    /// Nothing was archived, so no call was made.
    NotAttempted,
    Removed { count: usize },
    /// The call failed; the listed tasks are archived but still in the client.
    Failed { ids: Vec<String>, error: String },
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Archived ledger rows deleted by housekeeping.
    pub pruned: u64,
    /// Torrents the client reported.
    pub listed: usize,
    pub candidates: usize,
    /// Ids archived this pass, in client order.
    pub archived: Vec<String>,
    pub skipped: Vec<SkippedTask>,
    pub removal: ClientRemoval,
}

impl ReconcileReport {
    pub fn skipped_for(&self, reason: SkipReason) -> Vec<&SkippedTask> {
        self.skipped.iter().filter(|s| s.reason == reason).collect()
    }
}

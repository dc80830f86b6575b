//! Types for remote storage operations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to remote storage.
#[derive(Debug, Error)]
pub enum RemoteStorageError {
    /// The storage tool could not be started at all.
    #[error("Failed to start {program}: {source}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage tool ran and reported failure.
    #[error("Storage command failed: {reason}")]
    CommandFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The operation did not finish in time and was aborted.
    #[error("Storage command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

impl RemoteStorageError {
    /// Creates a new command failed error with captured stderr.
    pub fn command_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::CommandFailed {
            reason: reason.into(),
            stderr,
        }
    }
}

/// Remote location of a payload: `remote_dir/name`.
///
/// Always derived on demand, never stored, so changing `remote_dir` does
/// not rewrite history.
pub fn remote_target(remote_dir: &str, name: &str) -> String {
    format!("{}/{}", remote_dir.trim_end_matches('/'), name)
}

/// Trait for remote storage backends.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Upload `local_path` to `remote_dir/name`, aborting after `timeout`.
    async fn upload(
        &self,
        local_path: &Path,
        remote_dir: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), RemoteStorageError>;

    /// Check whether `remote_dir/name` exists.
    ///
    /// A tool that runs but reports failure means `false`; only a tool that
    /// cannot be started or exceeds `timeout` is an error.
    async fn exists(
        &self,
        remote_dir: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<bool, RemoteStorageError>;
}

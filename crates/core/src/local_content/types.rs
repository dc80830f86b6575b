//! Types for local content removal.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while removing local content.
#[derive(Debug, Error)]
pub enum LocalContentError {
    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a successful removal actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    /// Nothing existed at the path; treated as success.
    AlreadyAbsent,
}

/// Removes downloaded payloads from local disk.
#[async_trait]
pub trait LocalContent: Send + Sync {
    /// Remove `path` and everything under it.
    async fn remove(&self, path: &Path) -> Result<RemovalOutcome, LocalContentError>;
}

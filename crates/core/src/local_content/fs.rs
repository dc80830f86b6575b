//! File system backed content removal.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use super::{LocalContent, LocalContentError, RemovalOutcome};

/// Deletes files and directory trees with `tokio::fs`.
#[derive(Debug, Default, Clone)]
pub struct FsLocalContent;

impl FsLocalContent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LocalContent for FsLocalContent {
    async fn remove(&self, path: &Path) -> Result<RemovalOutcome, LocalContentError> {
        let failed = |source: std::io::Error| LocalContentError::RemoveFailed {
            path: path.to_path_buf(),
            source,
        };

        // symlink_metadata so a link is removed itself, never followed.
        let metadata = match fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RemovalOutcome::AlreadyAbsent),
            Err(e) => return Err(failed(e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };

        match result {
            Ok(()) => Ok(RemovalOutcome::Removed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RemovalOutcome::AlreadyAbsent),
            Err(e) => Err(failed(e)),
        }
    }
}

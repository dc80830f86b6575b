//! Mock local content remover for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::local_content::{LocalContent, LocalContentError, RemovalOutcome};

use super::CallLog;

/// Mock implementation of the LocalContent trait.
///
/// Records every path it is asked to remove and never touches the disk.
#[derive(Debug)]
pub struct MockLocalContent {
    removed: Arc<RwLock<Vec<PathBuf>>>,
    /// Paths whose removal fails with a permission error.
    failing: Arc<RwLock<HashSet<PathBuf>>>,
    /// Paths reported as already gone.
    absent: Arc<RwLock<HashSet<PathBuf>>>,
    calls: CallLog,
}

impl Default for MockLocalContent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLocalContent {
    pub fn new() -> Self {
        Self::with_call_log(CallLog::new())
    }

    pub fn with_call_log(calls: CallLog) -> Self {
        Self {
            removed: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            absent: Arc::new(RwLock::new(HashSet::new())),
            calls,
        }
    }

    pub async fn fail_path(&self, path: impl Into<PathBuf>) {
        self.failing.write().await.insert(path.into());
    }

    pub async fn mark_absent(&self, path: impl Into<PathBuf>) {
        self.absent.write().await.insert(path.into());
    }

    /// Paths successfully removed, in call order.
    pub async fn removed(&self) -> Vec<PathBuf> {
        self.removed.read().await.clone()
    }
}

#[async_trait]
impl LocalContent for MockLocalContent {
    async fn remove(&self, path: &Path) -> Result<RemovalOutcome, LocalContentError> {
        self.calls
            .record(format!("remove_local:{}", path.display()));

        if self.failing.read().await.contains(path) {
            return Err(LocalContentError::RemoveFailed {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ),
            });
        }

        self.removed.write().await.push(path.to_path_buf());
        if self.absent.read().await.contains(path) {
            Ok(RemovalOutcome::AlreadyAbsent)
        } else {
            Ok(RemovalOutcome::Removed)
        }
    }
}

//! Mock remote storage for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::remote_storage::{remote_target, RemoteStorage, RemoteStorageError};

use super::CallLog;

/// A recorded upload for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub timeout: Duration,
}

/// Mock implementation of the RemoteStorage trait.
///
/// Successful uploads add their target to an in-memory set that `exists`
/// answers from, so an ingest followed by a reconcile behaves like the
/// real thing. Failures can be injected per call or per remote path.
#[derive(Debug)]
pub struct MockRemoteStorage {
    /// Remote paths that currently exist.
    remote: Arc<RwLock<HashSet<String>>>,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    exists_checks: Arc<RwLock<Vec<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<RemoteStorageError>>>,
    /// Remote paths whose existence check always times out.
    unreachable: Arc<RwLock<HashSet<String>>>,
    calls: CallLog,
}

impl Default for MockRemoteStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteStorage {
    pub fn new() -> Self {
        Self::with_call_log(CallLog::new())
    }

    /// Create a mock storage that records into a shared call log.
    pub fn with_call_log(calls: CallLog) -> Self {
        Self {
            remote: Arc::new(RwLock::new(HashSet::new())),
            uploads: Arc::new(RwLock::new(Vec::new())),
            exists_checks: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            unreachable: Arc::new(RwLock::new(HashSet::new())),
            calls,
        }
    }

    /// Pretend `remote_dir/name` was uploaded earlier.
    pub async fn add_remote(&self, remote_dir: &str, name: &str) {
        self.remote
            .write()
            .await
            .insert(remote_target(remote_dir, name));
    }

    /// Forget `remote_dir/name`, as if someone deleted it remotely.
    pub async fn remove_remote(&self, remote_dir: &str, name: &str) {
        self.remote
            .write()
            .await
            .remove(&remote_target(remote_dir, name));
    }

    pub async fn contains(&self, remote_dir: &str, name: &str) -> bool {
        self.remote
            .read()
            .await
            .contains(&remote_target(remote_dir, name))
    }

    /// Make every existence check for `remote_dir/name` time out.
    pub async fn make_unreachable(&self, remote_dir: &str, name: &str) {
        self.unreachable
            .write()
            .await
            .insert(remote_target(remote_dir, name));
    }

    /// Make the next operation fail with the given error.
    pub async fn set_next_error(&self, error: RemoteStorageError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    /// Remote paths passed to `exists`, in call order.
    pub async fn exists_checks(&self) -> Vec<String> {
        self.exists_checks.read().await.clone()
    }

    async fn take_error(&self) -> Option<RemoteStorageError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl RemoteStorage for MockRemoteStorage {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(
        &self,
        local_path: &Path,
        remote_dir: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), RemoteStorageError> {
        let remote_path = remote_target(remote_dir, name);
        self.calls.record(format!("upload:{}", remote_path));
        self.uploads.write().await.push(RecordedUpload {
            local_path: local_path.to_path_buf(),
            remote_path: remote_path.clone(),
            timeout,
        });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.remote.write().await.insert(remote_path);
        Ok(())
    }

    async fn exists(
        &self,
        remote_dir: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<bool, RemoteStorageError> {
        let remote_path = remote_target(remote_dir, name);
        self.calls.record(format!("exists:{}", remote_path));
        self.exists_checks.write().await.push(remote_path.clone());

        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        if self.unreachable.read().await.contains(&remote_path) {
            return Err(RemoteStorageError::Timeout {
                timeout_secs: timeout.as_secs(),
            });
        }

        Ok(self.remote.read().await.contains(&remote_path))
    }
}

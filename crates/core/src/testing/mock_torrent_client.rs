//! Mock torrent client for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{TorrentClient, TorrentClientError, TorrentFilters, TorrentInfo};

use super::CallLog;

/// A recorded batch removal for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRemoval {
    pub hashes: Vec<String>,
    pub delete_files: bool,
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Seed the torrent list in client order
/// - Track logins and batch removals for assertions
/// - Simulate failures, either on the next call or on every removal
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
/// client.add_mock_torrent(fixtures::torrent("h1", "Foo", "pausedUP")).await;
///
/// orchestrator.reconcile().await?;
///
/// let removals = client.removals().await;
/// assert_eq!(removals[0].hashes, vec!["h1"]);
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    /// Torrents in the order `list_torrents` returns them.
    torrents: Arc<RwLock<Vec<TorrentInfo>>>,
    /// Recorded remove_torrents calls.
    removals: Arc<RwLock<Vec<RecordedRemoval>>>,
    logins: Arc<RwLock<u32>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    /// If set, every remove_torrents call fails with this message.
    remove_error: Arc<RwLock<Option<String>>>,
    calls: CallLog,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new() -> Self {
        Self::with_call_log(CallLog::new())
    }

    /// Create a mock client that records into a shared call log.
    pub fn with_call_log(calls: CallLog) -> Self {
        Self {
            torrents: Arc::new(RwLock::new(Vec::new())),
            removals: Arc::new(RwLock::new(Vec::new())),
            logins: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
            remove_error: Arc::new(RwLock::new(None)),
            calls,
        }
    }

    /// Append a torrent to the client list.
    pub async fn add_mock_torrent(&self, info: TorrentInfo) {
        self.torrents.write().await.push(info);
    }

    /// Check if a torrent is still present.
    pub async fn has_torrent(&self, hash: &str) -> bool {
        self.torrents.read().await.iter().any(|t| t.hash == hash)
    }

    /// Get all recorded remove_torrents calls.
    pub async fn removals(&self) -> Vec<RecordedRemoval> {
        self.removals.read().await.clone()
    }

    pub async fn login_count(&self) -> u32 {
        *self.logins.read().await
    }

    /// Make the next operation fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every batch removal fail.
    pub async fn fail_removals(&self, message: impl Into<String>) {
        *self.remove_error.write().await = Some(message.into());
    }

    async fn take_error(&self) -> Option<TorrentClientError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login(&self) -> Result<(), TorrentClientError> {
        self.calls.record("login");
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        *self.logins.write().await += 1;
        Ok(())
    }

    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        self.calls.record("list_torrents");
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let torrents = self.torrents.read().await;
        Ok(torrents
            .iter()
            .filter(|t| match &filters.category {
                Some(category) => t.category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.calls
            .record(format!("remove_torrents:{}", hashes.join("|")));
        self.removals.write().await.push(RecordedRemoval {
            hashes: hashes.to_vec(),
            delete_files,
        });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        if let Some(message) = self.remove_error.read().await.clone() {
            return Err(TorrentClientError::ApiError(message));
        }

        self.torrents
            .write()
            .await
            .retain(|t| !hashes.contains(&t.hash));
        Ok(())
    }
}

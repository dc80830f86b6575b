//! Types for torrent client operations.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A torrent as listed by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name; also the payload's file or directory name.
    pub name: String,
    /// Directory the payload was saved into.
    pub save_path: String,
    /// State string exactly as the client reported it (e.g. `pausedUP`).
    pub raw_state: String,
    /// Uploaded/downloaded ratio.
    pub ratio: f64,
    /// Accumulated time spent seeding, in seconds.
    pub seeding_secs: u64,
    pub category: Option<String>,
}

impl TorrentInfo {
    /// Local payload location, `save_path/name`.
    ///
    /// Returns `None` unless `name` is a single normal path component and
    /// `save_path` is absolute, so the result always lies strictly inside
    /// `save_path`.
    pub fn payload_path(&self) -> Option<PathBuf> {
        let save_path = Path::new(&self.save_path);
        if !save_path.is_absolute() || !is_plain_name(&self.name) {
            return None;
        }

        let path = save_path.join(&self.name);
        (path.starts_with(save_path) && path != save_path).then_some(path)
    }
}

fn is_plain_name(name: &str) -> bool {
    if name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Filters for listing torrents.
#[derive(Debug, Clone, Default)]
pub struct TorrentFilters {
    /// Filter by category.
    pub category: Option<String>,
}

/// Trait for torrent client backends.
///
/// Callers must `login` before any other operation.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Establish an authenticated session.
    async fn login(&self) -> Result<(), TorrentClientError>;

    /// List torrents in the order the client returns them.
    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Remove several torrents in one call.
    /// If `delete_files` is true, the client also deletes downloaded files.
    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), TorrentClientError>;
}

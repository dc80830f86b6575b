//! Testing utilities and mock implementations.
//!
//! Every gateway the orchestrators talk to has a mock here, so both passes
//! can be driven end to end against an in-memory ledger.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedvault_core::testing::{CallLog, MockLocalContent, MockRemoteStorage, MockTorrentClient};
//!
//! let calls = CallLog::new();
//! let client = MockTorrentClient::with_call_log(calls.clone());
//! let storage = MockRemoteStorage::with_call_log(calls.clone());
//! let local = MockLocalContent::with_call_log(calls.clone());
//!
//! // Run a reconcile pass, then:
//! assert!(calls.position("remove_local:/d/Foo") < calls.position("remove_torrents:h1"));
//! ```

mod call_log;
mod mock_local_content;
mod mock_remote_storage;
mod mock_torrent_client;
mod recording_ledger;

pub use call_log::CallLog;
pub use mock_local_content::MockLocalContent;
pub use mock_remote_storage::{MockRemoteStorage, RecordedUpload};
pub use mock_torrent_client::{MockTorrentClient, RecordedRemoval};
pub use recording_ledger::RecordingLedger;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::torrent_client::TorrentInfo;

    /// Save path used by [`torrent`].
    pub const SAVE_PATH: &str = "/downloads";

    /// Create a completed torrent with zero ratio and seeding time.
    pub fn torrent(hash: &str, name: &str, raw_state: &str) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: name.to_string(),
            save_path: SAVE_PATH.to_string(),
            raw_state: raw_state.to_string(),
            ratio: 0.0,
            seeding_secs: 0,
            category: None,
        }
    }

    /// Create a torrent that has been seeding for a while.
    pub fn seeded_torrent(hash: &str, name: &str, ratio: f64, seeding_hours: u64) -> TorrentInfo {
        TorrentInfo {
            ratio,
            seeding_secs: seeding_hours * 3600,
            ..torrent(hash, name, "uploading")
        }
    }
}

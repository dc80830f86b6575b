//! Task lifecycle integration tests.
//!
//! These tests drive both passes against a file-backed ledger:
//! pending -> uploading -> success -> archived

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tokio_test::assert_ok;

use seedvault_core::{
    ledger::{SqliteTaskLedger, TaskLedger, TaskStatus},
    local_content::FsLocalContent,
    remote_storage::RemoteStorageError,
    testing::{
        fixtures, CallLog, MockLocalContent, MockRemoteStorage, MockTorrentClient,
        RecordingLedger,
    },
    torrent_client::TorrentClientError,
    CleanupOrchestrator, ClientRemoval, IngestOutcome, OrchestratorError, OrchestratorSettings,
    SeedingPolicy, SkipReason, UploadOrchestrator,
};

const REMOTE_DIR: &str = "/backup";

/// Test helper to create all dependencies for lifecycle testing.
struct TestHarness {
    ledger: Arc<RecordingLedger>,
    client: Arc<MockTorrentClient>,
    storage: Arc<MockRemoteStorage>,
    local: Arc<MockLocalContent>,
    calls: CallLog,
    settings: OrchestratorSettings,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("tasks.db");
        let sqlite = SqliteTaskLedger::new(&db_path, std::time::Duration::from_secs(5))
            .expect("Failed to create ledger");

        let calls = CallLog::new();
        Self {
            ledger: Arc::new(RecordingLedger::new(Arc::new(sqlite), calls.clone())),
            client: Arc::new(MockTorrentClient::with_call_log(calls.clone())),
            storage: Arc::new(MockRemoteStorage::with_call_log(calls.clone())),
            local: Arc::new(MockLocalContent::with_call_log(calls.clone())),
            calls,
            settings: OrchestratorSettings {
                remote_dir: REMOTE_DIR.to_string(),
                policy: SeedingPolicy::from_state_list("pausedUP, stoppedUP"),
                ..Default::default()
            },
            _temp_dir: temp_dir,
        }
    }

    fn with_policy(mut self, policy: SeedingPolicy) -> Self {
        self.settings.policy = policy;
        self
    }

    fn uploader(&self) -> UploadOrchestrator {
        UploadOrchestrator::new(
            Arc::clone(&self.ledger) as Arc<dyn TaskLedger>,
            Arc::clone(&self.storage) as Arc<dyn seedvault_core::remote_storage::RemoteStorage>,
            self.settings.clone(),
        )
    }

    fn cleaner(&self) -> CleanupOrchestrator {
        CleanupOrchestrator::new(
            Arc::clone(&self.ledger) as Arc<dyn TaskLedger>,
            Arc::clone(&self.client) as Arc<dyn seedvault_core::torrent_client::TorrentClient>,
            Arc::clone(&self.storage) as Arc<dyn seedvault_core::remote_storage::RemoteStorage>,
            Arc::clone(&self.local) as Arc<dyn seedvault_core::local_content::LocalContent>,
            self.settings.clone(),
        )
    }

    /// Upload a payload and put its torrent into the client.
    async fn seed_uploaded(&self, hash: &str, name: &str, raw_state: &str) {
        let local_path = Path::new(fixtures::SAVE_PATH).join(name);
        let outcome = self
            .uploader()
            .ingest(hash, name, &local_path)
            .await
            .expect("ingest failed");
        assert_eq!(outcome, IngestOutcome::Uploaded);
        self.client
            .add_mock_torrent(fixtures::torrent(hash, name, raw_state))
            .await;
    }

    fn status(&self, id: &str) -> TaskStatus {
        self.ledger
            .get(id)
            .expect("ledger read failed")
            .expect("task missing")
            .status
    }
}

#[tokio::test]
async fn test_full_lifecycle_archives_and_removes() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    assert!(h.storage.contains(REMOTE_DIR, "Foo").await);
    h.calls.clear();

    let report = assert_ok!(h.cleaner().reconcile().await);

    assert_eq!(report.listed, 1);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.archived, vec!["h1".to_string()]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.removal, ClientRemoval::Removed { count: 1 });

    assert_eq!(h.status("h1"), TaskStatus::Archived);
    assert_eq!(
        h.local.removed().await,
        vec![Path::new("/downloads/Foo").to_path_buf()]
    );
    let removals = h.client.removals().await;
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].hashes, vec!["h1".to_string()]);
    assert!(!removals[0].delete_files);
    assert!(!h.client.has_torrent("h1").await);
}

#[tokio::test]
async fn test_retire_steps_run_in_order() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.calls.clear();

    assert_ok!(h.cleaner().reconcile().await);

    let exists = h.calls.position("exists:/backup/Foo").unwrap();
    let delete = h.calls.position("remove_local:/downloads/Foo").unwrap();
    let archive = h.calls.position("status:h1:archived").unwrap();
    let remove = h.calls.position("remove_torrents:h1").unwrap();
    assert!(exists < delete);
    assert!(delete < archive);
    assert!(archive < remove);
}

#[tokio::test]
async fn test_second_ingest_is_a_no_op() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "uploading").await;
    let before = h.ledger.get("h1").unwrap().unwrap();

    let outcome = assert_ok!(
        h.uploader()
            .ingest("h1", "Foo", Path::new("/downloads/Foo"))
            .await
    );

    assert_eq!(outcome, IngestOutcome::AlreadyUploaded);
    assert_eq!(h.storage.uploads().await.len(), 1);
    assert_eq!(h.ledger.get("h1").unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_failed_upload_then_retry_succeeds() {
    let h = TestHarness::new();
    h.storage
        .set_next_error(RemoteStorageError::Timeout {
            timeout_secs: 86400,
        })
        .await;

    let err = h
        .uploader()
        .ingest("h1", "Foo", Path::new("/downloads/Foo"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Gateway(_)));
    assert_eq!(h.status("h1"), TaskStatus::Failed);

    let outcome = assert_ok!(
        h.uploader()
            .ingest("h1", "Foo", Path::new("/downloads/Foo"))
            .await
    );
    assert_eq!(outcome, IngestOutcome::Uploaded);
    assert_eq!(h.status("h1"), TaskStatus::Success);
    assert_eq!(
        h.calls.with_prefix("status:h1:"),
        vec![
            "status:h1:uploading",
            "status:h1:failed",
            "status:h1:uploading",
            "status:h1:success",
        ]
    );
}

#[tokio::test]
async fn test_failed_upload_is_never_cleaned_up() {
    let h = TestHarness::new();
    h.storage
        .set_next_error(RemoteStorageError::command_failed("exit status 1", None))
        .await;
    assert!(h
        .uploader()
        .ingest("h1", "Foo", Path::new("/downloads/Foo"))
        .await
        .is_err());
    h.client
        .add_mock_torrent(fixtures::torrent("h1", "Foo", "pausedUP"))
        .await;

    let report = assert_ok!(h.cleaner().reconcile().await);
    assert_eq!(report.candidates, 0);
    assert!(h.storage.exists_checks().await.is_empty());
    assert!(h.local.removed().await.is_empty());
}

#[tokio::test]
async fn test_remote_missing_keeps_local_content() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.storage.remove_remote(REMOTE_DIR, "Foo").await;

    let report = assert_ok!(h.cleaner().reconcile().await);

    assert!(report.archived.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::RemoteMissing);
    assert_eq!(report.removal, ClientRemoval::NotAttempted);
    assert!(h.local.removed().await.is_empty());
    assert!(h.client.removals().await.is_empty());
    assert_eq!(h.status("h1"), TaskStatus::Success);
}

#[tokio::test]
async fn test_verify_error_keeps_local_content() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.storage.make_unreachable(REMOTE_DIR, "Foo").await;

    let report = assert_ok!(h.cleaner().reconcile().await);

    assert_eq!(report.skipped_for(SkipReason::VerifyFailed).len(), 1);
    assert!(h.local.removed().await.is_empty());
    assert!(h.client.removals().await.is_empty());
    assert_eq!(h.status("h1"), TaskStatus::Success);
}

#[tokio::test]
async fn test_one_batch_for_mixed_candidates() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.seed_uploaded("h2", "Bar", "stoppedUP").await;
    h.seed_uploaded("h3", "Baz", "pausedUP").await;
    h.seed_uploaded("h4", "Qux", "uploading").await;
    h.storage.remove_remote(REMOTE_DIR, "Bar").await;

    let report = assert_ok!(h.cleaner().reconcile().await);

    assert_eq!(report.listed, 4);
    assert_eq!(report.candidates, 3);
    assert_eq!(report.archived, vec!["h1".to_string(), "h3".to_string()]);
    assert_eq!(report.skipped[0].id, "h2");

    let removals = h.client.removals().await;
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].hashes, vec!["h1".to_string(), "h3".to_string()]);

    assert_eq!(h.status("h2"), TaskStatus::Success);
    assert_eq!(h.status("h4"), TaskStatus::Success);
    assert!(h.client.has_torrent("h2").await);
    assert!(h.client.has_torrent("h4").await);
}

#[tokio::test]
async fn test_batch_removal_failure_keeps_archived() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.client.fail_removals("qBittorrent is busy").await;

    let report = assert_ok!(h.cleaner().reconcile().await);

    match &report.removal {
        ClientRemoval::Failed { ids, error } => {
            assert_eq!(ids, &vec!["h1".to_string()]);
            assert!(error.contains("qBittorrent is busy"));
        }
        other => panic!("unexpected removal outcome: {:?}", other),
    }
    assert_eq!(h.status("h1"), TaskStatus::Archived);
    assert!(h.client.has_torrent("h1").await);

    // Archived tasks are not candidates again on the next pass.
    h.calls.clear();
    let report = assert_ok!(h.cleaner().reconcile().await);
    assert_eq!(report.candidates, 0);
    assert!(h.calls.with_prefix("exists:").is_empty());
}

#[tokio::test]
async fn test_archive_failure_keeps_torrent_in_client() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.ledger.fail_status(TaskStatus::Archived);

    let report = assert_ok!(h.cleaner().reconcile().await);

    assert_eq!(report.skipped_for(SkipReason::LedgerFailed).len(), 1);
    assert_eq!(report.removal, ClientRemoval::NotAttempted);
    assert_eq!(h.local.removed().await.len(), 1);
    assert_eq!(h.status("h1"), TaskStatus::Success);
}

#[tokio::test]
async fn test_thresholds_either_clause_suffices() {
    let h = TestHarness::new().with_policy(SeedingPolicy::thresholds(2.0, 72));

    for (hash, name, ratio, hours) in [
        ("h1", "RatioOnly", 2.5, 1),
        ("h2", "TimeOnly", 0.3, 100),
        ("h3", "Neither", 1.0, 10),
    ] {
        let local_path = Path::new(fixtures::SAVE_PATH).join(name);
        assert_ok!(h.uploader().ingest(hash, name, &local_path).await);
        h.client
            .add_mock_torrent(fixtures::seeded_torrent(hash, name, ratio, hours))
            .await;
    }

    let report = assert_ok!(h.cleaner().reconcile().await);

    assert_eq!(report.candidates, 2);
    assert_eq!(report.archived, vec!["h1".to_string(), "h2".to_string()]);
    assert_eq!(h.status("h3"), TaskStatus::Success);
}

#[tokio::test]
async fn test_login_failure_is_fatal() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.client
        .set_next_error(TorrentClientError::AuthenticationFailed(
            "Invalid credentials".into(),
        ))
        .await;

    let err = h.cleaner().reconcile().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Auth(_)));
    assert!(h.storage.exists_checks().await.is_empty());
    assert!(h.local.removed().await.is_empty());
    assert_eq!(h.status("h1"), TaskStatus::Success);
}

#[tokio::test]
async fn test_prune_failure_does_not_block_cleanup() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    h.ledger.fail_prune();

    let report = assert_ok!(h.cleaner().reconcile().await);

    assert_eq!(report.pruned, 0);
    assert_eq!(report.archived, vec!["h1".to_string()]);
    assert!(h.calls.position("prune").unwrap() < h.calls.position("login").unwrap());
}

#[tokio::test]
async fn test_ingest_after_archive_is_skipped() {
    let h = TestHarness::new();
    h.seed_uploaded("h1", "Foo", "pausedUP").await;
    assert_ok!(h.cleaner().reconcile().await);

    let outcome = assert_ok!(
        h.uploader()
            .ingest("h1", "Foo", Path::new("/downloads/Foo"))
            .await
    );
    assert_eq!(outcome, IngestOutcome::AlreadyArchived);
    assert_eq!(h.storage.uploads().await.len(), 1);
    assert_eq!(h.status("h1"), TaskStatus::Archived);
}

/// Run a cleanup pass that deletes from a real directory tree.
async fn reconcile_on_disk(
    save_dir: &Path,
    hash: &str,
    name: &str,
) -> seedvault_core::ReconcileReport {
    let ledger = Arc::new(SqliteTaskLedger::in_memory().unwrap());
    ledger.register(hash, name).unwrap();
    ledger.set_status(hash, TaskStatus::Uploading, "started").unwrap();
    ledger.set_status(hash, TaskStatus::Success, "uploaded").unwrap();

    let client = Arc::new(MockTorrentClient::new());
    let mut torrent = fixtures::torrent(hash, name, "pausedUP");
    torrent.save_path = save_dir.to_string_lossy().into_owned();
    client.add_mock_torrent(torrent).await;

    let storage = Arc::new(MockRemoteStorage::new());
    storage.add_remote(REMOTE_DIR, name).await;

    let orchestrator = CleanupOrchestrator::new(
        ledger,
        client,
        storage,
        Arc::new(FsLocalContent::new()),
        OrchestratorSettings {
            remote_dir: REMOTE_DIR.to_string(),
            ..Default::default()
        },
    );
    assert_ok!(orchestrator.reconcile().await)
}

#[tokio::test]
async fn test_absolute_name_never_deletes_outside_save_path() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("downloads");
    let outside = temp.path().join("outside");
    std::fs::create_dir_all(&save_dir).unwrap();
    std::fs::create_dir_all(&outside).unwrap();
    std::fs::write(outside.join("keep.txt"), b"data").unwrap();

    let report = reconcile_on_disk(&save_dir, "h1", &outside.to_string_lossy()).await;

    assert!(report.archived.is_empty());
    assert_eq!(report.skipped_for(SkipReason::UnsafePath).len(), 1);
    assert!(outside.join("keep.txt").exists());
}

#[tokio::test]
async fn test_empty_name_never_deletes_save_path() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("downloads");
    std::fs::create_dir_all(save_dir.join("Other.Torrent")).unwrap();

    let report = reconcile_on_disk(&save_dir, "h1", "").await;

    assert!(report.archived.is_empty());
    assert_eq!(report.skipped_for(SkipReason::UnsafePath).len(), 1);
    assert!(save_dir.join("Other.Torrent").exists());
}

#[tokio::test]
async fn test_parent_name_never_deletes_above_save_path() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("downloads");
    std::fs::create_dir_all(&save_dir).unwrap();
    std::fs::write(temp.path().join("sibling.txt"), b"data").unwrap();

    let report = reconcile_on_disk(&save_dir, "h1", "..").await;

    assert_eq!(report.skipped_for(SkipReason::UnsafePath).len(), 1);
    assert!(temp.path().join("sibling.txt").exists());
    assert!(save_dir.exists());
}

#[tokio::test]
async fn test_plain_name_is_deleted_from_disk() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("downloads");
    std::fs::create_dir_all(save_dir.join("Foo")).unwrap();
    std::fs::write(save_dir.join("Foo/E01.mkv"), b"video").unwrap();
    std::fs::create_dir_all(save_dir.join("Bar")).unwrap();

    let report = reconcile_on_disk(&save_dir, "h1", "Foo").await;

    assert_eq!(report.archived, vec!["h1".to_string()]);
    assert!(!save_dir.join("Foo").exists());
    assert!(save_dir.join("Bar").exists());
}

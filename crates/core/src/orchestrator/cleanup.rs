//! Cleanup pass: retire torrents that have seeded enough and are safely
//! stored remotely.
//!
//! Per candidate the order is fixed: verify the remote copy, delete the
//! local payload, archive the ledger row. Torrents are then removed from
//! the client in a single batch. Any per-candidate failure leaves that
//! candidate untouched for the next pass.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::ledger::{TaskLedger, TaskStatus};
use crate::local_content::{LocalContent, RemovalOutcome};
use crate::metrics;
use crate::remote_storage::{remote_target, RemoteStorage};
use crate::torrent_client::{TorrentClient, TorrentInfo};

use super::{
    ClientRemoval, OrchestratorError, OrchestratorSettings, ReconcileReport, SkipReason,
    SkippedTask,
};

/// Reconciles torrent client state with the ledger and remote storage.
pub struct CleanupOrchestrator {
    ledger: Arc<dyn TaskLedger>,
    client: Arc<dyn TorrentClient>,
    storage: Arc<dyn RemoteStorage>,
    local: Arc<dyn LocalContent>,
    settings: OrchestratorSettings,
}

impl CleanupOrchestrator {
    pub fn new(
        ledger: Arc<dyn TaskLedger>,
        client: Arc<dyn TorrentClient>,
        storage: Arc<dyn RemoteStorage>,
        local: Arc<dyn LocalContent>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            ledger,
            client,
            storage,
            local,
            settings,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Fails only when the client cannot be reached or the ledger cannot be
    /// read; everything after that is reported per task.
    pub async fn reconcile(&self) -> Result<ReconcileReport, OrchestratorError> {
        let pruned = self.prune();

        self.client.login().await.map_err(OrchestratorError::Auth)?;
        let torrents = self.client.list_torrents(&self.settings.filters).await?;
        let uploaded = self.ledger.list_by_status(TaskStatus::Success)?;
        info!(
            "{} torrents in {}, {} uploaded tasks in ledger",
            torrents.len(),
            self.client.name(),
            uploaded.len()
        );

        let candidates: Vec<&TorrentInfo> = torrents
            .iter()
            .filter(|t| uploaded.contains(&t.hash))
            .filter(|t| self.settings.policy.evaluate(t).is_eligible())
            .collect();
        metrics::RECONCILE_CANDIDATES.inc_by(candidates.len() as u64);

        let mut archived = Vec::new();
        let mut skipped = Vec::new();
        let total = candidates.len();
        for (i, torrent) in candidates.iter().enumerate() {
            info!(
                "[{} / {}] Processing {} ({})",
                i + 1,
                total,
                torrent.name,
                torrent.hash
            );
            match self.retire(torrent).await {
                Ok(()) => {
                    metrics::TASKS_ARCHIVED.inc();
                    archived.push(torrent.hash.clone());
                }
                Err((reason, detail)) => {
                    metrics::TASKS_SKIPPED
                        .with_label_values(&[reason.as_str()])
                        .inc();
                    skipped.push(SkippedTask {
                        id: torrent.hash.clone(),
                        name: torrent.name.clone(),
                        reason,
                        detail,
                    });
                }
            }
        }

        let removal = self.remove_from_client(&candidates, &archived).await;

        info!(
            "Cleanup finished: {} archived, {} skipped",
            archived.len(),
            skipped.len()
        );
        Ok(ReconcileReport {
            pruned,
            listed: torrents.len(),
            candidates: total,
            archived,
            skipped,
            removal,
        })
    }

    /// Housekeeping; failure never blocks the pass.
    fn prune(&self) -> u64 {
        match self.ledger.prune(self.settings.keep_archived_days) {
            Ok(count) => {
                if count > 0 {
                    info!("Pruned {} archived tasks from ledger", count);
                }
                metrics::LEDGER_PRUNED.inc_by(count);
                count
            }
            Err(e) => {
                warn!("Failed to prune archived tasks: {}", e);
                0
            }
        }
    }

    /// Verify, delete locally, archive. Stops at the first failing step.
    async fn retire(&self, torrent: &TorrentInfo) -> Result<(), (SkipReason, String)> {
        let Some(local_path) = torrent.payload_path() else {
            error!(
                "Refusing to touch {} ({}): name {:?} is not a plain entry under save path {:?}",
                torrent.name, torrent.hash, torrent.name, torrent.save_path
            );
            return Err((
                SkipReason::UnsafePath,
                format!(
                    "name {:?} does not resolve inside {:?}",
                    torrent.name, torrent.save_path
                ),
            ));
        };
        let remote_path = remote_target(&self.settings.remote_dir, &torrent.name);

        match self
            .storage
            .exists(
                &self.settings.remote_dir,
                &torrent.name,
                self.settings.exists_timeout,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                error!(
                    "Remote copy missing at {}, keeping {} ({}) local",
                    remote_path, torrent.name, torrent.hash
                );
                return Err((
                    SkipReason::RemoteMissing,
                    format!("not found at {}", remote_path),
                ));
            }
            Err(e) => {
                warn!(
                    "Could not verify {} for {} ({}): {}",
                    remote_path, torrent.name, torrent.hash, e
                );
                return Err((SkipReason::VerifyFailed, e.to_string()));
            }
        }

        match self.local.remove(&local_path).await {
            Ok(RemovalOutcome::Removed) => {
                info!("Deleted local content {}", local_path.display());
            }
            Ok(RemovalOutcome::AlreadyAbsent) => {
                info!("Local content {} already gone", local_path.display());
            }
            Err(e) => {
                error!("Failed to delete local content: {}", e);
                return Err((SkipReason::LocalDeleteFailed, e.to_string()));
            }
        }

        match self
            .ledger
            .set_status(&torrent.hash, TaskStatus::Archived, "archived")
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                error!(
                    "Local content of {} ({}) deleted but its ledger row is gone",
                    torrent.name, torrent.hash
                );
                Err((SkipReason::LedgerFailed, "no ledger row to archive".to_string()))
            }
            Err(e) => {
                error!(
                    "Local content of {} ({}) deleted but task not archived: {}",
                    torrent.name, torrent.hash, e
                );
                Err((SkipReason::LedgerFailed, e.to_string()))
            }
        }
    }

    /// One batched call for everything archived this pass. A failure is
    /// reported but never rolls back the archived rows.
    async fn remove_from_client(
        &self,
        candidates: &[&TorrentInfo],
        archived: &[String],
    ) -> ClientRemoval {
        if archived.is_empty() {
            return ClientRemoval::NotAttempted;
        }

        info!(
            "Removing {} torrents from {}",
            archived.len(),
            self.client.name()
        );
        match self.client.remove_torrents(archived, false).await {
            Ok(()) => {
                metrics::CLIENT_REMOVALS
                    .with_label_values(&["success"])
                    .inc();
                ClientRemoval::Removed {
                    count: archived.len(),
                }
            }
            Err(e) => {
                metrics::CLIENT_REMOVALS.with_label_values(&["failed"]).inc();
                let names: Vec<&str> = candidates
                    .iter()
                    .filter(|t| archived.contains(&t.hash))
                    .map(|t| t.name.as_str())
                    .collect();
                error!(
                    "Failed to remove archived torrents from {}: {}. Remove manually: {}",
                    self.client.name(),
                    e,
                    names.join(", ")
                );
                ClientRemoval::Failed {
                    ids: archived.to_vec(),
                    error: e.to_string(),
                }
            }
        }
    }
}

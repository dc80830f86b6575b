//! Orchestrator settings.

use std::time::Duration;

use crate::config::Config;
use crate::policy::SeedingPolicy;
use crate::torrent_client::TorrentFilters;

/// Runtime settings shared by the upload and cleanup passes.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Remote directory every payload is uploaded into.
    pub remote_dir: String,
    pub upload_timeout: Duration,
    pub exists_timeout: Duration,
    /// Archived rows older than this are pruned; zero or below disables pruning.
    pub keep_archived_days: i64,
    /// Which client torrents reconciliation looks at.
    pub filters: TorrentFilters,
    pub policy: SeedingPolicy,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        let category = config
            .torrent_client
            .qbittorrent
            .as_ref()
            .and_then(|qb| qb.category.clone());

        Self {
            remote_dir: config.remote_storage.remote_dir.clone(),
            upload_timeout: config.remote_storage.upload_timeout(),
            exists_timeout: config.remote_storage.exists_timeout(),
            keep_archived_days: config.maintenance.keep_archived_days,
            filters: TorrentFilters { category },
            policy: config.seeding_policy.to_policy(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            remote_dir: "/backup".to_string(),
            upload_timeout: Duration::from_secs(24 * 60 * 60),
            exists_timeout: Duration::from_secs(5 * 60),
            keep_archived_days: 30,
            filters: TorrentFilters::default(),
            policy: SeedingPolicy::from_state_list("pausedUP,stoppedUP"),
        }
    }
}

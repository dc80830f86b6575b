use super::{types::Config, ConfigError, PolicyMode, TorrentClientBackend};
use crate::policy::SeedingPolicy;

/// Validate configuration
/// Currently validates:
/// - Required sections exist (enforced by serde)
/// - The selected torrent client backend has its settings
/// - Remote directory and storage program are not empty
/// - Timeouts are non-zero
/// - The seeding policy can select at least something
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    match config.torrent_client.backend {
        TorrentClientBackend::QBittorrent => match &config.torrent_client.qbittorrent {
            Some(q) if !q.url.trim().is_empty() => {}
            Some(_) => return Err(invalid("torrent_client.qbittorrent.url cannot be empty")),
            None => {
                return Err(invalid(
                    "torrent_client.backend is qbittorrent but [torrent_client.qbittorrent] is missing",
                ))
            }
        },
    }

    let storage = &config.remote_storage;
    if storage.remote_dir.trim().is_empty() {
        return Err(invalid("remote_storage.remote_dir cannot be empty"));
    }
    if storage.command.program.as_os_str().is_empty() {
        return Err(invalid("remote_storage.command.program cannot be empty"));
    }
    if storage.upload_timeout_secs == 0 {
        return Err(invalid("remote_storage.upload_timeout_secs cannot be 0"));
    }
    if storage.exists_timeout_secs == 0 {
        return Err(invalid("remote_storage.exists_timeout_secs cannot be 0"));
    }

    match (config.seeding_policy.mode, config.seeding_policy.to_policy()) {
        (PolicyMode::States, SeedingPolicy::States(states)) if states.is_empty() => {
            return Err(invalid(
                "seeding_policy.target_states must list at least one state in states mode",
            ));
        }
        (PolicyMode::Thresholds, policy) if policy.is_disabled() => {
            return Err(invalid(
                "seeding_policy needs target_ratio or target_seeding_hours above 0 in thresholds mode",
            ));
        }
        _ => {}
    }

    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}

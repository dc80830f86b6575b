use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::policy::SeedingPolicy;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub torrent_client: TorrentClientConfig,
    pub remote_storage: RemoteStorageConfig,
    pub seeding_policy: SeedingPolicyConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("seedvault.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Torrent client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TorrentClientConfig {
    /// Torrent client backend type
    pub backend: TorrentClientBackend,
    /// qBittorrent-specific configuration (required when backend = "qbittorrent")
    #[serde(default)]
    pub qbittorrent: Option<QBittorrentConfig>,
}

/// Available torrent client backends
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TorrentClientBackend {
    #[serde(rename = "qbittorrent")]
    QBittorrent,
}

/// qBittorrent Web API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// Web UI URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u32,
    /// Only consider torrents in this category during cleanup.
    #[serde(default)]
    pub category: Option<String>,
}

fn default_client_timeout() -> u32 {
    30
}

/// Remote storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteStorageConfig {
    /// Remote directory every payload is uploaded into.
    pub remote_dir: String,
    /// Upload timeout in seconds (default: one day).
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
    /// Existence check timeout in seconds (default: five minutes).
    #[serde(default = "default_exists_timeout")]
    pub exists_timeout_secs: u64,
    #[serde(default)]
    pub command: CommandStorageConfig,
}

impl RemoteStorageConfig {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn exists_timeout(&self) -> Duration {
        Duration::from_secs(self.exists_timeout_secs)
    }
}

fn default_upload_timeout() -> u64 {
    24 * 60 * 60
}

fn default_exists_timeout() -> u64 {
    5 * 60
}

/// External storage CLI (BaiduPCS-Go and compatible tools).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandStorageConfig {
    /// Path to the storage CLI binary.
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Extra arguments appended to every upload invocation.
    /// Accepts a TOML array or a single whitespace separated string.
    #[serde(default, deserialize_with = "deserialize_args")]
    pub extra_args: Vec<String>,
}

impl Default for CommandStorageConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            extra_args: Vec::new(),
        }
    }
}

fn default_program() -> PathBuf {
    PathBuf::from("BaiduPCS-Go")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArgsRepr {
    List(Vec<String>),
    Line(String),
}

fn deserialize_args<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ArgsRepr::deserialize(deserializer)? {
        ArgsRepr::List(args) => args,
        ArgsRepr::Line(line) => line.split_whitespace().map(str::to_string).collect(),
    })
}

/// Which seeding predicate decides cleanup eligibility.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Client-reported state must be in `target_states`.
    States,
    /// Ratio or seeding time must reach its target.
    Thresholds,
}

/// Seeding policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedingPolicyConfig {
    pub mode: PolicyMode,
    /// Comma separated client state names (e.g. "pausedUP, stoppedUP").
    #[serde(default)]
    pub target_states: String,
    /// Ratio target; zero or negative disables the clause.
    #[serde(default)]
    pub target_ratio: f64,
    /// Seeding time target in hours; zero or negative disables the clause.
    #[serde(default)]
    pub target_seeding_hours: i64,
}

impl SeedingPolicyConfig {
    /// Build the runtime policy this configuration describes.
    pub fn to_policy(&self) -> SeedingPolicy {
        match self.mode {
            PolicyMode::States => SeedingPolicy::from_state_list(&self.target_states),
            PolicyMode::Thresholds => {
                SeedingPolicy::thresholds(self.target_ratio, self.target_seeding_hours)
            }
        }
    }
}

/// Housekeeping configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaintenanceConfig {
    /// Archived ledger rows older than this are deleted; zero or negative keeps them forever.
    #[serde(default = "default_keep_archived_days")]
    pub keep_archived_days: i64,
    /// Write Prometheus text exposition here after each run.
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            keep_archived_days: default_keep_archived_days(),
            metrics_textfile: None,
        }
    }
}

fn default_keep_archived_days() -> i64 {
    30
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub torrent_client: SanitizedTorrentClientConfig,
    pub remote_storage: RemoteStorageConfig,
    pub seeding_policy: SeedingPolicyConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTorrentClientConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbittorrent: Option<SanitizedQBittorrentConfig>,
}

/// Sanitized qBittorrent config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQBittorrentConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            database: config.database.clone(),
            logging: config.logging.clone(),
            torrent_client: SanitizedTorrentClientConfig {
                backend: match config.torrent_client.backend {
                    TorrentClientBackend::QBittorrent => "qbittorrent".to_string(),
                },
                qbittorrent: config.torrent_client.qbittorrent.as_ref().map(|q| {
                    SanitizedQBittorrentConfig {
                        url: q.url.clone(),
                        username: q.username.clone(),
                        password_configured: !q.password.is_empty(),
                        timeout_secs: q.timeout_secs,
                        category: q.category.clone(),
                    }
                }),
            },
            remote_storage: config.remote_storage.clone(),
            seeding_policy: config.seeding_policy.clone(),
            maintenance: config.maintenance.clone(),
        }
    }
}

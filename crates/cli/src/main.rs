mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedvault_core::config::{LogFormat, LoggingConfig, TorrentClientBackend};
use seedvault_core::local_content::FsLocalContent;
use seedvault_core::remote_storage::CommandStorage;
use seedvault_core::torrent_client::{QBittorrentClient, TorrentClient};
use seedvault_core::{
    load_config, metrics, validate_config, CleanupOrchestrator, ClientRemoval, Config,
    OrchestratorSettings, SanitizedConfig, SqliteTaskLedger, TaskLedger, UploadOrchestrator,
};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Logging settings come from the config, so a broken config still
    // needs default logging to report itself.
    let loaded = load_config(&cli.config);
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_logging(&logging);

    info!("Loading configuration from {:?}", cli.config);
    let config =
        loaded.with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Configuration: {:?}", SanitizedConfig::from(&config));

    let result = execute(cli.command, &config).await;

    if let Some(path) = &config.maintenance.metrics_textfile {
        if let Err(e) = write_metrics_textfile(path).await {
            error!("Failed to write metrics to {:?}: {:#}", path, e);
        }
    }

    result
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn execute(command: Commands, config: &Config) -> Result<()> {
    info!("Database path: {:?}", config.database.path);
    let ledger: Arc<dyn TaskLedger> = Arc::new(
        SqliteTaskLedger::new(
            &config.database.path,
            Duration::from_millis(config.database.busy_timeout_ms),
        )
        .context("Failed to open task ledger")?,
    );
    let storage = Arc::new(CommandStorage::new(config.remote_storage.command.clone()));
    let settings = OrchestratorSettings::from_config(config);

    match command {
        Commands::Upload {
            content_path,
            torrent_name,
            info_hash,
        } => {
            let id = info_hash.trim().to_lowercase();
            let orchestrator = UploadOrchestrator::new(ledger, storage, settings);
            let outcome = orchestrator
                .ingest(&id, &torrent_name, &content_path)
                .await
                .with_context(|| format!("Upload of {} failed", torrent_name))?;
            info!("Upload of {} ({}) done: {:?}", torrent_name, id, outcome);
        }
        Commands::Cleanup { json } => {
            let client = create_torrent_client(config)?;
            let local = Arc::new(FsLocalContent::new());
            let orchestrator = CleanupOrchestrator::new(ledger, client, storage, local, settings);
            let report = orchestrator.reconcile().await.context("Cleanup failed")?;

            if let ClientRemoval::Failed { ids, .. } = &report.removal {
                error!(
                    "{} archived torrents are still in the torrent client",
                    ids.len()
                );
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
    }

    Ok(())
}

fn create_torrent_client(config: &Config) -> Result<Arc<dyn TorrentClient>> {
    match config.torrent_client.backend {
        TorrentClientBackend::QBittorrent => {
            let qb_config = config
                .torrent_client
                .qbittorrent
                .clone()
                .context("qBittorrent backend selected but [torrent_client.qbittorrent] is missing")?;
            info!("Using qBittorrent at {}", qb_config.url);
            let client =
                QBittorrentClient::new(qb_config).context("Failed to create qBittorrent client")?;
            Ok(Arc::new(client))
        }
    }
}

/// Write the metrics text exposition for a textfile collector. The file is
/// replaced atomically so a scrape never sees a partial write.
async fn write_metrics_textfile(path: &Path) -> Result<()> {
    let text = metrics::render_text().context("Failed to encode metrics")?;
    let tmp = path.with_extension("prom.tmp");
    tokio::fs::write(&tmp, text)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {:?} into place", tmp))?;
    Ok(())
}

//! Command line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "seedvault")]
#[command(about = "Back up finished torrents to remote storage and retire them once seeded", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        env = "SEEDVAULT_CONFIG",
        default_value = "config.toml",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a completed download (run from the torrent client's completion hook)
    Upload {
        /// Local path of the downloaded content
        content_path: PathBuf,

        /// Torrent name, used as the remote file name
        torrent_name: String,

        /// Info hash of the torrent
        info_hash: String,
    },

    /// Delete uploaded content that has finished seeding
    Cleanup {
        /// Print the pass report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

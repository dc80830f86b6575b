//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for listing and retiring
//! torrents, with a qBittorrent Web API backend.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::*;

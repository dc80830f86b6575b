//! qBittorrent torrent client implementation (Web API v2).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::QBittorrentConfig;

use super::{TorrentClient, TorrentClientError, TorrentFilters, TorrentInfo};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Set once a login succeeded; cleared when the server rejects the session.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client. No network traffic happens until `login`.
    pub fn new(config: QBittorrentConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn authenticate(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            // Session cookie is stored by the cookie jar
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.authenticate().await
    }

    /// Send an authenticated request, re-authenticating once on 403.
    async fn send<F>(&self, build: F) -> Result<String, TorrentClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let response = build(&self.client).send().await.map_err(map_send_error)?;

        if response.status().as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.authenticate().await?;

            let response = build(&self.client).send().await.map_err(map_send_error)?;
            return read_body(response).await;
        }

        read_body(response).await
    }

    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        self.send(|client| client.get(&url)).await
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        self.send(|client| client.post(&url).form(params)).await
    }
}

fn map_send_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

async fn read_body(response: Response) -> Result<String, TorrentClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
    }

    response
        .text()
        .await
        .map_err(|e| TorrentClientError::ApiError(e.to_string()))
}

/// Subset of `/api/v2/torrents/info` entries the cleanup pass needs.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    #[serde(default)]
    ratio: f64,
    #[serde(default)]
    seeding_time: i64,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    category: String,
}

impl QBTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            save_path: self.save_path,
            raw_state: self.state,
            ratio: self.ratio,
            seeding_secs: self.seeding_time.max(0) as u64,
            category: (!self.category.is_empty()).then_some(self.category),
        }
    }
}

fn list_endpoint(filters: &TorrentFilters) -> String {
    let mut endpoint = "/api/v2/torrents/info".to_string();
    if let Some(category) = &filters.category {
        endpoint.push_str("?category=");
        endpoint.push_str(&urlencoding::encode(category));
    }
    endpoint
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn login(&self) -> Result<(), TorrentClientError> {
        debug!("Logging in to qBittorrent at {}", self.base_url());
        self.authenticate().await?;

        let version = self.get("/api/v2/app/version").await?;
        info!("Connected to qBittorrent {}", version.trim());
        Ok(())
    }

    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        let response = self.get(&list_endpoint(filters)).await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(torrents.into_iter().map(|t| t.into_torrent_info()).collect())
    }

    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        if hashes.is_empty() {
            return Ok(());
        }

        let joined = hashes
            .iter()
            .map(|h| h.to_lowercase())
            .collect::<Vec<_>>()
            .join("|");
        let delete_str = if delete_files { "true" } else { "false" };

        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", joined.as_str()), ("deleteFiles", delete_str)],
        )
        .await?;

        Ok(())
    }
}

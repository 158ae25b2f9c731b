//! Transmission RPC submission
//!
//! Talks the Transmission JSON-RPC dialect: every request may be answered
//! with 409 plus a fresh `X-Transmission-Session-Id`, in which case the same
//! request is replayed once with the new id. That handshake is part of the
//! protocol, not a retry policy.

use crate::config::TransmissionConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Mutex;

const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Seam between the workflow and the torrent daemon.
///
/// The workflow only needs "hand this descriptor to the daemon with this
/// download directory"; tests substitute an in-memory implementation.
#[async_trait]
pub trait TorrentSubmitter: Send + Sync {
    /// Submit a saved descriptor for download into `destination`.
    ///
    /// Returns the daemon-assigned torrent id.
    async fn submit(&self, descriptor: &Path, destination: &Path) -> Result<i64>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: RpcArguments,
}

#[derive(Debug, Default, Deserialize)]
struct RpcArguments {
    #[serde(rename = "torrent-added")]
    torrent_added: Option<TorrentRef>,
    #[serde(rename = "torrent-duplicate")]
    torrent_duplicate: Option<TorrentRef>,
}

#[derive(Debug, Deserialize)]
struct TorrentRef {
    id: i64,
    name: String,
}

/// JSON-RPC client for a Transmission daemon
pub struct TransmissionClient {
    http: reqwest::Client,
    config: TransmissionConfig,
    // Last session id handed out by the daemon; refreshed on 409.
    session_id: Mutex<Option<HeaderValue>>,
}

impl TransmissionClient {
    /// Build a client from daemon configuration.
    pub fn new(config: TransmissionConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            config,
            session_id: Mutex::new(None),
        })
    }

    /// Check the daemon is reachable and answering RPC.
    pub async fn probe(&self) -> Result<()> {
        let body = json!({ "method": "session-get" });
        let response = self.call(&body).await?;
        if response.result != "success" {
            return Err(Error::Transmission {
                reason: format!("session-get returned {}", response.result),
            });
        }
        tracing::debug!(url = %self.config.url, "transmission daemon reachable");
        Ok(())
    }

    /// POST an RPC body, replaying once after a 409 session-id handshake.
    async fn call(&self, body: &serde_json::Value) -> Result<RpcResponse> {
        let first = self.send(body).await?;
        let response = if first.status() == StatusCode::CONFLICT {
            self.store_session_id(&first);
            self.send(body).await?
        } else {
            first
        };

        if !response.status().is_success() {
            return Err(Error::Transmission {
                reason: format!("daemon answered HTTP {}", response.status()),
            });
        }
        self.store_session_id(&response);
        let parsed = response.json::<RpcResponse>().await.map_err(|e| {
            Error::Transmission {
                reason: format!("malformed RPC response: {e}"),
            }
        })?;
        Ok(parsed)
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let mut request = self.http.post(&self.config.url).json(body);
        if let Some(id) = self.session_header() {
            request = request.header(SESSION_ID_HEADER, id);
        }
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }
        let response = request.send().await.map_err(|e| {
            // Connection-level failures get the dedicated user message.
            Error::Transmission {
                reason: format!("failed to connect to daemon: {e}"),
            }
        })?;
        Ok(response)
    }

    fn session_header(&self) -> Option<HeaderValue> {
        match self.session_id.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_session_id(&self, response: &reqwest::Response) {
        if let Some(id) = response.headers().get(SESSION_ID_HEADER) {
            let stored = id.clone();
            match self.session_id.lock() {
                Ok(mut guard) => *guard = Some(stored),
                Err(poisoned) => *poisoned.into_inner() = Some(stored),
            }
        }
    }
}

#[async_trait]
impl TorrentSubmitter for TransmissionClient {
    async fn submit(&self, descriptor: &Path, destination: &Path) -> Result<i64> {
        let data = tokio::fs::read(descriptor)
            .await
            .map_err(|source| Error::FileSystem {
                path: descriptor.to_path_buf(),
                source,
            })?;

        let body = json!({
            "method": "torrent-add",
            "arguments": {
                "metainfo": BASE64.encode(&data),
                "download-dir": destination.to_string_lossy(),
            },
        });
        let response = self.call(&body).await?;

        if response.result != "success" {
            return Err(Error::Transmission {
                reason: format!("torrent-add returned {}", response.result),
            });
        }
        if let Some(duplicate) = response.arguments.torrent_duplicate {
            return Err(Error::Transmission {
                reason: format!("torrent already added: {} (id {})", duplicate.name, duplicate.id),
            });
        }
        let added = response
            .arguments
            .torrent_added
            .ok_or_else(|| Error::Transmission {
                reason: "torrent-add succeeded without a torrent-added record".to_string(),
            })?;

        tracing::info!(id = added.id, name = %added.name, "torrent submitted");
        Ok(added.id)
    }
}

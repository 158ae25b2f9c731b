//! Configuration types for kinozal-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tracker site configuration (address, credentials, endpoint paths)
///
/// Used as a nested sub-config within [`Config`]. The base URLs are plain
/// strings so tests can point the client at a local mock server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the catalog site (default: "https://kinozal.tv")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the descriptor-serving subdomain (default: "https://dl.kinozal.tv")
    ///
    /// The site serves `.torrent` files from a separate host.
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,

    /// Account username (required)
    #[serde(default)]
    pub username: String,

    /// Account password (required)
    #[serde(default)]
    pub password: String,

    /// Site endpoint paths
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_base_url: default_download_base_url(),
            username: String::new(),
            password: String::new(),
            endpoints: EndpointsConfig::default(),
        }
    }
}

/// Paths of the four tracker endpoints the pipeline consumes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Login form POST target (default: "/takelogin.php")
    #[serde(default = "default_login_endpoint")]
    pub login: String,

    /// Search page (default: "/browse.php")
    #[serde(default = "default_search_endpoint")]
    pub search: String,

    /// Release detail page (default: "/details.php")
    #[serde(default = "default_details_endpoint")]
    pub details: String,

    /// Detail-hash fragment endpoint (default: "/get_srv_details.php")
    #[serde(default = "default_hash_endpoint")]
    pub hash: String,

    /// Descriptor download path on the download subdomain (default: "/download.php")
    #[serde(default = "default_download_endpoint")]
    pub download: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            login: default_login_endpoint(),
            search: default_search_endpoint(),
            details: default_details_endpoint(),
            hash: default_hash_endpoint(),
            download: default_download_endpoint(),
        }
    }
}

/// Transmission RPC configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransmissionConfig {
    /// Full RPC URL (default: "http://localhost:9091/transmission/rpc")
    #[serde(default = "default_transmission_url")]
    pub url: String,

    /// HTTP basic auth username (None = no auth)
    #[serde(default)]
    pub username: Option<String>,

    /// HTTP basic auth password
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            url: default_transmission_url(),
            username: None,
            password: None,
        }
    }
}

/// Folder configuration: transient descriptor dir plus destination categories
///
/// Used as a nested sub-config within [`Config`]. The three destination
/// folders are independent; none of them may alias another's label.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoldersConfig {
    /// Directory for transient `.torrent` descriptors (default: "./torrents")
    #[serde(default = "default_torrents_dir")]
    pub torrents_dir: PathBuf,

    /// Destination for films (default: "./downloads/films")
    #[serde(default = "default_films_dir")]
    pub films: PathBuf,

    /// Destination for series (default: "./downloads/series")
    #[serde(default = "default_series_dir")]
    pub series: PathBuf,

    /// Destination for audiobooks (default: "./downloads/audiobooks")
    #[serde(default = "default_audiobooks_dir")]
    pub audiobooks: PathBuf,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            torrents_dir: default_torrents_dir(),
            films: default_films_dir(),
            series: default_series_dir(),
            audiobooks: default_audiobooks_dir(),
        }
    }
}

/// Main configuration for the acquisition pipeline
///
/// Fields are organized into logical sub-configs:
/// - [`tracker`](TrackerConfig) — site address, credentials, endpoints
/// - [`transmission`](TransmissionConfig) — download-client RPC
/// - [`folders`](FoldersConfig) — descriptor dir and destination categories
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Catalog site settings
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Download-client RPC settings
    #[serde(default)]
    pub transmission: TransmissionConfig,

    /// Folder layout
    #[serde(default)]
    pub folders: FoldersConfig,

    /// Capacity bound of the in-memory selection store (default: 64 entries)
    ///
    /// When exceeded, the oldest stored selection is evicted.
    #[serde(default = "default_max_pending_selections")]
    pub max_pending_selections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            transmission: TransmissionConfig::default(),
            folders: FoldersConfig::default(),
            max_pending_selections: default_max_pending_selections(),
        }
    }
}

impl Config {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.tracker.username.is_empty() {
            return Err(Error::Config {
                message: "tracker username is required".to_string(),
                key: Some("tracker.username".to_string()),
            });
        }
        if self.tracker.password.is_empty() {
            return Err(Error::Config {
                message: "tracker password is required".to_string(),
                key: Some("tracker.password".to_string()),
            });
        }
        if url::Url::parse(&self.tracker.base_url).is_err() {
            return Err(Error::Config {
                message: format!("invalid tracker base URL: {}", self.tracker.base_url),
                key: Some("tracker.base_url".to_string()),
            });
        }
        if url::Url::parse(&self.tracker.download_base_url).is_err() {
            return Err(Error::Config {
                message: format!(
                    "invalid descriptor base URL: {}",
                    self.tracker.download_base_url
                ),
                key: Some("tracker.download_base_url".to_string()),
            });
        }
        if url::Url::parse(&self.transmission.url).is_err() {
            return Err(Error::Config {
                message: format!("invalid Transmission RPC URL: {}", self.transmission.url),
                key: Some("transmission.url".to_string()),
            });
        }
        if self.max_pending_selections == 0 {
            return Err(Error::Config {
                message: "selection store capacity must be at least 1".to_string(),
                key: Some("max_pending_selections".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://kinozal.tv".to_string()
}

fn default_download_base_url() -> String {
    "https://dl.kinozal.tv".to_string()
}

fn default_login_endpoint() -> String {
    "/takelogin.php".to_string()
}

fn default_search_endpoint() -> String {
    "/browse.php".to_string()
}

fn default_details_endpoint() -> String {
    "/details.php".to_string()
}

fn default_hash_endpoint() -> String {
    "/get_srv_details.php".to_string()
}

fn default_download_endpoint() -> String {
    "/download.php".to_string()
}

fn default_transmission_url() -> String {
    "http://localhost:9091/transmission/rpc".to_string()
}

fn default_torrents_dir() -> PathBuf {
    PathBuf::from("./torrents")
}

fn default_films_dir() -> PathBuf {
    PathBuf::from("./downloads/films")
}

fn default_series_dir() -> PathBuf {
    PathBuf::from("./downloads/series")
}

fn default_audiobooks_dir() -> PathBuf {
    PathBuf::from("./downloads/audiobooks")
}

fn default_max_pending_selections() -> usize {
    64
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            tracker: TrackerConfig {
                username: "user".to_string(),
                password: "pass".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn default_config_has_site_endpoints() {
        let config = Config::default();
        assert_eq!(config.tracker.endpoints.login, "/takelogin.php");
        assert_eq!(config.tracker.endpoints.search, "/browse.php");
        assert_eq!(config.tracker.endpoints.details, "/details.php");
        assert_eq!(config.tracker.endpoints.hash, "/get_srv_details.php");
        assert_eq!(config.tracker.base_url, "https://kinozal.tv");
        assert_eq!(config.tracker.download_base_url, "https://dl.kinozal.tv");
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("tracker.username"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = valid_config();
        config.tracker.base_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("tracker.base_url"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_selection_capacity() {
        let mut config = valid_config();
        config.max_pending_selections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_complete_config() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn config_deserializes_from_partial_json() {
        let json = r#"{
            "tracker": { "username": "u", "password": "p" },
            "folders": { "films": "/mnt/films" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.tracker.username, "u");
        assert_eq!(config.folders.films, PathBuf::from("/mnt/films"));
        // Untouched fields keep their defaults
        assert_eq!(config.folders.series, PathBuf::from("./downloads/series"));
        assert_eq!(config.max_pending_selections, 64);
    }
}

//! Error types for kinozal-dl
//!
//! Every component raises a typed variant carrying enough context (release
//! id, query, HTTP status, cookie names) for the caller to render a specific
//! message. [`Error::user_message`] maps each kind to the fixed user-readable
//! string shown by the transport; unmapped kinds fall back to a generic one.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kinozal-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for kinozal-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Login or session failure against the tracker
    ///
    /// Carries the HTTP status of the login attempt and the session cookie
    /// names actually present in the jar afterwards, for diagnosis.
    #[error("authentication failed with status {status}, cookies present: {cookies:?}")]
    Authentication {
        /// HTTP status returned by the login endpoint
        status: u16,
        /// Names of the cookies the jar held after the attempt
        cookies: Vec<String>,
    },

    /// Malformed or unexpected catalog HTML
    #[error("parse error: {reason}")]
    Parse {
        /// What was missing or malformed
        reason: String,
    },

    /// Search operation failed against the tracker
    #[error("search for {query:?} failed: {reason}")]
    Search {
        /// The free-text query that was being searched
        query: String,
        /// Underlying failure description
        reason: String,
    },

    /// Descriptor download failed (wrong content type, empty body, HTTP error)
    #[error("descriptor download for release {release_id} failed: {reason}")]
    Download {
        /// The release whose descriptor was requested
        release_id: String,
        /// Underlying failure description
        reason: String,
    },

    /// Stale or duplicate selection (entry missing or already consumed)
    #[error("session error: {reason}")]
    Session {
        /// Why the selection could not be resolved
        reason: String,
    },

    /// Download-client RPC failure, carrying the client's error text
    #[error("transmission error: {reason}")]
    Transmission {
        /// Error text reported by (or about) the Transmission client
        reason: String,
    },

    /// Descriptor persistence failure
    #[error("filesystem error at {path}: {source}")]
    FileSystem {
        /// The path the operation was acting on
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "tracker.username")
        key: Option<String>,
    },

    /// Transport-level network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Fixed user-readable message for this error kind.
    ///
    /// The outermost handler renders exactly one of these per failed step;
    /// kinds without a specific mapping get the generic fallback.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Authentication { .. } => "Ошибка авторизации на сайте. Попробуйте позже.",
            Error::Parse { .. } => "Ошибка обработки данных с сайта.",
            Error::Search { .. } => "Ошибка при поиске. Попробуйте изменить запрос.",
            Error::Download { .. } => "Ошибка при скачивании торрент-файла.",
            Error::Session { .. } => "Ошибка сессии. Попробуйте выполнить поиск заново.",
            Error::Transmission { reason } => {
                // Connection refusals read differently from add failures.
                if reason.contains("connect") {
                    "Ошибка подключения к Transmission."
                } else {
                    "Ошибка при добавлении торрента в Transmission."
                }
            }
            Error::FileSystem { .. } => "Ошибка при работе с файловой системой.",
            Error::Config { .. } | Error::Network(_) => {
                "Произошла неизвестная ошибка. Попробуйте позже."
            }
        }
    }
}

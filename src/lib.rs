//! # kinozal-dl
//!
//! Backend library for driving torrent acquisition from the Kinozal catalog
//! through a Transmission daemon.
//!
//! ## Design Philosophy
//!
//! kinozal-dl is designed to be:
//! - **Transport-agnostic** - Workflow steps return plain replies with
//!   tappable choices; the embedding bot decides how to render them
//! - **Sensible defaults** - The stock site endpoints and folder layout work
//!   out of the box, only credentials are required
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Typed end to end** - Choice tokens, destinations, and errors are
//!   enums, never delimiter-packed strings
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kinozal_dl::{Config, DownloadWorkflow, KinozalClient, TransmissionClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.tracker.username = "user".to_string();
//!     config.tracker.password = "secret".to_string();
//!     config.validate()?;
//!
//!     let client = KinozalClient::new(config.tracker.clone())?;
//!     let transmission = Arc::new(TransmissionClient::new(config.transmission.clone())?);
//!     let workflow = DownloadWorkflow::new(
//!         client,
//!         transmission,
//!         config.folders.clone(),
//!         config.max_pending_selections,
//!     );
//!
//!     let reply = workflow.handle_search(1, "Матрица").await?;
//!     for choice in &reply.choices {
//!         println!("{} -> {}", choice.label, choice.token);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Session-authenticated site client
pub mod client;
/// Configuration types
pub mod config;
/// Transient descriptor persistence
pub mod descriptor;
/// Error types
pub mod error;
/// Catalog page parsing
pub mod parser;
/// Pending selection store
pub mod selection;
/// Transmission RPC submission
pub mod transmission;
/// Core types
pub mod types;
/// Acquisition workflow orchestration
pub mod workflow;

pub use client::KinozalClient;
pub use config::{Config, EndpointsConfig, FoldersConfig, TrackerConfig, TransmissionConfig};
pub use error::{Error, Result};
pub use selection::SelectionStore;
pub use transmission::{TorrentSubmitter, TransmissionClient};
pub use types::{
    Choice, ConversationId, Destination, ReleaseDetail, Reply, SearchResult, SelectionEntry,
    Token, MAX_CHOICES, TITLE_LIMIT,
};
pub use workflow::DownloadWorkflow;

//! Acquisition workflow orchestration
//!
//! Chains the four user-facing steps: search, selection, descriptor
//! download, and submission to the torrent daemon. Every step returns a
//! [`Reply`] for the messaging transport; errors bubble up typed so the
//! caller can render [`crate::error::Error::user_message`] in the user's
//! language.

use crate::client::KinozalClient;
use crate::config::FoldersConfig;
use crate::descriptor;
use crate::error::{Error, Result};
use crate::parser;
use crate::selection::SelectionStore;
use crate::transmission::TorrentSubmitter;
use crate::types::{
    Choice, ConversationId, Destination, Reply, SelectionEntry, Token, MAX_CHOICES,
};
use std::sync::Arc;

/// Drives one acquisition pipeline: catalog search through daemon submission
pub struct DownloadWorkflow {
    client: KinozalClient,
    store: SelectionStore,
    submitter: Arc<dyn TorrentSubmitter>,
    folders: FoldersConfig,
}

impl DownloadWorkflow {
    /// Assemble a workflow from its parts.
    ///
    /// `max_pending` bounds the in-memory selection store; when exceeded the
    /// oldest pending selection is evicted.
    pub fn new(
        client: KinozalClient,
        submitter: Arc<dyn TorrentSubmitter>,
        folders: FoldersConfig,
        max_pending: usize,
    ) -> Self {
        Self {
            client,
            store: SelectionStore::new(max_pending),
            submitter,
            folders,
        }
    }

    /// Route an echoed-back token to the matching workflow step.
    pub async fn dispatch(&self, conversation: ConversationId, token: Token) -> Result<Reply> {
        match token {
            Token::Select { ordinal } => self.handle_selection(conversation, ordinal).await,
            Token::Download { release_id } => self.handle_download(&release_id).await,
            Token::Destination {
                release_id,
                destination,
            } => self.handle_destination(&release_id, destination).await,
        }
    }

    /// Search the catalog and present the top-ranked results as choices.
    ///
    /// Stores each presented result under `(conversation, ordinal)` for the
    /// later selection tap. An empty result set stores nothing.
    pub async fn handle_search(
        &self,
        conversation: ConversationId,
        query: &str,
    ) -> Result<Reply> {
        tracing::info!(conversation, query, "searching catalog");
        let page = self.client.search_page(query).await?;
        let results = parser::parse_search_results(&page).map_err(|e| Error::Search {
            query: query.to_string(),
            reason: e.to_string(),
        })?;

        if results.is_empty() {
            tracing::debug!(conversation, query, "no results");
            return Ok(Reply::text("По вашему запросу ничего не найдено"));
        }

        let total = results.len();
        let mut choices = Vec::new();
        for (ordinal, result) in results.iter().take(MAX_CHOICES).enumerate() {
            let ordinal = ordinal as u8;
            self.store
                .put(conversation, ordinal, SelectionEntry::from(result));
            choices.push(Choice {
                label: format!(
                    "{} ({}, сидов: {})",
                    result.title,
                    result.size,
                    result.seeders_text()
                ),
                token: Token::Select { ordinal },
            });
        }

        Ok(Reply {
            text: format!("Найдено раздач: {total}. Выберите одну:"),
            choices,
        })
    }

    /// Resolve a tapped search choice into a full release card.
    ///
    /// The stored entry is consumed before any network work, so a duplicate
    /// tap fails fast without touching the site.
    pub async fn handle_selection(
        &self,
        conversation: ConversationId,
        ordinal: u8,
    ) -> Result<Reply> {
        let entry = self.store.take(conversation, ordinal)?;
        tracing::info!(conversation, release_id = %entry.release_id, "selection resolved");

        // The site serves the info hash from a separate fragment endpoint;
        // both documents feed one parse.
        let detail_html = self.client.detail_page(&entry.release_id).await?;
        let hash_fragment = self.client.hash_fragment(&entry.release_id).await?;
        let source = format!("{detail_html}\n{hash_fragment}");

        let detail_url = self.client.detail_url(&entry.release_id)?;
        let detail = parser::parse_release_detail(&source, detail_url.as_str())?;

        Ok(Reply {
            text: detail.card(),
            choices: vec![Choice {
                label: "Скачать".to_string(),
                token: Token::Download {
                    release_id: detail.release_id,
                },
            }],
        })
    }

    /// Fetch and persist the release's descriptor, then ask for a folder.
    pub async fn handle_download(&self, release_id: &str) -> Result<Reply> {
        let data = self.client.fetch_descriptor(release_id).await?;
        descriptor::save(&self.folders.torrents_dir, release_id, &data).await?;

        let choices = Destination::ALL
            .iter()
            .map(|&destination| Choice {
                label: destination.label().to_string(),
                token: Token::Destination {
                    release_id: release_id.to_string(),
                    destination,
                },
            })
            .collect();

        Ok(Reply {
            text: "Выберите папку для загрузки:".to_string(),
            choices,
        })
    }

    /// Submit the saved descriptor to the daemon with the chosen folder.
    ///
    /// The transient descriptor file is deleted whether or not the
    /// submission succeeds.
    pub async fn handle_destination(
        &self,
        release_id: &str,
        destination: Destination,
    ) -> Result<Reply> {
        let path = descriptor::path_for(&self.folders.torrents_dir, release_id);
        let download_dir = destination.resolve(&self.folders);

        let outcome = self.submitter.submit(&path, download_dir).await;
        descriptor::cleanup(&path).await;
        let torrent_id = outcome?;

        tracing::info!(release_id, torrent_id, folder = destination.label(), "submitted");
        Ok(Reply::text(format!(
            "Торрент добавлен в загрузки. Папка: {}",
            destination.label()
        )))
    }
}

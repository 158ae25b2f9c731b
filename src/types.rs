//! Core types for kinozal-dl

use crate::config::FoldersConfig;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Identifier of a conversation with one user on the messaging transport
pub type ConversationId = i64;

/// Rendered title length limit; longer titles get an ellipsis marker
pub const TITLE_LIMIT: usize = 30;

/// Number of top-ranked search results offered as selectable choices
pub const MAX_CHOICES: usize = 5;

/// One row of a catalog search page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Opaque numeric release identifier from the site
    pub release_id: String,
    /// Display title, truncated to [`TITLE_LIMIT`] chars plus "..." if longer
    pub title: String,
    /// Free-form size text as rendered by the site
    pub size: String,
    /// Seeder count; `None` when the site renders something non-numeric
    pub seeders: Option<u32>,
}

impl SearchResult {
    /// Seeder count used for ranking (unknown sorts as zero).
    pub fn rank(&self) -> u32 {
        self.seeders.unwrap_or(0)
    }

    /// Seeder count as display text ("Нет данных" when unknown).
    pub fn seeders_text(&self) -> String {
        match self.seeders {
            Some(n) => n.to_string(),
            None => "Нет данных".to_string(),
        }
    }
}

/// Full metadata of a single release, assembled from the detail page and
/// the hash fragment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseDetail {
    /// Opaque numeric release identifier
    pub release_id: String,
    /// Cleaned-up release title
    pub title: String,
    /// Genre text ("Не указан" when the markup lacks one)
    pub genre: String,
    /// Free-form size text ("Размер не найден" when absent)
    pub size: String,
    /// Seeder count as text ("Нет данных" when absent)
    pub seeders: String,
    /// 40-hex-character BitTorrent info hash; always present
    pub info_hash: String,
}

impl ReleaseDetail {
    /// Render the release card shown to the user.
    pub fn card(&self) -> String {
        format!(
            "{}\n\nЖанр: {}\nРазмер: {}\nРаздают: {}\nИнфо хеш: {}",
            self.title, self.genre, self.size, self.seeders, self.info_hash
        )
    }
}

/// A stored search choice awaiting the user's selection tap
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionEntry {
    /// Opaque numeric release identifier
    pub release_id: String,
    /// Truncated display title
    pub title: String,
    /// Free-form size text
    pub size: String,
    /// Seeder count, if known
    pub seeders: Option<u32>,
}

impl From<&SearchResult> for SelectionEntry {
    fn from(result: &SearchResult) -> Self {
        Self {
            release_id: result.release_id.clone(),
            title: result.title.clone(),
            size: result.size.clone(),
            seeders: result.seeders,
        }
    }
}

/// Destination folder category a completed download is routed into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Films folder
    Films,
    /// Series folder
    Series,
    /// Audiobooks folder
    Audiobooks,
}

impl Destination {
    /// All categories in presentation order.
    pub const ALL: [Destination; 3] = [
        Destination::Films,
        Destination::Series,
        Destination::Audiobooks,
    ];

    /// Stable wire key used inside tokens.
    pub fn key(self) -> &'static str {
        match self {
            Destination::Films => "films",
            Destination::Series => "series",
            Destination::Audiobooks => "audiobooks",
        }
    }

    /// Human-readable label. Each category is independently labeled.
    pub fn label(self) -> &'static str {
        match self {
            Destination::Films => "Фильмы",
            Destination::Series => "Сериалы",
            Destination::Audiobooks => "Аудиокниги",
        }
    }

    /// Resolve the configured filesystem path for this category.
    pub fn resolve<'a>(self, folders: &'a FoldersConfig) -> &'a Path {
        match self {
            Destination::Films => &folders.films,
            Destination::Series => &folders.series,
            Destination::Audiobooks => &folders.audiobooks,
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "films" => Ok(Destination::Films),
            "series" => Ok(Destination::Series),
            "audiobooks" => Ok(Destination::Audiobooks),
            other => Err(Error::Session {
                reason: format!("unknown destination key: {other}"),
            }),
        }
    }
}

/// Typed workflow token carried through the messaging transport
///
/// Replaces the original delimiter-packed callback strings: every field is
/// a numeric id or a fixed key, so display names can never make a token
/// ambiguous.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// User tapped one of the presented search results
    Select {
        /// 0-based position within the presented top-5 list
        ordinal: u8,
    },
    /// User tapped "begin download" on a release card
    Download {
        /// The release whose descriptor should be fetched
        release_id: String,
    },
    /// User tapped a destination folder choice
    Destination {
        /// The release whose descriptor is awaiting submission
        release_id: String,
        /// The chosen folder category
        destination: Destination,
    },
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Select { ordinal } => write!(f, "sel:{ordinal}"),
            Token::Download { release_id } => write!(f, "dl:{release_id}"),
            Token::Destination {
                release_id,
                destination,
            } => write!(f, "dest:{}:{}", release_id, destination.key()),
        }
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::Session {
            reason: format!("malformed token: {s}"),
        };
        let mut parts = s.splitn(3, ':');
        match parts.next() {
            Some("sel") => {
                let ordinal = parts
                    .next()
                    .and_then(|p| p.parse::<u8>().ok())
                    .ok_or_else(bad)?;
                Ok(Token::Select { ordinal })
            }
            Some("dl") => {
                let release_id = parts.next().filter(|p| !p.is_empty()).ok_or_else(bad)?;
                Ok(Token::Download {
                    release_id: release_id.to_string(),
                })
            }
            Some("dest") => {
                let release_id = parts.next().filter(|p| !p.is_empty()).ok_or_else(bad)?;
                let destination = parts.next().ok_or_else(bad)?.parse::<Destination>()?;
                Ok(Token::Destination {
                    release_id: release_id.to_string(),
                    destination,
                })
            }
            _ => Err(bad()),
        }
    }
}

/// One selectable choice offered to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    /// Display label
    pub label: String,
    /// Opaque token the transport echoes back when the choice is tapped
    pub token: Token,
}

/// Outbound message produced by a workflow step
///
/// The transport renders `text` plainly and the choices as tappable
/// buttons; the crate never produces transport-specific markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// Message body
    pub text: String,
    /// Ordered list of selectable choices (may be empty)
    pub choices: Vec<Choice>,
}

impl Reply {
    /// A plain text reply with no choices.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }
}

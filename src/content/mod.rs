//! Remote content store: record types and the store abstraction.
//!
//! The store is an opaque collaborator with two read operations. "No matching
//! record" is a normal outcome (`Ok(None)`), kept apart from transport and
//! decode failures (`Err(StoreError)`).
//!
//! - [`rest`] - PostgREST-style HTTP implementation

pub mod rest;

use crate::menu::Selection;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use rest::{RestStore, StoreSettings};

// ============================================================================
// Records
// ============================================================================

/// One editorial card inside a content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, alias = "url")]
    pub source_url: Option<String>,
    #[serde(default, alias = "source")]
    pub source_label: Option<String>,
}

/// A source link attached to a content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// The most recent store entry for a selection. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentRecord {
    pub content: String,
    pub cards: Vec<Card>,
    pub links: Vec<Link>,
    pub date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ContentRecord {
    /// Record with only a body, mostly for tests and fakes.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Number of voiceable items: the body followed by each card.
    pub fn item_count(&self) -> usize {
        1 + self.cards.len()
    }

    /// Text to read aloud for item `index` (0 = body, 1.. = cards).
    pub fn item_text(&self, index: usize) -> Option<String> {
        if index == 0 {
            return Some(self.content.clone());
        }
        self.cards.get(index - 1).map(|card| {
            if card.title.is_empty() {
                card.body.clone()
            } else if card.body.is_empty() {
                card.title.clone()
            } else {
                format!("{}。{}", card.title, card.body)
            }
        })
    }

    /// Openable URLs in display order: links first, then card sources.
    pub fn open_targets(&self) -> Vec<(&str, &str)> {
        let links = self
            .links
            .iter()
            .map(|l| (l.title.as_str(), l.url.as_str()));
        let sources = self.cards.iter().filter_map(|c| {
            c.source_url.as_deref().map(|url| {
                let label = c.source_label.as_deref().unwrap_or(c.title.as_str());
                (label, url)
            })
        });
        links.chain(sources).collect()
    }
}

/// A single editorial quote, fetched once at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteRecord {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed store response: {0}")]
    Decode(String),
    #[error("Invalid store URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure store URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Compact failure classification carried in view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Transport,
    Status(u16),
    TooLarge,
    Decode,
    Config,
    /// The fetch task itself failed (panicked) before producing an outcome.
    Internal,
}

impl StoreError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            StoreError::Timeout(_) => FetchErrorKind::Timeout,
            StoreError::Network(_) => FetchErrorKind::Transport,
            StoreError::HttpStatus(status) => FetchErrorKind::Status(*status),
            StoreError::ResponseTooLarge(_) => FetchErrorKind::TooLarge,
            StoreError::Decode(_) => FetchErrorKind::Decode,
            StoreError::InvalidBaseUrl(_) | StoreError::InsecureBaseUrl => FetchErrorKind::Config,
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timed out"),
            FetchErrorKind::Transport => write!(f, "network error"),
            FetchErrorKind::Status(status) => write!(f, "store returned HTTP {}", status),
            FetchErrorKind::TooLarge => write!(f, "response too large"),
            FetchErrorKind::Decode => write!(f, "malformed response"),
            FetchErrorKind::Config => write!(f, "store misconfigured"),
            FetchErrorKind::Internal => write!(f, "internal error"),
        }
    }
}

// ============================================================================
// Store Abstraction
// ============================================================================

/// Read access to the remote content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The newest quote, or `None` when the store has none.
    async fn fetch_latest_quote(&self) -> Result<Option<QuoteRecord>, StoreError>;

    /// The newest record for `selection`, or `None` when nothing matches.
    async fn fetch_latest_content(
        &self,
        selection: &Selection,
    ) -> Result<Option<ContentRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record_with_cards() -> ContentRecord {
        ContentRecord {
            content: "今日综述".to_string(),
            cards: vec![
                Card {
                    title: "标题".to_string(),
                    body: "正文".to_string(),
                    image_url: None,
                    source_url: Some("https://example.com/a".to_string()),
                    source_label: Some("Example".to_string()),
                },
                Card {
                    title: String::new(),
                    body: "只有正文".to_string(),
                    image_url: None,
                    source_url: None,
                    source_label: None,
                },
            ],
            links: vec![Link {
                title: "Source".to_string(),
                url: "https://example.com/src".to_string(),
            }],
            date: None,
            created_at: None,
        }
    }

    #[test]
    fn test_item_text() {
        let record = record_with_cards();
        assert_eq!(record.item_count(), 3);
        assert_eq!(record.item_text(0).as_deref(), Some("今日综述"));
        assert_eq!(record.item_text(1).as_deref(), Some("标题。正文"));
        assert_eq!(record.item_text(2).as_deref(), Some("只有正文"));
        assert_eq!(record.item_text(3), None);
    }

    #[test]
    fn test_open_targets_links_then_sources() {
        let record = record_with_cards();
        assert_eq!(
            record.open_targets(),
            vec![
                ("Source", "https://example.com/src"),
                ("Example", "https://example.com/a"),
            ]
        );
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(StoreError::Timeout(20).kind(), FetchErrorKind::Timeout);
        assert_eq!(
            StoreError::HttpStatus(503).kind(),
            FetchErrorKind::Status(503)
        );
        assert_eq!(
            StoreError::Decode("bad".into()).kind(),
            FetchErrorKind::Decode
        );
        assert_eq!(StoreError::InsecureBaseUrl.kind(), FetchErrorKind::Config);
    }

    #[test]
    fn test_card_aliases() {
        let card: Card = serde_json::from_str(
            r#"{"title":"T","content":"B","url":"https://e.com","source":"E"}"#,
        )
        .unwrap();
        assert_eq!(card.body, "B");
        assert_eq!(card.source_url.as_deref(), Some("https://e.com"));
        assert_eq!(card.source_label.as_deref(), Some("E"));
    }
}

//! Value types shared by every connector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::NormalizedSet;

/// How a connector talks to its site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Scrapes server-rendered HTML.
    Native,
    /// Configured mapping over a JSON API.
    Declarative,
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Declarative => write!(f, "declarative"),
        }
    }
}

/// Normalized metadata for one item on one source site.
///
/// Created fresh per call; never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MangaResult {
    /// Key of the connector that produced this result.
    pub source_key: String,
    /// Connector-local stable identifier (slug, numeric id, UUID).
    pub source_item_id: String,
    /// Primary display title. Never empty.
    pub title: String,
    /// Alias titles, deduplicated by normalized form, excluding the title.
    #[serde(default)]
    pub related_titles: Vec<String>,
    /// Canonical page URL on the source site.
    pub url: String,
    /// Absolute cover URL, or empty.
    #[serde(default)]
    pub cover_image_url: String,
    /// Latest chapter number. Fractional values denote side releases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_chapter: Option<f64>,
    /// Best-effort update time of `latest_chapter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl MangaResult {
    /// Create a result with only the required fields set.
    pub fn new(
        source_key: impl Into<String>,
        source_item_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            source_item_id: source_item_id.into(),
            title: title.into(),
            related_titles: Vec::new(),
            url: url.into(),
            cover_image_url: String::new(),
            latest_chapter: None,
            last_updated_at: None,
        }
    }

    /// Replace the related titles, dropping anything normalization-equal to
    /// the title or to an earlier alias.
    pub fn set_related_titles<I, S>(&mut self, titles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = NormalizedSet::new();
        seen.insert(&self.title);
        self.related_titles = titles
            .into_iter()
            .filter_map(|t| {
                let t = t.as_ref().trim();
                if !t.is_empty() && seen.insert(t) {
                    Some(t.to_string())
                } else {
                    None
                }
            })
            .collect();
    }
}

/// Read-only identity projection of a connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Descriptor {
    pub key: String,
    pub name: String,
    pub kind: ConnectorKind,
}

/// Liveness projection of a connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub key: String,
    pub name: String,
    pub kind: ConnectorKind,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

//! Core types for pictogram matching

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Label given to a match that fell below the confidence threshold.
///
/// Signals "no suitable pictogram yet, candidate for generation".
pub const PLACEHOLDER_LABEL: &str = "生成候補（まだ登録なし）";

/// Well-known label of the catalog entry forced onto prohibitive units
pub const PROHIBITION_LABEL: &str = "禁止";

/// Confidence threshold for cosine scores from an embedding model
pub const EMBEDDING_THRESHOLD: f32 = 0.35;

/// Confidence threshold for the lexical fallback.
///
/// Lower than the embedding threshold: containment/Jaccard scores have a
/// different dynamic range than cosine similarity.
pub const LEXICAL_THRESHOLD: f32 = 0.2;

/// Score given to the forced prohibition match
pub const FORCED_SCORE: f32 = 1.0;

/// A single pictogram in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictogramEntry {
    /// Display label, unique within a catalog snapshot
    pub label: String,

    /// Keyword phrases; the entry is represented by all of them
    pub keywords: Vec<String>,

    /// Image reference (file path or URL)
    #[serde(
        default,
        rename = "path",
        alias = "image_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_ref: Option<String>,
}

impl PictogramEntry {
    pub fn new<L, K, S>(label: L, keywords: K, image_ref: Option<String>) -> Self
    where
        L: Into<String>,
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            image_ref,
        }
    }

    /// Synthesize the placeholder that replaces a low-confidence entry.
    ///
    /// Keywords are carried over so the generation step knows what the
    /// nearest concept was.
    pub fn placeholder_for(entry: &PictogramEntry) -> Self {
        Self {
            label: PLACEHOLDER_LABEL.to_string(),
            keywords: entry.keywords.clone(),
            image_ref: None,
        }
    }

    /// Placeholder with no nearest entry (degenerate query)
    pub fn empty_placeholder() -> Self {
        Self {
            label: PLACEHOLDER_LABEL.to_string(),
            keywords: Vec::new(),
            image_ref: None,
        }
    }
}

/// Result of matching a text unit against one catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The matched entry, or a synthesized placeholder
    pub entry: PictogramEntry,

    /// Confidence in [0, 1]; for placeholders this is still the best
    /// similarity that was found
    pub score: f32,

    /// True when `score` fell below the scorer's threshold
    pub is_placeholder: bool,

    /// Label of the catalog entry a placeholder was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_label: Option<String>,
}

impl MatchResult {
    /// Build a result from a raw similarity, applying the fallback policy.
    pub fn scored(entry: &PictogramEntry, raw_score: f32, threshold: f32) -> Self {
        let score = clamp_score(raw_score);
        if score < threshold {
            Self {
                entry: PictogramEntry::placeholder_for(entry),
                score,
                is_placeholder: true,
                nearest_label: Some(entry.label.clone()),
            }
        } else {
            Self {
                entry: entry.clone(),
                score,
                is_placeholder: false,
                nearest_label: None,
            }
        }
    }

    /// A match that bypasses scoring (prohibition pictogram)
    pub fn forced(entry: &PictogramEntry) -> Self {
        Self {
            entry: entry.clone(),
            score: FORCED_SCORE,
            is_placeholder: false,
            nearest_label: None,
        }
    }

    /// Result for a query that is empty after trimming
    pub fn empty_query() -> Self {
        Self {
            entry: PictogramEntry::empty_placeholder(),
            score: 0.0,
            is_placeholder: true,
            nearest_label: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.entry.label
    }

    pub fn image_ref(&self) -> Option<&str> {
        self.entry.image_ref.as_deref()
    }
}

/// Map a raw similarity into [0, 1]. Non-finite values become 0.
pub fn clamp_score(raw: f32) -> f32 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Which similarity backend is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Candle sentence embedding model
    Embedding,
    /// Deterministic feature-hashing embedder (offline)
    Hashing,
    /// Containment / character Jaccard (no model)
    #[default]
    Lexical,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::Embedding => "embedding",
            ScorerKind::Hashing => "hashing",
            ScorerKind::Lexical => "lexical",
        }
    }

    /// Threshold that applies when the config does not override it
    pub fn default_threshold(&self) -> f32 {
        match self {
            ScorerKind::Embedding | ScorerKind::Hashing => EMBEDDING_THRESHOLD,
            ScorerKind::Lexical => LEXICAL_THRESHOLD,
        }
    }
}

impl FromStr for ScorerKind {
    type Err = MatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedding" | "model" | "semantic" => Ok(ScorerKind::Embedding),
            "hashing" | "hash" => Ok(ScorerKind::Hashing),
            "lexical" | "fallback" => Ok(ScorerKind::Lexical),
            other => Err(MatcherError::InvalidArgument(format!(
                "unknown scorer '{}'. Valid values: embedding, hashing, lexical",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token pooling strategy for the transformer embedder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// Attention-masked mean over all tokens (sentence-transformers style)
    #[default]
    Mean,
    /// First token only (BGE style)
    Cls,
}

/// Errors from pictogram matching
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Catalog has no '{label}' entry")]
    ConfigurationGap { label: String },
}

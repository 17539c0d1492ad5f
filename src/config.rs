//! Engine configuration
//!
//! Loaded from YAML (every field optional), then overridden from the
//! environment:
//!
//! | variable             | field          |
//! |----------------------|----------------|
//! | `TEXT2PICTO_SCORER`  | `scorer`       |
//! | `TEXT2PICTO_MODEL`   | `model_name`   |
//! | `TEXT2PICTO_CATALOG` | `catalog_path` |
//! | `TEXT2PICTO_TOP_K`   | `top_k`        |
//! | `TEXT2PICTO_MODE`    | `mode`         |

use crate::segment::{GranularityMode, SegmenterConfig};
use anyhow::{anyhow, Context, Result};
use picto_semantic_matcher::embedder::DEFAULT_MODEL;
use picto_semantic_matcher::hashing::DEFAULT_HASHING_DIM;
use picto_semantic_matcher::{Pooling, ScorerKind, EMBEDDING_THRESHOLD, LEXICAL_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of matches per unit
pub const DEFAULT_TOP_K: usize = 2;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Similarity backend
    pub scorer: ScorerKind,

    /// HuggingFace repository for the `embedding` scorer
    pub model_name: String,

    pub pooling: Pooling,

    /// Vector size for the `hashing` scorer
    pub hashing_dim: usize,

    /// Threshold for the `embedding` and `hashing` scorers
    pub embedding_threshold: f32,

    /// Threshold for the `lexical` scorer
    pub lexical_threshold: f32,

    pub top_k: usize,

    pub mode: GranularityMode,

    /// JSON catalog; the built-in catalog is used when absent
    pub catalog_path: Option<PathBuf>,

    pub segmenter: SegmenterConfig,

    /// Appended to the built-in prohibition markers
    pub extra_prohibition_markers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerKind::default(),
            model_name: DEFAULT_MODEL.to_string(),
            pooling: Pooling::default(),
            hashing_dim: DEFAULT_HASHING_DIM,
            embedding_threshold: EMBEDDING_THRESHOLD,
            lexical_threshold: LEXICAL_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            mode: GranularityMode::default(),
            catalog_path: None,
            segmenter: SegmenterConfig::default(),
            extra_prohibition_markers: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load configuration from YAML string (for testing)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from `TEXT2PICTO_*` variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TEXT2PICTO_SCORER") {
            self.scorer = value.parse()?;
        }
        if let Some(value) = lookup("TEXT2PICTO_MODEL") {
            self.model_name = value;
        }
        if let Some(value) = lookup("TEXT2PICTO_CATALOG") {
            self.catalog_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("TEXT2PICTO_TOP_K") {
            self.top_k = value
                .trim()
                .parse()
                .with_context(|| format!("TEXT2PICTO_TOP_K is not a number: '{}'", value))?;
        }
        if let Some(value) = lookup("TEXT2PICTO_MODE") {
            self.mode = value.parse()?;
        }
        self.validate()
    }

    /// Threshold that applies to the configured scorer
    pub fn threshold(&self) -> f32 {
        match self.scorer {
            ScorerKind::Embedding | ScorerKind::Hashing => self.embedding_threshold,
            ScorerKind::Lexical => self.lexical_threshold,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(anyhow!("top_k must be positive"));
        }
        for (name, value) in [
            ("embedding_threshold", self.embedding_threshold),
            ("lexical_threshold", self.lexical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be in [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }
}

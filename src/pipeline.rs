//! Text → pictogram pipeline
//!
//! ```text
//! raw text
//!    │ Segmenter (sentence / chunk / word)
//!    ▼
//! units[] ── for each unit, in reading order ──┐
//!                                              │
//!          Ranker ──► top-k matches            │
//!          ProhibitionDetector ──► +禁止 (1.00) │
//!                                              ▼
//!                         [(unit, matches)]  (never reordered by score)
//! ```
//!
//! A `process` call either returns every unit or fails as a whole; a
//! scoring failure in any unit fails the request.

use crate::config::EngineConfig;
use crate::prohibition::ProhibitionDetector;
use crate::segment::{GranularityMode, Segmenter};
use anyhow::Context;
use picto_semantic_matcher::{
    Catalog, Embedder, EmbeddingScorer, LexicalScorer, MatchResult, MatcherError, Ranker,
    ScorerKind, SimilarityScorer, PROHIBITION_LABEL,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Matches for one text unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMatches {
    pub unit: String,

    /// Ranked matches, then the forced prohibition match if any
    pub matches: Vec<MatchResult>,

    /// Whether the prohibition detector fired for this unit
    pub prohibitive: bool,
}

/// Segments text and matches every unit against a catalog
#[derive(Clone)]
pub struct PictogramPipeline {
    segmenter: Segmenter,
    ranker: Ranker,
    detector: ProhibitionDetector,
}

impl PictogramPipeline {
    /// Default segmenter and prohibition markers around `scorer`
    pub fn new(scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self::with_parts(
            Segmenter::default(),
            Ranker::new(scorer),
            ProhibitionDetector::default(),
        )
    }

    pub fn with_parts(segmenter: Segmenter, ranker: Ranker, detector: ProhibitionDetector) -> Self {
        Self {
            segmenter,
            ranker,
            detector,
        }
    }

    /// Build from configuration, loading the embedding model if selected.
    ///
    /// # Errors
    /// `ResourceUnavailable` when the model cannot be downloaded or loaded.
    pub fn from_config(config: &EngineConfig) -> Result<Self, MatcherError> {
        let scorer = build_scorer(config)?;
        Ok(Self::with_parts(
            Segmenter::new(config.segmenter.clone()),
            Ranker::new(scorer),
            ProhibitionDetector::with_extra_markers(&config.extra_prohibition_markers),
        ))
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    pub fn detector(&self) -> &ProhibitionDetector {
        &self.detector
    }

    /// Warm scorer caches for a freshly loaded catalog
    pub fn prepare(&self, catalog: &Catalog) -> Result<(), MatcherError> {
        self.ranker.scorer().prepare(catalog)
    }

    pub fn segment(&self, text: &str, mode: GranularityMode) -> Vec<String> {
        self.segmenter.segment(text, mode)
    }

    pub fn rank(
        &self,
        unit: &str,
        catalog: &Catalog,
        top_k: usize,
    ) -> Result<Vec<MatchResult>, MatcherError> {
        self.ranker.rank(unit, catalog, top_k)
    }

    pub fn is_prohibitive(&self, unit: &str) -> bool {
        self.detector.is_prohibitive(unit)
    }

    /// Segment `text` and match each unit, preserving reading order
    #[instrument(skip(self, catalog), fields(mode = %mode, catalog_size = catalog.len()))]
    pub fn process(
        &self,
        text: &str,
        mode: GranularityMode,
        top_k: usize,
        catalog: &Catalog,
    ) -> Result<Vec<UnitMatches>, MatcherError> {
        let units = self.segment(text, mode);
        let prohibition_entry = catalog.get(PROHIBITION_LABEL);

        let mut results = Vec::with_capacity(units.len());
        for unit in units {
            let mut matches = self.rank(&unit, catalog, top_k)?;

            let prohibitive = match self.detector.matched_marker(&unit) {
                Some(marker) => {
                    debug!("Prohibition marker '{}' in '{}'", marker, unit);
                    match prohibition_entry {
                        Some(entry) => matches.push(MatchResult::forced(entry)),
                        None => {
                            let gap = MatcherError::ConfigurationGap {
                                label: PROHIBITION_LABEL.to_string(),
                            };
                            warn!("{}; prohibition match omitted for '{}'", gap, unit);
                        }
                    }
                    true
                }
                None => false,
            };

            results.push(UnitMatches {
                unit,
                matches,
                prohibitive,
            });
        }

        debug!("Processed {} units", results.len());
        Ok(results)
    }
}

/// Construct the scorer selected by `config.scorer`
pub fn build_scorer(config: &EngineConfig) -> Result<Arc<dyn SimilarityScorer>, MatcherError> {
    let threshold = config.threshold();
    let scorer: Arc<dyn SimilarityScorer> = match config.scorer {
        ScorerKind::Embedding => {
            let embedder = Embedder::with_model(&config.model_name, config.pooling)
                .with_context(|| format!("Failed to load model {}", config.model_name))
                .map_err(|e| MatcherError::ResourceUnavailable(format!("{:#}", e)))?;
            Arc::new(EmbeddingScorer::with_kind(
                embedder,
                ScorerKind::Embedding,
                threshold,
            ))
        }
        ScorerKind::Hashing => Arc::new(EmbeddingScorer::hashing(config.hashing_dim, threshold)),
        ScorerKind::Lexical => Arc::new(LexicalScorer::new(threshold)),
    };
    info!("Using {} scorer (threshold {})", scorer.kind(), threshold);
    Ok(scorer)
}

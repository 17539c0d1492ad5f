//! text2picto: text → pictogram retrieval
//!
//! Turns free text (primarily Japanese) into a sequence of short units and
//! finds, for each unit, the best-matching pictograms in a catalog. Units
//! that match nothing well get a placeholder for downstream generation;
//! units that express a prohibition get the prohibition pictogram forced
//! onto their matches.
//!
//! ```text
//! text ──► segment ──► [unit] ──► Ranker (picto-semantic-matcher) ──► matches
//!                         └─────► prohibition ──► +禁止
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use text2picto::{load_catalog, GranularityMode, LexicalScorer, PictogramPipeline};
//!
//! let pipeline = PictogramPipeline::new(Arc::new(LexicalScorer::default()));
//! let catalog = load_catalog()?;
//! for unit in pipeline.process("お茶をのみましょう。", GranularityMode::Chunk, 2, &catalog)? {
//!     println!("{}: {}", unit.unit, unit.matches[0].label());
//! }
//! # Ok::<(), text2picto::MatcherError>(())
//! ```

pub mod config;
pub mod pipeline;
pub mod prohibition;
pub mod segment;
pub mod session;

pub use config::EngineConfig;
pub use pipeline::{build_scorer, PictogramPipeline, UnitMatches};
pub use prohibition::{is_prohibitive, ProhibitionDetector};
pub use segment::{GranularityMode, Segmenter, SegmenterConfig};
pub use session::{
    load_catalog, load_catalog_from, load_configured_catalog, CatalogStore, Session,
};

pub use picto_semantic_matcher::{
    Catalog, EmbeddingScorer, HashingEmbedder, LexicalScorer, MatchResult, MatcherError,
    PictogramEntry, Pooling, Ranker, ScorerKind, SimilarityScorer, EMBEDDING_THRESHOLD,
    FORCED_SCORE, LEXICAL_THRESHOLD, PLACEHOLDER_LABEL, PROHIBITION_LABEL,
};

//! Semantic Pictogram Matcher
//!
//! Scores a fixed pictogram catalog against short text units and decides,
//! per unit, between "known pictogram" and "no match, candidate for
//! generation".
//!
//! # Architecture
//!
//! ```text
//! Text unit
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  SimilarityScorer                       │
//! │  Embedder (Candle) / HashingEmbedder    │
//! │  "お茶をのみましょう" → [384 dims]        │
//! │  or LexicalScorer (no model)            │
//! └─────────────────────────────────────────┘
//!       │  cosine vs per-entry keyword mean
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  Ranker                                 │
//! │  stable sort → top-k                    │
//! └─────────────────────────────────────────┘
//!       │
//!       ├─── score >= threshold ───► catalog entry
//!       │
//!       ▼
//!   placeholder ("生成候補"), score preserved
//! ```

pub mod catalog;
pub mod centroid;
pub mod embedder;
pub mod hashing;
pub mod lexical;
pub mod ranker;
pub mod scorer;
pub mod types;

pub use catalog::Catalog;
pub use embedder::{Embedder, TextEmbedder};
pub use hashing::HashingEmbedder;
pub use lexical::{lexical_similarity, LexicalScorer};
pub use ranker::Ranker;
pub use scorer::{EmbeddingScorer, SimilarityScorer};
pub use types::*;

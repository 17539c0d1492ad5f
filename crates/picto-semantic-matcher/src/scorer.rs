//! Similarity scoring capability
//!
//! The ranker only sees `SimilarityScorer`. Two families implement it:
//!
//! ```text
//! SimilarityScorer
//!   ├── EmbeddingScorer<E: TextEmbedder>   cosine(query vec, entry mean vec)
//!   │     ├── E = Embedder                 Candle sentence model
//!   │     └── E = HashingEmbedder          offline feature hashing
//!   └── LexicalScorer                      max(containment, char Jaccard)
//! ```
//!
//! Each scorer reports its own confidence threshold because the scoring
//! functions have different dynamic ranges.

use crate::catalog::Catalog;
use crate::centroid::{cosine_similarity, mean_vector};
use crate::embedder::TextEmbedder;
use crate::hashing::HashingEmbedder;
use crate::types::{MatcherError, PictogramEntry, ScorerKind, EMBEDDING_THRESHOLD};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Scores a query against every entry of a catalog
pub trait SimilarityScorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    /// Scores strictly below this become placeholders
    fn threshold(&self) -> f32;

    /// One raw score per catalog entry, in catalog order
    fn score_entries(&self, query: &str, catalog: &Catalog) -> Result<Vec<f32>, MatcherError>;

    /// Precompute per-entry data for a catalog snapshot.
    ///
    /// Optional; scoring computes on demand when this was not called.
    fn prepare(&self, _catalog: &Catalog) -> Result<(), MatcherError> {
        Ok(())
    }
}

/// Entry vectors computed for one catalog snapshot
struct EntryVectors {
    fingerprint: String,
    vectors: Arc<Vec<Vec<f32>>>,
}

/// Cosine scorer over an embedding backend
pub struct EmbeddingScorer<E> {
    embedder: E,
    kind: ScorerKind,
    threshold: f32,
    cache: RwLock<Option<EntryVectors>>,
}

impl EmbeddingScorer<HashingEmbedder> {
    /// Offline scorer with the feature-hashing embedder
    pub fn hashing(dim: usize, threshold: f32) -> Self {
        Self::with_kind(HashingEmbedder::new(dim), ScorerKind::Hashing, threshold)
    }
}

impl<E: TextEmbedder> EmbeddingScorer<E> {
    pub fn new(embedder: E) -> Self {
        Self::with_kind(embedder, ScorerKind::Embedding, EMBEDDING_THRESHOLD)
    }

    pub fn with_kind(embedder: E, kind: ScorerKind, threshold: f32) -> Self {
        Self {
            embedder,
            kind,
            threshold,
            cache: RwLock::new(None),
        }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Representative vector of an entry: mean of its keyword embeddings
    pub fn entry_vector(&self, entry: &PictogramEntry) -> Result<Vec<f32>, MatcherError> {
        let keywords: Vec<&str> = entry
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        let vectors = self.embedder.embed_batch(&keywords)?;
        mean_vector(&vectors)
    }

    /// Entry vectors for `catalog`, reused while its fingerprint is unchanged
    fn entry_vectors(&self, catalog: &Catalog) -> Result<Arc<Vec<Vec<f32>>>, MatcherError> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = cache.as_ref() {
                if cached.fingerprint == catalog.fingerprint() {
                    return Ok(Arc::clone(&cached.vectors));
                }
            }
        }

        info!(
            "Embedding {} catalog entries with {}",
            catalog.len(),
            self.embedder.model_name()
        );
        let vectors = catalog
            .iter()
            .map(|entry| self.entry_vector(entry))
            .collect::<Result<Vec<_>, _>>()?;
        let vectors = Arc::new(vectors);

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = Some(EntryVectors {
            fingerprint: catalog.fingerprint().to_string(),
            vectors: Arc::clone(&vectors),
        });
        Ok(vectors)
    }
}

impl<E: TextEmbedder> SimilarityScorer for EmbeddingScorer<E> {
    fn kind(&self) -> ScorerKind {
        self.kind
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn score_entries(&self, query: &str, catalog: &Catalog) -> Result<Vec<f32>, MatcherError> {
        let query_vec = self.embedder.embed(query)?;
        let entry_vecs = self.entry_vectors(catalog)?;
        if let Some(bad) = entry_vecs.iter().find(|v| v.len() != query_vec.len()) {
            return Err(MatcherError::ResourceUnavailable(format!(
                "{} returned a {}-dim query vector for {}-dim entry vectors",
                self.embedder.model_name(),
                query_vec.len(),
                bad.len()
            )));
        }
        debug!(
            "Scoring query against {} entry vectors ({} dims)",
            entry_vecs.len(),
            query_vec.len()
        );
        Ok(entry_vecs
            .iter()
            .map(|v| cosine_similarity(&query_vec, v))
            .collect())
    }

    fn prepare(&self, catalog: &Catalog) -> Result<(), MatcherError> {
        self.entry_vectors(catalog).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts embed calls, delegating to the hashing embedder
    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    impl TextEmbedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text)
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct FailingEmbedder;

    impl TextEmbedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, MatcherError> {
            Err(MatcherError::ResourceUnavailable("backend down".to_string()))
        }
        fn dimension(&self) -> usize {
            8
        }
        fn model_name(&self) -> &str {
            "failing"
        }
    }

    /// Longer vectors for longer texts
    struct RaggedEmbedder;

    impl TextEmbedder for RaggedEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
            Ok(vec![1.0; text.chars().count()])
        }
        fn dimension(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "ragged"
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            PictogramEntry::new("病院", ["病院", "診察"], None),
            PictogramEntry::new("ポテト", ["ポテト"], None),
        ])
        .unwrap()
    }

    #[test]
    fn test_entry_vectors_are_cached_per_fingerprint() {
        let scorer = EmbeddingScorer::new(CountingEmbedder {
            inner: HashingEmbedder::default(),
            calls: AtomicUsize::new(0),
        });
        let catalog = catalog();

        scorer.prepare(&catalog).unwrap();
        let after_prepare = scorer.embedder().calls.load(Ordering::SeqCst);
        assert_eq!(after_prepare, 3); // three keywords

        scorer.score_entries("病院", &catalog).unwrap();
        scorer.score_entries("ポテト", &catalog).unwrap();
        // Only the two query embeddings were added
        assert_eq!(scorer.embedder().calls.load(Ordering::SeqCst), after_prepare + 2);

        let other = Catalog::new(vec![PictogramEntry::new("待つ", ["待つ"], None)]).unwrap();
        scorer.score_entries("待つ", &other).unwrap();
        assert_eq!(scorer.embedder().calls.load(Ordering::SeqCst), after_prepare + 4);
    }

    #[test]
    fn test_scores_in_catalog_order() {
        let scorer = EmbeddingScorer::hashing(256, EMBEDDING_THRESHOLD);
        let scores = scorer.score_entries("病院", &catalog()).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1]);
        assert_eq!(scorer.kind(), ScorerKind::Hashing);
    }

    #[test]
    fn test_embedding_failure_surfaces() {
        let scorer = EmbeddingScorer::new(FailingEmbedder);
        assert!(matches!(
            scorer.score_entries("病院", &catalog()),
            Err(MatcherError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn test_entry_vector_is_keyword_order_invariant() {
        let scorer = EmbeddingScorer::hashing(64, EMBEDDING_THRESHOLD);
        let a = PictogramEntry::new("飲む", ["飲む", "お茶", "水をのむ", "drink"], None);
        let b = PictogramEntry::new("飲む", ["drink", "水をのむ", "飲む", "お茶"], None);
        assert_eq!(
            scorer.entry_vector(&a).unwrap(),
            scorer.entry_vector(&b).unwrap()
        );
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let scorer = EmbeddingScorer::new(RaggedEmbedder);
        // Both keywords are two chars, so the entry vector is 2-dim
        let catalog =
            Catalog::new(vec![PictogramEntry::new("病院", ["病院", "診察"], None)]).unwrap();

        let err = scorer.score_entries("フライドポテト", &catalog).unwrap_err();
        assert!(matches!(err, MatcherError::ResourceUnavailable(_)));
        assert!(err.to_string().contains("ragged"));

        // Matching dimensions still score
        let scores = scorer.score_entries("待つ", &catalog).unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-6);
    }
}

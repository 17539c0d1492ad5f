//! Ranking of catalog entries against a text unit
//!
//! ```text
//! unit ──► scorer.score_entries ──► [raw score per entry]
//!                                        │ stable sort, descending
//!                                        ▼
//!                                   take top_k
//!                                        │
//!            score >= threshold ◄────────┴────────► score < threshold
//!            entry as-is                            placeholder, score kept
//! ```

use crate::catalog::Catalog;
use crate::scorer::SimilarityScorer;
use crate::types::{clamp_score, MatchResult, MatcherError, ScorerKind};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Ranks a catalog against text units with a pluggable scorer
#[derive(Clone)]
pub struct Ranker {
    scorer: Arc<dyn SimilarityScorer>,
}

impl Ranker {
    pub fn new(scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &dyn SimilarityScorer {
        self.scorer.as_ref()
    }

    pub fn kind(&self) -> ScorerKind {
        self.scorer.kind()
    }

    pub fn threshold(&self) -> f32 {
        self.scorer.threshold()
    }

    /// Return up to `top_k` matches, best first.
    ///
    /// Ties keep catalog order. Matches below the scorer threshold are
    /// replaced by placeholders that keep their score. A query that is
    /// empty after trimming yields one placeholder with score 0.
    ///
    /// # Errors
    /// `InvalidArgument` if `top_k` is 0 or the catalog is empty;
    /// `ResourceUnavailable` if the embedding backend fails.
    #[instrument(skip(self, catalog), fields(scorer = %self.kind()))]
    pub fn rank(
        &self,
        query: &str,
        catalog: &Catalog,
        top_k: usize,
    ) -> Result<Vec<MatchResult>, MatcherError> {
        if top_k == 0 {
            return Err(MatcherError::InvalidArgument(
                "top_k must be positive".to_string(),
            ));
        }
        if catalog.is_empty() {
            return Err(MatcherError::InvalidArgument(
                "cannot rank against an empty catalog".to_string(),
            ));
        }

        let query = query.trim();
        if query.is_empty() {
            debug!("Empty query, returning placeholder");
            return Ok(vec![MatchResult::empty_query()]);
        }

        let scores = self.scorer.score_entries(query, catalog)?;
        if scores.len() != catalog.len() {
            return Err(MatcherError::ResourceUnavailable(format!(
                "scorer returned {} scores for {} entries",
                scores.len(),
                catalog.len()
            )));
        }

        // Clamp first so a NaN or out-of-range score cannot disturb the order
        let mut scored: Vec<(usize, f32)> = scores
            .into_iter()
            .map(clamp_score)
            .enumerate()
            .collect();
        // Stable: equal scores keep catalog order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let threshold = self.scorer.threshold();
        let entries = catalog.entries();
        let results: Vec<MatchResult> = scored
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| MatchResult::scored(&entries[idx], score, threshold))
            .collect();

        if let Some(best) = results.first() {
            debug!(
                "Best match: {} ({:.3}{})",
                best.nearest_label.as_deref().unwrap_or(best.label()),
                best.score,
                if best.is_placeholder {
                    ", placeholder"
                } else {
                    ""
                }
            );
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::LexicalScorer;
    use crate::scorer::EmbeddingScorer;
    use crate::types::{PictogramEntry, EMBEDDING_THRESHOLD, PLACEHOLDER_LABEL};

    /// Returns fixed scores regardless of query
    struct FixedScorer(Vec<f32>);

    impl SimilarityScorer for FixedScorer {
        fn kind(&self) -> ScorerKind {
            ScorerKind::Embedding
        }
        fn threshold(&self) -> f32 {
            EMBEDDING_THRESHOLD
        }
        fn score_entries(&self, _q: &str, _c: &Catalog) -> Result<Vec<f32>, MatcherError> {
            Ok(self.0.clone())
        }
    }

    fn abc() -> Catalog {
        Catalog::new(vec![
            PictogramEntry::new("a", ["a"], Some("a.png".to_string())),
            PictogramEntry::new("b", ["b"], Some("b.png".to_string())),
            PictogramEntry::new("c", ["c"], Some("c.png".to_string())),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let ranker = Ranker::new(Arc::new(FixedScorer(vec![0.4, 0.9, 0.6])));
        let results = ranker.rank("q", &abc(), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label(), "b");
        assert_eq!(results[1].label(), "c");
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let ranker = Ranker::new(Arc::new(FixedScorer(vec![0.5, 0.5, 0.5])));
        let labels: Vec<String> = ranker
            .rank("q", &abc(), 3)
            .unwrap()
            .into_iter()
            .map(|m| m.entry.label)
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_top_k_larger_than_catalog() {
        let ranker = Ranker::new(Arc::new(FixedScorer(vec![0.4, 0.9, 0.6])));
        assert_eq!(ranker.rank("q", &abc(), 10).unwrap().len(), 3);
    }

    #[test]
    fn test_low_scores_become_placeholders() {
        let ranker = Ranker::new(Arc::new(FixedScorer(vec![0.1, 0.9, 0.34])));
        let results = ranker.rank("q", &abc(), 3).unwrap();
        assert!(!results[0].is_placeholder);
        assert!(results[1].is_placeholder);
        assert_eq!(results[1].label(), PLACEHOLDER_LABEL);
        assert!((results[1].score - 0.34).abs() < 1e-6);
        assert_eq!(results[1].nearest_label.as_deref(), Some("c"));
        assert!(results[2].image_ref().is_none());
    }

    #[test]
    fn test_negative_cosine_clamped() {
        let ranker = Ranker::new(Arc::new(FixedScorer(vec![-0.2, 0.9, 0.6])));
        let results = ranker.rank("q", &abc(), 3).unwrap();
        assert_eq!(results[2].score, 0.0);
        assert!(results[2].is_placeholder);
    }

    #[test]
    fn test_non_finite_scores_sort_as_zero() {
        let ranker = Ranker::new(Arc::new(FixedScorer(vec![0.5, f32::NAN, 0.9])));
        let results = ranker.rank("q", &abc(), 3).unwrap();

        let scores: Vec<f32> = results.iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.0]);
        assert_eq!(results[2].nearest_label.as_deref(), Some("b"));

        let ranker = Ranker::new(Arc::new(FixedScorer(vec![f32::INFINITY, 0.2, f32::NAN])));
        let results = ranker.rank("q", &abc(), 3).unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_zero_top_k_is_invalid() {
        let ranker = Ranker::new(Arc::new(LexicalScorer::default()));
        assert!(matches!(
            ranker.rank("お茶", &abc(), 0),
            Err(MatcherError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_catalog_is_invalid() {
        let ranker = Ranker::new(Arc::new(LexicalScorer::default()));
        for k in [0, 1, 5] {
            assert!(matches!(
                ranker.rank("お茶", &Catalog::empty(), k),
                Err(MatcherError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_empty_query_yields_placeholder() {
        let ranker = Ranker::new(Arc::new(LexicalScorer::default()));
        let results = ranker.rank("   ", &abc(), 2).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_placeholder);
        assert_eq!(results[0].score, 0.0);
    }

    #[test]
    fn test_hashing_scorer_ranks_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        let ranker = Ranker::new(Arc::new(EmbeddingScorer::hashing(256, EMBEDDING_THRESHOLD)));
        let results = ranker.rank("フライドポテト", &catalog, 1).unwrap();
        assert_eq!(results[0].label(), "ポテト");
        assert!(!results[0].is_placeholder);
    }
}

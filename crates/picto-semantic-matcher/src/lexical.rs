//! Lexical similarity fallback
//!
//! Used when no embedding model is available. Two strings score
//! `max(containment, jaccard)`:
//! - containment is 1.0 when either folded string contains the other
//! - jaccard is |A ∩ B| / |A ∪ B| over the character sets (denominator
//!   floored at 1)
//!
//! An entry scores the best value over its keywords.

use crate::catalog::Catalog;
use crate::scorer::SimilarityScorer;
use crate::types::{MatcherError, ScorerKind, LEXICAL_THRESHOLD};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// NFKC fold + lowercase, so full-width and case variants compare equal
pub fn fold(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

fn char_set(s: &str) -> HashSet<char> {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Character-set Jaccard similarity of two already-folded strings
pub fn jaccard(a: &str, b: &str) -> f32 {
    let sa = char_set(a);
    let sb = char_set(b);
    let inter = sa.intersection(&sb).count();
    let union = sa.union(&sb).count().max(1);
    inter as f32 / union as f32
}

/// Lexical similarity in [0, 1]
pub fn lexical_similarity(a: &str, b: &str) -> f32 {
    let a = fold(a.trim());
    let b = fold(b.trim());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let containment = if a.contains(&b) || b.contains(&a) {
        1.0
    } else {
        0.0
    };
    f32::max(containment, jaccard(&a, &b))
}

/// Similarity scorer that needs no model
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    threshold: f32,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new(LEXICAL_THRESHOLD)
    }
}

impl LexicalScorer {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl SimilarityScorer for LexicalScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Lexical
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn score_entries(&self, query: &str, catalog: &Catalog) -> Result<Vec<f32>, MatcherError> {
        Ok(catalog
            .iter()
            .map(|entry| {
                entry
                    .keywords
                    .iter()
                    .map(|k| lexical_similarity(query, k))
                    .fold(0.0f32, f32::max)
            })
            .collect())
    }
}

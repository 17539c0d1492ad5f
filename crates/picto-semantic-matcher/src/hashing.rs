//! Deterministic feature-hashing embedder.
//!
//! Not a neural model. Character unigrams and bigrams of the folded text
//! are hashed (blake3) into signed buckets and the result is L2-normalized.
//! Works offline, needs no download and is stable across processes, which
//! makes it the embedding backend for tests and air-gapped installs.
//!
//! Character n-grams instead of word tokens because Japanese text has no
//! spaces between words.

use crate::centroid::normalize;
use crate::embedder::TextEmbedder;
use crate::lexical::fold;
use crate::types::MatcherError;

/// Default dimensionality for hashing embeddings
pub const DEFAULT_HASHING_DIM: usize = 256;

/// Offline embedder based on feature hashing
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIM)
    }
}

impl HashingEmbedder {
    /// A zero dimension is bumped to 1
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let hash = blake3::hash(feature.as_bytes());
        let bytes = hash.as_bytes();
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        let idx = (u64::from_le_bytes(raw) % self.dim as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }

    fn features(text: &str) -> Vec<String> {
        let chars: Vec<char> = fold(text).chars().filter(|c| !c.is_whitespace()).collect();
        let mut features: Vec<String> = chars.iter().map(|c| format!("1:{}", c)).collect();
        features.extend(chars.windows(2).map(|w| format!("2:{}{}", w[0], w[1])));
        features
    }
}

impl TextEmbedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
        let mut vec = vec![0.0f32; self.dim];
        for feature in Self::features(text) {
            let (idx, sign) = self.bucket(&feature);
            vec[idx] += sign;
        }
        Ok(normalize(vec))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::{cosine_similarity, l2_norm};

    #[test]
    fn test_hashing_is_deterministic() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed("お茶をのむ").unwrap(), e.embed("お茶をのむ").unwrap());
    }

    #[test]
    fn test_dimension_is_respected() {
        let e = HashingEmbedder::new(13);
        assert_eq!(e.embed("x").unwrap().len(), 13);
        assert_eq!(HashingEmbedder::new(0).dimension(), 1);
    }

    #[test]
    fn test_unit_length() {
        let e = HashingEmbedder::default();
        let v = e.embed("病院にいきます").unwrap();
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let e = HashingEmbedder::default();
        let v = e.embed("   ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_overlap_scores_higher() {
        let e = HashingEmbedder::default();
        let query = e.embed("病院にいく").unwrap();
        let near = e.embed("病院").unwrap();
        let far = e.embed("フライドポテト").unwrap();
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_case_and_width_folded() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed("DRINK").unwrap(), e.embed("ｄｒｉｎｋ").unwrap());
    }
}

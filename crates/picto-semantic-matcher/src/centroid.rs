//! Vector maths for entry representatives
//!
//! A pictogram entry is represented by the arithmetic mean of its keyword
//! embeddings, not by the embedding of the concatenated keywords. That way
//! one entry can stand for several synonyms without biasing toward the
//! longest phrase.
//!
//! The mean is computed in a canonical summation order (vectors sorted
//! lexicographically first), so it is bit-for-bit identical for any
//! permutation of the keywords.

use crate::types::MatcherError;
use std::cmp::Ordering;
use tracing::warn;

/// L2 norm of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize vector to unit length
pub fn normalize(v: Vec<f32>) -> Vec<f32> {
    let n = l2_norm(&v);
    if n > 0.0 {
        v.into_iter().map(|x| x / n).collect()
    } else {
        v
    }
}

/// Arithmetic mean of a set of vectors.
///
/// Fails on an empty set or mismatched dimensions.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Result<Vec<f32>, MatcherError> {
    let first = vectors.first().ok_or_else(|| {
        MatcherError::InvalidArgument("mean requires at least 1 vector".to_string())
    })?;
    let dim = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(MatcherError::InvalidArgument(format!(
            "all vectors must have same dimension (expected {}, got {})",
            dim,
            bad.len()
        )));
    }

    let mut ordered: Vec<&Vec<f32>> = vectors.iter().collect();
    ordered.sort_by(|a, b| lexicographic(a, b));

    // f64 accumulator
    let mut acc = vec![0.0f64; dim];
    for v in ordered {
        for (slot, x) in acc.iter_mut().zip(v.iter()) {
            *slot += f64::from(*x);
        }
    }

    let n = vectors.len() as f64;
    Ok(acc.into_iter().map(|x| (x / n) as f32).collect())
}

fn lexicographic(a: &[f32], b: &[f32]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.total_cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Cosine similarity in [-1, 1]. A zero vector has similarity 0 with
/// everything, and so do vectors of different lengths (logged, since it
/// means two embedders were mixed).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        warn!("Cosine of mismatched dimensions ({} vs {})", a.len(), b.len());
        return 0.0;
    }
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

//! Pure template comparators and the liveness heuristic. No I/O, no state;
//! safe to call concurrently without synchronization.

use crate::utils::error::{CoreError, Result};

/// Default distance operating point for login-path face comparisons.
/// Empirical, not derived.
pub const FACE_LOGIN_THRESHOLD: f32 = 0.4;

/// Default operating point for re-confirming an already-authenticated user.
pub const FACE_REVERIFY_THRESHOLD: f32 = 0.6;

/// Default minimum population standard deviation for a live capture.
pub const LIVENESS_MIN_STDDEV: f32 = 0.1;

/// Euclidean distance between two templates of equal length.
pub fn euclidean_distance(stored: &[f32], candidate: &[f32]) -> Result<f32> {
    if stored.len() != candidate.len() {
        return Err(CoreError::DimensionMismatch {
            stored: stored.len(),
            presented: candidate.len(),
        });
    }

    let sum: f32 = stored
        .iter()
        .zip(candidate.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum();

    Ok(sum.sqrt())
}

/// Embeddings from the same face cluster tightly, so a strict distance cut
/// works as an accept test.
pub fn match_face(stored: &[f32], candidate: &[f32], threshold: f32) -> Result<bool> {
    Ok(euclidean_distance(stored, candidate)? < threshold)
}

/// Exact equality of the full minutiae vector. Weaker than the tolerant
/// face comparison: any re-capture noise fails the match. Vectors of
/// different lengths are simply unequal.
pub fn match_fingerprint(stored: &[f32], candidate: &[f32]) -> bool {
    stored.len() == candidate.len() && stored.iter().zip(candidate.iter()).all(|(a, b)| a == b)
}

/// Coarse replay heuristic, not a real anti-spoofing control: a replayed or
/// synthetically flat vector shows abnormally low variance across elements.
pub fn assess_liveness(candidate: &[f32], min_stddev: f32) -> bool {
    if candidate.is_empty() {
        return false;
    }

    let n = candidate.len() as f32;
    let mean = candidate.iter().sum::<f32>() / n;
    let variance = candidate.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;

    variance.sqrt() >= min_stddev
}

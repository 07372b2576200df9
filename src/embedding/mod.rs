//! Embedding infrastructure for line matching.
//!
//! Pluggable embedding providers produce vectors from text. TF-IDF is the
//! only provider today; it feeds the lexical segment of the 656-dimension
//! semantic vector built in [`semantic`]. The helpers here are the shared
//! vector math: cosine, normalization, and hash bucketing.

pub mod semantic;
pub mod tfidf;

/// A single embedding vector.
pub type Embedding = Vec<f32>;

/// Trait for embedding text into vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a text string into a vector.
    fn embed(&self, text: &str) -> Embedding;
    /// Dimensionality of the embedding space.
    fn dimensions(&self) -> usize;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths, empty input or a zero vector, so
/// callers never see NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Euclidean length of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize a vector to unit length (in-place). Zero vectors stay zero.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Scale a vector so its absolute values sum to 1 (in-place).
pub fn normalize_l1(v: &mut [f32]) {
    let sum: f32 = v.iter().map(|x| x.abs()).sum();
    if sum > 0.0 {
        for x in v.iter_mut() {
            *x /= sum;
        }
    }
}

/// Stable bucket for a term: CRC-32 of its UTF-8 bytes modulo `dims`.
pub fn hash_bucket(term: &str, dims: usize) -> usize {
    if dims == 0 {
        return 0;
    }
    crc32fast::hash(term.as_bytes()) as usize % dims
}

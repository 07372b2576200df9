//! TF-IDF vectorizer over the line corpus.
//!
//! Document frequencies come from the corpus's textual fields. Term vectors
//! are folded into a fixed number of buckets by CRC-32, so the output width
//! does not depend on vocabulary size. Terms are visited in sorted order,
//! which keeps the float accumulation and therefore the output bit-identical
//! across runs.

use std::collections::{BTreeMap, BTreeSet};

use super::{hash_bucket, normalize, Embedding, EmbeddingProvider};
use crate::tokenizer::term_occurrences;

/// Width of the lexical segment this vectorizer feeds.
pub const LEXICAL_DIMS: usize = 100;

/// TF-IDF vectorizer.
///
/// Cold until [`build_vocabulary`](Self::build_vocabulary) runs: a cold
/// vectorizer returns zero vectors.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    /// term → stable index (sorted term order)
    vocabulary: BTreeMap<String, usize>,
    /// IDF weight per index
    idf: Vec<f32>,
    /// Number of documents the vocabulary was built from
    documents: usize,
    /// Output width of `embed`
    dims: usize,
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self::new(LEXICAL_DIMS)
    }
}

impl TfIdfVectorizer {
    /// A cold vectorizer with the given `embed` width.
    pub fn new(dims: usize) -> Self {
        Self {
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
            documents: 0,
            dims,
        }
    }

    /// Build from a set of documents in one step.
    pub fn from_corpus<S: AsRef<str>>(documents: &[S], dims: usize) -> Self {
        let mut v = Self::new(dims);
        v.build_vocabulary(documents);
        v
    }

    /// Compute document frequencies and `idf = ln(N / df)` for every term.
    pub fn build_vocabulary<S: AsRef<str>>(&mut self, documents: &[S]) {
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let unique: BTreeSet<String> = term_occurrences(doc.as_ref()).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f32;
        self.vocabulary = doc_freq
            .keys()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.idf = doc_freq
            .values()
            .map(|&df| (n / df.max(1) as f32).ln())
            .collect();
        self.documents = documents.len();
    }

    pub fn is_cold(&self) -> bool {
        self.vocabulary.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// IDF of a known term.
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary.get(term).map(|&idx| self.idf[idx])
    }

    /// Hashed, L2-normalized TF-IDF vector of `text` with `dims` buckets.
    ///
    /// Unknown terms contribute nothing. A cold vectorizer returns zeros.
    pub fn vectorize(&self, text: &str, dims: usize) -> Embedding {
        let mut vector = vec![0.0f32; dims];
        if self.is_cold() || dims == 0 {
            return vector;
        }

        let terms = term_occurrences(text);
        if terms.is_empty() {
            return vector;
        }
        let total = terms.len() as f32;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for term in &terms {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }

        for (term, count) in counts {
            if let Some(&idx) = self.vocabulary.get(term) {
                let tf = count as f32 / total;
                vector[hash_bucket(term, dims)] += tf * self.idf[idx];
            }
        }

        normalize(&mut vector);
        vector
    }
}

impl EmbeddingProvider for TfIdfVectorizer {
    fn embed(&self, text: &str) -> Embedding {
        self.vectorize(text, self.dims)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

//! Semantic vector builder — 656 hand-engineered dimensions.
//!
//! The vector is six contiguous segments, each filled by its own encoder and
//! compared segment by segment at scoring time. The layout is a table of
//! `(kind, range, encode_fn)` rows iterated uniformly, so each encoder can be
//! tested on its own slice. Everything here is a pure function of the input:
//! no clock, no RNG, hashes are CRC-32.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use yaoline_config::SemanticConfig;

use super::{cosine_similarity, hash_bucket, normalize, normalize_l1, EmbeddingProvider};
use crate::corpus::TemporalPhase;
use crate::tokenizer::{PartOfSpeech, Token, TokenCategory};

/// Total width of a semantic vector.
pub const SEMANTIC_DIMS: usize = 656;

pub type SemanticVector = [f32; SEMANTIC_DIMS];

/// Relative strength of each line position in the positional segment.
const POSITION_WEIGHTS: [f32; 6] = [0.5, 0.4, 0.45, 0.5, 0.8, 0.4];
const POSITION_SPACING: f32 = 16.67;
const POSITION_SIGMA: f32 = 15.0;
const RIPPLE: f32 = 0.1;

const TRANSFORM_STEP: f32 = 0.15;

const HEAD_TAIL_CHARS: usize = 10;
const KEYWORD_WEIGHT: f32 = 0.2;
const RELATION_WEIGHT: f32 = 0.3;

/// Named segment of the semantic vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Grouping,
    Positional,
    Lexical,
    Transformation,
    Temporal,
    Contextual,
}

type EncodeFn = fn(&SemanticInput<'_>, &dyn EmbeddingProvider, &mut [f32]);

/// One row of the segment table.
pub struct Segment {
    pub kind: SegmentKind,
    pub range: Range<usize>,
    encode: EncodeFn,
}

impl Segment {
    /// Fill `out` (exactly `range.len()` long) from `input`.
    pub fn encode(&self, input: &SemanticInput<'_>, provider: &dyn EmbeddingProvider, out: &mut [f32]) {
        (self.encode)(input, provider, out)
    }

    pub fn width(&self) -> usize {
        self.range.end - self.range.start
    }
}

/// The segment layout, in vector order.
pub const SEGMENTS: [Segment; 6] = [
    Segment { kind: SegmentKind::Grouping, range: 0..100, encode: encode_grouping },
    Segment { kind: SegmentKind::Positional, range: 100..200, encode: encode_positional },
    Segment { kind: SegmentKind::Lexical, range: 200..300, encode: encode_lexical },
    Segment { kind: SegmentKind::Transformation, range: 300..400, encode: encode_transformation },
    Segment { kind: SegmentKind::Temporal, range: 400..500, encode: encode_temporal },
    Segment { kind: SegmentKind::Contextual, range: 500..656, encode: encode_contextual },
];

/// Everything an encoder may look at. Built from a candidate line at corpus
/// build, or from a query analysis per request.
#[derive(Debug, Clone, Copy)]
pub struct SemanticInput<'a> {
    /// Weighted tokens, most significant first.
    pub tokens: &'a [Token],
    /// Free text for the lexical and character-level encoders.
    pub text: &'a str,
    /// Mixing weight per line position (index 0 = position 1).
    pub position_profile: [f32; 6],
    pub phase: TemporalPhase,
    /// Related line ids (neighbours and correspondent); empty for queries.
    pub relations: &'a [u16],
    pub keywords: &'a [String],
}

/// Build the full vector: encode every segment, then L2-normalize the whole.
pub fn build(input: &SemanticInput<'_>, provider: &dyn EmbeddingProvider) -> SemanticVector {
    let mut vector = [0.0f32; SEMANTIC_DIMS];
    for segment in &SEGMENTS {
        segment.encode(input, provider, &mut vector[segment.range.clone()]);
    }
    normalize(&mut vector);
    vector
}

/// Cosine per segment, clamped at zero, in segment order.
pub fn segment_similarities(a: &[f32], b: &[f32]) -> [f32; 6] {
    let mut out = [0.0f32; 6];
    if a.len() != SEMANTIC_DIMS || b.len() != SEMANTIC_DIMS {
        return out;
    }
    for (slot, segment) in out.iter_mut().zip(SEGMENTS.iter()) {
        let r = segment.range.clone();
        *slot = cosine_similarity(&a[r.clone()], &b[r]).max(0.0);
    }
    out
}

/// Weighted segment similarity, sharpened and contrast-boosted, in `[0, 1]`.
pub fn semantic_similarity(a: &[f32], b: &[f32], config: &SemanticConfig) -> f32 {
    let weights = config.segment_weights.as_array();
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let sims = segment_similarities(a, b);
    let weighted: f32 = sims.iter().zip(weights.iter()).map(|(s, w)| s * w).sum::<f32>() / total;

    let mut s = weighted.clamp(0.0, 1.0).powf(config.sharpen_exponent);
    if s > config.contrast_threshold {
        s = config.contrast_threshold + (s - config.contrast_threshold) * config.contrast_gain;
    }
    s.clamp(0.0, 1.0)
}

// ── Encoders ──

/// Hash-trick word embedding; earlier tokens count more.
fn encode_grouping(input: &SemanticInput<'_>, _: &dyn EmbeddingProvider, out: &mut [f32]) {
    let dims = out.len();
    for (rank, token) in input.tokens.iter().enumerate() {
        let w = token.weight / (rank + 1) as f32;
        out[hash_bucket(&token.surface, dims)] += w;
        // Category echo so same-category terms land near each other
        let category_bucket = (token.category.index() * 7 + 3) % dims;
        out[category_bucket] += w * 0.25;
    }
}

/// Gaussian bump per position with a sine ripple, mixed by the profile.
fn encode_positional(input: &SemanticInput<'_>, _: &dyn EmbeddingProvider, out: &mut [f32]) {
    for (p_idx, &mix) in input.position_profile.iter().enumerate() {
        if mix == 0.0 {
            continue;
        }
        let p = (p_idx + 1) as f32;
        let centre = (p - 1.0) * POSITION_SPACING;
        for (i, slot) in out.iter_mut().enumerate() {
            let x = i as f32;
            let gauss = (-(x - centre).powi(2) / (2.0 * POSITION_SIGMA * POSITION_SIGMA)).exp();
            let ripple = (p * x * 0.1).sin() * RIPPLE;
            *slot += mix * (POSITION_WEIGHTS[p_idx] * gauss + ripple);
        }
    }
}

fn encode_lexical(input: &SemanticInput<'_>, provider: &dyn EmbeddingProvider, out: &mut [f32]) {
    let embedded = provider.embed(input.text);
    for (slot, v) in out.iter_mut().zip(embedded.iter()) {
        *slot = *v;
    }
}

/// Character-code spread, L1-normalized.
fn encode_transformation(input: &SemanticInput<'_>, _: &dyn EmbeddingProvider, out: &mut [f32]) {
    let dims = out.len() as u32;
    for c in input.text.chars() {
        let code = c as u32;
        let bucket = (code.wrapping_mul(7) % dims) as usize;
        out[bucket] += code as f32 / 65536.0 * TRANSFORM_STEP;
    }
    normalize_l1(out);
}

/// Text statistics `[0,10)`, phase band `[10,70)`, relation pattern `[70,100)`.
fn encode_temporal(input: &SemanticInput<'_>, _: &dyn EmbeddingProvider, out: &mut [f32]) {
    let chars: Vec<char> = input.text.chars().filter(|c| !c.is_whitespace()).collect();
    if !chars.is_empty() {
        let unique: std::collections::BTreeSet<char> = chars.iter().copied().collect();
        out[0] = (chars.len() as f32 / 100.0).min(1.0);
        out[1] = unique.len() as f32 / chars.len() as f32;
    }
    if !input.tokens.is_empty() {
        let n = input.tokens.len() as f32;
        let avg_weight = input.tokens.iter().map(|t| t.weight).sum::<f32>() / n;
        out[2] = avg_weight / 2.5;

        let mut categories = [false; TokenCategory::ALL.len()];
        let mut pos = [false; PartOfSpeech::ALL.len()];
        for t in input.tokens {
            categories[t.category.index()] = true;
            pos[t.part_of_speech.index()] = true;
        }
        out[3] = categories.iter().filter(|c| **c).count() as f32 / 10.0;
        out[4] = pos.iter().filter(|p| **p).count() as f32 / 5.0;
    }

    let k = input.phase.index();
    for (band, strength) in [(k as isize - 1, 0.4f32), (k as isize, 1.0), (k as isize + 1, 0.4)] {
        if !(0..TemporalPhase::ALL.len() as isize).contains(&band) {
            continue;
        }
        let start = 10 + band as usize * 10;
        for slot in &mut out[start..start + 10] {
            *slot += strength;
        }
    }

    for &id in input.relations {
        out[70 + (id as usize * 13) % 30] += RELATION_WEIGHT;
    }
}

/// Head/tail character codes `[0,20)`, keyword hash buckets `[20, width)`.
fn encode_contextual(input: &SemanticInput<'_>, _: &dyn EmbeddingProvider, out: &mut [f32]) {
    let chars: Vec<char> = input.text.chars().filter(|c| !c.is_whitespace()).collect();
    for (slot, c) in out.iter_mut().zip(chars.iter().take(HEAD_TAIL_CHARS)) {
        *slot = *c as u32 as f32 / 65536.0;
    }
    let tail_start = chars.len().saturating_sub(HEAD_TAIL_CHARS);
    for (i, c) in chars[tail_start..].iter().enumerate() {
        out[HEAD_TAIL_CHARS + i] = *c as u32 as f32 / 65536.0;
    }

    let bucket_base = 2 * HEAD_TAIL_CHARS;
    let buckets = out.len() - bucket_base;
    for kw in input.keywords {
        out[bucket_base + hash_bucket(kw, buckets)] += KEYWORD_WEIGHT;
    }
}

//! Scorer — one composite score per (candidate line, query).
//!
//! ```text
//! base  = Σ weight·component + base_chance
//! total = ((base · base_weight · position_bias) + noise) · usage_factor + diversity
//! ```
//!
//! clamped to `[0, 1]`. Scoring is pure given the usage snapshot: the
//! exploration noise is a keyed CRC-32 of text features, never an RNG.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use yaoline_config::EngineConfig;

use crate::analysis::{AnalysisResult, QueryEnergy};
use crate::corpus::{CandidateLine, EmotionProfile, PhaseProfile, TemporalPhase};
use crate::embedding::semantic::semantic_similarity;
use crate::engine::usage::UsageSnapshot;

const TEMPORAL_STEP: f32 = 0.2;
const QUESTION_BONUS: f32 = 0.1;
const PRIORITY_BONUS: f32 = 0.1;
const ANTI_PENALTY: f32 = 0.1;

/// Per-component scores of one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub keyword: f32,
    pub temporal: f32,
    pub energy: f32,
    pub emotion: f32,
    pub semantic: f32,
    pub positional: f32,
    /// Weighted sum plus base chance, before multipliers.
    pub base: f32,
    pub position_bias: f32,
    pub noise: f32,
    pub usage_factor: f32,
    pub diversity: f32,
    pub total: f32,
}

impl ScoreBreakdown {
    /// A breakdown carrying only a fixed total (boundary lines).
    pub fn fixed(total: f32) -> Self {
        Self {
            base: total,
            position_bias: 1.0,
            usage_factor: 1.0,
            total: total.clamp(0.0, 1.0),
            ..Self::default()
        }
    }
}

/// Score one candidate against a query.
pub fn score(
    candidate: &CandidateLine,
    analysis: &AnalysisResult,
    usage: &UsageSnapshot,
    config: &EngineConfig,
) -> ScoreBreakdown {
    let w = &config.scoring;

    let keyword = keyword_match(candidate, analysis);
    let temporal = temporal_match(&candidate.temporal_phase, analysis.temporal);
    let energy = energy_match(candidate, &analysis.energy);
    let emotion = emotion_match(&candidate.emotion, &analysis.emotion);
    let semantic = semantic_similarity(&candidate.semantic_vector, &analysis.vector, &config.semantic);
    let positional = positional_adjustment(candidate, analysis);

    let base = w.keyword * keyword
        + w.temporal * temporal
        + w.energy * energy
        + w.emotion * emotion
        + w.semantic * semantic
        + w.positional * positional
        + w.base_chance;

    let position_bias = position_bias(candidate.position, analysis.context.decision_related, config);
    let noise = exploration_noise(candidate.id, &analysis.text, config);
    let usage_factor = usage_factor(candidate.id, usage, config);
    let diversity = diversity_bonus(candidate, usage, config);

    let total = ((base * candidate.base_weight * position_bias) + noise) * usage_factor + diversity;

    ScoreBreakdown {
        keyword,
        temporal,
        energy,
        emotion,
        semantic,
        positional,
        base,
        position_bias,
        noise,
        usage_factor,
        diversity,
        total: total.clamp(0.0, 1.0),
    }
}

/// Line keywords present in the query, over the larger keyword set.
pub fn keyword_match(candidate: &CandidateLine, analysis: &AnalysisResult) -> f32 {
    let denominator = candidate.keywords.len().max(analysis.keywords.len());
    if denominator == 0 || analysis.keywords.is_empty() {
        return 0.0;
    }
    let matches = candidate
        .keywords
        .iter()
        .filter(|k| analysis.keywords.contains(k) || analysis.text.contains(k.as_str()))
        .count();
    matches as f32 / denominator as f32
}

/// Closeness on the phase axis; the hexagram modifier shifts the line.
pub fn temporal_match(line: &PhaseProfile, query: TemporalPhase) -> f32 {
    let line_index = line.base.index() as f32 + line.modifier;
    let distance = (line_index - query.index() as f32).abs();
    (1.0 - TEMPORAL_STEP * distance).max(0.0)
}

pub fn energy_match(candidate: &CandidateLine, query: &QueryEnergy) -> f32 {
    let direction = if candidate.energy.direction == query.direction {
        0.5
    } else {
        0.0
    };
    direction + 0.5 * (1.0 - (candidate.energy.intensity - query.intensity).abs()).max(0.0)
}

pub fn emotion_match(line: &EmotionProfile, query: &EmotionProfile) -> f32 {
    if line.primary == query.primary {
        return 1.0;
    }
    (1.0 - 0.5 * (line.valence - query.valence).abs()).max(0.0)
}

/// Position cue adjustment plus question, priority and anti-context terms.
pub fn positional_adjustment(candidate: &CandidateLine, analysis: &AnalysisResult) -> f32 {
    let mut adj = analysis.position_cues.adjustment(candidate.position);
    if analysis.context.is_question && candidate.position == 4 {
        adj += QUESTION_BONUS;
    }
    if candidate
        .priority_contexts
        .iter()
        .any(|c| analysis.text.contains(c.as_str()))
    {
        adj += PRIORITY_BONUS;
    }
    if candidate
        .anti_contexts
        .iter()
        .any(|c| analysis.text.contains(c.as_str()))
    {
        adj -= ANTI_PENALTY;
    }
    adj
}

pub fn position_bias(position: u8, decision_related: bool, config: &EngineConfig) -> f32 {
    let w = &config.scoring;
    match position {
        5 if decision_related => w.fifth_line_bias * w.decision_bias,
        5 => w.fifth_line_bias,
        2 | 3 => w.middle_line_bias,
        _ => 1.0,
    }
}

/// Keyed pseudo-random offset in `[0, amplitude + length_amplitude)`.
pub fn exploration_noise(candidate_id: u16, text: &str, config: &EngineConfig) -> f32 {
    let x = &config.exploration;
    let length = text.chars().count() as u32;
    let first = text.chars().next().map_or(0, |c| c as u32);
    let last = text.chars().last().map_or(0, |c| c as u32);

    let keyed = |tag: &[u8]| -> f32 {
        let mut h = crc32fast::Hasher::new();
        h.update(x.model_version.as_bytes());
        h.update(&[0]);
        h.update(x.salt.as_bytes());
        h.update(&[0]);
        h.update(tag);
        h.update(&candidate_id.to_le_bytes());
        h.update(&length.to_le_bytes());
        h.update(&first.to_le_bytes());
        h.update(&last.to_le_bytes());
        // 24 bits fit an f32 mantissa exactly, keeping the result below 1
        (h.finalize() >> 8) as f32 / (1u32 << 24) as f32
    };

    x.amplitude * keyed(b"candidate") + x.length_amplitude * keyed(b"length")
}

/// Penalty for reuse, relief for novelty, both scaled by session coverage.
pub fn usage_factor(candidate_id: u16, usage: &UsageSnapshot, config: &EngineConfig) -> f32 {
    let u = &config.usage;
    let coverage = usage.coverage();
    let count = usage.count(candidate_id) as usize;

    let mut factor = if count == 0 {
        if usage.any_selected() {
            1.0 + u.novelty_relief * (1.0 - coverage)
        } else {
            1.0
        }
    } else {
        let reuse = u.reuse_factors.get(count - 1).copied().unwrap_or(u.floor);
        reuse.powf(1.0 + u.coverage_gain * (1.0 - coverage))
    };
    if usage.is_recent(candidate_id) {
        factor *= u.recent_factor;
    }
    factor
}

pub fn diversity_bonus(candidate: &CandidateLine, usage: &UsageSnapshot, config: &EngineConfig) -> f32 {
    let d = &config.diversity;
    let mut bonus = 0.0;
    if !usage.group_used(candidate.group_id) {
        bonus += d.unused_group_bonus;
    }
    if !usage.position_used(candidate.position) {
        bonus += d.unused_position_bonus;
    }
    bonus
}

/// Ranking order: higher total first, then smaller id, then smaller group.
pub fn rank_order(a: (&CandidateLine, &ScoreBreakdown), b: (&CandidateLine, &ScoreBreakdown)) -> Ordering {
    b.1.total
        .total_cmp(&a.1.total)
        .then(a.0.id.cmp(&b.0.id))
        .then(a.0.group_id.cmp(&b.0.group_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::corpus::{Corpus, Direction, Emotion};
    use crate::embedding::tfidf::{TfIdfVectorizer, LEXICAL_DIMS};
    use crate::engine::usage::UsageStats;
    use crate::tokenizer::Tokenizer;
    use std::time::Instant;

    fn setup() -> (Corpus, TfIdfVectorizer) {
        let mut corpus = Corpus::synthesize();
        let v = TfIdfVectorizer::from_corpus(&corpus.documents(), LEXICAL_DIMS);
        corpus.attach_vectors(&v);
        (corpus, v)
    }

    #[test]
    fn totals_are_bounded() {
        let (corpus, v) = setup();
        let config = EngineConfig::default();
        let a = analyze("変化の時期に慎重に判断する", &Tokenizer::new(), &v);
        for line in corpus.regular() {
            let s = score(line, &a, &UsageSnapshot::empty(), &config);
            assert!((0.0..=1.0).contains(&s.total), "line {} total {}", line.id, s.total);
            assert!((0.0..=1.0).contains(&s.semantic));
        }
    }

    #[test]
    fn scoring_is_pure() {
        let (corpus, v) = setup();
        let config = EngineConfig::default();
        let a = analyze("新しい仕事を始める準備をしている", &Tokenizer::new(), &v);
        let line = corpus.get(7).unwrap();
        let x = score(line, &a, &UsageSnapshot::empty(), &config);
        let y = score(line, &a, &UsageSnapshot::empty(), &config);
        assert_eq!(x.total.to_bits(), y.total.to_bits());
    }

    #[test]
    fn temporal_distance_decays() {
        let at = |base, modifier| PhaseProfile { base, modifier };
        assert_eq!(temporal_match(&at(TemporalPhase::Mature, 0.0), TemporalPhase::Mature), 1.0);
        let near = temporal_match(&at(TemporalPhase::Transition, 0.0), TemporalPhase::Mature);
        assert!((near - 0.8).abs() < 1e-6);
        assert!(temporal_match(&at(TemporalPhase::Beginning, 0.0), TemporalPhase::Completion) < 1e-6);
    }

    #[test]
    fn emotion_valence_distance() {
        let a = EmotionProfile::new(Emotion::Confident, 0.6);
        let b = EmotionProfile::new(Emotion::Anxious, 0.6);
        let c = EmotionProfile::new(Emotion::Patient, 0.6);
        assert_eq!(emotion_match(&a, &a), 1.0);
        assert_eq!(emotion_match(&a, &b), 0.0);
        assert_eq!(emotion_match(&a, &c), 0.5);
    }

    #[test]
    fn energy_rewards_direction_and_intensity() {
        let corpus = Corpus::synthesize();
        let line = corpus.get(5).unwrap(); // 乾 九五: yang, intensity 1.0
        let same = QueryEnergy { direction: Direction::Expanding, intensity: 1.0 };
        let other = QueryEnergy { direction: Direction::Contracting, intensity: 0.6 };
        assert_eq!(energy_match(line, &same), 1.0);
        assert!((energy_match(line, &other) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn noise_is_keyed_and_bounded() {
        let config = EngineConfig::default();
        let a = exploration_noise(10, "テキスト", &config);
        assert_eq!(a.to_bits(), exploration_noise(10, "テキスト", &config).to_bits());
        assert_ne!(a, exploration_noise(11, "テキスト", &config));
        let max = config.exploration.amplitude + config.exploration.length_amplitude;
        for id in 1..=384 {
            let n = exploration_noise(id, "テキスト", &config);
            assert!((0.0..max).contains(&n));
        }
    }

    #[test]
    fn noise_depends_on_model_version() {
        let mut config = EngineConfig::default();
        let before = exploration_noise(10, "テキスト", &config);
        config.exploration.model_version = "4.0".into();
        assert_ne!(before, exploration_noise(10, "テキスト", &config));
    }

    #[test]
    fn usage_factor_curve() {
        let config = EngineConfig::default();
        let mut stats = UsageStats::new(&config.usage);
        assert_eq!(usage_factor(1, &stats.snapshot(), &config), 1.0);

        let now = Instant::now();
        stats.record(1, false, now);
        let snap = stats.snapshot();
        // Unused line gets novelty relief once something is selected
        assert!(usage_factor(2, &snap, &config) > 1.0);
        // Used once and recent
        let used = usage_factor(1, &snap, &config);
        assert!(used < 0.95 * config.usage.recent_factor + 1e-6);

        for _ in 0..10 {
            stats.record(1, false, now);
        }
        let floor = usage_factor(1, &stats.snapshot(), &config);
        assert!(floor < 0.15);
        assert!(floor > 0.0);
    }

    #[test]
    fn diversity_rewards_unexplored() {
        let (corpus, _) = setup();
        let config = EngineConfig::default();
        let mut stats = UsageStats::new(&config.usage);
        let line = corpus.get(1).unwrap();
        let fresh = diversity_bonus(line, &stats.snapshot(), &config);
        assert!((fresh - 0.03).abs() < 1e-6);
        stats.record(1, false, Instant::now());
        assert_eq!(diversity_bonus(line, &stats.snapshot(), &config), 0.0);
    }

    #[test]
    fn fifth_line_bias_for_decisions() {
        let config = EngineConfig::default();
        assert!((position_bias(5, true, &config) - 1.26).abs() < 1e-6);
        assert_eq!(position_bias(5, false, &config), 1.05);
        assert_eq!(position_bias(2, true, &config), 0.95);
        assert_eq!(position_bias(6, true, &config), 1.0);
    }

    #[test]
    fn rank_order_is_total() {
        let corpus = Corpus::synthesize();
        let (a, b) = (corpus.get(3).unwrap(), corpus.get(9).unwrap());
        let same = ScoreBreakdown::fixed(0.5);
        assert_eq!(rank_order((a, &same), (b, &same)), Ordering::Less);
        let higher = ScoreBreakdown::fixed(0.6);
        assert_eq!(rank_order((b, &higher), (a, &same)), Ordering::Less);
    }

    #[test]
    fn priority_and_anti_contexts_shift_position_score() {
        let (corpus, v) = setup();
        let a = analyze("新規事業の始まり", &Tokenizer::new(), &v);
        let first = corpus.get(1).unwrap();
        let sixth = corpus.get(6).unwrap();
        assert!(positional_adjustment(first, &a) > positional_adjustment(sixth, &a));
    }
}

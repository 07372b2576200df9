//! Line corpus — the 386 candidate lines and their characteristics.
//!
//! 64 hexagrams × 6 positions give 384 regular lines (id `(h-1)*6 + p`),
//! followed by the two boundary lines 用九 (385) and 用六 (386). The corpus
//! is synthesized deterministically from the static tables in
//! [`hexagrams`], optionally enriched with texts from a [`CorpusSource`],
//! then every line gets its semantic vector. Once built it is read-only.

pub mod hexagrams;
pub mod source;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::semantic::{self, SemanticInput, SemanticVector, SEMANTIC_DIMS};
use crate::embedding::{l2_norm, EmbeddingProvider};
use crate::error::EngineError;
use crate::tokenizer::{fallback_tokenize, TokenCategory};

use hexagrams::Hexagram;
pub use source::{CorpusSource, SourceEntry};

pub const REGULAR_LINES: usize = 384;
pub const TOTAL_LINES: usize = 386;
/// 用九: all lines yang, transforming.
pub const YANG_BOUNDARY_ID: u16 = 385;
/// 用六: all lines yin, transforming.
pub const YIN_BOUNDARY_ID: u16 = 386;

const REGULAR_BASE_WEIGHT: f32 = 1.0;
const BOUNDARY_BASE_WEIGHT: f32 = 0.8;
/// Source-text tokens heavier than this become line keywords.
const IMPORTANT_TOKEN_WEIGHT: f32 = 1.5;
const IMPORTANT_TOKENS_PER_TEXT: usize = 5;

/// Developmental stage, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalPhase {
    Beginning,
    EarlyDevelop,
    Developing,
    Transition,
    Mature,
    Completion,
}

impl TemporalPhase {
    pub const ALL: [TemporalPhase; 6] = [
        Self::Beginning,
        Self::EarlyDevelop,
        Self::Developing,
        Self::Transition,
        Self::Mature,
        Self::Completion,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Beginning => "始まりの時",
            Self::EarlyDevelop => "準備の時",
            Self::Developing => "発展の時",
            Self::Transition => "転換の時",
            Self::Mature => "成熟の時",
            Self::Completion => "完成の時",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Yin,
    Yang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Expanding,
    Contracting,
    Stable,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Expanding => "拡大",
            Self::Contracting => "収縮",
            Self::Stable => "安定",
        }
    }
}

/// Emotional tone of a line or a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Ambitious,
    Confident,
    Determined,
    Decisive,
    Authoritative,
    Excessive,
    Cautious,
    Patient,
    Nurturing,
    Receptive,
    Accepting,
    Yielding,
    Anxious,
    Struggling,
    Persevering,
    Emerging,
    Achieving,
    Relieved,
    Alert,
    Wary,
    Fearful,
    Insightful,
    Trapped,
    Curious,
    Enlightening,
    Passionate,
    Illuminating,
    Brilliant,
    Burning,
    Joyful,
    Peaceful,
    Hopeful,
    Neutral,
}

impl Emotion {
    /// −1, 0 or +1.
    pub fn valence(self) -> f32 {
        match self {
            Self::Confident | Self::Joyful | Self::Peaceful | Self::Hopeful | Self::Brilliant => {
                1.0
            }
            Self::Anxious | Self::Fearful | Self::Trapped | Self::Excessive | Self::Burning => -1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseProfile {
    pub base: TemporalPhase,
    pub modifier: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfile {
    pub kind: Polarity,
    pub intensity: f32,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionProfile {
    pub primary: Emotion,
    pub intensity: f32,
    pub valence: f32,
}

impl EmotionProfile {
    pub fn new(primary: Emotion, intensity: f32) -> Self {
        Self {
            primary,
            intensity,
            valence: primary.valence(),
        }
    }
}

/// Display and source texts of a line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateText {
    /// e.g. `乾為天 初九`
    pub name: String,
    pub shin: Option<String>,
    pub hen: Option<String>,
}

/// One candidate line. Immutable after corpus build.
#[derive(Debug, Clone)]
pub struct CandidateLine {
    pub id: u16,
    pub group_id: u16,
    pub position: u8,
    pub is_boundary: bool,
    pub polarity: Polarity,
    pub group_name: &'static str,
    pub line_name: String,
    pub text: CandidateText,
    pub keywords: Vec<String>,
    pub priority_contexts: Vec<String>,
    pub anti_contexts: Vec<String>,
    pub temporal_phase: PhaseProfile,
    pub energy: EnergyProfile,
    pub emotion: EmotionProfile,
    pub semantic_vector: SemanticVector,
    pub base_weight: f32,
}

impl CandidateLine {
    /// Ids of the lines this one relates to: the neighbours below and above
    /// and the corresponding line in the other trigram.
    pub fn relations(&self) -> Vec<u16> {
        if self.is_boundary {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(3);
        if self.position > 1 {
            out.push(self.id - 1);
        }
        if self.position < 6 {
            out.push(self.id + 1);
        }
        if self.position <= 3 {
            out.push(self.id + 3);
        } else {
            out.push(self.id - 3);
        }
        out
    }

    /// Text the lexical encoders see: name, keywords, source texts.
    pub fn lexical_text(&self) -> String {
        let mut parts = vec![self.text.name.clone(), self.keywords.join(" ")];
        parts.extend(self.text.shin.iter().cloned());
        parts.extend(self.text.hen.iter().cloned());
        parts.join(" ")
    }

    fn embed(&mut self, provider: &dyn EmbeddingProvider) {
        let lexical = self.lexical_text();
        let tokens = fallback_tokenize(&format!("{} {}", self.keywords.join(" "), self.text.name));
        let relations = self.relations();
        let mut profile = [0.0f32; 6];
        profile[(self.position.clamp(1, 6) - 1) as usize] = 1.0;
        let input = SemanticInput {
            tokens: &tokens,
            text: &lexical,
            position_profile: profile,
            phase: self.temporal_phase.base,
            relations: &relations,
            keywords: &self.keywords,
        };
        self.semantic_vector = semantic::build(&input, provider);
    }
}

/// The ordered, read-only line collection.
#[derive(Debug, Clone)]
pub struct Corpus {
    lines: Vec<CandidateLine>,
}

impl Corpus {
    /// Synthesize all 386 lines (without vectors) from the static tables.
    pub fn synthesize() -> Self {
        let mut lines = Vec::with_capacity(TOTAL_LINES);
        for hex in &hexagrams::HEXAGRAMS {
            for position in 1..=6u8 {
                lines.push(regular_line(hex, position));
            }
        }
        lines.push(boundary_line(YANG_BOUNDARY_ID));
        lines.push(boundary_line(YIN_BOUNDARY_ID));
        Self { lines }
    }

    /// Merge texts and keywords from an external source. Entry `i` enriches
    /// line `i + 1`; identity and cardinality never change.
    pub fn enrich(&mut self, source: &CorpusSource) -> Result<(), EngineError> {
        if source.len() != TOTAL_LINES {
            return Err(EngineError::Configuration(format!(
                "corpus source has {} entries, expected {TOTAL_LINES}",
                source.len()
            )));
        }
        for (i, (line, entry)) in self.lines.iter_mut().zip(source.entries()).enumerate() {
            if let Some(id) = entry.id {
                if id as usize != i + 1 {
                    return Err(EngineError::Configuration(format!(
                        "corpus source entry {i} has id {id}, expected {}",
                        i + 1
                    )));
                }
            }
            if let Some(name) = entry.name.as_ref().filter(|n| !n.trim().is_empty()) {
                line.text.name = name.clone();
            }
            line.text.shin = entry.shin.clone().filter(|s| !s.trim().is_empty());
            line.text.hen = entry.hen.clone().filter(|s| !s.trim().is_empty());

            let mut extra: Vec<String> = entry.keywords.clone();
            for text in [&line.text.shin, &line.text.hen].into_iter().flatten() {
                extra.extend(important_tokens(text));
            }
            push_unique(&mut line.keywords, extra);
        }
        Ok(())
    }

    /// Documents for the TF-IDF vocabulary: each line's lexical text, plus
    /// one position-keyword document per regular line.
    pub fn documents(&self) -> Vec<String> {
        let mut docs: Vec<String> = self.lines.iter().map(|l| l.lexical_text()).collect();
        docs.extend(
            self.regular()
                .iter()
                .map(|l| hexagrams::position_keywords(l.position).join(" ")),
        );
        docs
    }

    /// Compute every line's semantic vector.
    pub fn attach_vectors(&mut self, provider: &dyn EmbeddingProvider) {
        for line in &mut self.lines {
            line.embed(provider);
        }
        debug!(lines = self.lines.len(), "semantic vectors attached");
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| -> Result<(), EngineError> { Err(EngineError::Configuration(msg)) };

        if self.lines.len() != TOTAL_LINES {
            return invalid(format!("corpus has {} lines, expected {TOTAL_LINES}", self.lines.len()));
        }
        let mut seen = [[false; 6]; 64];
        for (i, line) in self.lines.iter().enumerate() {
            if line.id as usize != i + 1 {
                return invalid(format!("line at index {i} has id {}", line.id));
            }
            let norm = l2_norm(&line.semantic_vector);
            if (norm - 1.0).abs() > 1e-3 {
                return invalid(format!("line {} vector norm is {norm}", line.id));
            }
            if line.is_boundary {
                continue;
            }
            if !(1..=64).contains(&line.group_id) || !(1..=6).contains(&line.position) {
                return invalid(format!("line {} is out of range", line.id));
            }
            let slot = &mut seen[line.group_id as usize - 1][line.position as usize - 1];
            if *slot {
                return invalid(format!(
                    "duplicate (group {}, position {})",
                    line.group_id, line.position
                ));
            }
            *slot = true;
        }
        let regular = self.lines.iter().filter(|l| !l.is_boundary).count();
        let boundary = self.lines.len() - regular;
        if regular != REGULAR_LINES || boundary != 2 {
            return invalid(format!("{regular} regular and {boundary} boundary lines"));
        }
        if !seen.iter().flatten().all(|s| *s) {
            return invalid("missing (group, position) pair".into());
        }
        Ok(())
    }

    pub fn lines(&self) -> &[CandidateLine] {
        &self.lines
    }

    /// The 384 regular lines.
    pub fn regular(&self) -> &[CandidateLine] {
        &self.lines[..REGULAR_LINES.min(self.lines.len())]
    }

    /// The two boundary lines.
    pub fn boundary(&self) -> &[CandidateLine] {
        &self.lines[REGULAR_LINES.min(self.lines.len())..]
    }

    pub fn get(&self, id: u16) -> Option<&CandidateLine> {
        self.lines.get((id as usize).checked_sub(1)?)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Activation keywords of a boundary line.
pub fn boundary_activation_keywords(id: u16) -> &'static [&'static str] {
    match id {
        YANG_BOUNDARY_ID => &[
            "極限", "究極", "最大", "頂点", "限界突破", "超越", "無限", "全力", "極致", "最高峰",
            "絶対", "全陽",
        ],
        YIN_BOUNDARY_ID => &[
            "受容", "包容", "柔軟", "適応", "流れ", "委ねる", "従順", "謙虚", "内省", "調和",
            "融合", "全陰",
        ],
        _ => &[],
    }
}

fn regular_line(hex: &Hexagram, position: u8) -> CandidateLine {
    let id = (hex.number - 1) * 6 + position as u16;
    let yang = hex.is_yang(position);
    let line_name = hexagrams::line_name(position, yang);

    let mut keywords = Vec::new();
    push_unique(
        &mut keywords,
        hexagrams::position_keywords(position).iter().map(|s| s.to_string()),
    );
    push_unique(
        &mut keywords,
        hexagrams::hexagram_keywords(hex.number).iter().map(|s| s.to_string()),
    );
    push_unique(
        &mut keywords,
        hexagrams::combination_keyword(hex.number, position).map(str::to_string),
    );
    // Trigram attributes (the image itself stays out; it is in the name)
    let trigram = if position <= 3 { hex.lower } else { hex.upper };
    push_unique(
        &mut keywords,
        trigram.attributes()[1..].iter().map(|s| s.to_string()),
    );

    let options = hexagrams::phase_options(position);
    let phase = PhaseProfile {
        base: options[hex.number as usize % options.len()],
        modifier: hexagrams::phase_modifier(hex.number),
    };

    CandidateLine {
        id,
        group_id: hex.number,
        position,
        is_boundary: false,
        polarity: if yang { Polarity::Yang } else { Polarity::Yin },
        group_name: hex.name,
        text: CandidateText {
            name: format!("{} {}", hex.name, line_name),
            shin: None,
            hen: None,
        },
        line_name,
        keywords,
        priority_contexts: to_owned(hexagrams::priority_contexts(hex.number, position)),
        anti_contexts: to_owned(hexagrams::anti_contexts(hex.number, position)),
        temporal_phase: phase,
        energy: EnergyProfile {
            kind: if yang { Polarity::Yang } else { Polarity::Yin },
            intensity: hexagrams::POSITION_INTENSITY[(position - 1) as usize],
            direction: if yang {
                Direction::Expanding
            } else {
                Direction::Contracting
            },
        },
        emotion: EmotionProfile::new(hex.emotion(position), 0.5 + position as f32 * 0.08),
        semantic_vector: [0.0; SEMANTIC_DIMS],
        base_weight: REGULAR_BASE_WEIGHT,
    }
}

fn boundary_line(id: u16) -> CandidateLine {
    let yang = id == YANG_BOUNDARY_ID;
    let (group_id, label, phase, emotion, direction) = if yang {
        (1, "用九", TemporalPhase::Transition, Emotion::Confident, Direction::Expanding)
    } else {
        (2, "用六", TemporalPhase::Mature, Emotion::Peaceful, Direction::Contracting)
    };
    let keywords: &[&str] = if yang {
        &["全陽", "極致", "転換点", "群龍無首", "リーダーシップの超越"]
    } else {
        &["全陰", "受容", "柔軟性", "利永貞", "永続的な貞正"]
    };
    let group_name = hexagrams::hexagram(group_id).map(|h| h.name).unwrap_or_default();
    let polarity = if yang { Polarity::Yang } else { Polarity::Yin };

    CandidateLine {
        id,
        group_id,
        position: 6,
        is_boundary: true,
        polarity,
        group_name,
        line_name: label.to_string(),
        text: CandidateText {
            name: format!("{group_name} {label}"),
            shin: None,
            hen: None,
        },
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        priority_contexts: boundary_activation_keywords(id)
            .iter()
            .map(|s| s.to_string())
            .collect(),
        anti_contexts: Vec::new(),
        temporal_phase: PhaseProfile {
            base: phase,
            modifier: 0.0,
        },
        energy: EnergyProfile {
            kind: polarity,
            intensity: 1.0,
            direction,
        },
        emotion: EmotionProfile::new(emotion, 1.0),
        semantic_vector: [0.0; SEMANTIC_DIMS],
        base_weight: BOUNDARY_BASE_WEIGHT,
    }
}

/// The heaviest dictionary tokens of a source text.
fn important_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<_> = fallback_tokenize(text)
        .into_iter()
        .filter(|t| t.weight > IMPORTANT_TOKEN_WEIGHT && t.category != TokenCategory::General)
        .collect();
    // Stable sort keeps text order among equal weights
    tokens.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    tokens
        .into_iter()
        .take(IMPORTANT_TOKENS_PER_TEXT)
        .map(|t| t.surface)
        .collect()
}

fn push_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !item.is_empty() && !target.contains(&item) {
            target.push(item);
        }
    }
}

fn to_owned(items: Vec<&'static str>) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::tfidf::TfIdfVectorizer;

    fn built() -> Corpus {
        let mut corpus = Corpus::synthesize();
        let vectorizer = TfIdfVectorizer::from_corpus(&corpus.documents(), 100);
        corpus.attach_vectors(&vectorizer);
        corpus
    }

    fn blank_source() -> CorpusSource {
        CorpusSource::from_entries(vec![SourceEntry::default(); TOTAL_LINES])
    }

    #[test]
    fn synthesized_corpus_has_every_line() {
        let corpus = built();
        corpus.validate().unwrap();
        assert_eq!(corpus.len(), TOTAL_LINES);
        assert_eq!(corpus.regular().len(), REGULAR_LINES);
        assert_eq!(corpus.boundary().len(), 2);
        assert!(corpus.boundary().iter().all(|l| l.is_boundary));
    }

    #[test]
    fn ids_follow_group_and_position() {
        let corpus = Corpus::synthesize();
        let line = corpus.get(9).unwrap();
        assert_eq!((line.group_id, line.position), (2, 3));
        assert_eq!(line.text.name, "坤為地 六三");
        assert_eq!(corpus.get(1).unwrap().line_name, "初九");
        assert!(corpus.get(0).is_none());
        assert!(corpus.get(387).is_none());
    }

    #[test]
    fn boundary_lines_are_gated_shape() {
        let corpus = Corpus::synthesize();
        let yang = corpus.get(YANG_BOUNDARY_ID).unwrap();
        assert_eq!(yang.line_name, "用九");
        assert_eq!(yang.base_weight, BOUNDARY_BASE_WEIGHT);
        assert_eq!(yang.group_id, 1);
        let yin = corpus.get(YIN_BOUNDARY_ID).unwrap();
        assert_eq!(yin.line_name, "用六");
        assert_eq!(yin.polarity, Polarity::Yin);
    }

    #[test]
    fn characteristics_follow_position() {
        let corpus = Corpus::synthesize();
        let first = corpus.get(1).unwrap();
        assert!(first.keywords.contains(&"準備".to_string()));
        assert!(first.keywords.contains(&"創造".to_string()));
        assert_eq!(first.energy.direction, Direction::Expanding);
        assert!((first.emotion.intensity - 0.58).abs() < 1e-6);
        assert_eq!(first.temporal_phase.modifier, 0.5);
        // hexagram 1 → options[1 % 2]
        assert_eq!(first.temporal_phase.base, TemporalPhase::EarlyDevelop);

        let fifth = corpus.get(5).unwrap();
        assert_eq!(fifth.temporal_phase.base, TemporalPhase::Mature);
        assert_eq!(fifth.energy.intensity, 1.0);

        let tai_five = corpus.get(10 * 6 + 5).unwrap();
        assert!(tai_five.keywords.contains(&"大いなる調和".to_string()));
    }

    #[test]
    fn relations_stay_inside_the_hexagram() {
        let corpus = Corpus::synthesize();
        assert_eq!(corpus.get(1).unwrap().relations(), vec![2, 4]);
        assert_eq!(corpus.get(6).unwrap().relations(), vec![5, 3]);
        assert!(corpus.get(YANG_BOUNDARY_ID).unwrap().relations().is_empty());
    }

    #[test]
    fn enrich_adds_texts_and_keywords() {
        let mut entries = vec![SourceEntry::default(); TOTAL_LINES];
        entries[0] = SourceEntry {
            id: Some(1),
            name: None,
            shin: Some("潛龍勿用".into()),
            hen: None,
            keywords: vec!["潜龍".into()],
        };
        let mut corpus = Corpus::synthesize();
        corpus.enrich(&CorpusSource::from_entries(entries)).unwrap();
        let line = corpus.get(1).unwrap();
        assert_eq!(line.text.shin.as_deref(), Some("潛龍勿用"));
        assert!(line.keywords.contains(&"潜龍".to_string()));
        // Dictionary terms from the text
        assert!(line.keywords.contains(&"龍".to_string()));
        assert!(line.keywords.contains(&"潛".to_string()));
        // Identity untouched
        assert_eq!(line.text.name, "乾為天 初九");
        assert_eq!(corpus.len(), TOTAL_LINES);
    }

    #[test]
    fn enrich_rejects_wrong_cardinality() {
        let mut corpus = Corpus::synthesize();
        let short = CorpusSource::from_entries(vec![SourceEntry::default(); 10]);
        assert!(matches!(
            corpus.enrich(&short),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn enrich_rejects_mismatched_id() {
        let mut entries = vec![SourceEntry::default(); TOTAL_LINES];
        entries[3].id = Some(99);
        let mut corpus = Corpus::synthesize();
        assert!(corpus.enrich(&CorpusSource::from_entries(entries)).is_err());
    }

    #[test]
    fn blank_source_changes_nothing_structural() {
        let mut corpus = Corpus::synthesize();
        corpus.enrich(&blank_source()).unwrap();
        assert_eq!(corpus.get(7).unwrap().text.name, "坤為地 初六");
    }

    #[test]
    fn validate_catches_missing_vectors() {
        let corpus = Corpus::synthesize();
        assert!(corpus.validate().is_err());
    }

    #[test]
    fn vectors_are_deterministic() {
        let a = built();
        let b = built();
        for (x, y) in a.lines().iter().zip(b.lines()) {
            assert!(x
                .semantic_vector
                .iter()
                .zip(y.semantic_vector.iter())
                .all(|(p, q)| p.to_bits() == q.to_bits()));
        }
    }

    #[test]
    fn documents_cover_lines_and_positions() {
        let corpus = Corpus::synthesize();
        assert_eq!(corpus.documents().len(), TOTAL_LINES + REGULAR_LINES);
    }
}

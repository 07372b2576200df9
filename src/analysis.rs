//! Query analysis — free text to the features the scorer compares.
//!
//! Every guess here is a keyword heuristic over the raw text: phase, energy
//! and emotion detection, position cues, sentiment and domain. None of it
//! fails; unknown text falls through to neutral defaults.

use serde::{Deserialize, Serialize};

use crate::corpus::hexagrams::POSITION_KEYWORDS;
use crate::corpus::{Direction, Emotion, EmotionProfile, TemporalPhase};
use crate::embedding::semantic::{self, SemanticInput, SemanticVector};
use crate::embedding::EmbeddingProvider;
use crate::tokenizer::{Token, TokenCategory, Tokenizer};

/// Phase cue lists, checked in order; the first hit wins.
const PHASE_CUES: [(TemporalPhase, &[&str]); 6] = [
    (
        TemporalPhase::Beginning,
        &["始", "新", "初", "スタート", "開始", "第一歩", "着手", "始まり", "立ち上げ"],
    ),
    (
        TemporalPhase::EarlyDevelop,
        &["準備", "計画", "構想", "検討", "模索", "試行", "基礎"],
    ),
    (
        TemporalPhase::Developing,
        &["成長", "発展", "進行", "途中", "継続", "進む", "実行中"],
    ),
    (
        TemporalPhase::Transition,
        &["変化", "転換", "移行", "岐路", "転機", "変更", "調整"],
    ),
    (
        TemporalPhase::Mature,
        &[
            "成熟", "完成", "達成", "成功", "安定", "確立", "充実", "リーダー", "責任", "統率",
            "指導", "管理", "権限", "中心",
        ],
    ),
    (
        TemporalPhase::Completion,
        &["終", "完了", "結果", "終了", "締結", "最後", "極致"],
    ),
];

const EXPANDING_CUES: &[&str] = &["積極", "前進", "拡大", "成長", "上昇"];
const CONTRACTING_CUES: &[&str] = &["慎重", "後退", "縮小", "保守", "下降"];
/// Text energy intensity; the cues only pick the direction.
const QUERY_ENERGY_INTENSITY: f32 = 0.6;

const EMOTION_CUES: [(Emotion, &[&str]); 4] = [
    (Emotion::Confident, &["自信", "確信", "強い"]),
    (Emotion::Anxious, &["不安", "心配", "迷"]),
    (Emotion::Hopeful, &["希望", "期待", "楽観"]),
    (Emotion::Cautious, &["慎重", "警戒", "注意"]),
];
const INTENSIFIERS: &[&str] = &["とても", "非常", "極めて", "本当に", "全く", "絶対"];
const BASE_EMOTION_INTENSITY: f32 = 0.5;
const EXCLAMATION_STEP: f32 = 0.05;
const EXCLAMATION_MAX: f32 = 0.2;

const IMPORTANT_TERMS: &[&str] = &[
    "始", "新", "変", "完", "成", "発", "展", "安", "定", "困", "難", "創造", "開始", "成長",
    "転換", "完了", "危機", "機会", "調和",
];

const POSITIVE_CUES: &[&str] = &["良い", "素晴らしい", "成功", "幸せ", "嬉しい"];
const NEGATIVE_CUES: &[&str] = &["悪い", "失敗", "困難", "不安", "心配"];

const DECISION_CUES: &[&str] = &[
    "決定", "判断", "決断", "決める", "選ぶ", "選択", "裁定", "決裁", "承認", "認可", "批准",
    "決着", "結論", "最終", "確定", "方針", "戦略", "計画", "リーダー", "指導", "統率", "管理",
    "経営", "方向性", "判定", "評価", "審査", "採択", "実行", "実施",
];

/// Cue words pointing at each line position.
const POSITION_CUES: [&[&str]; 6] = [
    &["始", "新", "初", "基礎", "準備", "第一歩", "着手", "スタート"],
    &["協力", "関係", "内面", "相談", "支援"],
    &["困難", "試練", "挑戦", "問題"],
    &["変化", "転換", "決断", "外部", "環境", "選択", "岐路"],
    &[
        "リーダーシップ", "決断", "成熟", "統率", "指導", "権威", "頂点", "支配", "君主", "統治",
        "最高", "絶頂", "完成間近", "最終段階", "決定的", "主導", "極致", "統括", "総括", "監督",
        "指揮", "采配", "統制", "管理職", "経営者", "円熟", "熟練", "老練", "達人", "マスター",
        "エキスパート", "プロフェッショナル", "ベテラン", "最終判断", "裁定", "決裁", "承認",
        "認可", "批准", "決着", "重鎮", "要職", "高位", "上級", "幹部", "役員", "トップ",
        "リーダー", "責任", "管理", "権限", "中心", "決定", "判断", "方向", "戦略", "全体", "統合",
        "マネジメント", "上位", "達成", "成功", "安定", "確立", "充実", "最適", "理想", "完璧",
    ],
    &["完成", "終了", "極限", "最終", "完了", "結果"],
];
const CUE_STEP: f32 = 0.05;
const FIFTH_CUE_STEP: f32 = 0.25;
const OFF_CUE_PENALTY: f32 = -0.03;
const MIDDLE_OFF_CUE_PENALTY: f32 = -0.05;
const FIFTH_DEFAULT_BONUS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Business,
    Relationship,
    Health,
    Education,
    General,
}

/// Surface features of the query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    pub char_length: usize,
    pub sentence_count: usize,
    pub is_question: bool,
    pub sentiment: Sentiment,
    pub domain: Domain,
    pub decision_related: bool,
}

/// Energy read from the text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryEnergy {
    pub direction: Direction,
    pub intensity: f32,
}

/// Which line positions the text points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionCues {
    /// Cue hits per position (index 0 = position 1).
    pub matches: [usize; 6],
    /// Score adjustment per position.
    pub adjustments: [f32; 6],
    /// Position with the strongest cue, if any matched.
    pub best: Option<u8>,
}

impl PositionCues {
    pub fn adjustment(&self, position: u8) -> f32 {
        match position {
            1..=6 => self.adjustments[(position - 1) as usize],
            _ => 0.0,
        }
    }

    /// Mixing weights for the positional vector segment: cue hits
    /// normalized, or uniform when nothing matched.
    pub fn profile(&self) -> [f32; 6] {
        let total: usize = self.matches.iter().sum();
        if total == 0 {
            return [1.0 / 6.0; 6];
        }
        let mut out = [0.0; 6];
        for (slot, &m) in out.iter_mut().zip(self.matches.iter()) {
            *slot = m as f32 / total as f32;
        }
        out
    }
}

/// Everything derived from one query.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub text: String,
    pub tokens: Vec<Token>,
    /// Recognized keywords, in discovery order.
    pub keywords: Vec<String>,
    pub temporal: TemporalPhase,
    pub energy: QueryEnergy,
    pub emotion: EmotionProfile,
    pub vector: SemanticVector,
    pub position_cues: PositionCues,
    pub context: QueryContext,
    /// The analyzer failed and the fallback tokenizer was used.
    pub degraded: bool,
}

/// Analyze `text`. Pure apart from tokenizer logging.
pub fn analyze(text: &str, tokenizer: &Tokenizer, provider: &dyn EmbeddingProvider) -> AnalysisResult {
    let tokenization = tokenizer.tokenize(text);
    let tokens = tokenization.tokens;
    let keywords = extract_keywords(text, &tokens);
    let temporal = detect_temporal(text);
    let position_cues = position_cues(text);

    let vector = semantic::build(
        &SemanticInput {
            tokens: &tokens,
            text,
            position_profile: position_cues.profile(),
            phase: temporal,
            relations: &[],
            keywords: &keywords,
        },
        provider,
    );

    AnalysisResult {
        text: text.to_string(),
        keywords,
        temporal,
        energy: detect_energy(text),
        emotion: detect_emotion(text),
        vector,
        position_cues,
        context: context(text),
        degraded: tokenization.degraded,
        tokens,
    }
}

/// Non-general token surfaces, then important terms and position keywords
/// found in the text, de-duplicated.
pub fn extract_keywords(text: &str, tokens: &[Token]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |s: &str| {
        if !s.is_empty() && !out.iter().any(|k| k == s) {
            out.push(s.to_string());
        }
    };
    for t in tokens.iter().filter(|t| t.category != TokenCategory::General) {
        push(&t.surface);
    }
    for term in IMPORTANT_TERMS.iter().filter(|t| text.contains(*t)) {
        push(term);
    }
    for kw in POSITION_KEYWORDS.iter().flat_map(|p| p.iter()) {
        if text.contains(kw) {
            push(kw);
        }
    }
    out
}

/// First phase whose cue list hits; otherwise a stable hash of the text.
pub fn detect_temporal(text: &str) -> TemporalPhase {
    for (phase, cues) in PHASE_CUES {
        if cues.iter().any(|c| text.contains(c)) {
            return phase;
        }
    }
    let code_sum: u64 = text.chars().map(|c| c as u64).sum();
    TemporalPhase::ALL[(code_sum % 6) as usize]
}

pub fn detect_energy(text: &str) -> QueryEnergy {
    let direction = if EXPANDING_CUES.iter().any(|c| text.contains(c)) {
        Direction::Expanding
    } else if CONTRACTING_CUES.iter().any(|c| text.contains(c)) {
        Direction::Contracting
    } else {
        Direction::Stable
    };
    QueryEnergy {
        direction,
        intensity: QUERY_ENERGY_INTENSITY,
    }
}

/// Primary emotion from the first matching cue list; intensity grows with
/// cue hits, intensifiers and exclamation marks.
pub fn detect_emotion(text: &str) -> EmotionProfile {
    let primary = EMOTION_CUES
        .iter()
        .find(|(_, cues)| cues.iter().any(|c| text.contains(c)))
        .map(|(e, _)| *e)
        .unwrap_or(Emotion::Neutral);

    let cue_hits = EMOTION_CUES
        .iter()
        .flat_map(|(_, cues)| cues.iter())
        .filter(|c| text.contains(*c))
        .count();
    let intensifier_hits = INTENSIFIERS.iter().filter(|c| text.contains(*c)).count();
    let exclamations = text.chars().filter(|c| matches!(c, '！' | '!')).count();

    let intensity = BASE_EMOTION_INTENSITY
        + 0.1 * cue_hits as f32
        + 0.1 * intensifier_hits as f32
        + (EXCLAMATION_STEP * exclamations as f32).min(EXCLAMATION_MAX);

    EmotionProfile::new(primary, intensity.min(1.0))
}

/// Count cue hits per position and turn them into score adjustments.
pub fn position_cues(text: &str) -> PositionCues {
    let mut matches = [0usize; 6];
    for (slot, cues) in matches.iter_mut().zip(POSITION_CUES.iter()) {
        *slot = cues.iter().filter(|c| text.contains(*c)).count();
    }

    let mut best: Option<(u8, f32)> = None;
    for (i, &m) in matches.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let step = if i == 4 { FIFTH_CUE_STEP } else { CUE_STEP };
        let adj = m as f32 * step;
        if best.map_or(true, |(_, b)| adj > b) {
            best = Some((i as u8 + 1, adj));
        }
    }

    let mut adjustments = [0.0f32; 6];
    match best {
        None => adjustments[4] = FIFTH_DEFAULT_BONUS,
        Some((best_pos, adj)) => {
            for (i, slot) in adjustments.iter_mut().enumerate() {
                let pos = i as u8 + 1;
                *slot = if pos == best_pos {
                    adj
                } else if pos == 2 || pos == 3 {
                    MIDDLE_OFF_CUE_PENALTY
                } else {
                    OFF_CUE_PENALTY
                };
            }
        }
    }

    PositionCues {
        matches,
        adjustments,
        best: best.map(|(p, _)| p),
    }
}

pub fn context(text: &str) -> QueryContext {
    let sentence_count = text
        .split(['。', '！', '？', '!', '?', '\n'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let trimmed = text.trim_end();
    let sentiment = if POSITIVE_CUES.iter().any(|c| text.contains(c)) {
        Sentiment::Positive
    } else if NEGATIVE_CUES.iter().any(|c| text.contains(c)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    QueryContext {
        char_length: text.chars().count(),
        sentence_count,
        is_question: text.contains(['？', '?']) || trimmed.ends_with('か'),
        sentiment,
        domain: detect_domain(text),
        decision_related: is_decision_related(text),
    }
}

fn detect_domain(text: &str) -> Domain {
    let any = |cues: &[&str]| cues.iter().any(|c| text.contains(c));
    if any(&["仕事", "ビジネス"]) {
        Domain::Business
    } else if any(&["恋愛", "結婚"]) {
        Domain::Relationship
    } else if any(&["健康", "病気"]) {
        Domain::Health
    } else if any(&["勉強", "学習"]) {
        Domain::Education
    } else {
        Domain::General
    }
}

pub fn is_decision_related(text: &str) -> bool {
    DECISION_CUES.iter().any(|c| text.contains(c))
}

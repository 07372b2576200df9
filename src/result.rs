//! Result assembly — selected line plus analysis to the public payload.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::corpus::{
    CandidateLine, Direction, Emotion, EmotionProfile, EnergyProfile, PhaseProfile, TemporalPhase,
};
use crate::error::AnalysisWarning;
use crate::scoring::ScoreBreakdown;

/// The full answer to one `analyze` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate_id: u16,
    pub group_id: u16,
    pub position: u8,
    pub is_boundary: bool,
    pub group_name: String,
    pub line_name: String,
    /// e.g. `乾為天 初九`
    pub label: String,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
    /// Keywords recognized in the query.
    pub matched_keywords: Vec<String>,
    pub characteristics: Option<LineCharacteristics>,
    pub interpretation: Option<Interpretation>,
    pub alternatives: Vec<Alternative>,
    pub from_cache: bool,
    pub processing_time_ms: f64,
    pub warnings: Vec<AnalysisWarning>,
    /// The query as given.
    pub original_text: String,
}

/// Static traits of the selected line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCharacteristics {
    pub keywords: Vec<String>,
    pub priority_contexts: Vec<String>,
    pub anti_contexts: Vec<String>,
    pub phase: PhaseProfile,
    pub energy: EnergyProfile,
    pub emotion: EmotionProfile,
    pub shin: Option<String>,
    pub hen: Option<String>,
}

/// Short human-readable labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    pub phase: String,
    pub energy: String,
    pub position: String,
    /// Phase, energy and position read together.
    pub modern: String,
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub candidate_id: u16,
    pub label: String,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
}

/// Meaning of each line position.
pub fn position_label(position: u8) -> &'static str {
    match position {
        1 => "始動期: 物事の始まり、潜在的な力",
        2 => "基盤期: 内なる力を蓄え、協力を得る",
        3 => "試練期: 困難と向き合い、成長する",
        4 => "転換期: 外界との関わり、進退の決断",
        5 => "成就期: 中正を得て、力を発揮する",
        6 => "完結期: 極まりと次への転換",
        _ => "",
    }
}

const FALLBACK_ADVICE: &str = "状況をよく観察し、適切なタイミングで行動しましょう。";

/// Keyword-triggered advice, in this order.
const KEYWORD_ADVICE: [(&str, &str); 3] = [
    ("始動", "新しいことを始めるのに適した時期です。"),
    ("忍耐", "今は耐え忍ぶことが重要です。"),
    ("成就", "努力が実を結ぶ時が来ました。"),
];

fn phase_reading(phase: TemporalPhase) -> &'static str {
    match phase {
        TemporalPhase::Beginning => "新しい始まりの時期です。",
        TemporalPhase::EarlyDevelop => "基礎を築く重要な段階です。",
        TemporalPhase::Developing => "成長と発展の真っ只中にいます。",
        TemporalPhase::Transition => "転換期を迎えています。",
        TemporalPhase::Mature => "成熟と実りの時期です。",
        TemporalPhase::Completion => "一つのサイクルが完了しようとしています。",
    }
}

fn position_advice(position: u8) -> &'static str {
    match position {
        1 => "潜在的な力を蓄える時期です。",
        2 => "内面の充実を図りましょう。",
        3 => "困難はあれど成長の機会です。",
        4 => "外界との関わりが重要です。",
        5 => "リーダーシップを発揮する時です。",
        6 => "次の段階への準備をしましょう。",
        _ => "",
    }
}

/// Present-day reading of a line from its phase, energy and position.
pub fn modern_reading(line: &CandidateLine) -> String {
    let mut parts = vec![phase_reading(line.temporal_phase.base)];
    match line.energy.direction {
        Direction::Expanding => parts.push("積極的に前進すべき時です。"),
        Direction::Contracting => parts.push("内省と準備の時期です。"),
        Direction::Stable => {}
    }
    parts.push(position_advice(line.position));
    parts.retain(|p| !p.is_empty());
    parts.join(" ")
}

/// Advice from the line's keywords and primary emotion.
pub fn advice(line: &CandidateLine) -> String {
    let mut parts: Vec<&str> = KEYWORD_ADVICE
        .iter()
        .filter(|(keyword, _)| line.keywords.iter().any(|k| k == keyword))
        .map(|(_, text)| *text)
        .collect();
    match line.emotion.primary {
        Emotion::Anxious => parts.push("不安はありますが、それは成長の証です。"),
        Emotion::Confident => parts.push("自信を持って前進してください。"),
        _ => {}
    }
    if parts.is_empty() {
        FALLBACK_ADVICE.to_string()
    } else {
        parts.join(" ")
    }
}

fn line_summary(line: &CandidateLine, score: f32, breakdown: ScoreBreakdown) -> MatchResult {
    MatchResult {
        candidate_id: line.id,
        group_id: line.group_id,
        position: line.position,
        is_boundary: line.is_boundary,
        group_name: line.group_name.to_string(),
        line_name: line.line_name.clone(),
        label: line.text.name.clone(),
        score,
        breakdown,
        characteristics: Some(LineCharacteristics {
            keywords: line.keywords.clone(),
            priority_contexts: line.priority_contexts.clone(),
            anti_contexts: line.anti_contexts.clone(),
            phase: line.temporal_phase,
            energy: line.energy,
            emotion: line.emotion,
            shin: line.text.shin.clone(),
            hen: line.text.hen.clone(),
        }),
        interpretation: Some(Interpretation {
            phase: line.temporal_phase.base.label().to_string(),
            energy: format!(
                "{} (強度 {:.1})",
                line.energy.direction.label(),
                line.energy.intensity
            ),
            position: position_label(line.position).to_string(),
            modern: modern_reading(line),
            advice: advice(line),
        }),
        ..MatchResult::default()
    }
}

/// Build the result for a selected line. Pure.
pub fn assemble(
    selected: &CandidateLine,
    breakdown: &ScoreBreakdown,
    analysis: &AnalysisResult,
    alternatives: &[(&CandidateLine, ScoreBreakdown)],
    processing_time_ms: f64,
) -> MatchResult {
    let mut warnings = Vec::new();
    if analysis.degraded {
        warnings.push(AnalysisWarning::DegradedAnalysis);
    }
    MatchResult {
        matched_keywords: analysis.keywords.clone(),
        alternatives: alternatives
            .iter()
            .map(|(line, b)| Alternative {
                candidate_id: line.id,
                label: line.text.name.clone(),
                score: b.total,
                breakdown: *b,
            })
            .collect(),
        processing_time_ms,
        warnings,
        original_text: analysis.text.clone(),
        ..line_summary(selected, breakdown.total, *breakdown)
    }
}

/// Result for empty input: the default line, no scoring.
pub fn empty_input(default_line: &CandidateLine, text: &str, processing_time_ms: f64) -> MatchResult {
    MatchResult {
        processing_time_ms,
        original_text: text.to_string(),
        warnings: vec![AnalysisWarning::EmptyInput],
        ..line_summary(default_line, 0.0, ScoreBreakdown::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::corpus::Corpus;
    use crate::embedding::tfidf::TfIdfVectorizer;
    use crate::tokenizer::Tokenizer;

    #[test]
    fn assemble_carries_line_and_query_fields() {
        let corpus = Corpus::synthesize();
        let v = TfIdfVectorizer::from_corpus(&corpus.documents(), 100);
        let analysis = analyze("新しい始まり", &Tokenizer::new(), &v);
        let line = corpus.get(1).unwrap();
        let alt = corpus.get(7).unwrap();
        let b = ScoreBreakdown::fixed(0.7);

        let r = assemble(line, &b, &analysis, &[(alt, ScoreBreakdown::fixed(0.6))], 1.5);
        assert_eq!(r.candidate_id, 1);
        assert_eq!(r.label, "乾為天 初九");
        assert_eq!(r.score, 0.7);
        assert_eq!(r.alternatives.len(), 1);
        assert_eq!(r.alternatives[0].candidate_id, 7);
        assert_eq!(r.matched_keywords, analysis.keywords);
        assert!(!r.from_cache);
        assert!(r.warnings.is_empty());
        assert_eq!(r.original_text, "新しい始まり");
        let i = r.interpretation.unwrap();
        assert_eq!(i.position, position_label(1));
        assert!(i.modern.contains("潜在的な力を蓄える時期です。"));
    }

    #[test]
    fn advice_follows_line_keywords() {
        let corpus = Corpus::synthesize();
        // Positions 1, 2 and 5 carry 始動, 忍耐 and 成就
        for (id, expected) in [
            (1, "新しいことを始めるのに適した時期です。"),
            (2, "今は耐え忍ぶことが重要です。"),
            (5, "努力が実を結ぶ時が来ました。"),
        ] {
            let text = advice(corpus.get(id).unwrap());
            assert!(text.contains(expected), "line {id}: {text}");
            assert_ne!(text, FALLBACK_ADVICE);
        }
    }

    #[test]
    fn advice_reflects_emotion_and_falls_back() {
        let corpus = Corpus::synthesize();
        let mut line = corpus.get(3).unwrap().clone();
        line.keywords.clear();

        line.emotion = EmotionProfile::new(Emotion::Anxious, 0.6);
        assert_eq!(advice(&line), "不安はありますが、それは成長の証です。");
        line.emotion = EmotionProfile::new(Emotion::Confident, 0.6);
        assert_eq!(advice(&line), "自信を持って前進してください。");

        line.emotion = EmotionProfile::new(Emotion::Patient, 0.6);
        assert_eq!(advice(&line), FALLBACK_ADVICE);
    }

    #[test]
    fn modern_reading_combines_phase_energy_and_position() {
        let corpus = Corpus::synthesize();
        let mut line = corpus.get(4).unwrap().clone();
        line.temporal_phase.base = TemporalPhase::Transition;
        line.energy.direction = Direction::Contracting;
        assert_eq!(
            modern_reading(&line),
            "転換期を迎えています。 内省と準備の時期です。 外界との関わりが重要です。"
        );
        line.energy.direction = Direction::Stable;
        assert_eq!(modern_reading(&line), "転換期を迎えています。 外界との関わりが重要です。");
    }

    #[test]
    fn empty_input_flags_warning() {
        let corpus = Corpus::synthesize();
        let r = empty_input(corpus.get(1).unwrap(), "  ", 0.1);
        assert_eq!(r.candidate_id, 1);
        assert_eq!(r.warnings, vec![AnalysisWarning::EmptyInput]);
        assert!(!r.from_cache);
        assert!(r.matched_keywords.is_empty());
        assert_eq!(r.original_text, "  ");
    }

    #[test]
    fn result_serializes_to_json() {
        let corpus = Corpus::synthesize();
        let r = empty_input(corpus.get(1).unwrap(), "", 0.0);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["candidate_id"], 1);
        assert_eq!(json["warnings"][0], "empty_input");
    }
}

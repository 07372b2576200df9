//! Tokenizer — text to weighted, categorized tokens.
//!
//! Two modes. A pluggable [`MorphologicalAnalyzer`] does the segmentation when
//! one is configured; its output is stop-word filtered and re-weighted from the
//! static dictionary. Without one (or when it fails) a deterministic fallback
//! scans for dictionary terms and then splits the text into character-class
//! runs. Output is never empty for non-empty input.

pub mod dictionary;

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use dictionary::{PartOfSpeech, TokenCategory};

/// Weight of a token with no dictionary entry.
const DEFAULT_WEIGHT: f32 = 1.0;
/// Weight of a single-character token from the last-resort split.
const MINIMAL_WEIGHT: f32 = 0.5;

static RUNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<kanji>[一-龠々]+)|(?P<hiragana>[ぁ-ん]+)|(?P<katakana>[ァ-ヴー]+)|(?P<number>[0-9０-９]+)|(?P<latin>[a-zA-Z]+)",
    )
    .expect("character class regex")
});

/// A single token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub surface: String,
    pub part_of_speech: PartOfSpeech,
    pub weight: f32,
    pub category: TokenCategory,
}

impl Token {
    fn general(surface: &str, part_of_speech: PartOfSpeech, weight: f32) -> Self {
        Self {
            surface: surface.to_string(),
            part_of_speech,
            weight,
            category: TokenCategory::General,
        }
    }

    /// Build a token, taking weight and category from the dictionary when the
    /// surface is a known term.
    fn classify(surface: &str, guessed: PartOfSpeech) -> Self {
        match dictionary::lookup(surface) {
            Some(e) => Self {
                surface: surface.to_string(),
                part_of_speech: e.part_of_speech,
                weight: e.weight,
                category: e.category,
            },
            None => Self::general(surface, guessed, DEFAULT_WEIGHT),
        }
    }
}

/// Output of [`Tokenizer::tokenize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokenization {
    pub tokens: Vec<Token>,
    /// The configured analyzer failed; the fallback was used.
    pub degraded: bool,
}

/// Segment produced by an external analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub surface: String,
    pub part_of_speech: PartOfSpeech,
}

/// Errors from an external morphological analyzer.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("analysis failed: {0}")]
    Failed(String),
}

/// Pluggable morphological analyzer.
pub trait MorphologicalAnalyzer: Send + Sync {
    /// Segment text into surface forms with parts of speech.
    fn analyze(&self, text: &str) -> Result<Vec<AnalyzedToken>, AnalyzerError>;
}

/// Character class of a fallback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunClass {
    Kanji,
    Hiragana,
    Katakana,
    Number,
    Latin,
}

/// Tokenizer with an optional analyzer.
#[derive(Clone, Default)]
pub struct Tokenizer {
    analyzer: Option<Arc<dyn MorphologicalAnalyzer>>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analyzer(analyzer: Arc<dyn MorphologicalAnalyzer>) -> Self {
        Self {
            analyzer: Some(analyzer),
        }
    }

    pub fn has_analyzer(&self) -> bool {
        self.analyzer.is_some()
    }

    /// Tokenize text. Pure apart from a warning log on analyzer failure.
    pub fn tokenize(&self, text: &str) -> Tokenization {
        if text.trim().is_empty() {
            return Tokenization::default();
        }

        let mut degraded = false;
        let mut tokens = match &self.analyzer {
            Some(analyzer) => match analyzer.analyze(text) {
                Ok(segments) => {
                    let tokens = from_segments(&segments);
                    if tokens.is_empty() {
                        warn!("analyzer returned no usable tokens, using fallback tokenizer");
                        degraded = true;
                        fallback_tokenize(text)
                    } else {
                        tokens
                    }
                }
                Err(e) => {
                    warn!(error = %e, "analyzer failed, using fallback tokenizer");
                    degraded = true;
                    fallback_tokenize(text)
                }
            },
            None => fallback_tokenize(text),
        };

        if tokens.is_empty() {
            tokens = minimal_tokenize(text);
        }
        Tokenization { tokens, degraded }
    }
}

fn from_segments(segments: &[AnalyzedToken]) -> Vec<Token> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .filter_map(|s| {
            let surface = s.surface.trim();
            if surface.is_empty()
                || dictionary::is_stop_word(surface)
                || !seen.insert(surface.to_string())
            {
                return None;
            }
            Some(Token::classify(surface, s.part_of_speech))
        })
        .collect()
}

/// Deterministic fallback: dictionary terms first (table order), then
/// character-class runs in text order, de-duplicated by surface.
pub fn fallback_tokenize(text: &str) -> Vec<Token> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut tokens = Vec::new();

    for entry in dictionary::DICTIONARY {
        if text.contains(entry.surface) && seen.insert(entry.surface.to_string()) {
            tokens.push(Token {
                surface: entry.surface.to_string(),
                part_of_speech: entry.part_of_speech,
                weight: entry.weight,
                category: entry.category,
            });
        }
    }

    for caps in RUNS.captures_iter(text) {
        let (run, class) = if let Some(m) = caps.name("kanji") {
            (m.as_str(), RunClass::Kanji)
        } else if let Some(m) = caps.name("hiragana") {
            (m.as_str(), RunClass::Hiragana)
        } else if let Some(m) = caps.name("katakana") {
            (m.as_str(), RunClass::Katakana)
        } else if let Some(m) = caps.name("number") {
            (m.as_str(), RunClass::Number)
        } else if let Some(m) = caps.name("latin") {
            (m.as_str(), RunClass::Latin)
        } else {
            continue;
        };
        if dictionary::is_stop_word(run) || !seen.insert(run.to_string()) {
            continue;
        }
        tokens.push(Token::classify(run, guess_pos(run, class)));
    }

    tokens
}

/// Every term occurrence in `text`, repeats included, for term-frequency
/// counting. Dictionary terms are counted by substring occurrence; runs that
/// are themselves dictionary terms are not counted twice.
pub fn term_occurrences(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for entry in dictionary::DICTIONARY {
        let count = text.matches(entry.surface).count();
        terms.extend(std::iter::repeat(entry.surface.to_string()).take(count));
    }
    for m in RUNS.find_iter(text) {
        let run = m.as_str();
        if dictionary::is_stop_word(run) || dictionary::lookup(run).is_some() {
            continue;
        }
        terms.push(run.to_string());
    }
    terms
}

/// Last resort: every distinct non-whitespace character becomes a token.
fn minimal_tokenize(text: &str) -> Vec<Token> {
    let mut seen = HashSet::new();
    text.chars()
        .filter(|c| !c.is_whitespace())
        .filter(|c| seen.insert(*c))
        .map(|c| Token::general(&c.to_string(), PartOfSpeech::Unknown, MINIMAL_WEIGHT))
        .collect()
}

fn guess_pos(run: &str, class: RunClass) -> PartOfSpeech {
    match class {
        RunClass::Kanji | RunClass::Katakana => PartOfSpeech::Noun,
        RunClass::Hiragana => match run.chars().last() {
            Some('う' | 'く' | 'ぐ' | 'す' | 'つ' | 'ぬ' | 'ぶ' | 'む' | 'ゆ' | 'る') => {
                PartOfSpeech::Verb
            }
            Some('い' | 'し' | 'き') => PartOfSpeech::Adjective,
            _ => PartOfSpeech::Unknown,
        },
        RunClass::Number | RunClass::Latin => PartOfSpeech::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surfaces(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.surface.as_str()).collect()
    }

    struct FixedAnalyzer(Vec<(&'static str, PartOfSpeech)>);

    impl MorphologicalAnalyzer for FixedAnalyzer {
        fn analyze(&self, _text: &str) -> Result<Vec<AnalyzedToken>, AnalyzerError> {
            Ok(self
                .0
                .iter()
                .map(|(s, p)| AnalyzedToken {
                    surface: s.to_string(),
                    part_of_speech: *p,
                })
                .collect())
        }
    }

    struct BrokenAnalyzer;

    impl MorphologicalAnalyzer for BrokenAnalyzer {
        fn analyze(&self, _text: &str) -> Result<Vec<AnalyzedToken>, AnalyzerError> {
            Err(AnalyzerError::Unavailable("dictionary not loaded".into()))
        }
    }

    #[test]
    fn fallback_splits_by_character_class() {
        let tokens = fallback_tokenize("新しい仕事を始める準備");
        let s = surfaces(&tokens);
        // Dictionary hit comes first
        assert_eq!(s[0], "準備");
        assert!(s.contains(&"新"));
        assert!(s.contains(&"仕事"));
        assert!(s.contains(&"始"));
        // Stop word "を" dropped
        assert!(!s.contains(&"を"));
    }

    #[test]
    fn fallback_deduplicates() {
        let tokens = fallback_tokenize("龍 龍 龍");
        assert_eq!(surfaces(&tokens), vec!["龍"]);
        assert_eq!(tokens[0].category, TokenCategory::Symbol);
    }

    #[test]
    fn pos_guess_from_hiragana_ending() {
        assert_eq!(guess_pos("はしる", RunClass::Hiragana), PartOfSpeech::Verb);
        assert_eq!(guess_pos("たかい", RunClass::Hiragana), PartOfSpeech::Adjective);
        assert_eq!(guess_pos("ねこ", RunClass::Hiragana), PartOfSpeech::Unknown);
        assert_eq!(guess_pos("テスト", RunClass::Katakana), PartOfSpeech::Noun);
        assert_eq!(guess_pos("abc", RunClass::Latin), PartOfSpeech::Unknown);
    }

    #[test]
    fn latin_and_digits_are_runs() {
        let tokens = fallback_tokenize("plan 2024");
        assert_eq!(surfaces(&tokens), vec!["plan", "2024"]);
    }

    #[test]
    fn empty_input_has_no_tokens() {
        let t = Tokenizer::new().tokenize("   ");
        assert!(t.tokens.is_empty());
        assert!(!t.degraded);
    }

    #[test]
    fn punctuation_only_gets_minimal_tokens() {
        let t = Tokenizer::new().tokenize("。、！");
        assert_eq!(t.tokens.len(), 3);
        assert!(t.tokens.iter().all(|tok| tok.weight == MINIMAL_WEIGHT));
    }

    #[test]
    fn stop_words_only_still_tokenizes() {
        let t = Tokenizer::new().tokenize("の");
        assert_eq!(surfaces(&t.tokens), vec!["の"]);
    }

    #[test]
    fn analyzer_tokens_are_reweighted() {
        let analyzer = FixedAnalyzer(vec![
            ("龍", PartOfSpeech::Noun),
            ("が", PartOfSpeech::Unknown),
            ("飛ぶ", PartOfSpeech::Verb),
        ]);
        let t = Tokenizer::with_analyzer(Arc::new(analyzer)).tokenize("龍が飛ぶ");
        assert!(!t.degraded);
        assert_eq!(surfaces(&t.tokens), vec!["龍", "飛ぶ"]);
        assert_eq!(t.tokens[0].weight, 2.5);
        assert_eq!(t.tokens[1].weight, DEFAULT_WEIGHT);
        assert_eq!(t.tokens[1].part_of_speech, PartOfSpeech::Verb);
    }

    #[test]
    fn failing_analyzer_degrades_to_fallback() {
        let t = Tokenizer::with_analyzer(Arc::new(BrokenAnalyzer)).tokenize("龍が飛ぶ");
        assert!(t.degraded);
        assert_eq!(t.tokens, fallback_tokenize("龍が飛ぶ"));
    }

    #[test]
    fn empty_analyzer_output_degrades() {
        let analyzer = FixedAnalyzer(vec![("の", PartOfSpeech::Unknown)]);
        let t = Tokenizer::with_analyzer(Arc::new(analyzer)).tokenize("龍");
        assert!(t.degraded);
        assert_eq!(surfaces(&t.tokens), vec!["龍"]);
    }

    #[test]
    fn term_occurrences_keep_repeats() {
        let terms = term_occurrences("龍 龍 成長 plan");
        assert_eq!(terms.iter().filter(|t| *t == "龍").count(), 2);
        assert_eq!(terms.iter().filter(|t| *t == "成長").count(), 1);
        assert!(terms.contains(&"plan".to_string()));
    }

    #[test]
    fn tokenization_is_deterministic() {
        let text = "変化の時期に慎重に判断する";
        assert_eq!(fallback_tokenize(text), fallback_tokenize(text));
    }
}

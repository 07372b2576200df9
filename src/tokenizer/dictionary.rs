//! Static term dictionary and stop words.
//!
//! The dictionary is a closed table: every term maps to a part of speech,
//! a weight and one of the fixed [`TokenCategory`] values. Order matters,
//! since the fallback tokenizer emits dictionary hits in table order.

use serde::{Deserialize, Serialize};

/// Semantic category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    Trigram,
    Position,
    Polarity,
    Symbol,
    Action,
    State,
    Fortune,
    Quality,
    Phase,
    Emotion,
    General,
}

impl TokenCategory {
    /// All categories, in declaration order.
    pub const ALL: [TokenCategory; 11] = [
        Self::Trigram,
        Self::Position,
        Self::Polarity,
        Self::Symbol,
        Self::Action,
        Self::State,
        Self::Fortune,
        Self::Quality,
        Self::Phase,
        Self::Emotion,
        Self::General,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Coarse part of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Unknown,
}

impl PartOfSpeech {
    pub const ALL: [PartOfSpeech; 5] = [
        Self::Noun,
        Self::Verb,
        Self::Adjective,
        Self::Adverb,
        Self::Unknown,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One dictionary row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DictEntry {
    pub surface: &'static str,
    pub part_of_speech: PartOfSpeech,
    pub weight: f32,
    pub category: TokenCategory,
}

const fn entry(
    surface: &'static str,
    part_of_speech: PartOfSpeech,
    weight: f32,
    category: TokenCategory,
) -> DictEntry {
    DictEntry {
        surface,
        part_of_speech,
        weight,
        category,
    }
}

use PartOfSpeech::{Adjective, Noun, Verb};
use TokenCategory::*;

/// The term table.
pub const DICTIONARY: &[DictEntry] = &[
    // Trigrams
    entry("乾", Noun, 2.0, Trigram),
    entry("坤", Noun, 2.0, Trigram),
    entry("震", Noun, 2.0, Trigram),
    entry("巽", Noun, 2.0, Trigram),
    entry("坎", Noun, 2.0, Trigram),
    entry("離", Noun, 2.0, Trigram),
    entry("艮", Noun, 2.0, Trigram),
    entry("兌", Noun, 2.0, Trigram),
    // Line positions
    entry("初", Noun, 1.8, Position),
    entry("二", Noun, 1.8, Position),
    entry("三", Noun, 1.8, Position),
    entry("四", Noun, 1.8, Position),
    entry("五", Noun, 1.8, Position),
    entry("上", Noun, 1.8, Position),
    // Yang / yin numerals
    entry("九", Noun, 1.5, Polarity),
    entry("六", Noun, 1.5, Polarity),
    entry("龍", Noun, 2.5, Symbol),
    entry("潛", Verb, 2.0, Action),
    entry("見", Verb, 2.0, Action),
    entry("飛", Verb, 2.0, Action),
    entry("躍", Verb, 2.0, Action),
    entry("亢", Adjective, 2.0, State),
    entry("吉", Adjective, 2.0, Fortune),
    entry("凶", Adjective, 2.0, Fortune),
    entry("悔", Noun, 1.8, Fortune),
    entry("咎", Noun, 1.8, Fortune),
    entry("利", Adjective, 1.8, Fortune),
    entry("貞", Adjective, 1.8, Quality),
    // Phase vocabulary
    entry("始まり", Noun, 1.6, Phase),
    entry("開始", Noun, 1.6, Phase),
    entry("準備", Noun, 1.6, Phase),
    entry("成長", Noun, 1.6, Phase),
    entry("発展", Noun, 1.6, Phase),
    entry("転換", Noun, 1.6, Phase),
    entry("変化", Noun, 1.6, Phase),
    entry("成熟", Noun, 1.6, Phase),
    entry("完成", Noun, 1.6, Phase),
    entry("完了", Noun, 1.6, Phase),
    // Emotion vocabulary
    entry("自信", Noun, 1.6, Emotion),
    entry("不安", Noun, 1.6, Emotion),
    entry("心配", Noun, 1.6, Emotion),
    entry("希望", Noun, 1.6, Emotion),
    entry("期待", Noun, 1.6, Emotion),
    entry("慎重", Noun, 1.6, Emotion),
    entry("恐れ", Noun, 1.6, Emotion),
    entry("喜び", Noun, 1.6, Emotion),
];

/// Particles and auxiliaries dropped by the tokenizer.
pub const STOP_WORDS: &[&str] = &[
    "の", "に", "は", "を", "た", "が", "で", "て", "と", "し", "れ", "さ", "ある", "いる", "も",
    "する", "から", "な", "こと", "として", "い", "や", "れる",
];

/// Look up a term by exact surface.
pub fn lookup(surface: &str) -> Option<&'static DictEntry> {
    DICTIONARY.iter().find(|e| e.surface == surface)
}

pub fn is_stop_word(surface: &str) -> bool {
    STOP_WORDS.contains(&surface)
}

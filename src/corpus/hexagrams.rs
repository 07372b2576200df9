//! Static hexagram data: King Wen order, trigram structure, per-position and
//! per-hexagram vocabularies.

use super::{Emotion, TemporalPhase};

/// The eight trigrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigram {
    Qian,
    Kun,
    Zhen,
    Xun,
    Kan,
    Li,
    Gen,
    Dui,
}

impl Trigram {
    /// Lines bottom to top, `true` = yang.
    pub fn lines(self) -> [bool; 3] {
        match self {
            Self::Qian => [true, true, true],
            Self::Kun => [false, false, false],
            Self::Zhen => [true, false, false],
            Self::Kan => [false, true, false],
            Self::Gen => [false, false, true],
            Self::Xun => [false, true, true],
            Self::Li => [true, false, true],
            Self::Dui => [true, true, false],
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Qian => "乾",
            Self::Kun => "坤",
            Self::Zhen => "震",
            Self::Xun => "巽",
            Self::Kan => "坎",
            Self::Li => "離",
            Self::Gen => "艮",
            Self::Dui => "兌",
        }
    }

    /// Natural image and attributes.
    pub fn attributes(self) -> [&'static str; 3] {
        match self {
            Self::Qian => ["天", "創造", "強健"],
            Self::Kun => ["地", "受容", "柔順"],
            Self::Zhen => ["雷", "震動", "奮起"],
            Self::Xun => ["風", "浸透", "柔軟"],
            Self::Kan => ["水", "危険", "洞察"],
            Self::Li => ["火", "明晰", "情熱"],
            Self::Gen => ["山", "静止", "安定"],
            Self::Dui => ["澤", "喜悦", "交流"],
        }
    }

    /// Emotional arc of lines 1–6 in a hexagram with this upper trigram.
    fn emotion_row(self) -> [Emotion; 6] {
        use Emotion::*;
        match self {
            Self::Qian => [Ambitious, Confident, Determined, Decisive, Authoritative, Excessive],
            Self::Kun => [Cautious, Patient, Nurturing, Receptive, Accepting, Yielding],
            Self::Kan => [Alert, Wary, Fearful, Cautious, Insightful, Trapped],
            Self::Li => [Curious, Enlightening, Passionate, Illuminating, Brilliant, Burning],
            Self::Zhen => [Alert, Emerging, Struggling, Determined, Confident, Relieved],
            Self::Gen => [Patient, Cautious, Peaceful, Wary, Insightful, Peaceful],
            Self::Xun => [Yielding, Receptive, Curious, Accepting, Nurturing, Cautious],
            Self::Dui => [Joyful, Hopeful, Anxious, Joyful, Confident, Excessive],
        }
    }
}

/// One hexagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hexagram {
    pub number: u16,
    pub name: &'static str,
    pub upper: Trigram,
    pub lower: Trigram,
}

impl Hexagram {
    /// Whether the line at `position` (1–6) is yang.
    pub fn is_yang(&self, position: u8) -> bool {
        match position {
            1..=3 => self.lower.lines()[(position - 1) as usize],
            4..=6 => self.upper.lines()[(position - 4) as usize],
            _ => false,
        }
    }

    /// Emotion of the line at `position` (1–6).
    pub fn emotion(&self, position: u8) -> Emotion {
        let row = match self.number {
            3 => [
                Emotion::Anxious,
                Emotion::Struggling,
                Emotion::Persevering,
                Emotion::Emerging,
                Emotion::Achieving,
                Emotion::Relieved,
            ],
            _ => self.upper.emotion_row(),
        };
        row[(position.clamp(1, 6) - 1) as usize]
    }
}

const fn hex(number: u16, name: &'static str, upper: Trigram, lower: Trigram) -> Hexagram {
    Hexagram {
        number,
        name,
        upper,
        lower,
    }
}

use Trigram::{Dui, Gen, Kan, Kun, Li, Qian, Xun, Zhen};

/// All 64 hexagrams in King Wen order.
pub const HEXAGRAMS: [Hexagram; 64] = [
    hex(1, "乾為天", Qian, Qian),
    hex(2, "坤為地", Kun, Kun),
    hex(3, "水雷屯", Kan, Zhen),
    hex(4, "山水蒙", Gen, Kan),
    hex(5, "水天需", Kan, Qian),
    hex(6, "天水訟", Qian, Kan),
    hex(7, "地水師", Kun, Kan),
    hex(8, "水地比", Kan, Kun),
    hex(9, "風天小畜", Xun, Qian),
    hex(10, "天澤履", Qian, Dui),
    hex(11, "地天泰", Kun, Qian),
    hex(12, "天地否", Qian, Kun),
    hex(13, "天火同人", Qian, Li),
    hex(14, "火天大有", Li, Qian),
    hex(15, "地山謙", Kun, Gen),
    hex(16, "雷地豫", Zhen, Kun),
    hex(17, "澤雷随", Dui, Zhen),
    hex(18, "山風蠱", Gen, Xun),
    hex(19, "地澤臨", Kun, Dui),
    hex(20, "風地観", Xun, Kun),
    hex(21, "火雷噬嗑", Li, Zhen),
    hex(22, "山火賁", Gen, Li),
    hex(23, "山地剝", Gen, Kun),
    hex(24, "地雷復", Kun, Zhen),
    hex(25, "天雷無妄", Qian, Zhen),
    hex(26, "山天大畜", Gen, Qian),
    hex(27, "山雷頤", Gen, Zhen),
    hex(28, "澤風大過", Dui, Xun),
    hex(29, "坎為水", Kan, Kan),
    hex(30, "離為火", Li, Li),
    hex(31, "澤山咸", Dui, Gen),
    hex(32, "雷風恒", Zhen, Xun),
    hex(33, "天山遯", Qian, Gen),
    hex(34, "雷天大壯", Zhen, Qian),
    hex(35, "火地晋", Li, Kun),
    hex(36, "地火明夷", Kun, Li),
    hex(37, "風火家人", Xun, Li),
    hex(38, "火澤睽", Li, Dui),
    hex(39, "水山蹇", Kan, Gen),
    hex(40, "雷水解", Zhen, Kan),
    hex(41, "山澤損", Gen, Dui),
    hex(42, "風雷益", Xun, Zhen),
    hex(43, "澤天夬", Dui, Qian),
    hex(44, "天風姤", Qian, Xun),
    hex(45, "澤地萃", Dui, Kun),
    hex(46, "地風升", Kun, Xun),
    hex(47, "澤水困", Dui, Kan),
    hex(48, "水風井", Kan, Xun),
    hex(49, "澤火革", Dui, Li),
    hex(50, "火風鼎", Li, Xun),
    hex(51, "震為雷", Zhen, Zhen),
    hex(52, "艮為山", Gen, Gen),
    hex(53, "風山漸", Xun, Gen),
    hex(54, "雷澤歸妹", Zhen, Dui),
    hex(55, "雷火豊", Zhen, Li),
    hex(56, "火山旅", Li, Gen),
    hex(57, "巽為風", Xun, Xun),
    hex(58, "兌為澤", Dui, Dui),
    hex(59, "風水渙", Xun, Kan),
    hex(60, "水澤節", Kan, Dui),
    hex(61, "風澤中孚", Xun, Dui),
    hex(62, "雷山小過", Zhen, Gen),
    hex(63, "水火既済", Kan, Li),
    hex(64, "火水未済", Li, Kan),
];

/// Look up a hexagram by King Wen number.
pub fn hexagram(number: u16) -> Option<&'static Hexagram> {
    HEXAGRAMS.get((number as usize).checked_sub(1)?)
}

/// Situation keywords by line position.
pub const POSITION_KEYWORDS: [&[&str]; 6] = [
    &["始動", "潜在", "基礎", "初心", "萌芽", "開始", "準備"],
    &["内面", "協力", "蓄積", "忍耐", "育成", "関係", "支援"],
    &["困難", "試練", "過渡期", "不安定", "成長", "挑戦"],
    &["外界", "関門", "進退", "決断", "境界", "変化", "転換"],
    &["中正", "君位", "成就", "権威", "責任", "リーダー", "統率"],
    &["極限", "終焉", "転換", "過剰", "変革", "完成", "結果"],
];

pub fn position_keywords(position: u8) -> &'static [&'static str] {
    match position {
        1..=6 => POSITION_KEYWORDS[(position - 1) as usize],
        _ => &[],
    }
}

/// Keywords specific to a hexagram.
pub fn hexagram_keywords(number: u16) -> &'static [&'static str] {
    match number {
        1 => &["創造", "強健", "剛毅"],
        2 => &["受容", "柔順", "包容"],
        3 => &["困難", "生成", "開拓"],
        29 => &["危険", "深淵", "洞察"],
        30 => &["明晰", "照明", "文明"],
        51 => &["震動", "覚醒", "始動"],
        52 => &["静止", "瞑想", "安定"],
        57 => &["浸透", "柔軟", "従順"],
        58 => &["喜悦", "交流", "説得"],
        _ => &[],
    }
}

/// Keyword for a notable hexagram/position pair.
pub fn combination_keyword(number: u16, position: u8) -> Option<&'static str> {
    match (number, position) {
        (11, 5) => Some("大いなる調和"),
        (12, 1) => Some("閉塞の兆し"),
        (63, 6) => Some("完成後の警戒"),
        (64, 1) => Some("新たな始まりの予感"),
        _ => None,
    }
}

/// Phase candidates per position; a line picks `options[id % len]`.
pub fn phase_options(position: u8) -> &'static [TemporalPhase] {
    use TemporalPhase::*;
    match position {
        1 => &[Beginning, EarlyDevelop],
        2 => &[EarlyDevelop, Developing],
        3 => &[Developing, Transition],
        4 => &[Transition, Developing],
        5 => &[Mature, Mature, Mature],
        _ => &[Completion, Mature],
    }
}

/// How far a hexagram pushes its lines along the phase axis.
pub fn phase_modifier(number: u16) -> f32 {
    match number {
        1 => 0.5,
        2 => -0.3,
        3 => 0.2,
        4 => -0.1,
        5 => -0.2,
        6 => 0.1,
        11 => 0.3,
        12 => -0.4,
        63 => -0.1,
        64 => 0.3,
        _ => 0.0,
    }
}

/// Energy intensity by position.
pub const POSITION_INTENSITY: [f32; 6] = [0.3, 0.5, 0.7, 0.8, 1.0, 0.6];

/// Contexts a line is especially suited to.
pub fn priority_contexts(number: u16, position: u8) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = match position {
        1 => vec!["始まり", "新規", "スタート"],
        5 => vec!["リーダーシップ", "権威", "成功"],
        6 => vec!["終わり", "完了", "転換"],
        _ => Vec::new(),
    };
    out.extend_from_slice(match number {
        1 => &["創造", "起業", "開拓"][..],
        11 => &["調和", "平和", "繁栄"][..],
        63 => &["完成", "達成", "成就"][..],
        _ => &[][..],
    });
    out
}

/// Contexts a line is ill-suited to.
pub fn anti_contexts(number: u16, position: u8) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = match position {
        1 => vec!["完了", "終焉"],
        6 => vec!["開始", "初期"],
        _ => Vec::new(),
    };
    out.extend_from_slice(match number {
        12 => &["通じる", "開放"][..],
        29 => &["安全", "平穏"][..],
        _ => &[][..],
    });
    out
}

/// Traditional line name: 初九, 六二, …, 上六.
pub fn line_name(position: u8, yang: bool) -> String {
    let numeral = if yang { "九" } else { "六" };
    match position {
        1 => format!("初{numeral}"),
        6 => format!("上{numeral}"),
        p => {
            let ordinal = ["二", "三", "四", "五"][(p.clamp(2, 5) - 2) as usize];
            format!("{numeral}{ordinal}")
        }
    }
}

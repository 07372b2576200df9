//! Engine tuning configuration for yaoline.
//!
//! Every constant the scorer and the controller use lives here, grouped by
//! concern. The values were tuned empirically against query samples rather
//! than derived from an objective function; treat them as knobs, not truths.
//!
//! All sections are `#[serde(default)]`, so a YAML file only needs the keys it
//! overrides:
//!
//! ```yaml
//! boundary:
//!   rate_cap: 0.02
//! cache:
//!   capacity: 100
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringWeights,
    pub semantic: SemanticConfig,
    pub exploration: ExplorationConfig,
    pub usage: UsageConfig,
    pub diversity: DiversityConfig,
    pub boundary: BoundaryConfig,
    pub cache: CacheConfig,
    pub selection: SelectionConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) YAML document and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Render the effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scoring;
        for (name, value) in [
            ("scoring.keyword", s.keyword),
            ("scoring.temporal", s.temporal),
            ("scoring.energy", s.energy),
            ("scoring.emotion", s.emotion),
            ("scoring.semantic", s.semantic),
            ("scoring.positional", s.positional),
            ("scoring.base_chance", s.base_chance),
            ("scoring.fifth_line_bias", s.fifth_line_bias),
            ("scoring.decision_bias", s.decision_bias),
            ("scoring.middle_line_bias", s.middle_line_bias),
            ("exploration.amplitude", self.exploration.amplitude),
            ("exploration.length_amplitude", self.exploration.length_amplitude),
            ("diversity.unused_group_bonus", self.diversity.unused_group_bonus),
            ("diversity.unused_position_bonus", self.diversity.unused_position_bonus),
            ("usage.coverage_gain", self.usage.coverage_gain),
            ("usage.novelty_relief", self.usage.novelty_relief),
        ] {
            non_negative(name, value)?;
        }

        let w = &self.semantic.segment_weights;
        let segment_sum: f32 = w.as_array().iter().sum();
        if w.as_array().iter().any(|v| !v.is_finite() || *v < 0.0) || segment_sum <= 0.0 {
            return Err(ConfigError::Invalid(
                "semantic.segment_weights must be non-negative with a positive sum".into(),
            ));
        }
        if !(self.semantic.sharpen_exponent > 0.0 && self.semantic.sharpen_exponent.is_finite()) {
            return Err(ConfigError::Invalid(
                "semantic.sharpen_exponent must be positive".into(),
            ));
        }

        let u = &self.usage;
        if u.reuse_factors.is_empty() {
            return Err(ConfigError::Invalid("usage.reuse_factors must not be empty".into()));
        }
        if u.reuse_factors.iter().any(|f| !(*f > 0.0 && *f <= 1.0)) {
            return Err(ConfigError::Invalid(
                "usage.reuse_factors must lie in (0, 1]".into(),
            ));
        }
        if u.reuse_factors.windows(2).any(|w| w[1] > w[0]) {
            return Err(ConfigError::Invalid(
                "usage.reuse_factors must be non-increasing".into(),
            ));
        }
        let last = u.reuse_factors[u.reuse_factors.len() - 1];
        if !(u.floor > 0.0 && u.floor <= last) {
            return Err(ConfigError::Invalid(format!(
                "usage.floor must lie in (0, {last}]"
            )));
        }
        if !(u.recent_factor > 0.0 && u.recent_factor <= 1.0) {
            return Err(ConfigError::Invalid("usage.recent_factor must lie in (0, 1]".into()));
        }
        if u.recent_window == 0 {
            return Err(ConfigError::Invalid("usage.recent_window must be > 0".into()));
        }

        let b = &self.boundary;
        if !(b.rate_cap > 0.0 && b.rate_cap <= 1.0) {
            return Err(ConfigError::Invalid("boundary.rate_cap must lie in (0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&b.emotion_threshold) {
            return Err(ConfigError::Invalid(
                "boundary.emotion_threshold must lie in [0, 1]".into(),
            ));
        }
        if b.min_keyword_hits == 0 {
            return Err(ConfigError::Invalid(
                "boundary.min_keyword_hits must be >= 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&b.score) {
            return Err(ConfigError::Invalid("boundary.score must lie in [0, 1]".into()));
        }

        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be > 0".into()));
        }
        let sel = &self.selection;
        if sel.batch_size == 0 {
            return Err(ConfigError::Invalid("selection.batch_size must be > 0".into()));
        }
        if !(1..=384).contains(&sel.default_candidate_id) {
            return Err(ConfigError::Invalid(
                "selection.default_candidate_id must be a regular line id (1..=384)".into(),
            ));
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be a finite non-negative number, got {value}"
        )))
    }
}

/// Weights of the composite score components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub keyword: f32,
    pub temporal: f32,
    pub energy: f32,
    pub emotion: f32,
    pub semantic: f32,
    pub positional: f32,
    /// Coverage floor added to every candidate.
    pub base_chance: f32,
    /// Multiplier for 5th lines.
    pub fifth_line_bias: f32,
    /// Extra multiplier for 5th lines when the text talks about decisions.
    pub decision_bias: f32,
    /// Multiplier for 2nd and 3rd lines.
    pub middle_line_bias: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword: 0.15,
            temporal: 0.05,
            energy: 0.10,
            emotion: 0.10,
            semantic: 0.45,
            positional: 0.15,
            base_chance: 0.02,
            fifth_line_bias: 1.05,
            decision_bias: 1.2,
            middle_line_bias: 0.95,
        }
    }
}

/// Segment-weighted cosine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub segment_weights: SegmentWeights,
    /// `similarity^p` sharpening.
    pub sharpen_exponent: f32,
    /// Sharpened similarities above this get stretched by `contrast_gain`.
    pub contrast_threshold: f32,
    pub contrast_gain: f32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            segment_weights: SegmentWeights::default(),
            sharpen_exponent: 0.65,
            contrast_threshold: 0.7,
            contrast_gain: 1.5,
        }
    }
}

/// Per-segment weights, in segment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentWeights {
    pub grouping: f32,
    pub positional: f32,
    pub lexical: f32,
    pub transformation: f32,
    pub temporal: f32,
    pub contextual: f32,
}

impl SegmentWeights {
    /// Weights in segment order: grouping, positional, lexical,
    /// transformation, temporal, contextual.
    pub fn as_array(&self) -> [f32; 6] {
        [
            self.grouping,
            self.positional,
            self.lexical,
            self.transformation,
            self.temporal,
            self.contextual,
        ]
    }
}

impl Default for SegmentWeights {
    fn default() -> Self {
        Self {
            grouping: 0.10,
            positional: 0.25,
            lexical: 0.30,
            transformation: 0.10,
            temporal: 0.10,
            contextual: 0.15,
        }
    }
}

/// Deterministic exploration noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Upper bound of the keyed per-candidate noise.
    pub amplitude: f32,
    /// Upper bound of the text-length keyed noise.
    pub length_amplitude: f32,
    /// Mixed into every noise key; bump it when the scoring model changes.
    pub model_version: String,
    pub salt: String,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.03,
            length_amplitude: 0.01,
            model_version: "3.0".into(),
            salt: "yaoline".into(),
        }
    }
}

/// Anti-repetition penalty curve and session bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Multiplier after the 1st, 2nd, ... selection of the same line.
    pub reuse_factors: Vec<f32>,
    /// Multiplier once the curve is exhausted.
    pub floor: f32,
    /// How much stronger the penalty gets while session coverage is low.
    pub coverage_gain: f32,
    /// Boost for never-selected lines while session coverage is low.
    pub novelty_relief: f32,
    /// Length of the recent-selection ring buffer.
    pub recent_window: usize,
    /// Multiplier for lines still in the ring buffer.
    pub recent_factor: f32,
    /// Idle time after which session counters reset.
    pub idle_reset_secs: u64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            reuse_factors: vec![0.95, 0.82, 0.68, 0.55, 0.45],
            floor: 0.15,
            coverage_gain: 0.5,
            novelty_relief: 0.05,
            recent_window: 10,
            recent_factor: 0.85,
            idle_reset_secs: 3600,
        }
    }
}

/// Additive bonus for unexplored groups and positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    pub unused_group_bonus: f32,
    pub unused_position_bonus: f32,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            unused_group_bonus: 0.02,
            unused_position_bonus: 0.01,
        }
    }
}

/// Gating of the two boundary lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Maximum share of committed selections that may be boundary lines.
    pub rate_cap: f64,
    /// Minimum query emotion intensity.
    pub emotion_threshold: f32,
    /// Minimum number of activation keywords present in the text.
    pub min_keyword_hits: usize,
    /// Score an eligible boundary line enters the ranking with.
    pub score: f32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            rate_cap: 0.01,
            emotion_threshold: 0.8,
            min_keyword_hits: 1,
            score: 0.8,
        }
    }
}

/// Result cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Selection pipeline knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Candidates per parallel scoring batch.
    pub batch_size: usize,
    /// Ranked alternatives reported with each result.
    pub top_alternatives: usize,
    /// Line returned for empty input.
    pub default_candidate_id: u16,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            batch_size: 48,
            top_alternatives: 3,
            default_candidate_id: 1,
        }
    }
}

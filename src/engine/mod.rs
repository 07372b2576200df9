//! Match engine — the selection and balancing controller.
//!
//! Per request the engine analyzes the text, scores the 384 regular lines in
//! parallel batches against a frozen usage snapshot, admits boundary lines
//! when their gate opens, ranks, then commits the winner to the session
//! usage state and the result cache.
//!
//! The corpus and its vocabulary are built once by [`MatchEngine::initialize`]
//! and shared read-only. Session state (usage, cache, counters) sits behind
//! one mutex that a request takes twice: once to read, once to commit.
//! Scoring holds no lock.

pub mod cache;
pub mod stats;
pub mod usage;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use yaoline_config::EngineConfig;

use crate::analysis::{analyze, AnalysisResult};
use crate::corpus::{boundary_activation_keywords, CandidateLine, Corpus, CorpusSource};
use crate::embedding::tfidf::{TfIdfVectorizer, LEXICAL_DIMS};
use crate::error::EngineError;
use crate::result::{self, MatchResult};
use crate::scoring::{self, rank_order, ScoreBreakdown};
use crate::tokenizer::{MorphologicalAnalyzer, Tokenizer};

use cache::{normalize_key, ResultCache};
use stats::{EngineStatistics, StatsTracker};
use usage::{UsageSnapshot, UsageStats};

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Bypass the cache read. The fresh result still refreshes the cache.
    pub skip_cache: bool,
    /// Score against an empty usage history, never select boundary lines,
    /// leave usage and cache untouched.
    pub deterministic_mode: bool,
}

/// Shape of the loaded corpus, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub lines: usize,
    pub regular: usize,
    pub boundary: usize,
    pub vocabulary_size: usize,
    pub documents: usize,
}

/// Read-only model built at initialization.
struct Model {
    corpus: Corpus,
    vectorizer: TfIdfVectorizer,
}

impl Model {
    fn build(source: Option<&CorpusSource>) -> Result<Self, EngineError> {
        let mut corpus = Corpus::synthesize();
        if let Some(source) = source {
            corpus.enrich(source)?;
        }
        let vectorizer = TfIdfVectorizer::from_corpus(&corpus.documents(), LEXICAL_DIMS);
        corpus.attach_vectors(&vectorizer);
        corpus.validate()?;

        info!(
            lines = corpus.len(),
            vocabulary = vectorizer.vocabulary_size(),
            documents = vectorizer.document_count(),
            enriched = source.is_some(),
            "corpus initialized"
        );
        Ok(Self { corpus, vectorizer })
    }

    fn summary(&self) -> CorpusSummary {
        CorpusSummary {
            lines: self.corpus.len(),
            regular: self.corpus.regular().len(),
            boundary: self.corpus.boundary().len(),
            vocabulary_size: self.vectorizer.vocabulary_size(),
            documents: self.vectorizer.document_count(),
        }
    }
}

struct SessionState {
    usage: UsageStats,
    cache: ResultCache,
    stats: StatsTracker,
}

pub struct MatchEngine {
    config: EngineConfig,
    tokenizer: Tokenizer,
    model: RwLock<Option<Arc<Model>>>,
    state: Mutex<SessionState>,
}

impl MatchEngine {
    /// Create an engine with a validated configuration. Call
    /// [`initialize`](Self::initialize) before analyzing.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let state = SessionState {
            usage: UsageStats::new(&config.usage),
            cache: ResultCache::new(config.cache.capacity),
            stats: StatsTracker::default(),
        };
        Ok(Self {
            config,
            tokenizer: Tokenizer::new(),
            model: RwLock::new(None),
            state: Mutex::new(state),
        })
    }

    /// Use a morphological analyzer instead of the built-in tokenizer.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn MorphologicalAnalyzer>) -> Self {
        self.tokenizer = Tokenizer::with_analyzer(analyzer);
        self
    }

    /// Start from existing usage state.
    pub fn with_usage_stats(self, usage: UsageStats) -> Self {
        self.lock_state().usage = usage;
        self
    }

    /// Build the corpus and vocabulary. A second call is a no-op.
    pub fn initialize(&self, source: Option<&CorpusSource>) -> Result<(), EngineError> {
        let mut model = self.model.write().unwrap_or_else(PoisonError::into_inner);
        if model.is_some() {
            debug!("engine already initialized");
            return Ok(());
        }
        *model = Some(Arc::new(Model::build(source)?));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.model().is_some()
    }

    pub fn summary(&self) -> Option<CorpusSummary> {
        self.model().map(|m| m.summary())
    }

    /// Whether a morphological analyzer is configured.
    pub fn has_analyzer(&self) -> bool {
        self.tokenizer.has_analyzer()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Select the best line for `text`.
    pub fn analyze(&self, text: &str, options: AnalyzeOptions) -> Result<MatchResult, EngineError> {
        let started = Instant::now();
        let model = self.model().ok_or(EngineError::NotInitialized)?;

        if text.trim().is_empty() {
            let id = self.config.selection.default_candidate_id;
            let line = model.corpus.get(id).ok_or_else(|| {
                EngineError::Configuration(format!("default candidate {id} is not in the corpus"))
            })?;
            debug!(candidate = id, "empty input, default line returned");
            return Ok(result::empty_input(line, text, elapsed_ms(started)));
        }

        let key = normalize_key(text);
        let read_cache = !options.skip_cache && !options.deterministic_mode;
        let snapshot = {
            let mut state = self.lock_state();
            state.usage.expire_if_idle(started);
            if read_cache {
                if let Some(hit) = state.cache.get(&key).cloned() {
                    state.stats.record_cache_hit();
                    debug!(candidate = hit.candidate_id, "cache hit");
                    return Ok(MatchResult {
                        from_cache: true,
                        processing_time_ms: elapsed_ms(started),
                        original_text: text.to_string(),
                        ..hit
                    });
                }
            }
            if options.deterministic_mode {
                UsageSnapshot::empty()
            } else {
                state.usage.snapshot()
            }
        };

        let analysis = analyze(text, &self.tokenizer, &model.vectorizer);
        if analysis.degraded {
            warn!("morphological analysis degraded, fallback tokenizer used");
        }

        let mut ranked = self.score_regular(&model.corpus, &analysis, &snapshot);
        if !options.deterministic_mode {
            ranked.extend(
                model
                    .corpus
                    .boundary()
                    .iter()
                    .filter(|line| self.boundary_eligible(line, &analysis, &snapshot))
                    .map(|line| {
                        let score = self.config.boundary.score * line.base_weight;
                        (line, ScoreBreakdown::fixed(score))
                    }),
            );
        }
        ranked.sort_by(|a, b| rank_order((a.0, &a.1), (b.0, &b.1)));

        let mut state = self.lock_state();
        // Another request may have committed a boundary selection since the snapshot
        let boundary_open = !options.deterministic_mode
            && state.usage.boundary_allowed(self.config.boundary.rate_cap);
        ranked.retain(|(line, _)| !line.is_boundary || boundary_open);
        let Some(((selected, breakdown), rest)) = ranked.split_first() else {
            return Err(EngineError::Configuration("no candidate lines to rank".into()));
        };

        let alternatives = &rest[..rest.len().min(self.config.selection.top_alternatives)];
        let mut outcome = result::assemble(selected, breakdown, &analysis, alternatives, 0.0);

        if !options.deterministic_mode {
            state.usage.record(selected.id, selected.is_boundary, started);
        }
        outcome.processing_time_ms = elapsed_ms(started);
        if !options.deterministic_mode {
            state.cache.put(key, outcome.clone());
        }
        state.stats.record_computed(outcome.processing_time_ms);

        debug!(
            candidate = selected.id,
            label = %outcome.label,
            score = breakdown.total,
            boundary = selected.is_boundary,
            "line selected"
        );
        Ok(outcome)
    }

    /// Score every regular line in parallel batches. Order follows the corpus.
    fn score_regular<'m>(
        &self,
        corpus: &'m Corpus,
        analysis: &AnalysisResult,
        snapshot: &UsageSnapshot,
    ) -> Vec<(&'m CandidateLine, ScoreBreakdown)> {
        let batch = self.config.selection.batch_size.max(1);
        corpus
            .regular()
            .par_chunks(batch)
            .enumerate()
            .map(|(index, chunk)| {
                trace!(batch = index, size = chunk.len(), "scoring batch");
                chunk
                    .iter()
                    .map(|line| (line, scoring::score(line, analysis, snapshot, &self.config)))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn boundary_eligible(&self, line: &CandidateLine, analysis: &AnalysisResult, snapshot: &UsageSnapshot) -> bool {
        let b = &self.config.boundary;
        let hits = boundary_activation_keywords(line.id)
            .iter()
            .filter(|k| analysis.text.contains(*k))
            .count();
        hits >= b.min_keyword_hits
            && analysis.emotion.intensity >= b.emotion_threshold
            && snapshot.boundary_allowed(b.rate_cap)
    }

    pub fn statistics(&self) -> EngineStatistics {
        let vocabulary = self.model().map_or(0, |m| m.vectorizer.vocabulary_size());
        let state = self.lock_state();
        state.stats.report(&state.usage, state.cache.len(), vocabulary)
    }

    /// Clear session usage counters. Lifetime boundary counters stay.
    pub fn reset_session(&self) {
        self.lock_state().usage.reset_session();
        info!("session reset");
    }

    pub fn clear_cache(&self) {
        self.lock_state().cache.clear();
    }

    pub fn usage_snapshot(&self) -> UsageSnapshot {
        self.lock_state().usage.snapshot()
    }

    fn model(&self) -> Option<Arc<Model>> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisWarning;
    use crate::tokenizer::{AnalyzedToken, AnalyzerError};

    fn engine() -> MatchEngine {
        let engine = MatchEngine::new(EngineConfig::default()).unwrap();
        engine.initialize(None).unwrap();
        engine
    }

    #[test]
    fn analyze_requires_initialize() {
        let engine = MatchEngine::new(EngineConfig::default()).unwrap();
        assert!(!engine.has_analyzer());
        assert_eq!(engine.config(), &EngineConfig::default());
        assert!(matches!(
            engine.analyze("テスト", AnalyzeOptions::default()),
            Err(EngineError::NotInitialized)
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.cache.capacity = 0;
        assert!(matches!(MatchEngine::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn initialize_is_idempotent() {
        let engine = engine();
        let before = engine.summary().unwrap();
        engine.initialize(None).unwrap();
        assert_eq!(engine.summary().unwrap(), before);
        assert_eq!(before.lines, 386);
        assert_eq!(before.regular, 384);
        assert_eq!(before.boundary, 2);
        assert!(before.vocabulary_size > 0);
    }

    #[test]
    fn enrichment_with_wrong_cardinality_fails() {
        let engine = MatchEngine::new(EngineConfig::default()).unwrap();
        let source = CorpusSource::from_json(r#"[{"name": "only one"}]"#).unwrap();
        assert!(matches!(
            engine.initialize(Some(&source)),
            Err(EngineError::Configuration(_))
        ));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn empty_input_returns_default_line() {
        let engine = engine();
        let r = engine.analyze("   ", AnalyzeOptions::default()).unwrap();
        assert_eq!(r.candidate_id, 1);
        assert_eq!(r.warnings, vec![AnalysisWarning::EmptyInput]);
        assert!(!r.from_cache);
        let s = engine.statistics();
        assert_eq!(s.total_selections, 0);
        assert_eq!(s.cache_size, 0);
    }

    #[test]
    fn second_call_hits_cache() {
        let engine = engine();
        let first = engine.analyze("迷いの中で決断を迫られている", AnalyzeOptions::default()).unwrap();
        let second = engine.analyze("  迷いの中で決断を迫られている\n", AnalyzeOptions::default()).unwrap();
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.original_text, "  迷いの中で決断を迫られている\n");
        assert_eq!(first.candidate_id, second.candidate_id);
        assert_eq!(first.score, second.score);

        let s = engine.statistics();
        assert_eq!(s.cache_hits, 1);
        assert_eq!(s.computed_analyses, 1);
        assert_eq!(s.total_selections, 1);
    }

    #[test]
    fn skip_cache_recomputes_and_refreshes() {
        let engine = engine();
        let text = "仲間と協力して進む";
        engine.analyze(text, AnalyzeOptions::default()).unwrap();
        let r = engine
            .analyze(text, AnalyzeOptions { skip_cache: true, ..Default::default() })
            .unwrap();
        assert!(!r.from_cache);
        let cached = engine.analyze(text, AnalyzeOptions::default()).unwrap();
        assert!(cached.from_cache);
        assert_eq!(cached.candidate_id, r.candidate_id);
    }

    #[test]
    fn deterministic_mode_leaves_state_untouched() {
        let engine = engine();
        let opts = AnalyzeOptions { deterministic_mode: true, ..Default::default() };
        let a = engine.analyze("変化の時を迎える", opts).unwrap();
        let b = engine.analyze("変化の時を迎える", opts).unwrap();
        assert_eq!(a.candidate_id, b.candidate_id);
        assert_eq!(a.score.to_bits(), b.score.to_bits());
        assert!(!b.from_cache);
        let s = engine.statistics();
        assert_eq!(s.total_selections, 0);
        assert_eq!(s.cache_size, 0);
        assert_eq!(s.computed_analyses, 2);
    }

    #[test]
    fn alternatives_follow_selection() {
        let engine = engine();
        let r = engine.analyze("静かに力を蓄える", AnalyzeOptions::default()).unwrap();
        assert_eq!(r.alternatives.len(), 3);
        for alt in &r.alternatives {
            assert_ne!(alt.candidate_id, r.candidate_id);
            assert!(alt.score <= r.score);
        }
    }

    #[test]
    fn repeated_queries_spread_over_lines() {
        let engine = engine();
        let opts = AnalyzeOptions { skip_cache: true, ..Default::default() };
        let mut ids: Vec<u16> = (0..6)
            .map(|_| engine.analyze("新しい挑戦", opts).unwrap().candidate_id)
            .collect();
        ids.dedup();
        assert!(ids.len() > 1);
    }

    #[test]
    fn reset_session_clears_usage() {
        let engine = engine();
        engine.analyze("新しい挑戦", AnalyzeOptions::default()).unwrap();
        assert!(engine.usage_snapshot().any_selected());
        engine.reset_session();
        assert!(!engine.usage_snapshot().any_selected());
        assert_eq!(engine.statistics().total_selections, 1);
    }

    #[test]
    fn clear_cache_forces_recompute() {
        let engine = engine();
        engine.analyze("新しい挑戦", AnalyzeOptions::default()).unwrap();
        engine.clear_cache();
        let r = engine.analyze("新しい挑戦", AnalyzeOptions::default()).unwrap();
        assert!(!r.from_cache);
    }

    struct Broken;

    impl MorphologicalAnalyzer for Broken {
        fn analyze(&self, _text: &str) -> Result<Vec<AnalyzedToken>, AnalyzerError> {
            Err(AnalyzerError::Unavailable("not installed".into()))
        }
    }

    #[test]
    fn failing_analyzer_degrades() {
        let engine = MatchEngine::new(EngineConfig::default())
            .unwrap()
            .with_analyzer(Arc::new(Broken));
        assert!(engine.has_analyzer());
        engine.initialize(None).unwrap();
        let r = engine.analyze("新しい仕事", AnalyzeOptions::default()).unwrap();
        assert_eq!(r.warnings, vec![AnalysisWarning::DegradedAnalysis]);
        assert!(r.candidate_id >= 1 && r.candidate_id <= 386);
    }

    #[test]
    fn deterministic_mode_never_selects_boundary() {
        let mut config = EngineConfig::default();
        config.boundary.rate_cap = 1.0;
        config.boundary.emotion_threshold = 0.0;
        let engine = MatchEngine::new(config).unwrap();
        engine.initialize(None).unwrap();
        let opts = AnalyzeOptions { deterministic_mode: true, ..Default::default() };
        let r = engine.analyze("極限まで全力で挑む", opts).unwrap();
        assert!(!r.is_boundary);
    }

    const PEAK_TEXT: &str = "絶対に極限まで全力で挑む！本当に強い自信がある！！";

    fn regular_history(selections: u16) -> UsageStats {
        let mut usage = UsageStats::new(&EngineConfig::default().usage);
        let now = Instant::now();
        for i in 0..selections {
            usage.record(i % 384 + 1, false, now);
        }
        usage
    }

    #[test]
    fn boundary_gate_needs_history_keywords_and_intensity() {
        let engine = engine();
        let model = engine.model().unwrap();
        let yang = model.corpus.get(385).unwrap();
        let yin = model.corpus.get(386).unwrap();
        let peak = analyze(PEAK_TEXT, &engine.tokenizer, &model.vectorizer);
        assert!(peak.emotion.intensity >= 0.8);

        // Fresh session: the rate cap keeps the gate shut
        let fresh = UsageSnapshot::empty();
        assert!(!engine.boundary_eligible(yang, &peak, &fresh));

        let seasoned = regular_history(99).snapshot();
        assert!(engine.boundary_eligible(yang, &peak, &seasoned));
        // No 用六 activation keyword in the text
        assert!(!engine.boundary_eligible(yin, &peak, &seasoned));

        let calm = analyze("極限まで走る", &engine.tokenizer, &model.vectorizer);
        assert!(calm.emotion.intensity < 0.8);
        assert!(!engine.boundary_eligible(yang, &calm, &seasoned));
    }

    #[test]
    fn boundary_never_twice_in_a_row() {
        let mut config = EngineConfig::default();
        config.boundary.rate_cap = 1.0;
        let engine = MatchEngine::new(config).unwrap();
        engine.initialize(None).unwrap();
        let opts = AnalyzeOptions { skip_cache: true, ..Default::default() };

        let mut previous = false;
        for _ in 0..8 {
            let r = engine.analyze(PEAK_TEXT, opts).unwrap();
            assert!(!(previous && r.is_boundary));
            previous = r.is_boundary;
        }
    }
}

//! yaoline — deterministic text-to-line matching over the 386 lines of the
//! I Ching.
//!
//! Free text goes in; one line (爻) comes out, with a score breakdown and
//! the runners-up. Matching combines keyword, temporal, energy, emotion,
//! semantic and positional signals, then spreads selections across the
//! corpus with session usage penalties and a keyed, reproducible
//! exploration term.
//!
//! ```no_run
//! use yaoline::{AnalyzeOptions, EngineConfig, MatchEngine};
//!
//! let engine = MatchEngine::new(EngineConfig::default())?;
//! engine.initialize(None)?;
//! let result = engine.analyze("新しい仕事を始める準備をしている", AnalyzeOptions::default())?;
//! println!("{} ({:.3})", result.label, result.score);
//! # Ok::<(), yaoline::EngineError>(())
//! ```

pub mod analysis;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod result;
pub mod scoring;
pub mod tokenizer;

pub use corpus::{CorpusSource, SourceEntry};
pub use engine::stats::EngineStatistics;
pub use engine::usage::{UsageSnapshot, UsageStats};
pub use engine::{AnalyzeOptions, CorpusSummary, MatchEngine};
pub use error::{AnalysisWarning, EngineError};
pub use result::MatchResult;
pub use yaoline_config::EngineConfig;

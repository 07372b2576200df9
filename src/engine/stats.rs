//! Engine statistics: request counts, timings, coverage.

use serde::{Deserialize, Serialize};

use super::usage::UsageStats;

/// Number of lines reported in `most_selected`.
const MOST_SELECTED: usize = 10;

/// Snapshot returned by `MatchEngine::statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStatistics {
    pub total_analyses: u64,
    pub computed_analyses: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub average_processing_time_ms: f64,
    pub min_processing_time_ms: f64,
    pub max_processing_time_ms: f64,
    /// Share of regular lines selected at least once this session.
    pub coverage_rate: f64,
    pub most_selected: Vec<SelectionCount>,
    pub never_selected: Vec<u16>,
    pub boundary_selections: u64,
    pub total_selections: u64,
    pub cache_size: usize,
    pub vocabulary_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCount {
    pub candidate_id: u16,
    pub count: u32,
}

/// Running request counters.
#[derive(Debug, Clone, Default)]
pub struct StatsTracker {
    total: u64,
    computed: u64,
    cache_hits: u64,
    total_time_ms: f64,
    min_time_ms: Option<f64>,
    max_time_ms: f64,
}

impl StatsTracker {
    pub fn record_computed(&mut self, elapsed_ms: f64) {
        self.total += 1;
        self.computed += 1;
        self.total_time_ms += elapsed_ms;
        self.min_time_ms = Some(self.min_time_ms.map_or(elapsed_ms, |m| m.min(elapsed_ms)));
        self.max_time_ms = self.max_time_ms.max(elapsed_ms);
    }

    pub fn record_cache_hit(&mut self) {
        self.total += 1;
        self.cache_hits += 1;
    }

    /// Combine counters with the current usage state.
    pub fn report(&self, usage: &UsageStats, cache_size: usize, vocabulary_size: usize) -> EngineStatistics {
        let ratio = |n: u64, d: u64| if d == 0 { 0.0 } else { n as f64 / d as f64 };
        EngineStatistics {
            total_analyses: self.total,
            computed_analyses: self.computed,
            cache_hits: self.cache_hits,
            cache_hit_rate: ratio(self.cache_hits, self.total),
            average_processing_time_ms: if self.computed == 0 {
                0.0
            } else {
                self.total_time_ms / self.computed as f64
            },
            min_processing_time_ms: self.min_time_ms.unwrap_or(0.0),
            max_processing_time_ms: self.max_time_ms,
            coverage_rate: usage.coverage() as f64,
            most_selected: usage
                .most_selected(MOST_SELECTED)
                .into_iter()
                .map(|(candidate_id, count)| SelectionCount { candidate_id, count })
                .collect(),
            never_selected: usage.never_selected(),
            boundary_selections: usage.boundary_selections(),
            total_selections: usage.total_selections(),
            cache_size,
            vocabulary_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use yaoline_config::UsageConfig;

    #[test]
    fn empty_report_is_zeroed() {
        let usage = UsageStats::new(&UsageConfig::default());
        let report = StatsTracker::default().report(&usage, 0, 0);
        assert_eq!(report.total_analyses, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
        assert_eq!(report.average_processing_time_ms, 0.0);
        assert_eq!(report.never_selected.len(), 384);
    }

    #[test]
    fn timings_and_hit_rate() {
        let mut t = StatsTracker::default();
        t.record_computed(2.0);
        t.record_computed(4.0);
        t.record_cache_hit();
        t.record_cache_hit();

        let mut usage = UsageStats::new(&UsageConfig::default());
        usage.record(7, false, Instant::now());
        let r = t.report(&usage, 3, 100);

        assert_eq!(r.total_analyses, 4);
        assert_eq!(r.computed_analyses, 2);
        assert_eq!(r.cache_hit_rate, 0.5);
        assert_eq!(r.average_processing_time_ms, 3.0);
        assert_eq!(r.min_processing_time_ms, 2.0);
        assert_eq!(r.max_processing_time_ms, 4.0);
        assert_eq!(
            r.most_selected,
            vec![SelectionCount { candidate_id: 7, count: 1 }]
        );
        assert_eq!(r.cache_size, 3);
    }
}

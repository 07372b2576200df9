//! Usage statistics — the anti-repetition memory of a session.
//!
//! Session counters (per-line counts, the recent ring buffer) reset after an
//! idle window. The lifetime counters behind the boundary rate cap do not.
//! Nothing here is persisted.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::warn;
use yaoline_config::UsageConfig;

use crate::corpus::REGULAR_LINES;

/// Group (1–64) and position (1–6) of a regular line id.
fn group_and_position(id: u16) -> Option<(u16, u8)> {
    if id == 0 || id as usize > REGULAR_LINES {
        return None;
    }
    let zero = id - 1;
    Some((zero / 6 + 1, (zero % 6 + 1) as u8))
}

/// Owned, injectable usage state.
#[derive(Debug, Clone)]
pub struct UsageStats {
    counts: BTreeMap<u16, u32>,
    recent: VecDeque<u16>,
    recent_window: usize,
    idle_reset: Duration,
    last_activity: Option<Instant>,
    total_selections: u64,
    boundary_selections: u64,
    last_was_boundary: bool,
}

impl UsageStats {
    pub fn new(config: &UsageConfig) -> Self {
        Self {
            counts: BTreeMap::new(),
            recent: VecDeque::with_capacity(config.recent_window),
            recent_window: config.recent_window.max(1),
            idle_reset: Duration::from_secs(config.idle_reset_secs),
            last_activity: None,
            total_selections: 0,
            boundary_selections: 0,
            last_was_boundary: false,
        }
    }

    /// Commit a selection made at `now`.
    pub fn record(&mut self, id: u16, is_boundary: bool, now: Instant) {
        self.expire_if_idle(now);
        *self.counts.entry(id).or_insert(0) += 1;
        if self.recent.len() == self.recent_window {
            self.recent.pop_front();
        }
        self.recent.push_back(id);
        self.last_activity = Some(now);

        self.total_selections += 1;
        if is_boundary {
            self.boundary_selections += 1;
        }
        self.last_was_boundary = is_boundary;
    }

    /// Reset session counters when idle beyond the window. Returns whether a
    /// reset happened.
    pub fn expire_if_idle(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_activity else {
            return false;
        };
        if now.saturating_duration_since(last) <= self.idle_reset {
            return false;
        }
        warn!(
            idle_secs = now.saturating_duration_since(last).as_secs(),
            "session idle, usage counters reset"
        );
        self.reset_session();
        true
    }

    /// Clear per-line counts and the ring buffer. Lifetime counters stay.
    pub fn reset_session(&mut self) {
        self.counts.clear();
        self.recent.clear();
        self.last_activity = None;
    }

    pub fn count(&self, id: u16) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    pub fn total_selections(&self) -> u64 {
        self.total_selections
    }

    pub fn boundary_selections(&self) -> u64 {
        self.boundary_selections
    }

    /// Whether one more boundary selection keeps the lifetime rate within
    /// `rate_cap` and does not follow another boundary selection.
    pub fn boundary_allowed(&self, rate_cap: f64) -> bool {
        boundary_rate_ok(self.boundary_selections, self.total_selections, rate_cap)
            && !self.last_was_boundary
    }

    /// Regular lines selected at least once this session.
    pub fn distinct_selected(&self) -> usize {
        self.counts
            .keys()
            .filter(|id| group_and_position(**id).is_some())
            .count()
    }

    /// Share of regular lines selected at least once this session.
    pub fn coverage(&self) -> f32 {
        self.distinct_selected() as f32 / REGULAR_LINES as f32
    }

    /// The `k` most selected lines, most first, ties by id.
    pub fn most_selected(&self, k: usize) -> Vec<(u16, u32)> {
        let mut all: Vec<(u16, u32)> = self.counts.iter().map(|(&id, &n)| (id, n)).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        all.truncate(k);
        all
    }

    /// Regular line ids never selected this session.
    pub fn never_selected(&self) -> Vec<u16> {
        (1..=REGULAR_LINES as u16)
            .filter(|id| !self.counts.contains_key(id))
            .collect()
    }

    /// Frozen view for one scoring pass.
    pub fn snapshot(&self) -> UsageSnapshot {
        let mut groups_used = [false; 64];
        let mut positions_used = [false; 6];
        for &id in self.counts.keys() {
            if let Some((g, p)) = group_and_position(id) {
                groups_used[g as usize - 1] = true;
                positions_used[p as usize - 1] = true;
            }
        }
        UsageSnapshot {
            counts: self.counts.clone(),
            recent: self.recent.iter().copied().collect(),
            groups_used,
            positions_used,
            coverage: self.coverage(),
            total_selections: self.total_selections,
            boundary_selections: self.boundary_selections,
            last_was_boundary: self.last_was_boundary,
        }
    }
}

fn boundary_rate_ok(boundary: u64, total: u64, rate_cap: f64) -> bool {
    (boundary + 1) as f64 / (total + 1) as f64 <= rate_cap
}

/// Read-only usage view the scorer works against.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    counts: BTreeMap<u16, u32>,
    recent: Vec<u16>,
    groups_used: [bool; 64],
    positions_used: [bool; 6],
    coverage: f32,
    total_selections: u64,
    boundary_selections: u64,
    last_was_boundary: bool,
}

impl UsageSnapshot {
    /// No history at all; used in deterministic mode.
    pub fn empty() -> Self {
        Self {
            counts: BTreeMap::new(),
            recent: Vec::new(),
            groups_used: [false; 64],
            positions_used: [false; 6],
            coverage: 0.0,
            total_selections: 0,
            boundary_selections: 0,
            last_was_boundary: false,
        }
    }

    pub fn count(&self, id: u16) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    pub fn is_recent(&self, id: u16) -> bool {
        self.recent.contains(&id)
    }

    pub fn any_selected(&self) -> bool {
        !self.counts.is_empty()
    }

    pub fn coverage(&self) -> f32 {
        self.coverage
    }

    pub fn group_used(&self, group_id: u16) -> bool {
        (1..=64).contains(&group_id) && self.groups_used[group_id as usize - 1]
    }

    pub fn position_used(&self, position: u8) -> bool {
        (1..=6).contains(&position) && self.positions_used[position as usize - 1]
    }

    pub fn boundary_allowed(&self, rate_cap: f64) -> bool {
        boundary_rate_ok(self.boundary_selections, self.total_selections, rate_cap)
            && !self.last_was_boundary
    }

    pub fn recent(&self) -> &[u16] {
        &self.recent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> UsageStats {
        UsageStats::new(&UsageConfig::default())
    }

    #[test]
    fn record_counts_and_ring_buffer() {
        let mut u = stats();
        let now = Instant::now();
        for id in 1..=12u16 {
            u.record(id, false, now);
        }
        u.record(3, false, now);
        assert_eq!(u.count(3), 2);
        let snap = u.snapshot();
        assert_eq!(snap.recent().len(), 10);
        assert!(!snap.is_recent(1));
        assert!(snap.is_recent(3));
        assert_eq!(u.total_selections(), 13);
    }

    #[test]
    fn coverage_counts_distinct_regular_lines() {
        let mut u = stats();
        let now = Instant::now();
        u.record(1, false, now);
        u.record(1, false, now);
        u.record(385, true, now);
        assert_eq!(u.distinct_selected(), 1);
        assert!((u.coverage() - 1.0 / 384.0).abs() < 1e-6);
        assert_eq!(u.never_selected().len(), 383);
    }

    #[test]
    fn snapshot_tracks_groups_and_positions() {
        let mut u = stats();
        u.record(8, false, Instant::now()); // group 2, position 2
        let snap = u.snapshot();
        assert!(snap.group_used(2));
        assert!(!snap.group_used(1));
        assert!(snap.position_used(2));
        assert!(!snap.position_used(1));
        assert!(snap.any_selected());
    }

    #[test]
    fn idle_reset_keeps_lifetime_counters() {
        let mut u = UsageStats::new(&UsageConfig {
            idle_reset_secs: 60,
            ..UsageConfig::default()
        });
        let t0 = Instant::now();
        u.record(5, false, t0);
        assert!(!u.expire_if_idle(t0 + Duration::from_secs(30)));
        assert_eq!(u.count(5), 1);

        assert!(u.expire_if_idle(t0 + Duration::from_secs(61)));
        assert_eq!(u.count(5), 0);
        assert_eq!(u.total_selections(), 1);
    }

    #[test]
    fn record_after_idle_starts_fresh_session() {
        let mut u = UsageStats::new(&UsageConfig {
            idle_reset_secs: 10,
            ..UsageConfig::default()
        });
        let t0 = Instant::now();
        u.record(5, false, t0);
        u.record(6, false, t0 + Duration::from_secs(100));
        assert_eq!(u.count(5), 0);
        assert_eq!(u.count(6), 1);
    }

    #[test]
    fn boundary_rate_cap_and_no_repeat() {
        let mut u = stats();
        let now = Instant::now();
        // (0 + 1) / (0 + 1) = 1.0 > 0.01
        assert!(!u.boundary_allowed(0.01));
        for id in 1..=99u16 {
            u.record(id, false, now);
        }
        // (0 + 1) / (99 + 1) = 0.01
        assert!(u.boundary_allowed(0.01));
        u.record(385, true, now);
        assert!(!u.boundary_allowed(1.0));
        u.record(1, false, now);
        assert!(u.boundary_allowed(1.0));
        assert_eq!(u.boundary_selections(), 1);
    }

    #[test]
    fn most_selected_orders_by_count_then_id() {
        let mut u = stats();
        let now = Instant::now();
        for id in [4u16, 2, 2, 4, 9] {
            u.record(id, false, now);
        }
        assert_eq!(u.most_selected(2), vec![(2, 2), (4, 2)]);
    }

    #[test]
    fn empty_snapshot_has_no_history() {
        let snap = UsageSnapshot::empty();
        assert_eq!(snap.count(1), 0);
        assert!(!snap.any_selected());
        assert_eq!(snap.coverage(), 0.0);
    }
}

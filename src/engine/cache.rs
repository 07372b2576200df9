//! Result cache: bounded, oldest-inserted entry evicted first.

use std::collections::{HashMap, VecDeque};

use crate::result::MatchResult;

/// Case-folded, whitespace-collapsed cache key.
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone)]
pub struct ResultCache {
    capacity: usize,
    entries: HashMap<String, MatchResult>,
    /// Keys in insertion order
    order: VecDeque<String>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Stored result for an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&MatchResult> {
        self.entries.get(key)
    }

    /// Insert or replace. A replaced entry keeps its original age.
    pub fn put(&mut self, key: String, result: MatchResult) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, result);
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, result);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

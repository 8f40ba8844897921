//! Counter/gauge store keyed by flat strings.

use super::key::StatKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bag of named counters and gauges.
///
/// Counters only ever grow. Gauges can be set, adjusted, and reset; the
/// consecutive-error streaks live here. The store itself is not
/// synchronized; the owning execution context guards it with its lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatStore {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, f64>,
}

impl StatStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Counters ====================

    /// Add `by` to a counter, creating it at zero first.
    pub fn increment(&mut self, key: &StatKey, by: u64) -> u64 {
        let slot = self.counters.entry(key.render()).or_insert(0);
        *slot = slot.saturating_add(by);
        *slot
    }

    pub fn counter(&self, key: &StatKey) -> u64 {
        self.counters.get(&key.render()).copied().unwrap_or(0)
    }

    // ==================== Gauges ====================

    pub fn set_gauge(&mut self, key: &StatKey, value: f64) {
        self.gauges.insert(key.render(), value);
    }

    /// Adjust a gauge by `delta`, creating it at zero first.
    pub fn add_gauge(&mut self, key: &StatKey, delta: f64) -> f64 {
        let slot = self.gauges.entry(key.render()).or_insert(0.0);
        *slot += delta;
        *slot
    }

    pub fn reset_gauge(&mut self, key: &StatKey) {
        self.gauges.insert(key.render(), 0.0);
    }

    pub fn gauge(&self, key: &StatKey) -> f64 {
        self.gauges.get(&key.render()).copied().unwrap_or(0.0)
    }

    // ==================== Lookups ====================

    /// Value of a key regardless of kind. Counters shadow gauges.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.counters
            .get(key)
            .map(|v| *v as f64)
            .or_else(|| self.gauges.get(key).copied())
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let counters = self
            .counters
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), *v as f64));
        let gauges = self
            .gauges
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), *v));
        counters.chain(gauges)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.with_prefix("")
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty()
    }

    /// Fold another store into this one.
    ///
    /// Counters are summed. Gauges keep the larger of the two values, so a
    /// child's error streak can surface at the parent without erasing the
    /// parent's own.
    pub fn merge_from(&mut self, other: &StatStore) {
        for (key, value) in &other.counters {
            let slot = self.counters.entry(key.clone()).or_insert(0);
            *slot = slot.saturating_add(*value);
        }
        for (key, value) in &other.gauges {
            let slot = self.gauges.entry(key.clone()).or_insert(*value);
            if *value > *slot {
                *slot = *value;
            }
        }
    }
}

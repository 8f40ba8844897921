//! Resource limits over stat keys.
//!
//! A [`Limit`] bounds one key ([`MatchType::Exact`]) or every key under
//! a prefix ([`MatchType::Prefix`]). [`first_violation`] scans a
//! [`StatStore`] and reports the first limit whose matched value is
//! strictly greater than `max_value`.
//!
//! Evaluation is pure; latching and cancellation live with the execution
//! context that owns the store.

use crate::core::error::DomainError;
use crate::stats::{StatKey, StatStore};
use serde::{Deserialize, Serialize};

/// How a limit's key selects stat entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Only the key itself.
    #[default]
    #[serde(alias = "exact_key")]
    Exact,
    /// Every key that starts with the given prefix, checked one by one.
    #[serde(alias = "key_prefix")]
    Prefix,
}

impl std::str::FromStr for MatchType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" | "exact_key" => Ok(MatchType::Exact),
            "prefix" | "key_prefix" => Ok(MatchType::Prefix),
            other => Err(DomainError::InvalidLimit(format!(
                "unknown match type '{}'",
                other
            ))),
        }
    }
}

/// Upper bound on a counter or gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub key: String,
    #[serde(default, rename = "match")]
    pub match_type: MatchType,
    #[serde(rename = "max")]
    pub max_value: f64,
}

impl Limit {
    pub fn exact(key: impl Into<String>, max_value: f64) -> Self {
        Self {
            key: key.into(),
            match_type: MatchType::Exact,
            max_value,
        }
    }

    pub fn prefix(prefix: impl Into<String>, max_value: f64) -> Self {
        Self {
            key: prefix.into(),
            match_type: MatchType::Prefix,
            max_value,
        }
    }

    /// Limit on a structured key.
    pub fn on(key: &StatKey, max_value: f64) -> Self {
        Self::exact(key.render(), max_value)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.key.is_empty() && self.match_type == MatchType::Exact {
            return Err(DomainError::InvalidLimit("empty key".to_string()));
        }
        if !self.max_value.is_finite() {
            return Err(DomainError::InvalidLimit(format!(
                "max for '{}' must be a finite number",
                self.key
            )));
        }
        Ok(())
    }

    /// First matching entry over the threshold, if any.
    pub fn check(&self, stats: &StatStore) -> Option<(String, f64)> {
        match self.match_type {
            MatchType::Exact => stats
                .value(&self.key)
                .filter(|v| *v > self.max_value)
                .map(|v| (self.key.clone(), v)),
            MatchType::Prefix => stats
                .with_prefix(&self.key)
                .find(|(_, v)| *v > self.max_value)
                .map(|(k, v)| (k.to_string(), v)),
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.match_type {
            MatchType::Exact => write!(f, "{} <= {}", self.key, self.max_value),
            MatchType::Prefix => write!(f, "{}* <= {}", self.key, self.max_value),
        }
    }
}

/// The limit that tripped, with the key and value that crossed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceededLimit {
    pub limit: Limit,
    pub observed_key: String,
    pub observed_value: f64,
}

impl std::fmt::Display for ExceededLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "limit exceeded: {} = {} (max {})",
            self.observed_key, self.observed_value, self.limit.max_value
        )
    }
}

/// Evaluate `limits` in order and return the first violation.
pub fn first_violation(limits: &[Limit], stats: &StatStore) -> Option<ExceededLimit> {
    limits.iter().find_map(|limit| {
        limit.check(stats).map(|(key, value)| ExceededLimit {
            limit: limit.clone(),
            observed_key: key,
            observed_value: value,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ParseCategory;

    #[test]
    fn test_exact_limit_is_strictly_greater() {
        let mut stats = StatStore::new();
        stats.increment(&StatKey::Iterations, 3);

        let limit = Limit::on(&StatKey::Iterations, 3.0);
        assert!(limit.check(&stats).is_none());

        stats.increment(&StatKey::Iterations, 1);
        assert_eq!(limit.check(&stats), Some(("iterations".to_string(), 4.0)));
    }

    #[test]
    fn test_prefix_limit_checks_each_key() {
        let mut stats = StatStore::new();
        stats.increment(&StatKey::ToolCallsFor("read".into()), 2);
        stats.increment(&StatKey::ToolCallsFor("write".into()), 6);

        let limit = Limit::prefix("tool.calls.by.", 5.0);
        let (key, value) = limit.check(&stats).unwrap();
        assert_eq!(key, "tool.calls.by.write");
        assert_eq!(value, 6.0);
    }

    #[test]
    fn test_gauge_limits() {
        let mut stats = StatStore::new();
        let streak = StatKey::ParseErrorStreak(ParseCategory::Toolchain);
        stats.add_gauge(&streak, 3.0);
        let limits = vec![Limit::on(&streak, 2.0)];
        let exceeded = first_violation(&limits, &stats).unwrap();
        assert_eq!(exceeded.observed_key, "parse.toolchain.consecutive");
        assert!(exceeded.to_string().contains("max 2"));
    }

    #[test]
    fn test_first_violation_in_configured_order() {
        let mut stats = StatStore::new();
        stats.increment(&StatKey::InputTokens, 100);
        stats.increment(&StatKey::Iterations, 10);
        let limits = vec![
            Limit::on(&StatKey::Iterations, 5.0),
            Limit::on(&StatKey::InputTokens, 50.0),
        ];
        let exceeded = first_violation(&limits, &stats).unwrap();
        assert_eq!(exceeded.observed_key, "iterations");
    }

    #[test]
    fn test_missing_key_never_violates() {
        let stats = StatStore::new();
        assert!(first_violation(&[Limit::exact("nothing", 0.0)], &stats).is_none());
    }

    #[test]
    fn test_limit_deserializes_from_config_shape() {
        let limit: Limit =
            serde_json::from_str(r#"{"key": "tool.calls.by.", "match": "prefix", "max": 3}"#)
                .unwrap();
        assert_eq!(limit.match_type, MatchType::Prefix);
        assert_eq!(limit.max_value, 3.0);

        let exact: Limit = serde_json::from_str(r#"{"key": "iterations", "max": 10}"#).unwrap();
        assert_eq!(exact.match_type, MatchType::Exact);
    }

    #[test]
    fn test_validate() {
        assert!(Limit::exact("", 1.0).validate().is_err());
        assert!(Limit::exact("k", f64::NAN).validate().is_err());
        assert!(Limit::exact("k", 1.0).validate().is_ok());
    }
}

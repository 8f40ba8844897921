//! Raw TOML configuration data types
//!
//! These structs mirror the config file exactly. Enumerated settings stay
//! strings here so that [`FileConfig::into_run_config`] can report a bad
//! entry by position instead of failing the whole load.

use agentctx_application::{RunConfig, StreamBufferPolicy, SyntaxKind};
use agentctx_domain::{Limit, MatchType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("limit #{index} has an empty key")]
    EmptyLimitKey { index: usize },

    #[error("limit '{key}' has unknown match type '{value}' (expected exact or prefix)")]
    UnknownMatchType { key: String, value: String },

    #[error("limit '{key}' must have a finite, non-negative max (got {max})")]
    InvalidLimitMax { key: String, max: f64 },

    #[error("unknown stream mode '{0}' (expected unbounded or bounded)")]
    UnknownStreamMode(String),

    #[error("bounded stream mode needs a capacity of at least 1")]
    ZeroCapacity,

    #[error("{0}")]
    UnknownSyntax(String),

    #[error("tool_section cannot be empty")]
    EmptyToolSection,
}

/// One `[[limits]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLimit {
    pub key: String,
    /// `exact` (default) or `prefix`
    #[serde(default = "default_match", rename = "match")]
    pub match_type: String,
    pub max: f64,
}

fn default_match() -> String {
    "exact".to_string()
}

/// Raw `[stream]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStreamConfig {
    /// `unbounded` or `bounded`
    pub mode: String,
    /// Per-subscriber buffer size in bounded mode
    pub capacity: usize,
}

impl Default for FileStreamConfig {
    fn default() -> Self {
        Self {
            mode: "unbounded".to_string(),
            capacity: 256,
        }
    }
}

/// Raw `[output]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Complete configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// `json` or `yaml`
    pub syntax: String,
    /// Reject duplicate section tags
    pub strict_tags: bool,
    /// Tag holding tool calls in model output
    pub tool_section: String,
    pub stream: FileStreamConfig,
    pub output: FileOutputConfig,
    pub limits: Vec<FileLimit>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            syntax: SyntaxKind::default().to_string(),
            strict_tags: false,
            tool_section: "tool".to_string(),
            stream: FileStreamConfig::default(),
            output: FileOutputConfig::default(),
            limits: Vec::new(),
        }
    }
}

impl FileConfig {
    /// Check the config without converting it
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clone().into_run_config().map(|_| ())
    }

    /// Convert into the application-level [`RunConfig`].
    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        if self.tool_section.trim().is_empty() {
            return Err(ConfigError::EmptyToolSection);
        }

        let syntax: SyntaxKind = self.syntax.parse().map_err(ConfigError::UnknownSyntax)?;

        let stream_buffer = match self.stream.mode.to_lowercase().as_str() {
            "unbounded" => StreamBufferPolicy::Unbounded,
            "bounded" if self.stream.capacity == 0 => return Err(ConfigError::ZeroCapacity),
            "bounded" => StreamBufferPolicy::Bounded {
                capacity: self.stream.capacity,
            },
            other => return Err(ConfigError::UnknownStreamMode(other.to_string())),
        };

        let limits = self
            .limits
            .into_iter()
            .enumerate()
            .map(|(index, limit)| {
                if limit.key.trim().is_empty() {
                    return Err(ConfigError::EmptyLimitKey { index });
                }
                if !limit.max.is_finite() || limit.max < 0.0 {
                    return Err(ConfigError::InvalidLimitMax {
                        key: limit.key,
                        max: limit.max,
                    });
                }
                let match_type: MatchType =
                    limit
                        .match_type
                        .parse()
                        .map_err(|_| ConfigError::UnknownMatchType {
                            key: limit.key.clone(),
                            value: limit.match_type.clone(),
                        })?;
                Ok(Limit {
                    key: limit.key,
                    match_type,
                    max_value: limit.max,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RunConfig::default()
            .with_limits(limits)
            .with_stream_buffer(stream_buffer)
            .with_strict_tags(self.strict_tags)
            .with_syntax(syntax))
    }
}

//! Infrastructure layer for agentctx
//!
//! Adapters for the ports defined in the application layer:
//!
//! | Module | Adapter |
//! |--------|---------|
//! | [`wire`] | JSON and YAML tool-call syntaxes |
//! | [`schema`] | JSON Schema compiler backed by `jsonschema` |
//! | [`format`] | `<tag>` section extraction from model output |
//! | [`config`] | TOML/env configuration loading |
//! | [`logging`] | JSONL trace export, `tracing` tool hooks |

pub mod config;
pub mod format;
pub mod logging;
pub mod schema;
pub mod wire;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use format::TaggedSectionFormat;
pub use logging::{JsonlTraceWriter, TracingHooks};
pub use schema::{JsonSchemaCompiler, JsonSchemaValidator};
pub use wire::{JsonSyntax, YamlSyntax, syntax_for};

//! Application configuration.

pub mod run_config;

pub use run_config::{RunConfig, StreamBufferPolicy, SyntaxKind};

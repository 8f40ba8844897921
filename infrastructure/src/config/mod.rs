//! Configuration file loading for agentctx
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `AGENTCTX_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./agentctx.toml` or `./.agentctx.toml`
//! 4. Global: `$XDG_CONFIG_HOME/agentctx/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{ConfigError, FileConfig, FileLimit, FileOutputConfig, FileStreamConfig};
pub use loader::ConfigLoader;

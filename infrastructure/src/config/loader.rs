//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const PROJECT_FILES: [&str; 2] = ["agentctx.toml", ".agentctx.toml"];
const ENV_PREFIX: &str = "AGENTCTX_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `AGENTCTX_*` environment variables (`__` separates tables, so
    ///    `AGENTCTX_STREAM__MODE=bounded`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./agentctx.toml` or `./.agentctx.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/agentctx/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Self::files(config_path);
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment.extract().map_err(Box::new)
    }

    /// Like [`load`](Self::load), without the environment layer.
    pub fn load_files(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::files(config_path).extract().map_err(Box::new)
    }

    fn files(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("agentctx").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Render a config back to TOML
    pub fn to_toml(config: &FileConfig) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(config)
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&Path>) {
        println!("Configuration sources (in priority order):");

        let env_vars: Vec<String> = std::env::vars()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with(ENV_PREFIX))
            .collect();
        if env_vars.is_empty() {
            println!("  [     ] Env:     {}*", ENV_PREFIX);
        } else {
            println!("  [FOUND] Env:     {}", env_vars.join(", "));
        }

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISS " };
            println!("  [{}] Explicit: {}", mark, path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./agentctx.toml or ./.agentctx.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert!(config.limits.is_empty());
        assert_eq!(config.tool_section, "tool");
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path().unwrap();
        assert!(path.to_string_lossy().contains("agentctx"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
strict_tags = true

[stream]
mode = "bounded"

[[limits]]
key = "iterations"
max = 5
"#
        )
        .unwrap();

        let config = ConfigLoader::load_files(Some(file.path())).unwrap();
        assert!(config.strict_tags);
        assert_eq!(config.stream.mode, "bounded");
        // Untouched keys keep their defaults.
        assert_eq!(config.stream.capacity, 256);
        assert_eq!(config.limits.len(), 1);
        assert_eq!(config.limits[0].match_type, "exact");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limits = \"not a list\"").unwrap();
        assert!(ConfigLoader::load_files(Some(file.path())).is_err());
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = FileConfig::default();
        let text = ConfigLoader::to_toml(&config).unwrap();
        let back: FileConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}

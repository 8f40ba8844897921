//! CLI command definitions

use agentctx_application::SyntaxKind;
use agentctx_domain::Limit;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Wire syntax of the tool sections in a transcript
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SyntaxArg {
    Json,
    Yaml,
}

impl From<SyntaxArg> for SyntaxKind {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Json => SyntaxKind::Json,
            SyntaxArg::Yaml => SyntaxKind::Yaml,
        }
    }
}

/// CLI arguments for agentctx
#[derive(Parser, Debug)]
#[command(name = "agentctx")]
#[command(author, version, about = "Execution context and tool pipeline for LLM agent runs")]
#[command(long_about = r#"
agentctx replays recorded model output through the tool invocation pipeline.

Each turn of a transcript is split into <tag> sections; the tool section is
parsed as JSON or YAML tool calls, run against the built-in demo tools, and
the observation the model would see next is printed. Limits cancel the run
as soon as a counter crosses its ceiling.

Configuration files are loaded from (in priority order):
1. AGENTCTX_* environment variables
2. --config <path>     Explicit config file
3. ./agentctx.toml     Project-level config
4. ~/.config/agentctx/config.toml   Global config

Example:
  agentctx replay transcript.txt
  agentctx replay --syntax yaml --limit tool.calls.total=5 transcript.txt
  agentctx replay --limit 'parse.*=3' --trace-out run.jsonl transcript.txt
  agentctx config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a transcript of model outputs through the toolchain
    Replay(ReplayArgs),

    /// List the built-in demo tools and their parameter schemas
    Tools,

    /// Show configuration sources and the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Transcript file; turns are separated by a line containing only `---`
    pub transcript: PathBuf,

    /// Wire syntax of tool sections (overrides config)
    #[arg(long, value_enum)]
    pub syntax: Option<SyntaxArg>,

    /// Tag holding tool calls (overrides config)
    #[arg(long, value_name = "TAG")]
    pub section: Option<String>,

    /// Reject turns that repeat a section tag
    #[arg(long)]
    pub strict: bool,

    /// Extra limit, `KEY=MAX` for one key or `PREFIX*=MAX` for a key prefix
    #[arg(long = "limit", value_name = "KEY=MAX", value_parser = parse_limit)]
    pub limits: Vec<Limit>,

    /// Write the trace tree as JSONL
    #[arg(long, value_name = "PATH")]
    pub trace_out: Option<PathBuf>,

    /// Print the final outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse `KEY=MAX` or `PREFIX*=MAX`.
pub fn parse_limit(s: &str) -> Result<Limit, String> {
    let (key, max) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=MAX, got '{}'", s))?;
    let key = key.trim();
    let max: f64 = max
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", max.trim()))?;
    if !max.is_finite() || max < 0.0 {
        return Err(format!("limit max must be non-negative, got {}", max));
    }

    let limit = match key.strip_suffix('*') {
        Some(prefix) => Limit::prefix(prefix, max),
        None => Limit::exact(key, max),
    };
    if limit.key.is_empty() {
        return Err("limit key cannot be empty".to_string());
    }
    Ok(limit)
}

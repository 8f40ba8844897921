//! CLI entrypoint for agentctx
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;
mod output;
mod replay;
mod tools;

use agentctx_application::{ExecutionContext, TraceSink, Toolchain, export_tree};
use agentctx_domain::TerminationReason;
use agentctx_infrastructure::{
    ConfigLoader, FileConfig, JsonlTraceWriter, TaggedSectionFormat, TracingHooks, syntax_for,
};
use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli::{Cli, Command, ReplayArgs};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("failed to load configuration: {}", e))?
    };

    if cli.no_color || !file_config.output.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Command::Config => {
            ConfigLoader::print_config_sources(cli.config.as_deref());
            println!();
            println!("{}", ConfigLoader::to_toml(&file_config)?);
            file_config.validate()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Tools => {
            output::print_tools(&tools::demo_toolbox()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Replay(args) => {
            let reason = run_replay(args, file_config).await?;
            Ok(match reason {
                TerminationReason::Completed => ExitCode::SUCCESS,
                _ => ExitCode::from(2),
            })
        }
    }
}

/// Initialize logging based on verbosity level, optionally teeing to a file.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("--log-file {} has no file name", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run_replay(args: ReplayArgs, file_config: FileConfig) -> Result<TerminationReason> {
    let section = args
        .section
        .clone()
        .unwrap_or_else(|| file_config.tool_section.clone());

    let mut config = file_config.into_run_config()?;
    if let Some(syntax) = args.syntax {
        config.syntax = syntax.into();
    }
    if args.strict {
        config.strict_tags = true;
    }
    config.limits.extend(args.limits);

    let text = std::fs::read_to_string(&args.transcript)
        .with_context(|| format!("cannot read transcript {}", args.transcript.display()))?;
    let turns = replay::split_turns(&text);
    if turns.is_empty() {
        bail!("transcript {} has no turns", args.transcript.display());
    }

    // === Dependency Injection ===
    let format = TaggedSectionFormat::new().strict(config.strict_tags);
    let toolchain = Toolchain::new(syntax_for(config.syntax), Arc::new(tools::demo_toolbox()?))
        .with_hook(Arc::new(TracingHooks));

    let name = args
        .transcript
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("replay")
        .to_string();
    info!(
        run = %name,
        turns = turns.len(),
        syntax = %config.syntax,
        limits = config.limits.len(),
        "starting replay"
    );
    let ctx = ExecutionContext::new(name, config);

    let printer = (!args.json).then(|| output::spawn_printer(ctx.subscribe_all()));
    let interrupt = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctx.cancel("interrupted by user");
            }
        })
    };

    let outcome = replay::run(&ctx, &format, &section, &toolchain, &turns)
        .await
        .context("replay ended without an outcome")?;
    interrupt.abort();
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    if let Some(path) = &args.trace_out {
        let writer = JsonlTraceWriter::new(path)
            .with_context(|| format!("cannot create trace file {}", path.display()))?;
        let written = export_tree(&ctx, &writer);
        writer.write_outcome(&outcome);
        writer.flush();
        info!(entries = written, path = %path.display(), "trace written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output::print_outcome(&outcome);
    }

    Ok(outcome.reason)
}

//! Console output for replays.

use crate::replay::{ANSWER_STREAM, ERROR_STREAM, OBSERVATION_STREAM, TURN_STREAM};
use agentctx_application::{Subscription, ToolBox};
use agentctx_domain::{RunOutcome, StreamChunk, TerminationReason};
use colored::Colorize;
use tokio::task::JoinHandle;

/// Print chunks as they arrive until the run's streams close.
pub fn spawn_printer(mut subscription: Subscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(chunk) = subscription.recv().await {
            print_chunk(&chunk);
        }
    })
}

pub fn print_chunk(chunk: &StreamChunk) {
    match chunk.stream_id.as_str() {
        TURN_STREAM => println!("\n{}", format!("── {} ──", chunk.content).bold()),
        OBSERVATION_STREAM => {
            let label = match chunk.topic.as_deref() {
                Some("ok") => "observation".green(),
                Some("media") => "media".cyan(),
                _ => "observation".yellow(),
            };
            println!("{} {}", label, chunk.content);
        }
        ERROR_STREAM => {
            let kind = chunk.topic.as_deref().unwrap_or("error");
            println!("{} {}", format!("[{}]", kind).red(), chunk.content);
        }
        ANSWER_STREAM => println!("{} {}", "answer".bold().green(), chunk.content),
        other => println!("{} {}", format!("[{}]", other).dimmed(), chunk.content),
    }
}

pub fn print_outcome(outcome: &RunOutcome) {
    println!();
    let reason = outcome.reason.to_string();
    let reason = match outcome.reason {
        TerminationReason::Completed => reason.green(),
        TerminationReason::Stopped => reason.yellow(),
        _ => reason.red(),
    };
    println!(
        "{} {} after {} iteration(s) in {}ms",
        "run".bold(),
        reason,
        outcome.iterations,
        outcome.duration_ms()
    );
    if let Some(error) = &outcome.error {
        println!("  {}", error.dimmed());
    }

    println!("{}", "stats".bold());
    for (key, value) in outcome.stats.iter() {
        println!("  {:<40} {}", key, value);
    }
}

pub fn print_tools(tools: &ToolBox) {
    for meta in tools.metas() {
        println!("{} {}", meta.name.bold(), meta.description.dimmed());
        if let Some(schema) = &meta.schema
            && let Ok(pretty) = serde_json::to_string_pretty(schema)
        {
            for line in pretty.lines() {
                println!("    {}", line);
            }
        }
    }
}

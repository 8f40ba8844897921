//! Transcript replay: the agent loop with recorded model output.
//!
//! Each turn stands in for one model response. The loop per turn:
//!
//! ```text
//! start_iteration ─▶ split sections ─▶ tool section? ─┬─ yes ─▶ toolchain ─▶ observation
//!                                                      └─ no ──▶ final answer, stop
//! ```
//!
//! Everything the user sees goes out as stream chunks on the root
//! context, so a subscriber prints the run live.

use agentctx_application::{ExecutionContext, TextFormat, Toolchain};
use agentctx_domain::{LoopAction, RunOutcome, StreamChunk, TerminationReason};
use serde_json::json;
use tracing::{debug, info};

pub const TURN_STREAM: &str = "turn";
pub const OBSERVATION_STREAM: &str = "observation";
pub const ERROR_STREAM: &str = "error";
pub const ANSWER_STREAM: &str = "answer";

/// Section holding the final answer, when the model wrote one.
const ANSWER_SECTION: &str = "answer";

/// Split a transcript into turns at lines consisting of `---`.
pub fn split_turns(text: &str) -> Vec<String> {
    let mut turns = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim() == "---" {
            turns.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    turns.push(current);
    turns
        .into_iter()
        .map(|turn| turn.trim().to_string())
        .filter(|turn| !turn.is_empty())
        .collect()
}

/// Run every turn until a final answer, cancellation, or the end of the
/// transcript. Sets the termination of `ctx` and returns its outcome.
pub async fn run(
    ctx: &ExecutionContext,
    format: &dyn TextFormat,
    section: &str,
    toolchain: &Toolchain,
    turns: &[String],
) -> Option<RunOutcome> {
    for turn in turns {
        if ctx.is_cancelled() {
            break;
        }
        let iteration = ctx.start_iteration();
        ctx.emit_chunk(StreamChunk::new(TURN_STREAM, format!("turn {}", iteration)));

        let sections = match format.parse(ctx, turn) {
            Ok(sections) => sections,
            Err(e) => {
                ctx.emit_chunk(StreamChunk::new(ERROR_STREAM, e.to_string()).with_topic(e.kind().as_str()));
                ctx.end_iteration(LoopAction::Error);
                continue;
            }
        };

        let Some(bodies) = sections.get(section) else {
            let answer = sections
                .get(ANSWER_SECTION)
                .and_then(|bodies| bodies.last())
                .cloned()
                .unwrap_or_else(|| turn.clone());
            debug!(iteration, "turn has no tool section; treating as final answer");
            ctx.emit_chunk(StreamChunk::new(ANSWER_STREAM, answer.clone()).finished());
            ctx.end_iteration(LoopAction::Stop);
            ctx.set_termination(TerminationReason::Completed, Some(json!(answer)), None);
            return ctx.outcome();
        };

        let mut parsed_any = false;
        let mut unrecoverable = false;
        for body in bodies {
            match toolchain.execute(ctx, body).await {
                Ok(result) => {
                    parsed_any = true;
                    unrecoverable |= result
                        .errors
                        .iter()
                        .flatten()
                        .any(|e| !e.kind().is_model_recoverable());
                    let topic = if result.has_errors() { "partial" } else { "ok" };
                    ctx.emit_chunk(
                        StreamChunk::new(OBSERVATION_STREAM, result.observation.text).with_topic(topic),
                    );
                    for part in &result.observation.media {
                        ctx.emit_chunk(
                            StreamChunk::new(OBSERVATION_STREAM, format!("[{}]", part.mime_type))
                                .with_topic("media"),
                        );
                    }
                }
                Err(e) => {
                    ctx.emit_chunk(
                        StreamChunk::new(ERROR_STREAM, e.to_string()).with_topic(e.kind().as_str()),
                    );
                }
            }
        }
        if unrecoverable {
            // Feeding a cancelled call back to the model cannot help.
            ctx.end_iteration(LoopAction::Stop);
            break;
        }
        ctx.end_iteration(if parsed_any {
            LoopAction::Continue
        } else {
            LoopAction::Error
        });
    }

    let (reason, error) = match ctx.cancel_cause() {
        Some(cause) if cause.exceeded_limit().is_some() => {
            (TerminationReason::LimitExceeded, cause.to_string())
        }
        Some(cause) => (TerminationReason::Cancelled, cause.to_string()),
        None => (
            TerminationReason::Stopped,
            "transcript ended without a final answer".to_string(),
        ),
    };
    info!(%reason, %error, "replay stopped early");
    ctx.set_termination(reason, None, Some(error));
    ctx.outcome()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::demo_toolbox;
    use agentctx_application::RunConfig;
    use agentctx_domain::{Limit, ParseCategory, StatKey, TraceEvent};
    use agentctx_infrastructure::{JsonSyntax, TaggedSectionFormat};
    use std::sync::Arc;

    fn toolchain() -> Toolchain {
        Toolchain::new(Arc::new(JsonSyntax), Arc::new(demo_toolbox().unwrap()))
    }

    fn turns(text: &str) -> Vec<String> {
        split_turns(text)
    }

    #[test]
    fn test_split_turns() {
        let turns = turns("one\n---\n\n---\ntwo\nlines\n  ---  \nthree");
        assert_eq!(turns, vec!["one", "two\nlines", "three"]);
    }

    #[tokio::test]
    async fn test_replay_to_final_answer() {
        let ctx = ExecutionContext::new("replay", RunConfig::default());
        let mut observations = ctx.subscribe_to_stream(OBSERVATION_STREAM);
        let transcript = turns(
            r#"<tool>{"tool": "add", "args": {"numbers": [1, 2, 3.5]}}</tool>
---
<tool>[{"tool": "echo", "args": {"text": "hi"}}, {"tool": "nope"}]</tool>
---
<answer>six and a half</answer>"#,
        );

        let outcome = run(&ctx, &TaggedSectionFormat::new(), "tool", &toolchain(), &transcript)
            .await
            .unwrap();

        assert_eq!(outcome.reason, TerminationReason::Completed);
        assert_eq!(outcome.result, Some(json!("six and a half")));
        assert_eq!(outcome.iterations, 3);
        assert_eq!(ctx.counter(&StatKey::ToolCalls), 3);

        let first = observations.recv().await.unwrap();
        assert_eq!(first.content, r#"{"tool":"add","result":6.5}"#);
        assert_eq!(first.topic.as_deref(), Some("ok"));
        assert_eq!(first.source.as_deref(), Some("replay/1"));
        let second = observations.recv().await.unwrap();
        assert_eq!(second.topic.as_deref(), Some("partial"));
        // Termination closed the stream.
        assert!(observations.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_limit_stops_replay() {
        let config = RunConfig::default().with_limit(Limit::on(
            &StatKey::ParseErrorStreak(ParseCategory::Toolchain),
            1.0,
        ));
        let ctx = ExecutionContext::new("replay", config);
        let transcript = turns("<tool>{broken</tool>\n---\n<tool>[oops</tool>\n---\n<answer>never</answer>");

        let outcome = run(&ctx, &TaggedSectionFormat::new(), "tool", &toolchain(), &transcript)
            .await
            .unwrap();

        assert_eq!(outcome.reason, TerminationReason::LimitExceeded);
        assert_eq!(outcome.iterations, 2);
        assert!(outcome.exceeded_limit.is_some());
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_slot_stops_the_turn() {
        let config = RunConfig::default().with_limit(Limit::on(&StatKey::ToolCalls, 0.0));
        let ctx = ExecutionContext::new("replay", config);
        let transcript = turns(
            r#"<tool>[{"tool": "echo", "args": {"text": "a"}}, {"tool": "echo", "args": {"text": "b"}}]</tool>
---
<answer>never</answer>"#,
        );

        let outcome = run(&ctx, &TaggedSectionFormat::new(), "tool", &toolchain(), &transcript)
            .await
            .unwrap();

        assert_eq!(outcome.reason, TerminationReason::LimitExceeded);
        assert_eq!(outcome.iterations, 1);
        let actions: Vec<LoopAction> = ctx
            .entries()
            .iter()
            .filter_map(|e| match &e.event {
                TraceEvent::IterationEnd { action, .. } => Some(*action),
                _ => None,
            })
            .collect();
        assert_eq!(actions, vec![LoopAction::Stop]);
    }

    #[tokio::test]
    async fn test_format_errors_continue_and_exhaust() {
        let ctx = ExecutionContext::new("replay", RunConfig::default());
        let mut errors = ctx.subscribe_to_stream(ERROR_STREAM);
        let transcript = turns("<tool>never closed\n---\n<tool>{\"tool\": \"echo\", \"args\": {\"text\": 1}}</tool>");

        let outcome = run(
            &ctx,
            &TaggedSectionFormat::new().with_tags(["tool", "answer"]),
            "tool",
            &toolchain(),
            &transcript,
        )
        .await
        .unwrap();

        assert_eq!(outcome.reason, TerminationReason::Stopped);
        assert_eq!(ctx.counter(&StatKey::ParseErrors(ParseCategory::Format)), 1);
        let chunk = errors.recv().await.unwrap();
        assert_eq!(chunk.topic.as_deref(), Some("invalid_wire_syntax"));
    }
}

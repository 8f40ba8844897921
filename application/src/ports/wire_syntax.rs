//! Wire syntax port — how tool calls and their results are written.
//!
//! | Direction | Method |
//! |-----------|--------|
//! | model → toolchain | [`WireSyntax::parse_calls`] |
//! | toolchain → model | [`WireSyntax::render_output`], [`WireSyntax::render_error`] |
//!
//! Parsing receives the registered tools so a syntax can use declared
//! argument types while decoding.

use crate::toolchain::ToolBox;
use agentctx_domain::{Observation, ToolCall, ToolCallError, ToolChainResult, ToolOutput, ToolchainError};

pub trait WireSyntax: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decode one tool-call section into calls, in written order.
    fn parse_calls(&self, raw: &str, tools: &ToolBox) -> Result<Vec<ToolCall>, ToolchainError>;

    /// Render a successful slot.
    fn render_output(&self, call: &ToolCall, output: &ToolOutput) -> String;

    /// Render a failed slot so the model sees the failure in-band.
    fn render_error(&self, call: &ToolCall, error: &ToolCallError) -> String;

    /// One block per slot, in call order, plus every slot's media.
    fn format_observation(&self, result: &ToolChainResult) -> Observation {
        let mut blocks = Vec::with_capacity(result.len());
        let mut media = Vec::new();
        for (call, outcome) in result.slots() {
            match outcome {
                Ok(output) => {
                    blocks.push(self.render_output(call, output));
                    media.extend(output.media.iter().cloned());
                }
                Err(error) => blocks.push(self.render_error(call, error)),
            }
        }
        Observation {
            text: blocks.join("\n"),
            media,
        }
    }
}

//! Execution context engine.
//!
//! | Type | Role |
//! |------|------|
//! | [`ExecutionContext`] | One node of the run tree: trace, stats, limits, children |
//! | [`CancelCause`] | Why a context was cancelled |
//! | [`StreamHub`] / [`Subscription`] | Streaming pub/sub, one channel per subscriber |

pub mod cancel;
pub mod execution;
pub mod hub;

pub use cancel::CancelCause;
pub use execution::ExecutionContext;
pub use hub::{PublishReport, StreamHub, Subscription};

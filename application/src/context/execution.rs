//! Execution context — the concurrency-safe record of one agent run.
//!
//! An [`ExecutionContext`] is a cheap, cloneable handle to shared state.
//! Contexts form a tree: the root is created at run start, sub-runs are
//! added with [`spawn_child`](ExecutionContext::spawn_child) and finalized
//! with [`complete_child`](ExecutionContext::complete_child).
//!
//! # Locking
//!
//! Each context guards its trace log, stats, children and termination
//! fields with one `RwLock`. Writers take it exclusively, readers share it.
//! No code path holds two contexts' locks at once.
//!
//! Limit evaluation is a second phase that runs after the mutation lock
//! has been released:
//!
//! ```text
//! trace(event)
//!   ├─ [write lock] stamp, aggregate, append      ── released
//!   └─ root.check_limits()
//!        ├─ [read lock] first_violation(limits)   ── released
//!        └─ latch exceeded limit (once) ─▶ cancel(root, cause)
//! ```
//!
//! # Child stats
//!
//! A child's stats are folded into its parent once, when the parent calls
//! `complete_child`. Counters are summed, gauges keep the maximum. Only
//! the root evaluates limits, since only the root sees the folded totals.

use super::cancel::{CancelCause, CancelHandle};
use super::hub::{StreamHub, Subscription};
use crate::config::RunConfig;
use agentctx_domain::{
    ChunkFilter, ExceededLimit, LoopAction, ParseCategory, RunOutcome, StatKey, StatStore,
    StreamChunk, TerminationReason, TraceEntry, TraceEvent, TraceLog, TraceRecord,
    first_violation,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, warn};

struct Termination {
    reason: TerminationReason,
    ended_at: DateTime<Utc>,
}

struct ContextState {
    iteration: u32,
    iteration_started: Option<Instant>,
    log: TraceLog,
    stats: StatStore,
    children: Vec<ExecutionContext>,
    termination: Option<Termination>,
}

struct ContextInner {
    name: String,
    depth: u32,
    path: String,
    parent: Option<Weak<ContextInner>>,
    config: Arc<RunConfig>,
    started_at: DateTime<Utc>,
    state: RwLock<ContextState>,
    exceeded: OnceLock<ExceededLimit>,
    cancel: CancelHandle,
    hub: StreamHub,
    outcome: watch::Sender<Option<RunOutcome>>,
    folded: AtomicBool,
}

/// Shared handle to one node of the run tree.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Create the root context of a run.
    pub fn new(name: impl Into<String>, config: RunConfig) -> Self {
        Self::root(name, Arc::new(config))
    }

    pub fn root(name: impl Into<String>, config: Arc<RunConfig>) -> Self {
        let name = name.into();
        let path = name.clone();
        Self::build(name, 0, path, None, config, CancelHandle::root())
    }

    fn build(
        name: String,
        depth: u32,
        path: String,
        parent: Option<Weak<ContextInner>>,
        config: Arc<RunConfig>,
        cancel: CancelHandle,
    ) -> Self {
        let (outcome, _) = watch::channel(None);
        let hub = StreamHub::new(config.stream_buffer);
        Self {
            inner: Arc::new(ContextInner {
                name,
                depth,
                path,
                parent,
                config,
                started_at: Utc::now(),
                state: RwLock::new(ContextState {
                    iteration: 0,
                    iteration_started: None,
                    log: TraceLog::new(),
                    stats: StatStore::new(),
                    children: Vec::new(),
                    termination: None,
                }),
                exceeded: OnceLock::new(),
                cancel,
                hub,
                outcome,
                folded: AtomicBool::new(false),
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ContextState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ContextState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Identity ====================

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Nesting depth; 0 for the root.
    pub fn depth(&self) -> u32 {
        self.inner.depth
    }

    /// Slash-joined names from the root down to this context.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn config(&self) -> &RunConfig {
        &self.inner.config
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// The parent, if this is a child and the parent is still alive.
    pub fn parent(&self) -> Option<ExecutionContext> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| ExecutionContext { inner })
    }

    /// Topmost live ancestor (or `self`).
    pub fn root_context(&self) -> ExecutionContext {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn ptr_eq(&self, other: &ExecutionContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ==================== Trace ====================

    /// Append an event, aggregate it, then check limits at the root.
    ///
    /// Missing timestamp, iteration and depth stamps are filled in from
    /// this context. An `IterationStart` record begins the next iteration
    /// the same way [`start_iteration`](Self::start_iteration) does.
    pub fn trace(&self, record: impl Into<TraceRecord>) {
        let record = record.into();
        if matches!(record.event, TraceEvent::IterationStart) {
            self.begin_iteration(record);
            return;
        }
        {
            let mut state = self.write_state();
            let iteration = state.iteration;
            let ContextState { log, stats, .. } = &mut *state;
            log.append(record, iteration, self.inner.depth, stats);
        }
        self.check_limits();
    }

    /// Begin the next iteration. Returns its 1-based number.
    pub fn start_iteration(&self) -> u32 {
        self.begin_iteration(TraceEvent::IterationStart.into())
    }

    fn begin_iteration(&self, record: TraceRecord) -> u32 {
        let iteration = {
            let mut state = self.write_state();
            state.iteration += 1;
            state.iteration_started = Some(Instant::now());
            let iteration = state.iteration;
            let ContextState { log, stats, .. } = &mut *state;
            log.append(record, iteration, self.inner.depth, stats);
            iteration
        };
        debug!(context = %self.inner.path, iteration, "iteration started");
        self.check_limits();
        iteration
    }

    /// Close the current iteration, recording the loop's decision.
    pub fn end_iteration(&self, action: LoopAction) {
        let duration_ms = {
            let mut state = self.write_state();
            let duration_ms = state
                .iteration_started
                .take()
                .map(|started| started.elapsed().as_millis() as u64)
                .unwrap_or(0);
            let iteration = state.iteration;
            let ContextState { log, stats, .. } = &mut *state;
            log.append(
                TraceEvent::IterationEnd {
                    action,
                    duration_ms,
                }
                .into(),
                iteration,
                self.inner.depth,
                stats,
            );
            duration_ms
        };
        debug!(context = %self.inner.path, %action, duration_ms, "iteration ended");
        self.check_limits();
    }

    pub fn record_model_call(
        &self,
        model: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        duration: Duration,
        error: Option<String>,
    ) {
        self.trace(TraceEvent::ModelCall {
            model: model.into(),
            input_tokens,
            output_tokens,
            duration_ms: duration.as_millis() as u64,
            error,
        });
    }

    /// Count a parse failure: total, this iteration, and the streak.
    pub fn record_parse_error(&self, category: ParseCategory, message: impl Into<String>) {
        let message = message.into();
        debug!(context = %self.inner.path, %category, %message, "parse error");
        self.trace(TraceEvent::ParseError { category, message });
    }

    /// End the consecutive-error streak for `category`.
    pub fn record_parse_success(&self, category: ParseCategory) {
        self.write_state()
            .stats
            .reset_gauge(&StatKey::ParseErrorStreak(category));
    }

    /// End the consecutive tool-error streaks, overall and for `tool`.
    ///
    /// Tool-call aggregation never resets these itself; the toolchain
    /// calls this after each successful call.
    pub fn reset_tool_error_streak(&self, tool: &str) {
        let mut state = self.write_state();
        state.stats.reset_gauge(&StatKey::ToolErrorStreak);
        state
            .stats
            .reset_gauge(&StatKey::ToolErrorStreakFor(tool.to_string()));
    }

    /// Bump a custom counter outside of any trace event.
    pub fn increment(&self, key: &StatKey, by: u64) -> u64 {
        let value = self.write_state().stats.increment(key, by);
        self.check_limits();
        value
    }

    pub fn set_gauge(&self, key: &StatKey, value: f64) {
        self.write_state().stats.set_gauge(key, value);
        self.check_limits();
    }

    // ==================== Reads ====================

    pub fn iteration(&self) -> u32 {
        self.read_state().iteration
    }

    /// Snapshot of this context's stats.
    pub fn stats(&self) -> StatStore {
        self.read_state().stats.clone()
    }

    pub fn counter(&self, key: &StatKey) -> u64 {
        self.read_state().stats.counter(key)
    }

    pub fn gauge(&self, key: &StatKey) -> f64 {
        self.read_state().stats.gauge(key)
    }

    /// Snapshot of this context's trace entries.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.read_state().log.entries().to_vec()
    }

    pub fn trace_len(&self) -> usize {
        self.read_state().log.len()
    }

    pub fn children(&self) -> Vec<ExecutionContext> {
        self.read_state().children.clone()
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.read_state().termination.as_ref().map(|t| t.reason)
    }

    pub fn is_terminated(&self) -> bool {
        self.read_state().termination.is_some()
    }

    /// Elapsed time until termination, or until now while running.
    pub fn elapsed(&self) -> Duration {
        let end = self
            .read_state()
            .termination
            .as_ref()
            .map(|t| t.ended_at)
            .unwrap_or_else(Utc::now);
        (end - self.inner.started_at).to_std().unwrap_or_default()
    }

    // ==================== Children ====================

    /// Create a sub-run one level deeper.
    ///
    /// The child's cancellation derives from this context's, so cancelling
    /// here always reaches the child.
    pub fn spawn_child(&self, name: impl Into<String>, data: Option<Value>) -> ExecutionContext {
        let name = name.into();
        let child = Self::build(
            name.clone(),
            self.inner.depth + 1,
            format!("{}/{}", self.inner.path, name),
            Some(Arc::downgrade(&self.inner)),
            Arc::clone(&self.inner.config),
            CancelHandle::child_of(&self.inner.cancel),
        );

        self.write_state().children.push(child.clone());
        debug!(parent = %self.inner.path, child = %child.path(), depth = child.depth(), "child spawned");
        self.trace(TraceEvent::ChildSpawn { child: name, data });
        child
    }

    /// Finalize `child`: fold its stats into this context and record the
    /// completion.
    ///
    /// A child that has not terminated yet is terminated first, as
    /// `Cancelled` if its token has tripped and `Completed` otherwise.
    ///
    /// Returns `false` without side effects if `child` is not a child of
    /// this context or has already been completed.
    pub fn complete_child(&self, child: &ExecutionContext) -> bool {
        let is_ours = child
            .parent()
            .map(|parent| parent.ptr_eq(self))
            .unwrap_or(false);
        if !is_ours {
            warn!(parent = %self.inner.path, child = %child.path(), "complete_child called on a foreign context");
            return false;
        }
        if child.inner.folded.swap(true, Ordering::AcqRel) {
            debug!(child = %child.path(), "child already completed");
            return false;
        }

        if !child.is_terminated() {
            let reason = if child.is_cancelled() {
                TerminationReason::Cancelled
            } else {
                TerminationReason::Completed
            };
            child.set_termination(reason, None, None);
        }

        let child_stats = child.stats();
        let reason = child.termination_reason();
        let duration_ms = child.elapsed().as_millis() as u64;

        {
            let mut state = self.write_state();
            state.stats.merge_from(&child_stats);
            let iteration = state.iteration;
            let ContextState { log, stats, .. } = &mut *state;
            log.append(
                TraceEvent::ChildComplete {
                    child: child.name().to_string(),
                    reason,
                    duration_ms,
                }
                .into(),
                iteration,
                self.inner.depth,
                stats,
            );
        }
        debug!(parent = %self.inner.path, child = %child.path(), duration_ms, "child completed");
        self.check_limits();
        true
    }

    // ==================== Limits ====================

    /// Evaluate limits at the root of this tree.
    ///
    /// Runs outside any state lock. Once a limit has tripped the root
    /// never re-evaluates.
    pub fn check_limits(&self) {
        let root = self.root_context();
        root.check_own_limits();
    }

    fn check_own_limits(&self) {
        if self.inner.exceeded.get().is_some() || self.inner.config.limits.is_empty() {
            return;
        }

        let violation = {
            let state = self.read_state();
            first_violation(&self.inner.config.limits, &state.stats)
        };

        let Some(exceeded) = violation else {
            return;
        };
        if self.inner.exceeded.set(exceeded.clone()).is_ok() {
            warn!(
                context = %self.inner.path,
                key = %exceeded.observed_key,
                value = exceeded.observed_value,
                limit = exceeded.limit.max_value,
                "limit exceeded; cancelling run"
            );
            self.inner
                .cancel
                .cancel(CancelCause::LimitExceeded(exceeded));
        }
    }

    /// The limit that tripped for this run tree, if any.
    pub fn exceeded_limit(&self) -> Option<ExceededLimit> {
        self.root_context().inner.exceeded.get().cloned()
    }

    // ==================== Cancellation ====================

    /// Cancel this context and all of its descendants.
    ///
    /// Returns `false` if the context was already cancelled.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let cancelled = self.inner.cancel.cancel(CancelCause::External(reason.clone()));
        if cancelled {
            debug!(context = %self.inner.path, %reason, "context cancelled");
        }
        cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// The cause recorded here or on the nearest cancelled ancestor.
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        if !self.is_cancelled() {
            return None;
        }
        let mut current = Some(self.clone());
        while let Some(context) = current {
            if let Some(cause) = context.inner.cancel.own_cause() {
                return Some(cause.clone());
            }
            current = context.parent();
        }
        None
    }

    /// Resolves once this context is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.cancel.cancelled()
    }

    /// The underlying token, for handing to code that takes one directly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.token().clone()
    }

    // ==================== Termination ====================

    /// Record how this context ended. Only the first call has any effect.
    ///
    /// Publishes a [`RunOutcome`] to [`outcome`](Self::outcome) watchers
    /// and closes this context's streams.
    pub fn set_termination(
        &self,
        reason: TerminationReason,
        result: Option<Value>,
        error: Option<String>,
    ) -> bool {
        let outcome = {
            let mut state = self.write_state();
            if state.termination.is_some() {
                return false;
            }
            let ended_at = Utc::now();
            state.termination = Some(Termination { reason, ended_at });
            RunOutcome {
                name: self.inner.name.clone(),
                depth: self.inner.depth,
                reason,
                result,
                error,
                exceeded_limit: None,
                iterations: state.iteration,
                started_at: self.inner.started_at,
                ended_at,
                stats: state.stats.clone(),
            }
        };
        let outcome = RunOutcome {
            exceeded_limit: self.exceeded_limit(),
            ..outcome
        };

        debug!(context = %self.inner.path, %reason, "run terminated");
        self.inner.outcome.send_replace(Some(outcome));
        self.close_streams();
        true
    }

    /// The published outcome, once terminated.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.inner.outcome.borrow().clone()
    }

    /// Wait until this context terminates.
    pub async fn wait_outcome(&self) -> Option<RunOutcome> {
        let mut rx = self.inner.outcome.subscribe();
        let outcome = rx.wait_for(Option::is_some).await.ok()?;
        outcome.clone()
    }

    // ==================== Streaming ====================

    pub fn subscribe_all(&self) -> Subscription {
        self.inner.hub.subscribe(ChunkFilter::All)
    }

    pub fn subscribe_to_stream(&self, stream_id: impl Into<String>) -> Subscription {
        self.inner.hub.subscribe(ChunkFilter::Stream(stream_id.into()))
    }

    pub fn subscribe_to_topic(&self, topic: impl Into<String>) -> Subscription {
        self.inner.hub.subscribe(ChunkFilter::Topic(topic.into()))
    }

    /// Publish a chunk here and on every ancestor.
    ///
    /// Stamps `source` as `<path>/<iteration>` when absent. Never waits on
    /// a subscriber.
    pub fn emit_chunk(&self, mut chunk: StreamChunk) {
        if chunk.source.is_none() {
            chunk.source = Some(format!("{}/{}", self.inner.path, self.iteration()));
        }

        let mut current = Some(self.clone());
        while let Some(context) = current {
            let report = context.inner.hub.publish(&chunk);
            if report.dropped > 0 {
                warn!(
                    context = %context.inner.path,
                    stream = %chunk.stream_id,
                    dropped = report.dropped,
                    "subscriber full; stream chunk dropped"
                );
                context.increment(&StatKey::StreamDropped, report.dropped as u64);
            }
            current = context.parent();
        }
    }

    pub fn close_streams(&self) {
        self.inner.hub.close();
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("path", &self.inner.path)
            .field("depth", &self.inner.depth)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

//! Cancellation with a cause, derived down the context tree.
//!
//! Each context owns a [`CancellationToken`]; a child's token is
//! `parent.child_token()`, so cancelling any context reaches every
//! descendant. The cause is recorded once, on the context where
//! cancellation was requested; descendants find it by walking up.

use agentctx_domain::ExceededLimit;
use std::sync::OnceLock;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Why a context was cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelCause {
    /// A configured limit tripped at the root.
    LimitExceeded(ExceededLimit),
    /// An external caller aborted (user abort, upstream timeout).
    External(String),
}

impl CancelCause {
    pub fn exceeded_limit(&self) -> Option<&ExceededLimit> {
        match self {
            CancelCause::LimitExceeded(exceeded) => Some(exceeded),
            CancelCause::External(_) => None,
        }
    }
}

impl std::fmt::Display for CancelCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelCause::LimitExceeded(exceeded) => write!(f, "{}", exceeded),
            CancelCause::External(reason) => write!(f, "cancelled: {}", reason),
        }
    }
}

/// A cancellation token plus the write-once cause recorded on it.
#[derive(Debug)]
pub(crate) struct CancelHandle {
    token: CancellationToken,
    cause: OnceLock<CancelCause>,
}

impl CancelHandle {
    pub(crate) fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            cause: OnceLock::new(),
        }
    }

    pub(crate) fn child_of(parent: &CancelHandle) -> Self {
        Self {
            token: parent.token.child_token(),
            cause: OnceLock::new(),
        }
    }

    /// Record `cause` and trip the token.
    ///
    /// Returns `false` if this token was already cancelled, in which case the
    /// earlier cause (here or on an ancestor) stands.
    pub(crate) fn cancel(&self, cause: CancelCause) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let recorded = self.cause.set(cause).is_ok();
        self.token.cancel();
        recorded
    }

    /// Cause recorded on this handle itself, not on ancestors.
    pub(crate) fn own_cause(&self) -> Option<&CancelCause> {
        self.cause.get()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_cancel_reaches_child() {
        let parent = CancelHandle::root();
        let child = CancelHandle::child_of(&parent);
        let grandchild = CancelHandle::child_of(&child);

        assert!(parent.cancel(CancelCause::External("user abort".into())));
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
        assert!(child.own_cause().is_none());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = CancelHandle::root();
        let child = CancelHandle::child_of(&parent);
        assert!(child.cancel(CancelCause::External("sub-agent timeout".into())));
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_first_cause_wins() {
        let handle = CancelHandle::root();
        assert!(handle.cancel(CancelCause::External("first".into())));
        assert!(!handle.cancel(CancelCause::External("second".into())));
        assert_eq!(
            handle.own_cause(),
            Some(&CancelCause::External("first".into()))
        );
    }
}

//! Decides whether a failed attempt is worth repeating.

use crate::error::{Error, ErrorKind};

/// Classifier hook consulted by the task handler after each failed attempt.
///
/// Fatal and terminal errors are never retried, whatever the policy says.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, err: &Error) -> bool;
}

/// Retry every attempt failure, transient or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryAll;

impl RetryPolicy for RetryAll {
    fn should_retry(&self, _err: &Error) -> bool {
        true
    }
}

/// Retry only timeouts. A missing element or a throwing evaluator ends the
/// scrape on the first failure instead of burning the whole timeout budget
/// again.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientOnly;

impl RetryPolicy for TransientOnly {
    fn should_retry(&self, err: &Error) -> bool {
        err.kind() == ErrorKind::Transient
    }
}

pub(crate) fn is_retryable(policy: &dyn RetryPolicy, err: &Error) -> bool {
    match err.kind() {
        ErrorKind::Fatal | ErrorKind::Terminal => false,
        ErrorKind::Transient | ErrorKind::Deterministic => policy.should_retry(err),
    }
}

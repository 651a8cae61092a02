use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Browser launch failed: {0}")]
    SessionInit(String),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {timeout:?} waiting for selector: {selector}")]
    ElementWaitTimeout { selector: String, timeout: Duration },

    #[error("Evaluation of `{key}` failed: {message}")]
    Evaluation { key: String, message: String },

    #[error("Exceeded retry limit of {max_retries} after {attempts} attempt(s): {source}")]
    RetryLimitExceeded {
        max_retries: u32,
        attempts: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("Scraper: {0}")]
    Scrape(#[source] Box<Error>),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a failure is treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeouts; worth another attempt.
    Transient,
    /// Failures that will most likely repeat on retry (bad URL, evaluator threw).
    Deterministic,
    /// The session cannot serve pages. Never retried.
    Fatal,
    /// The invocation is over.
    Terminal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NavigationTimeout { .. } | Error::ElementWaitTimeout { .. } => {
                ErrorKind::Transient
            }
            Error::Navigation(_) | Error::Evaluation { .. } | Error::Cdp(_) | Error::Io(_) => {
                ErrorKind::Deterministic
            }
            Error::SessionInit(_) | Error::SessionClosed => ErrorKind::Fatal,
            Error::RetryLimitExceeded { .. } | Error::Scrape(_) => ErrorKind::Terminal,
        }
    }

    /// True if this error, or the error it wraps, reports an exhausted retry budget.
    pub fn is_retry_limit(&self) -> bool {
        match self {
            Error::RetryLimitExceeded { .. } => true,
            Error::Scrape(inner) => inner.is_retry_limit(),
            _ => false,
        }
    }

    /// The error that caused the last failed attempt, if this is a retry-limit error.
    pub fn last_attempt_error(&self) -> Option<&Error> {
        match self {
            Error::RetryLimitExceeded { source, .. } => Some(source),
            Error::Scrape(inner) => inner.last_attempt_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_timeout() -> Error {
        Error::ElementWaitTimeout {
            selector: "span".into(),
            timeout: Duration::from_millis(10),
        }
    }

    #[test]
    fn timeouts_are_transient() {
        assert_eq!(wait_timeout().kind(), ErrorKind::Transient);
        let nav = Error::NavigationTimeout {
            url: "http://127.0.0.1:8080".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(nav.kind(), ErrorKind::Transient);
    }

    #[test]
    fn session_errors_are_fatal() {
        assert_eq!(Error::SessionClosed.kind(), ErrorKind::Fatal);
        assert_eq!(Error::SessionInit("no chrome".into()).kind(), ErrorKind::Fatal);
    }

    #[test]
    fn retry_limit_is_visible_through_wrapper() {
        let err = Error::Scrape(Box::new(Error::RetryLimitExceeded {
            max_retries: 1,
            attempts: 2,
            source: Box::new(wait_timeout()),
        }));
        assert!(err.is_retry_limit());
        assert_eq!(err.kind(), ErrorKind::Terminal);
        assert!(matches!(
            err.last_attempt_error(),
            Some(Error::ElementWaitTimeout { .. })
        ));

        let msg = err.to_string();
        assert!(msg.starts_with("Scraper: Exceeded retry limit of 1"), "{msg}");
        assert!(msg.contains("span"), "{msg}");
    }

    #[test]
    fn plain_errors_are_not_retry_limit() {
        assert!(!Error::SessionClosed.is_retry_limit());
        assert!(Error::Scrape(Box::new(Error::SessionClosed)).last_attempt_error().is_none());
    }
}

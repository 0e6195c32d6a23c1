//! Error taxonomy for the orchestration core.
//!
//! Propagation policy: field-level absence never escalates to record-level
//! failure, record-level failure never escalates past the pipeline, and the
//! only error class that aborts a whole batch is `Authentication`.

use thiserror::Error;

use crate::infrastructure::browser::DriverError;

/// What class of transient failure occurred. Drives the retry decision and
/// the log line, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverableKind {
    /// Navigation or element wait exceeded the configured timeout.
    Timeout,
    /// Transient navigation/network failure (connection reset, 5xx, stale page).
    Navigation,
    /// The site answered with a rate-limit response.
    RateLimited,
    /// The session expired and was detected mid-extraction.
    SessionExpired,
}

impl RecoverableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Navigation => "navigation",
            Self::RateLimited => "rate-limited",
            Self::SessionExpired => "session-expired",
        }
    }
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Credentials rejected or the manual login window ran out. Fatal to the
    /// batch: without a session no further progress is possible.
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    /// Transient failure. Retried up to the configured maximum, then
    /// downgraded to a per-record failure.
    #[error("{} while {context}: {message}", kind.as_str())]
    Recoverable {
        kind: RecoverableKind,
        context: String,
        message: String,
    },

    /// The company has no acceptable match on the site. Recorded
    /// immediately, consumes no retries.
    #[error("company not found: {name}")]
    NotFound { name: String },
}

impl ScrapeError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    pub fn recoverable(
        kind: RecoverableKind,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Recoverable {
            kind,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }

    pub fn recoverable_kind(&self) -> Option<RecoverableKind> {
        match self {
            Self::Recoverable { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Classify a driver failure seen while doing `context`. Everything a
    /// driver can report is transient from the batch's point of view; only
    /// the session manager produces fatal errors.
    pub fn from_driver(err: DriverError, context: impl Into<String>) -> Self {
        let kind = match &err {
            DriverError::Timeout { .. } => RecoverableKind::Timeout,
            DriverError::Http { status: 429, .. } => RecoverableKind::RateLimited,
            _ => RecoverableKind::Navigation,
        };
        Self::Recoverable {
            kind,
            context: context.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_timeouts_classify_as_recoverable_timeout() {
        let err = ScrapeError::from_driver(
            DriverError::Timeout {
                what: "navigation".to_string(),
            },
            "loading profile",
        );
        assert!(err.is_recoverable());
        assert_eq!(err.recoverable_kind(), Some(RecoverableKind::Timeout));
    }

    #[test]
    fn rate_limit_status_classifies_as_rate_limited() {
        let err = ScrapeError::from_driver(
            DriverError::Http {
                status: 429,
                url: "https://example.com".to_string(),
            },
            "search",
        );
        assert_eq!(err.recoverable_kind(), Some(RecoverableKind::RateLimited));
    }

    #[test]
    fn not_found_and_authentication_are_not_recoverable() {
        assert!(!ScrapeError::not_found("GhostCorp").is_recoverable());
        assert!(!ScrapeError::authentication("bad credentials").is_recoverable());
    }
}

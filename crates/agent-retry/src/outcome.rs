use crate::error::{Error, ErrorKind, Result};
use std::fmt;
use std::time::Duration;

/// Terminal state of a retried request.
#[derive(Debug)]
pub enum RequestOutcome<T> {
    /// An attempt drained its stream without error.
    Success {
        /// Every item the successful attempt produced, in order
        items: Vec<T>,
        /// Attempts made, including the successful one
        attempts: u32,
    },
    /// Attempts ran out, or an unclassified error stopped the call.
    Failure {
        /// The last error encountered
        error: Error,
        /// Attempts made
        attempts: u32,
    },
    /// A non-retryable error, reported after the attempt that raised it.
    Fatal {
        /// The fatal error
        error: Error,
        /// Attempts made
        attempts: u32,
    },
    /// The deadline fired during an attempt or before a retry.
    Timeout {
        /// Attempts started before the deadline fired
        attempts: u32,
        /// Time spent in the call
        elapsed: Duration,
    },
}

/// Discriminant of [`RequestOutcome`], handy for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// See [`RequestOutcome::Success`]
    Success,
    /// See [`RequestOutcome::Failure`]
    Failure,
    /// See [`RequestOutcome::Fatal`]
    Fatal,
    /// See [`RequestOutcome::Timeout`]
    Timeout,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Failure => "failure",
            OutcomeKind::Fatal => "fatal",
            OutcomeKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

impl<T> RequestOutcome<T> {
    /// Which terminal state this is.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            RequestOutcome::Success { .. } => OutcomeKind::Success,
            RequestOutcome::Failure { .. } => OutcomeKind::Failure,
            RequestOutcome::Fatal { .. } => OutcomeKind::Fatal,
            RequestOutcome::Timeout { .. } => OutcomeKind::Timeout,
        }
    }

    /// Number of attempts made before reaching this state.
    pub fn attempts(&self) -> u32 {
        match self {
            RequestOutcome::Success { attempts, .. }
            | RequestOutcome::Failure { attempts, .. }
            | RequestOutcome::Fatal { attempts, .. }
            | RequestOutcome::Timeout { attempts, .. } => *attempts,
        }
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }

    /// The error behind a `Failure` or `Fatal` outcome.
    pub fn error(&self) -> Option<&Error> {
        match self {
            RequestOutcome::Failure { error, .. } | RequestOutcome::Fatal { error, .. } => {
                Some(error)
            }
            _ => None,
        }
    }

    /// Kind of the error behind the outcome, `Timeout` for a timed-out call.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            RequestOutcome::Timeout { .. } => Some(ErrorKind::Timeout),
            _ => self.error().map(Error::kind),
        }
    }

    /// Convert into a plain result, surfacing the last error encountered.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self {
            RequestOutcome::Success { items, .. } => Ok(items),
            RequestOutcome::Failure { error, .. } | RequestOutcome::Fatal { error, .. } => {
                Err(error)
            }
            RequestOutcome::Timeout { elapsed, .. } => Err(Error::Timeout(elapsed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let success: RequestOutcome<u8> = RequestOutcome::Success {
            items: vec![1, 2],
            attempts: 2,
        };
        assert!(success.is_success());
        assert_eq!(success.kind(), OutcomeKind::Success);
        assert_eq!(success.attempts(), 2);
        assert!(success.error_kind().is_none());
        assert_eq!(success.into_result().unwrap(), vec![1, 2]);

        let failure: RequestOutcome<u8> = RequestOutcome::Failure {
            error: Error::Process {
                exit_code: Some(1),
                stderr: "x".to_string(),
            },
            attempts: 3,
        };
        assert_eq!(failure.error_kind(), Some(ErrorKind::Transient));
        assert!(matches!(
            failure.into_result(),
            Err(Error::Process { exit_code: Some(1), .. })
        ));

        let timeout: RequestOutcome<u8> = RequestOutcome::Timeout {
            attempts: 1,
            elapsed: Duration::from_secs(30),
        };
        assert_eq!(timeout.kind().to_string(), "timeout");
        assert_eq!(timeout.error_kind(), Some(ErrorKind::Timeout));
        assert!(matches!(timeout.into_result(), Err(Error::Timeout(_))));
    }
}

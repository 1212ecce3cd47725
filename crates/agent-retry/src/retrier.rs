//! Bounded retries with exponential backoff and a call deadline.
//!
//! ```text
//! Idle → Attempting ─┬─ drained ──────────────→ Success
//!                    ├─ transient, budget left → RetryWaiting → Attempting
//!                    ├─ transient, budget gone → Failure
//!                    ├─ unknown error ─────────→ Failure
//!                    ├─ fatal error ───────────→ Fatal
//!                    └─ deadline ──────────────→ Timeout
//! ```
//!
//! The deadline is checked before every wait: an in-flight attempt is
//! dropped when it fires, and a backoff that would reach it is not started.

use crate::deadline::Deadline;
use crate::error::{Error, ErrorKind, Result};
use crate::message::Message;
use crate::options::AgentOptions;
use crate::outcome::RequestOutcome;
use crate::policy::RetryPolicy;
use crate::query::AgentQuery;
use futures::{Stream, TryStreamExt};
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, warn};

enum RetryState<T> {
    Attempting { attempt: u32 },
    RetryWaiting { next_attempt: u32, delay: Duration },
    Finished(RequestOutcome<T>),
}

/// Runs a streaming request under a [`RetryPolicy`] and a [`Deadline`].
///
/// The retrier holds no per-call state, so one instance can serve any
/// number of concurrent calls.
#[derive(Debug, Clone)]
pub struct RequestRetrier {
    operation: String,
}

impl Default for RequestRetrier {
    fn default() -> Self {
        Self::new("request")
    }
}

impl RequestRetrier {
    /// Create a retrier; `operation` names the call in log output.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Name used in log output.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Execute `request_fn` until it succeeds, fails for good, or the
    /// deadline fires.
    ///
    /// Each attempt calls `request_fn` for a fresh stream and drains it. An
    /// error item ends the attempt and is classified with
    /// [`Error::kind`]. Only transient errors are retried.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use agent_retry::{Deadline, RequestRetrier, RetryPolicy};
    /// use futures::stream;
    /// use std::time::Duration;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let retrier = RequestRetrier::new("example");
    /// let policy = RetryPolicy::new(3, Duration::from_millis(10)).unwrap();
    /// let outcome = retrier
    ///     .execute(
    ///         || stream::iter(vec![Ok::<_, agent_retry::Error>(1), Ok(2)]),
    ///         &policy,
    ///         Deadline::after(Duration::from_secs(5)),
    ///     )
    ///     .await;
    /// assert_eq!(outcome.into_result().unwrap(), vec![1, 2]);
    /// # }
    /// ```
    pub async fn execute<F, S, T>(
        &self,
        mut request_fn: F,
        policy: &RetryPolicy,
        deadline: Deadline,
    ) -> RequestOutcome<T>
    where
        F: FnMut() -> S,
        S: Stream<Item = Result<T>>,
    {
        let started = Instant::now();

        if deadline.is_expired() {
            warn!(operation = %self.operation, "Deadline already passed, not attempting");
            return RequestOutcome::Timeout {
                attempts: 0,
                elapsed: Duration::ZERO,
            };
        }

        let mut state = RetryState::Attempting { attempt: 1 };
        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    debug!(
                        operation = %self.operation,
                        attempt,
                        max_attempts = policy.max_attempts(),
                        "Starting attempt"
                    );
                    let drained = timeout_at(
                        deadline.instant(),
                        request_fn().try_collect::<Vec<T>>(),
                    )
                    .await;

                    match drained {
                        Ok(Ok(items)) => {
                            if attempt > 1 {
                                debug!(
                                    operation = %self.operation,
                                    "Succeeded on attempt {} after {} previous failures",
                                    attempt,
                                    attempt - 1
                                );
                            }
                            RetryState::Finished(RequestOutcome::Success {
                                items,
                                attempts: attempt,
                            })
                        }
                        Ok(Err(error)) => {
                            self.after_failure(error, attempt, policy, &deadline, started)
                        }
                        Err(_) => {
                            error!(
                                operation = %self.operation,
                                attempt,
                                "Deadline reached during attempt"
                            );
                            RetryState::Finished(RequestOutcome::Timeout {
                                attempts: attempt,
                                elapsed: started.elapsed(),
                            })
                        }
                    }
                }
                RetryState::RetryWaiting {
                    next_attempt,
                    delay,
                } => {
                    sleep(delay).await;
                    RetryState::Attempting {
                        attempt: next_attempt,
                    }
                }
                RetryState::Finished(outcome) => return outcome,
            };
        }
    }

    fn after_failure<T>(
        &self,
        error: Error,
        attempt: u32,
        policy: &RetryPolicy,
        deadline: &Deadline,
        started: Instant,
    ) -> RetryState<T> {
        match error.kind() {
            ErrorKind::Transient if attempt >= policy.max_attempts() => {
                error!(
                    operation = %self.operation,
                    "All {} attempts failed: {}",
                    policy.max_attempts(),
                    error
                );
                RetryState::Finished(RequestOutcome::Failure {
                    error,
                    attempts: attempt,
                })
            }
            ErrorKind::Transient => {
                let delay = policy.delay_before(attempt + 1);
                if deadline.would_exceed(delay) {
                    error!(
                        operation = %self.operation,
                        attempt,
                        ?delay,
                        "Backoff would pass the deadline: {}",
                        error
                    );
                    return RetryState::Finished(RequestOutcome::Timeout {
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    });
                }
                warn!(
                    operation = %self.operation,
                    "Attempt {} failed, retrying in {:?}: {}",
                    attempt,
                    delay,
                    error
                );
                RetryState::RetryWaiting {
                    next_attempt: attempt + 1,
                    delay,
                }
            }
            ErrorKind::Fatal => {
                error!(
                    operation = %self.operation,
                    "Non-retryable error on attempt {}: {}",
                    attempt,
                    error
                );
                RetryState::Finished(RequestOutcome::Fatal {
                    error,
                    attempts: attempt,
                })
            }
            ErrorKind::Timeout => RetryState::Finished(RequestOutcome::Timeout {
                attempts: attempt,
                elapsed: started.elapsed(),
            }),
            ErrorKind::Unknown => {
                error!(
                    operation = %self.operation,
                    "Unexpected error on attempt {}: {}",
                    attempt,
                    error
                );
                RetryState::Finished(RequestOutcome::Failure {
                    error,
                    attempts: attempt,
                })
            }
        }
    }

    /// Run one agent query under the policy and deadline.
    ///
    /// Options are validated first; invalid options end the call as
    /// `Fatal` without querying the agent.
    pub async fn query(
        &self,
        agent: &dyn AgentQuery,
        prompt: &str,
        options: &AgentOptions,
        policy: &RetryPolicy,
        deadline: Deadline,
    ) -> RequestOutcome<Message> {
        if let Err(error) = options.validate() {
            error!(operation = %self.operation, "Rejected agent options: {}", error);
            return RequestOutcome::Fatal { error, attempts: 0 };
        }
        self.execute(|| agent.query(prompt, options), policy, deadline)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::cell::Cell;

    fn transient() -> Error {
        Error::Process {
            exit_code: Some(1),
            stderr: "temporary".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_exhaust_budget() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(4, Duration::from_millis(100)).unwrap();

        let outcome = RequestRetrier::new("test")
            .execute(
                || {
                    calls.set(calls.get() + 1);
                    stream::iter(vec![Err::<(), _>(transient())])
                },
                &policy,
                Deadline::after(Duration::from_secs(60)),
            )
            .await;

        assert_eq!(calls.get(), 4);
        assert!(matches!(
            outcome,
            RequestOutcome::Failure {
                error: Error::Process { .. },
                attempts: 4
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_error_is_not_retried() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(3, Duration::from_millis(100)).unwrap();

        let outcome = RequestRetrier::new("test")
            .execute(
                || {
                    calls.set(calls.get() + 1);
                    stream::iter(vec![Err::<(), _>(Error::Other("odd".to_string()))])
                },
                &policy,
                Deadline::after(Duration::from_secs(60)),
            )
            .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(
            outcome,
            RequestOutcome::Failure {
                error: Error::Other(_),
                attempts: 1
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_skips_request() {
        let calls = Cell::new(0u32);
        let deadline = Deadline::after(Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        let outcome = RequestRetrier::default()
            .execute(
                || {
                    calls.set(calls.get() + 1);
                    stream::iter(vec![Ok::<_, Error>(1)])
                },
                &RetryPolicy::default(),
                deadline,
            )
            .await;

        assert_eq!(calls.get(), 0);
        assert!(matches!(outcome, RequestOutcome::Timeout { attempts: 0, .. }));
    }
}

//! Retry policy and backoff schedule.

use crate::error::{Error, Result};
use std::time::Duration;

/// Attempt budget and backoff base for a single call.
///
/// The delay before attempt `k` (for `k > 1`) is `base_delay * 2^(k-2)`:
/// one base delay before the second attempt, two before the third, and so
/// on. There is no cap; the call deadline bounds the total wait instead.
///
/// # Examples
///
/// ```rust
/// use agent_retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_secs(1)).unwrap();
/// assert_eq!(policy.delay_before(2), Duration::from_secs(1));
/// assert_eq!(policy.delay_before(3), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy, rejecting a zero attempt budget or a zero base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if base_delay.is_zero() {
            return Err(Error::Config("base delay must be greater than zero".to_string()));
        }
        Ok(Self {
            max_attempts,
            base_delay,
        })
    }

    /// Create a policy from a base delay expressed in (fractional) seconds.
    pub fn from_secs_f64(max_attempts: u32, base_delay_secs: f64) -> Result<Self> {
        if !base_delay_secs.is_finite() || base_delay_secs <= 0.0 {
            return Err(Error::Config(format!(
                "base delay must be a positive number of seconds (got {})",
                base_delay_secs
            )));
        }
        let base_delay = Duration::try_from_secs_f64(base_delay_secs)
            .map_err(|e| Error::Config(format!("base delay out of range: {}", e)))?;
        Self::new(max_attempts, base_delay)
    }

    /// Maximum number of attempts, always at least 1.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the second attempt.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay to wait before starting `attempt` (1-based).
    ///
    /// The first attempt starts immediately. Overflow saturates at
    /// `Duration::MAX`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        2u32.checked_pow(attempt - 2)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_invalid_policies() {
        assert!(matches!(
            RetryPolicy::new(0, Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RetryPolicy::new(3, Duration::ZERO),
            Err(Error::Config(_))
        ));
        assert!(RetryPolicy::from_secs_f64(3, -1.0).is_err());
        assert!(RetryPolicy::from_secs_f64(3, f64::NAN).is_err());
        assert!(RetryPolicy::from_secs_f64(3, f64::INFINITY).is_err());
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::from_secs_f64(5, 0.5).unwrap();

        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_secs(1));
        assert_eq!(policy.delay_before(4), Duration::from_secs(2));
        assert_eq!(policy.delay_before(5), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1)).unwrap();
        assert_eq!(policy.delay_before(80), Duration::MAX);
    }

    proptest! {
        #[test]
        fn delay_doubles_between_attempts(
            base_ms in 1u64..10_000,
            attempt in 2u32..20,
        ) {
            let policy = RetryPolicy::new(attempt + 1, Duration::from_millis(base_ms)).unwrap();
            let expected = Duration::from_millis(base_ms) * 2u32.pow(attempt - 2);
            prop_assert_eq!(policy.delay_before(attempt), expected);
            prop_assert_eq!(policy.delay_before(attempt + 1), expected * 2);
        }
    }
}

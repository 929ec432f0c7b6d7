//! Bounded retry driver for connection establishment.

use std::{fmt::Display, str::FromStr, time::Duration};

use tracing::warn;

/// Delay progression between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The configured delay is used verbatim between every attempt.
    Fixed,
    /// The configured delay doubles after each failed attempt.
    Exponential,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!(
                "unknown backoff `{other}`, expected `fixed` or `exponential`"
            )),
        }
    }
}

/// How often and how patiently an operation is re-attempted.
///
/// `attempts` counts retries after the initial try: a policy with
/// `attempts = N` drives exactly `N + 1` invocations before giving up.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn total_attempts(&self) -> u32 {
        self.attempts.saturating_add(1)
    }

    /// Delay to sleep after the given 1-based failed attempt.
    fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                self.delay.checked_mul(factor).unwrap_or(Duration::MAX)
            }
        }
    }
}

/// Drive `op` until it succeeds or the policy is exhausted, returning the
/// final error untouched. Every failed attempt is logged.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total = policy.total_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= total => {
                warn!(
                    target = "telaio::retry",
                    what,
                    attempt,
                    total,
                    error = %err,
                    "giving up",
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    target = "telaio::retry",
                    what,
                    attempt,
                    total,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying",
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    #[tokio::test]
    async fn persistent_failure_tries_exactly_attempts_plus_one() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), &str> = with_retry(&policy(3), "always failing", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err("unreachable") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), &str> = with_retry(&policy(0), "always failing", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err("unreachable") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_stops_further_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<u32, &str> = with_retry(&policy(5), "flaky", || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { if n < 3 { Err("not yet") } else { Ok(n) } }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exponential_backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            attempts: 4,
            delay: Duration::from_millis(100),
            backoff: Backoff::Exponential,
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = RetryPolicy {
            attempts: 4,
            delay: Duration::from_millis(250),
            backoff: Backoff::Fixed,
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(3), Duration::from_millis(250));
    }

    #[test]
    fn backoff_parses_known_values() {
        assert_eq!(Backoff::from_str("fixed"), Ok(Backoff::Fixed));
        assert_eq!(Backoff::from_str("exponential"), Ok(Backoff::Exponential));
        assert!(Backoff::from_str("fibonacci").is_err());
    }
}

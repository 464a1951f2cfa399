//! ---
//! np_section: "07-resilience"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Retry policy and retry driver."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Doubling stops growing after this many steps; `max_delay` caps it earlier in practice.
const MAX_EXPONENT: u32 = 16;

/// Bounds on how often and how patiently an operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never below 1.
    pub max_attempts: usize,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Ceiling applied to the exponential delay before jitter.
    pub max_delay: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Build a policy; `max_attempts` is raised to 1 and `max_delay` to `base_delay`.
    pub fn new(
        max_attempts: usize,
        base_delay: Duration,
        max_delay: Duration,
        jitter: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter,
        }
    }

    /// Policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Deterministic part of the delay after failed `attempt` (1-indexed):
    /// `base_delay * 2^(attempt-1)` capped at `max_delay`.
    pub fn capped_delay(&self, attempt: usize) -> Duration {
        let exponent = (attempt.saturating_sub(1) as u32).min(MAX_EXPONENT);
        self.base_delay
            .checked_mul(1_u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Full delay after failed `attempt`, including jitter.
    pub fn backoff_delay<R: Rng + ?Sized>(&self, attempt: usize, rng: &mut R) -> Duration {
        let base = self.capped_delay(attempt);
        if self.jitter.is_zero() {
            base
        } else {
            let jitter_ms = rng.gen_range(0..=self.jitter.as_millis().max(1)) as u64;
            base + Duration::from_millis(jitter_ms)
        }
    }

    /// Longest total time spent sleeping when every attempt fails.
    pub fn worst_case_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.capped_delay(attempt) + self.jitter)
            .sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            4,
            Duration::from_millis(500),
            Duration::from_millis(8_000),
            Duration::from_millis(100),
        )
    }
}

/// Why a retried operation ultimately gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The error was classified as not worth retrying.
    #[error("permanent failure after {attempts} attempt(s): {error}")]
    Permanent {
        /// Error returned by the final attempt.
        error: E,
        /// Attempts made, including the failing one.
        attempts: usize,
    },
    /// Every allowed attempt failed transiently.
    #[error("gave up after {attempts} attempt(s): {error}")]
    Exhausted {
        /// Error returned by the final attempt.
        error: E,
        /// Attempts made; equals the policy ceiling.
        attempts: usize,
    },
    /// Shutdown arrived while waiting to retry.
    #[error("abandoned on shutdown after {attempts} attempt(s): {error}")]
    Abandoned {
        /// Error returned by the last attempt before shutdown.
        error: E,
        /// Attempts made before abandoning.
        attempts: usize,
    },
}

impl<E> RetryError<E> {
    /// Attempts made before giving up.
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Permanent { attempts, .. }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::Abandoned { attempts, .. } => *attempts,
        }
    }

    /// Borrow the last underlying error.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Permanent { error, .. }
            | RetryError::Exhausted { error, .. }
            | RetryError::Abandoned { error, .. } => error,
        }
    }
}

/// Result of driving an operation through a [`Retrier`].
#[derive(Debug)]
pub struct RetryReport<T, E> {
    /// Attempts made, successful or not.
    pub attempts: usize,
    /// Final value or the reason for giving up.
    pub result: Result<T, RetryError<E>>,
}

impl<T, E> RetryReport<T, E> {
    /// Attempts beyond the first.
    pub fn retries(&self) -> usize {
        self.attempts.saturating_sub(1)
    }

    /// Whether the operation eventually succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives an async operation under a [`RetryPolicy`], owning the jitter RNG.
#[derive(Debug)]
pub struct Retrier {
    policy: RetryPolicy,
    rng: StdRng,
}

impl Retrier {
    /// Create a retrier whose jitter is seeded from entropy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed the jitter RNG for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Active policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails permanently, exhausts the
    /// policy, or `shutdown` fires during a backoff sleep.
    ///
    /// The closure receives the 1-indexed attempt number. Shutdown is only
    /// observed between attempts, so an attempt in flight always completes.
    pub async fn run<T, E, F, Fut, C>(
        &mut self,
        label: &str,
        mut operation: F,
        is_transient: C,
        mut shutdown: Option<&mut broadcast::Receiver<()>>,
    ) -> RetryReport<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => {
                    debug!(target: "netpulse::resilience::retry", label, attempt, "attempt succeeded");
                    return RetryReport {
                        attempts: attempt,
                        result: Ok(value),
                    };
                }
                Err(error) => error,
            };

            if !is_transient(&error) {
                warn!(
                    target: "netpulse::resilience::retry",
                    label,
                    attempt,
                    error = %error,
                    "permanent failure; not retrying",
                );
                return RetryReport {
                    attempts: attempt,
                    result: Err(RetryError::Permanent {
                        error,
                        attempts: attempt,
                    }),
                };
            }
            if attempt >= max_attempts {
                warn!(
                    target: "netpulse::resilience::retry",
                    label,
                    attempt,
                    error = %error,
                    "retry budget exhausted",
                );
                return RetryReport {
                    attempts: attempt,
                    result: Err(RetryError::Exhausted {
                        error,
                        attempts: attempt,
                    }),
                };
            }

            let delay = self.policy.backoff_delay(attempt, &mut self.rng);
            warn!(
                target: "netpulse::resilience::retry",
                label,
                attempt,
                max_attempts,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "transient failure; backing off",
            );
            let interrupted = match shutdown.as_deref_mut() {
                Some(rx) => tokio::select! {
                    _ = sleep(delay) => false,
                    _ = rx.recv() => true,
                },
                None => {
                    sleep(delay).await;
                    false
                }
            };
            if interrupted {
                return RetryReport {
                    attempts: attempt,
                    result: Err(RetryError::Abandoned {
                        error,
                        attempts: attempt,
                    }),
                };
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Failure {
        Flaky,
        Fatal,
    }

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn transient(failure: &Failure) -> bool {
        *failure == Failure::Flaky
    }

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(10),
            Duration::from_millis(40),
            Duration::ZERO,
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = fast_policy(6);
        let delays: Vec<u128> = (1..=5).map(|a| policy.capped_delay(a).as_millis()).collect();
        assert_eq!(delays, vec![10, 20, 40, 40, 40]);
        assert_eq!(policy.capped_delay(10_000), Duration::from_millis(40));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = RetryPolicy::new(
            3,
            Duration::from_millis(100),
            Duration::from_secs(1),
            Duration::from_millis(25),
        );
        let mut rng = StdRng::seed_from_u64(3);
        for attempt in 1..=3 {
            let delay = policy.backoff_delay(attempt, &mut rng);
            let floor = policy.capped_delay(attempt);
            assert!(delay >= floor && delay <= floor + Duration::from_millis(25));
        }
    }

    #[test]
    fn constructor_clamps_degenerate_values() {
        let policy = RetryPolicy::new(0, Duration::from_secs(2), Duration::from_secs(1), Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_delay, Duration::from_secs(2));
        assert_eq!(RetryPolicy::no_retry().worst_case_backoff(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_before_ceiling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut retrier = Retrier::new(fast_policy(4)).with_seed(1);
        let report = retrier
            .run(
                "flaky",
                move |attempt| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 3 {
                            Err(Failure::Flaky)
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                transient,
                None,
            )
            .await;
        assert_eq!(report.attempts, 3);
        assert_eq!(report.retries(), 2);
        assert_eq!(report.result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_exactly_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut retrier = Retrier::new(fast_policy(4));
        let report: RetryReport<(), Failure> = retrier
            .run(
                "down",
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(Failure::Flaky) }
                },
                transient,
                None,
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match report.result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let mut retrier = Retrier::new(fast_policy(5));
        let report: RetryReport<(), Failure> = retrier
            .run("rejected", |_| async { Err(Failure::Fatal) }, transient, None)
            .await;
        assert_eq!(report.attempts, 1);
        assert!(matches!(report.result, Err(RetryError::Permanent { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_at_backoff_boundary() {
        let (tx, mut rx) = broadcast::channel(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut retrier = Retrier::new(RetryPolicy::new(
            5,
            Duration::from_secs(30),
            Duration::from_secs(60),
            Duration::ZERO,
        ));
        tx.send(()).unwrap();
        let report: RetryReport<(), Failure> = retrier
            .run(
                "stopping",
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(Failure::Flaky) }
                },
                transient,
                Some(&mut rx),
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let err = report.result.unwrap_err();
        assert!(matches!(err, RetryError::Abandoned { attempts: 1, .. }));
        assert_eq!(*err.last_error(), Failure::Flaky);
    }
}

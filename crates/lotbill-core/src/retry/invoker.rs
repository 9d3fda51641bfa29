//! Retry with exponential backoff and full jitter.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use rand_core::{OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, warn};

use super::classify::{classify, ErrorKind, FailureSignal};

/// Retry tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first try. Never below 1.
    pub max_attempts: u32,
    /// Backoff before the second attempt, doubled for each later one.
    pub base_delay: Duration,
    /// HTTP statuses retried regardless of classification.
    pub extra_transient_statuses: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(300),
            extra_transient_statuses: BTreeSet::new(),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that tries once.
    pub fn no_retry() -> Self {
        Self::new().with_max_attempts(1)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_transient_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.extra_transient_statuses.extend(statuses);
        self
    }

    /// Exponential term for a zero-based retry index: `base_delay * 2^index`.
    pub fn backoff(&self, index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(index.min(31)))
    }

    /// Whether a failure of `kind` with `status` should be retried.
    ///
    /// Extra statuses can make terminal kinds retryable, except authentication.
    pub fn is_transient(&self, kind: ErrorKind, status: Option<u16>) -> bool {
        if kind == ErrorKind::Authentication {
            return false;
        }
        kind.is_transient()
            || status.is_some_and(|s| self.extra_transient_statuses.contains(&s))
    }
}

/// Diagnostics for a call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Attempts made, including the failing one.
    pub attempts: u32,
    /// Classification of the last failure.
    pub kind: ErrorKind,
    /// Whether the last failure was considered transient.
    pub transient: bool,
    /// Waits slept between attempts, in order.
    pub schedule: Vec<Duration>,
}

/// The last error of a failed call, unchanged, with retry diagnostics.
#[derive(Error, Debug)]
#[error("{source} ({} after {} attempt(s))", .outcome.kind, .outcome.attempts)]
pub struct RetryError<E> {
    pub source: E,
    pub outcome: RetryOutcome,
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        self.outcome.attempts
    }

    pub fn kind(&self) -> ErrorKind {
        self.outcome.kind
    }

    pub fn is_transient(&self) -> bool {
        self.outcome.transient
    }

    /// The original error.
    pub fn into_inner(self) -> E {
        self.source
    }
}

/// Runs fallible async operations under a [`RetryPolicy`].
///
/// Attempts are strictly sequential. Each wait is
/// `max(base * 2^i + U[0, base * 2^i), Retry-After)`.
#[derive(Debug, Clone)]
pub struct ResilientInvoker {
    policy: RetryPolicy,
    jitter: bool,
}

impl ResilientInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            jitter: true,
        }
    }

    /// Disable random jitter so waits are exactly the exponential term.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails terminally or runs out of attempts.
    pub async fn invoke<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: FailureSignal,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut schedule = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let kind = classify(&error);
            let transient = self.policy.is_transient(kind, error.status_code());

            if !transient || attempt >= self.policy.max_attempts {
                warn!(
                    attempt,
                    %kind,
                    transient,
                    error = %error,
                    "giving up on call"
                );
                return Err(RetryError {
                    source: error,
                    outcome: RetryOutcome {
                        attempts: attempt,
                        kind,
                        transient,
                        schedule,
                    },
                });
            }

            let delay = self.delay(attempt - 1, error.retry_after());
            warn!(
                attempt,
                %kind,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "call failed, retrying"
            );
            schedule.push(delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn delay(&self, index: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.policy.backoff(index);
        let wait = if self.jitter {
            backoff.saturating_add(jitter(backoff))
        } else {
            backoff
        };
        match retry_after {
            Some(server) => wait.max(server),
            None => wait,
        }
    }
}

impl Default for ResilientInvoker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

/// Uniform random duration in `[0, ceiling)` at millisecond resolution.
fn jitter(ceiling: Duration) -> Duration {
    let ceiling_ms = ceiling.as_millis() as u64;
    if ceiling_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(OsRng.next_u64() % ceiling_ms)
}

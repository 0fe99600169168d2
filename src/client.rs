//! Retry/backoff wrapper for every outbound provider call.
//!
//! Rate-limit waits (HTTP 429) are unbounded and not counted as failures.
//! Transient failures back off `base^attempt` seconds up to `max_attempts`.
//! Permanent failures are surfaced immediately. This is the only place in
//! the crate that sleeps.

use std::cell::Cell;
use std::time::Duration;

use crate::error::{CallError, ProviderError};
use crate::observe::{Event, Observer};

// ============================================================================
// Policy
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per call before a transient failure is surfaced
    pub max_attempts: u32,
    pub backoff_base: f64,
    pub max_backoff: Duration,
    /// Used when a 429 carries no Retry-After header
    pub default_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2.0,
            max_backoff: Duration::from_secs(60),
            default_rate_limit_wait: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = self.backoff_base.powi(attempt as i32);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

// ============================================================================
// Sleeping
// ============================================================================

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct RateLimitedClient {
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    calls: Cell<u64>,
    rate_limit_hits: Cell<u64>,
}

impl RateLimitedClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Box::new(ThreadSleeper))
    }

    pub fn with_sleeper(policy: RetryPolicy, sleeper: Box<dyn Sleeper>) -> Self {
        Self {
            policy,
            sleeper,
            calls: Cell::new(0),
            rate_limit_hits: Cell::new(0),
        }
    }

    /// Total operation invocations, including retries.
    pub fn call_count(&self) -> u64 {
        self.calls.get()
    }

    pub fn rate_limit_hits(&self) -> u64 {
        self.rate_limit_hits.get()
    }

    /// Run `op` until it succeeds, fails permanently, or exhausts the
    /// transient retry budget.
    pub fn call<T, F>(&self, obs: &Observer, operation: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Result<T, CallError>,
    {
        let mut attempt: u32 = 0;
        loop {
            self.calls.set(self.calls.get() + 1);
            match op() {
                Ok(value) => return Ok(value),
                Err(CallError::RateLimited { retry_after }) => {
                    self.rate_limit_hits.set(self.rate_limit_hits.get() + 1);
                    let wait = retry_after.unwrap_or(self.policy.default_rate_limit_wait);
                    obs.record(Event::RateLimitWait {
                        operation: operation.to_string(),
                        wait,
                    });
                    self.sleeper.sleep(wait);
                }
                Err(CallError::Transient(reason)) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts {
                        obs.record(Event::CallFailed {
                            operation: operation.to_string(),
                            transient: true,
                            reason: reason.clone(),
                        });
                        return Err(ProviderError::Transient {
                            operation: operation.to_string(),
                            attempts: attempt,
                            reason,
                        });
                    }
                    let delay = self.policy.backoff_delay(attempt);
                    obs.record(Event::BackoffRetry {
                        operation: operation.to_string(),
                        attempt,
                        delay,
                        reason,
                    });
                    self.sleeper.sleep(delay);
                }
                Err(CallError::Permanent(reason)) => {
                    obs.record(Event::CallFailed {
                        operation: operation.to_string(),
                        transient: false,
                        reason: reason.clone(),
                    });
                    return Err(ProviderError::Permanent {
                        operation: operation.to_string(),
                        reason,
                    });
                }
            }
        }
    }

    /// Fixed pause between track-level retries, through the same sleeper.
    pub fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::instant_client;
    use super::*;

    #[test]
    fn test_success_first_try() {
        let (client, sleeper) = instant_client(RetryPolicy::default());
        let obs = Observer::new();
        let result: Result<u32, _> = client.call(&obs, "op", || Ok(7));
        assert_eq!(result, Ok(7));
        assert_eq!(client.call_count(), 1);
        assert!(sleeper.slept.borrow().is_empty());
    }

    #[test]
    fn test_rate_limit_waits_do_not_consume_attempts() {
        let (client, sleeper) = instant_client(RetryPolicy::default());
        let obs = Observer::new();
        let mut responses = vec![
            Err(CallError::RateLimited { retry_after: Some(Duration::from_secs(2)) }),
            Err(CallError::RateLimited { retry_after: None }),
            Err(CallError::RateLimited { retry_after: None }),
            Err(CallError::RateLimited { retry_after: None }),
            Ok("done"),
        ]
        .into_iter();
        let result = client.call(&obs, "op", || responses.next().unwrap());
        assert_eq!(result, Ok("done"));
        assert_eq!(
            *sleeper.slept.borrow(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(5),
                Duration::from_secs(5)
            ]
        );
        assert_eq!(client.rate_limit_hits(), 4);
        assert_eq!(obs.stats().rate_limit_waits, 4);
    }

    #[test]
    fn test_transient_backoff_then_give_up() {
        let (client, sleeper) = instant_client(RetryPolicy::default());
        let obs = Observer::new();
        let result: Result<(), _> =
            client.call(&obs, "op", || Err(CallError::Transient("timeout".into())));
        match result {
            Err(ProviderError::Transient { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected transient failure, got {:?}", other),
        }
        // 2^1, 2^2, then surfaced on the third failure
        assert_eq!(
            *sleeper.slept.borrow(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(client.call_count(), 3);
        assert_eq!(obs.stats().backoff_retries, 2);
        assert_eq!(obs.stats().transient_failures, 1);
    }

    #[test]
    fn test_transient_recovers() {
        let (client, _) = instant_client(RetryPolicy::default());
        let obs = Observer::new();
        let mut first = true;
        let result = client.call(&obs, "op", || {
            if first {
                first = false;
                Err(CallError::Transient("reset".into()))
            } else {
                Ok(1)
            }
        });
        assert_eq!(result, Ok(1));
    }

    #[test]
    fn test_permanent_is_immediate() {
        let (client, sleeper) = instant_client(RetryPolicy::default());
        let obs = Observer::new();
        let result: Result<(), _> =
            client.call(&obs, "op", || Err(CallError::Permanent("HTTP 404".into())));
        assert!(matches!(result, Err(ProviderError::Permanent { .. })));
        assert_eq!(client.call_count(), 1);
        assert!(sleeper.slept.borrow().is_empty());
        assert_eq!(obs.stats().permanent_failures, 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_backoff: Duration::from_secs(10),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(200), Duration::from_secs(10));
    }
}

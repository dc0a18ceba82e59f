use crate::constants::*;
use crate::error::AppError;
use crate::resilience::classifier::{classify, TransportFailure};
use crate::resilience::connectivity::ConnectivityProbe;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Exponential backoff settings. Plain configuration, no state.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            backoff_multiplier: DEFAULT_RETRY_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, String> {
        let policy = RetryPolicy {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts < 1 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be >= 1.0 (got {})",
                self.backoff_multiplier
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err("initial_delay must not exceed max_delay".to_string());
        }
        Ok(())
    }

    /// Policy that makes a single attempt.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_multiplier).min(self.max_delay)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetryError {
    #[error(transparent)]
    Failed(AppError),

    #[error("operation cancelled")]
    Cancelled,
}

/// Runs an outbound operation under a [`RetryPolicy`], consulting the
/// connectivity probe before each attempt.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    probe: Arc<dyn ConnectivityProbe>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, probe: Arc<dyn ConnectivityProbe>) -> Self {
        RetryExecutor { policy, probe }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation` until it succeeds, fails with a non-retryable
    /// error, or the attempt budget runs out. `operation` receives the
    /// 1-based attempt number.
    ///
    /// Cancelling `cancel` aborts an in-flight attempt or pending backoff
    /// sleep and returns [`RetryError::Cancelled`].
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportFailure>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_delay.min(self.policy.max_delay);
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let quality = self.probe.current_quality();
            if !quality.is_reachable() {
                tracing::warn!(
                    operation = label,
                    attempt,
                    "Offline, skipping {} (attempt {}/{})",
                    label,
                    attempt,
                    max_attempts
                );
                return Err(RetryError::Failed(AppError::NoInternet));
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                outcome = operation(attempt) => outcome,
            };

            let failure = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            operation = label,
                            attempt,
                            "{} succeeded on attempt {}/{}",
                            label,
                            attempt,
                            max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            // Re-sample: the network may have changed while the call was in flight
            let error = classify(&failure, self.probe.current_quality());

            if !error.is_retryable() {
                tracing::warn!(
                    operation = label,
                    attempt,
                    code = error.code(),
                    "{} failed with non-retryable error: {}",
                    label,
                    failure
                );
                return Err(RetryError::Failed(error));
            }
            if attempt >= max_attempts {
                tracing::warn!(
                    operation = label,
                    attempt,
                    code = error.code(),
                    "{} failed after {} attempts: {}",
                    label,
                    attempt,
                    failure
                );
                return Err(RetryError::Failed(error));
            }

            tracing::warn!(
                operation = label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                code = error.code(),
                "{} failed ({}), retrying in {}ms (attempt {}/{})",
                label,
                failure,
                delay.as_millis(),
                attempt + 1,
                max_attempts
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            delay = self.policy.next_delay(delay);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::connectivity::{
        ConnectionQuality, SharedConnectivity, StaticConnectivity,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn executor(quality: ConnectionQuality) -> RetryExecutor {
        RetryExecutor::new(RetryPolicy::default(), Arc::new(StaticConnectivity(quality)))
    }

    fn server_error() -> TransportFailure {
        TransportFailure::Http {
            status: 500,
            body: "internal".into(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
        assert_eq!(policy.max_delay, Duration::from_millis(10_000));
        assert_eq!(policy.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_policy_validation() {
        let ms = Duration::from_millis;
        assert!(RetryPolicy::new(1, ms(10), ms(10), 1.0).is_ok());
        assert!(RetryPolicy::new(0, ms(10), ms(100), 2.0).is_err());
        assert!(RetryPolicy::new(3, ms(10), ms(100), 0.5).is_err());
        assert!(RetryPolicy::new(3, ms(10), ms(100), f64::NAN).is_err());
        assert!(RetryPolicy::new(3, ms(500), ms(100), 2.0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_retryable_failures() {
        let executor = executor(ConnectionQuality::Wifi);
        let start = Instant::now();
        let attempt_times = Mutex::new(Vec::new());

        let result = executor
            .execute("test", &CancellationToken::new(), |attempt| {
                attempt_times.lock().unwrap().push(start.elapsed());
                async move {
                    if attempt < 3 {
                        Err(server_error())
                    } else {
                        Ok("route")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("route"));
        let times = attempt_times.into_inner().unwrap();
        assert_eq!(
            times,
            vec![
                Duration::ZERO,
                Duration::from_millis(1000),
                Duration::from_millis(3000)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_short_circuits() {
        let executor = executor(ConnectionQuality::Wifi);
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = executor
            .execute("test", &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(TransportFailure::Http {
                        status: 401,
                        body: "bad key".into(),
                    })
                }
            })
            .await;

        assert_eq!(result, Err(RetryError::Failed(AppError::ApiKeyInvalid)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_fails_fast_without_calling() {
        let executor = executor(ConnectionQuality::None);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute("test", &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(result, Err(RetryError::Failed(AppError::NoInternet)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_return_last_error() {
        let executor = executor(ConnectionQuality::Wifi);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute("test", &CancellationToken::new(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err(TransportFailure::Http {
                        status: 500 + attempt as u16,
                        body: String::new(),
                    })
                }
            })
            .await;

        assert_eq!(result, Err(RetryError::Failed(AppError::ServerError(503))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_capped() {
        let policy = RetryPolicy::new(
            4,
            Duration::from_millis(1000),
            Duration::from_millis(3000),
            10.0,
        )
        .unwrap();
        let executor = RetryExecutor::new(
            policy,
            Arc::new(StaticConnectivity(ConnectionQuality::Wifi)),
        );
        let start = Instant::now();
        let attempt_times = Mutex::new(Vec::new());

        let _: Result<(), _> = executor
            .execute("test", &CancellationToken::new(), |_| {
                attempt_times.lock().unwrap().push(start.elapsed());
                async { Err(server_error()) }
            })
            .await;

        let times = attempt_times.into_inner().unwrap();
        assert_eq!(
            times,
            vec![
                Duration::ZERO,
                Duration::from_millis(1000),
                Duration::from_millis(4000),
                Duration::from_millis(7000)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_goes_offline_between_attempts() {
        let probe = Arc::new(SharedConnectivity::new(ConnectionQuality::Wifi));
        let executor = RetryExecutor::new(RetryPolicy::default(), probe.clone());
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute("test", &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                probe.set(ConnectionQuality::None);
                async {
                    Err(TransportFailure::Timeout("read timed out".into()))
                }
            })
            .await;

        // Timeout classified against the offline sample is NoInternet (retryable),
        // and the next attempt fails fast.
        assert_eq!(result, Err(RetryError::Failed(AppError::NoInternet)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_returns_promptly() {
        let executor = executor(ConnectionQuality::Wifi);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                cancel.cancel();
            })
        };

        let result: Result<(), _> = executor
            .execute("test", &cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(server_error()) }
            })
            .await;

        canceller.await.unwrap();
        assert_eq!(result, Err(RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_call() {
        let executor = executor(ConnectionQuality::Wifi);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let result: Result<(), _> = executor
            .execute("test", &cancel, |_| {
                trigger.cancel();
                async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(result, Err(RetryError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_attempt() {
        let executor = executor(ConnectionQuality::Wifi);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute("test", &cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(result, Err(RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

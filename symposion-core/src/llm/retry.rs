//! Retry logic for external calls
//!
//! Implements exponential backoff with jitter for transient failures. Tool
//! clients never retry on their own; callers opt in here, optionally drawing
//! from a [`RetryBudget`] shared by every call in a session.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::RetrySettings;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: usize,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add jitter to prevent thundering herd
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self::default()
            .with_max_attempts(settings.max_attempts)
            .with_initial_delay(settings.initial_delay)
            .with_max_delay(settings.max_delay)
    }
}

impl RetryConfig {
    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Builder: set max attempts
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder: set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Builder: set max delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Builder: set backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Builder: enable/disable jitter
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);

        let clamped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.add_jitter {
            // Add up to 25% jitter
            let jitter = clamped_delay * 0.25 * rand_jitter();
            clamped_delay + jitter
        } else {
            clamped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0)
fn rand_jitter() -> f64 {
    use std::sync::atomic::AtomicU64;
    static SEED: AtomicU64 = AtomicU64::new(0);

    // LCG parameters
    const A: u64 = 1103515245;
    const C: u64 = 12345;
    const M: u64 = 1 << 31;

    let seed = SEED.fetch_add(1, Ordering::Relaxed);
    let time_component = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let combined = seed.wrapping_add(time_component);
    let next = (A.wrapping_mul(combined).wrapping_add(C)) % M;

    (next as f64) / (M as f64)
}

/// Cap on the total number of retries shared by several call sites.
///
/// Clones share the same counter.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    remaining: Arc<AtomicUsize>,
}

impl RetryBudget {
    pub fn new(retries: usize) -> Self {
        Self {
            remaining: Arc::new(AtomicUsize::new(retries)),
        }
    }

    /// Take one retry from the budget; false once it is exhausted
    pub fn try_acquire(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }
}

/// Retry state tracker
#[derive(Debug)]
pub struct RetryState {
    config: RetryConfig,
    attempt: usize,
    last_error: Option<String>,
}

impl RetryState {
    /// Create a new retry state
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            last_error: None,
        }
    }

    /// Check if we should retry
    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Record an attempt
    pub fn record_attempt(&mut self, error: impl Into<String>) {
        self.attempt += 1;
        self.last_error = Some(error.into());
    }

    /// Get the delay before next retry
    pub fn next_delay(&self) -> Duration {
        self.config.delay_for_attempt(self.attempt.saturating_sub(1))
    }

    /// Get current attempt number (1-indexed)
    pub fn current_attempt(&self) -> usize {
        self.attempt
    }

    /// Get remaining attempts
    pub fn remaining_attempts(&self) -> usize {
        self.config.max_attempts.saturating_sub(self.attempt)
    }

    /// Get the last error
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Execute an async operation with retries on every error
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, None, |_: &E| true, operation).await
}

/// Execute an async operation, retrying only errors accepted by `retryable`
/// and only while the optional budget has retries left
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    budget: Option<&RetryBudget>,
    retryable: P,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut state = RetryState::new(config.clone());

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                state.record_attempt(e.to_string());

                if !state.should_retry() || !retryable(&e) {
                    return Err(e);
                }
                if let Some(budget) = budget {
                    if !budget.try_acquire() {
                        tracing::warn!(error = %e, "Retry budget exhausted");
                        return Err(e);
                    }
                }

                let delay = state.next_delay();
                tracing::debug!(
                    attempt = state.current_attempt(),
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

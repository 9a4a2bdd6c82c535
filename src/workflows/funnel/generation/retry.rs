use std::time::Duration;

use async_trait::async_trait;

use super::backend::GenerationError;

/// Time source and sleeper injected into the orchestrator so the retry
/// policy can be exercised in tests without real delays.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic elapsed time since the clock was created.
    fn elapsed(&self) -> Duration;
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio timer.
#[derive(Debug)]
pub struct TokioClock {
    started: std::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            started: std::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// Exponent cap so the shift cannot overflow; delays past ~17 minutes are
// academic for this workload anyway.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Bounded-retry policy for one orchestrated generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// `retries` counts extra attempts beyond the first.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following a failed attempt `n` (1-based):
    /// 1 s, 2 s, 4 s, doubling each time.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        Duration::from_millis(1000u64 << exponent)
    }

    /// Whether the policy allows another attempt after `attempt` failed with
    /// `error`. Authentication failures are never retried.
    pub fn should_retry(&self, attempt: u32, error: &GenerationError) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }
}

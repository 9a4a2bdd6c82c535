pub mod backend;
pub mod compliance;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use backend::{GenerationBackend, GenerationError, GenerationRequest};
use compliance::ComplianceReviewer;
use retry::{Clock, RetryPolicy};

use super::domain::FunnelStructure;
use super::repair;

const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Caller-tunable knobs for one orchestrated generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Extra primary attempts beyond the first.
    pub retries: u32,
    /// Budget for each individual attempt.
    pub attempt_timeout: Duration,
    /// Overall budget across attempts and backoff waits.
    pub deadline: Option<Duration>,
    /// Persist the result to the funnel library on success.
    pub save_to_library: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            deadline: None,
            save_to_library: false,
        }
    }
}

/// Success payload: the usable funnel plus advisory detail about how it was
/// reached.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub funnel: FunnelStructure,
    pub warnings: Vec<String>,
    pub repaired: bool,
    pub attempts: u32,
    pub used_fallback: bool,
}

/// Terminal failure surfaced after the orchestrator gives up.
#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    #[error("generation failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: GenerationError,
    },
    #[error("generation abandoned after {elapsed:?}: caller deadline elapsed")]
    DeadlineExceeded { elapsed: Duration },
}

/// Drives the external generation call to a usable funnel: bounded primary
/// retries with exponential backoff, per-attempt timeouts, the repair pass,
/// the compliance review, and a single-shot fallback path. Attempts within
/// one call are strictly sequential; independent calls share no mutable
/// state.
pub struct GenerationOrchestrator {
    primary: Arc<dyn GenerationBackend>,
    fallback: Arc<dyn GenerationBackend>,
    reviewer: Arc<dyn ComplianceReviewer>,
    clock: Arc<dyn Clock>,
}

impl GenerationOrchestrator {
    pub fn new(
        primary: Arc<dyn GenerationBackend>,
        fallback: Arc<dyn GenerationBackend>,
        reviewer: Arc<dyn ComplianceReviewer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            primary,
            fallback,
            reviewer,
            clock,
        }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationOutcome, GenerationFailure> {
        let policy = RetryPolicy::with_retries(options.retries);
        let started = self.clock.elapsed();
        let mut attempts = 0;

        while attempts < policy.max_attempts() {
            self.check_deadline(started, options)?;
            attempts += 1;

            match self.run_attempt(&*self.primary, request, options, attempts).await {
                Ok(outcome) => {
                    return Ok(GenerationOutcome {
                        attempts,
                        used_fallback: false,
                        ..outcome
                    });
                }
                Err(error) => {
                    if !policy.should_retry(attempts, &error) {
                        break;
                    }
                    let delay = policy.backoff_after(attempts);
                    self.check_deadline(started, options)?;
                    self.clock.sleep(delay).await;
                }
            }
        }

        // Primary path exhausted (or aborted on an auth failure); the
        // simpler fallback path gets exactly one attempt.
        self.check_deadline(started, options)?;
        attempts += 1;
        warn!(
            backend = self.fallback.label(),
            attempt = attempts,
            "primary generation exhausted, invoking fallback"
        );

        match self.run_attempt(&*self.fallback, request, options, attempts).await {
            Ok(outcome) => Ok(GenerationOutcome {
                attempts,
                used_fallback: true,
                ..outcome
            }),
            Err(error) => Err(GenerationFailure::Exhausted {
                attempts,
                last: error,
            }),
        }
    }

    fn check_deadline(
        &self,
        started: Duration,
        options: &GenerationOptions,
    ) -> Result<(), GenerationFailure> {
        if let Some(deadline) = options.deadline {
            let elapsed = self.clock.elapsed().saturating_sub(started);
            if elapsed >= deadline {
                return Err(GenerationFailure::DeadlineExceeded { elapsed });
            }
        }
        Ok(())
    }

    /// One attempt against one backend: timed call, structural validation,
    /// repair, then compliance review.
    async fn run_attempt(
        &self,
        backend: &dyn GenerationBackend,
        request: &GenerationRequest,
        options: &GenerationOptions,
        attempt: u32,
    ) -> Result<GenerationOutcome, GenerationError> {
        let attempt_started = self.clock.elapsed();

        let result = tokio::time::timeout(options.attempt_timeout, backend.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout)
            .and_then(|inner| inner);

        let funnel = match result {
            Ok(funnel) => funnel,
            Err(error) => {
                let elapsed = self.clock.elapsed().saturating_sub(attempt_started);
                warn!(
                    backend = backend.label(),
                    attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    class = error.class(),
                    "generation attempt failed"
                );
                return Err(error);
            }
        };

        let outcome = self.validate_result(funnel).await;
        let elapsed = self.clock.elapsed().saturating_sub(attempt_started);
        match &outcome {
            Ok(success) => info!(
                backend = backend.label(),
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                repaired = success.repaired,
                warnings = success.warnings.len(),
                "generation attempt succeeded"
            ),
            Err(error) => warn!(
                backend = backend.label(),
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                class = error.class(),
                "generation attempt failed validation"
            ),
        }

        outcome
    }

    async fn validate_result(
        &self,
        funnel: FunnelStructure,
    ) -> Result<GenerationOutcome, GenerationError> {
        if funnel.name.trim().is_empty() {
            return Err(GenerationError::Incomplete("funnel has no name".to_string()));
        }

        let repair_pass = repair::validate_and_repair(funnel);
        let mut repaired = repair_pass.repaired;
        let mut funnel = repair_pass.funnel;

        let report = self.reviewer.review(&funnel).await?;
        let warnings: Vec<String> = report
            .warnings()
            .map(|issue| issue.message.clone())
            .collect();

        if let Some(corrected) = report.corrected {
            let corrected_pass = repair::validate_and_repair(corrected);
            repaired = repaired || corrected_pass.repaired;
            funnel = corrected_pass.funnel;
        } else if report.has_blocking_issues() {
            let detail = report
                .issues
                .iter()
                .filter(|issue| issue.severity == compliance::IssueSeverity::Error)
                .map(|issue| issue.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GenerationError::ComplianceBlocking(detail));
        }

        Ok(GenerationOutcome {
            funnel,
            warnings,
            repaired,
            attempts: 0,
            used_fallback: false,
        })
    }
}

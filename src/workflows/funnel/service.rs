use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::generation::backend::GenerationRequest;
use super::generation::{GenerationFailure, GenerationOptions, GenerationOrchestrator, GenerationOutcome};
use super::repository::{FunnelRepository, FunnelRepositoryError};

/// Subscription gate applied before any backend call. An explicit injected
/// value rather than a module-level flag so tests can exercise both policies
/// without shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "plan")]
pub enum FeatureAccessPolicy {
    /// Every generation is allowed.
    Free,
    /// A fixed allowance of generations per billing window.
    Metered { included_generations: u64 },
}

impl FeatureAccessPolicy {
    fn authorize(&self, used: u64) -> Result<(), FunnelServiceError> {
        match self {
            FeatureAccessPolicy::Free => Ok(()),
            FeatureAccessPolicy::Metered {
                included_generations,
            } => {
                if used < *included_generations {
                    Ok(())
                } else {
                    Err(FunnelServiceError::AccessDenied {
                        included_generations: *included_generations,
                    })
                }
            }
        }
    }
}

static FUNNEL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_funnel_id() -> String {
    let id = FUNNEL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("fnl-{id:06}")
}

/// Service composing the access policy, orchestrator, and funnel library.
pub struct FunnelService<R> {
    orchestrator: GenerationOrchestrator,
    repository: Arc<R>,
    access: FeatureAccessPolicy,
    generations_used: AtomicU64,
}

impl<R> FunnelService<R>
where
    R: FunnelRepository + 'static,
{
    pub fn new(
        orchestrator: GenerationOrchestrator,
        repository: Arc<R>,
        access: FeatureAccessPolicy,
    ) -> Self {
        Self {
            orchestrator,
            repository,
            access,
            generations_used: AtomicU64::new(0),
        }
    }

    /// Generate a funnel, assigning a library identifier when the backend
    /// leaves one out, and persist it when the caller asked for that.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationOutcome, FunnelServiceError> {
        self.access
            .authorize(self.generations_used.load(Ordering::Relaxed))?;

        let mut outcome = self.orchestrator.generate(request, options).await?;
        self.generations_used.fetch_add(1, Ordering::Relaxed);

        if outcome.funnel.id.trim().is_empty() {
            outcome.funnel.id = next_funnel_id();
        }

        if options.save_to_library {
            self.repository.save(outcome.funnel.clone())?;
        }

        Ok(outcome)
    }

    pub fn access_policy(&self) -> FeatureAccessPolicy {
        self.access
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}

/// Error raised by the funnel service.
#[derive(Debug, thiserror::Error)]
pub enum FunnelServiceError {
    #[error("plan allowance of {included_generations} generation(s) exhausted")]
    AccessDenied { included_generations: u64 },
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    #[error(transparent)]
    Repository(#[from] FunnelRepositoryError),
}

pub mod domain;
pub mod generation;
pub mod repair;
pub mod repository;
pub mod service;

pub use domain::{FunnelStep, FunnelStructure, StepKind};
pub use generation::backend::GenerationRequest;
pub use generation::{GenerationOptions, GenerationOutcome};
pub use repair::{validate_and_repair, RepairOutcome};
pub use service::{FeatureAccessPolicy, FunnelService, FunnelServiceError};

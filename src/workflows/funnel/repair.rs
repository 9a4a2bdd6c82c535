use super::domain::{FunnelStep, FunnelStructure};

/// Result of one repair pass over a funnel structure.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub repaired: bool,
    pub funnel: FunnelStructure,
}

/// Normalize a possibly defective funnel. Two defects are handled:
///
/// - no steps at all: a single deterministic lead-capture step is injected;
/// - order values that are not the contiguous sequence `1..=N`: steps are
///   stably resequenced (ties keep their input position), so relative
///   ordering never changes.
///
/// Valid input is returned unchanged and the pass is idempotent. Authored
/// content is never deleted, only added to or renumbered.
pub fn validate_and_repair(mut funnel: FunnelStructure) -> RepairOutcome {
    if funnel.steps.is_empty() {
        funnel.steps.push(FunnelStep::default_lead_capture());
        return RepairOutcome {
            repaired: true,
            funnel,
        };
    }

    if funnel.orders_contiguous() {
        return RepairOutcome {
            repaired: false,
            funnel,
        };
    }

    funnel.steps.sort_by_key(|step| step.order);
    for (index, step) in funnel.steps.iter_mut().enumerate() {
        step.order = index as u32 + 1;
    }

    RepairOutcome {
        repaired: true,
        funnel,
    }
}

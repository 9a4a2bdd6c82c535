pub mod import;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::workflows::scoring::domain::{LeadAttributes, RuleSet, RuleSetError, ScoreBreakdown};
use crate::workflows::scoring::store::{RuleStore, RuleStoreError};
use crate::workflows::scoring::ScoringEngine;

/// Outreach template chosen from the lead's score. The downstream mailer owns
/// the template bodies; the core only names the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    HotLead,
    WarmFollowUp,
    Nurture,
}

impl EmailTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            EmailTemplate::HotLead => "hot_lead",
            EmailTemplate::WarmFollowUp => "warm_follow_up",
            EmailTemplate::Nurture => "nurture",
        }
    }
}

/// Score thresholds mapping a total to an outreach tier. Injected rather than
/// hard-coded so deployments can tune routing without a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachMatrix {
    pub hot_threshold: i32,
    pub warm_threshold: i32,
}

impl Default for OutreachMatrix {
    fn default() -> Self {
        Self {
            hot_threshold: 50,
            warm_threshold: 20,
        }
    }
}

impl OutreachMatrix {
    pub fn template_for(&self, total_score: i32) -> EmailTemplate {
        if total_score >= self.hot_threshold {
            EmailTemplate::HotLead
        } else if total_score >= self.warm_threshold {
            EmailTemplate::WarmFollowUp
        } else {
            EmailTemplate::Nurture
        }
    }
}

/// Score report returned to callers: the numeric signal, the explainable
/// breakdown, and the outreach tier it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScoreReport {
    pub total_score: i32,
    pub breakdown: ScoreBreakdown,
    pub template: EmailTemplate,
}

/// Service composing the rule store, scoring engine, and outreach matrix.
pub struct LeadScoringService<S> {
    store: Arc<S>,
    matrix: OutreachMatrix,
}

impl<S> LeadScoringService<S>
where
    S: RuleStore + 'static,
{
    pub fn new(store: Arc<S>, matrix: OutreachMatrix) -> Self {
        Self { store, matrix }
    }

    /// Read the rule collection wholesale, evaluate it against the lead, and
    /// translate the total into an outreach tier.
    pub fn score_lead(&self, lead: &LeadAttributes) -> Result<LeadScoreReport, LeadScoringError> {
        let rules = RuleSet::new(self.store.load_all()?)?;
        let engine = ScoringEngine::new(rules);
        let breakdown = engine.score(lead);
        let template = self.matrix.template_for(breakdown.total_score);

        Ok(LeadScoreReport {
            total_score: breakdown.total_score,
            breakdown,
            template,
        })
    }

    pub fn matrix(&self) -> OutreachMatrix {
        self.matrix
    }
}

/// Error raised by the lead scoring service.
#[derive(Debug, thiserror::Error)]
pub enum LeadScoringError {
    #[error(transparent)]
    RuleSet(#[from] RuleSetError),
    #[error(transparent)]
    Store(#[from] RuleStoreError),
}

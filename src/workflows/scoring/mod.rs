pub mod domain;
mod rules;
pub mod store;

use std::collections::BTreeMap;

use domain::{LeadAttributes, RuleSet, ScoreBreakdown};

/// Stateless evaluator that applies a validated rule set to lead attributes.
/// Pure and deterministic: a fixed `(rules, lead)` pair always produces the
/// same total and breakdown, with no side effects.
pub struct ScoringEngine {
    rules: RuleSet,
}

impl ScoringEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate every active rule against the lead. Each active rule yields
    /// exactly one breakdown entry keyed by rule name; rules whose attribute
    /// is absent or whose operand cannot be interpreted simply do not apply.
    pub fn score(&self, lead: &LeadAttributes) -> ScoreBreakdown {
        let mut entries = BTreeMap::new();
        let mut total_score = 0;

        for rule in self.rules.active() {
            let outcome = rules::evaluate_rule(rule, lead);
            total_score += outcome.points;
            entries.insert(rule.name.clone(), outcome);
        }

        ScoreBreakdown {
            total_score,
            entries,
        }
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for administrator-managed scoring rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

/// Lead attribute a rule inspects. Closed set: a new attribute is a compile
/// error until every evaluation site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    ResponseTime,
    MessageLength,
    Source,
    Tone,
}

impl RuleKind {
    pub const fn label(self) -> &'static str {
        match self {
            RuleKind::ResponseTime => "response_time",
            RuleKind::MessageLength => "message_length",
            RuleKind::Source => "source",
            RuleKind::Tone => "tone",
        }
    }
}

/// Comparison applied between the selected lead attribute and the operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    LessThan,
    GreaterThan,
    Equals,
    Contains,
}

/// A single condition-action pair maintained through the settings surface.
/// Read-only to the engine; never mutated during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub id: RuleId,
    pub name: String,
    pub kind: RuleKind,
    pub operator: ConditionOperator,
    /// String-encoded operand; numeric operators parse it on evaluation.
    pub operand: String,
    pub points: i32,
    pub is_active: bool,
}

/// The subject being scored. Absent numeric fields cause the matching rule
/// kind to be skipped, never treated as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadAttributes {
    #[serde(default)]
    pub response_time_minutes: Option<f64>,
    #[serde(default)]
    pub message_length: Option<u64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Validated rule collection. Duplicate names would silently overwrite each
/// other in the breakdown map, so they are rejected here instead of being
/// resolved at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    rules: Vec<ScoringRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ScoringRule>) -> Result<Self, RuleSetError> {
        let mut seen: BTreeMap<&str, &RuleId> = BTreeMap::new();
        for rule in &rules {
            let name = rule.name.trim();
            if name.is_empty() {
                return Err(RuleSetError::EmptyName {
                    rule_id: rule.id.clone(),
                });
            }
            if seen.insert(name, &rule.id).is_some() {
                return Err(RuleSetError::DuplicateName {
                    name: rule.name.clone(),
                });
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ScoringRule] {
        &self.rules
    }

    pub fn active(&self) -> impl Iterator<Item = &ScoringRule> {
        self.rules.iter().filter(|rule| rule.is_active)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rules = Vec::<ScoringRule>::deserialize(deserializer)?;
        RuleSet::new(rules).map_err(serde::de::Error::custom)
    }
}

/// Malformed rule-set input. The only fatal condition in the scoring engine;
/// everything else fails closed per rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("duplicate rule name '{name}' would overwrite its breakdown entry")]
    DuplicateName { name: String },
    #[error("rule {rule_id:?} has an empty name")]
    EmptyName { rule_id: RuleId },
}

/// Per-rule contribution recorded for every active rule, applying or not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub applies: bool,
    pub points: i32,
    pub kind: RuleKind,
}

/// Full evaluation result: the total plus an explainable per-rule breakdown,
/// keyed by rule name. Recomputed wholesale on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_score: i32,
    pub entries: BTreeMap<String, RuleOutcome>,
}

impl ScoreBreakdown {
    pub fn applying(&self) -> impl Iterator<Item = (&String, &RuleOutcome)> {
        self.entries.iter().filter(|(_, outcome)| outcome.applies)
    }
}

use serde::{Deserialize, Serialize};

/// Kinds of steps a funnel can present. Closed set so routing and rendering
/// code must handle every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Landing,
    LeadCapture,
    Quiz,
    Offer,
    Checkout,
    ThankYou,
}

impl StepKind {
    pub const fn label(self) -> &'static str {
        match self {
            StepKind::Landing => "landing",
            StepKind::LeadCapture => "lead_capture",
            StepKind::Quiz => "quiz",
            StepKind::Offer => "offer",
            StepKind::Checkout => "checkout",
            StepKind::ThankYou => "thank_you",
        }
    }
}

/// One step of a funnel flow. `fields_config` and `settings` are free-form
/// content authored by the generation backend; the core never interprets
/// them, it only carries them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStep {
    pub order: u32,
    pub kind: StepKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields_config: serde_json::Value,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl FunnelStep {
    /// Deterministic single-step fallback injected when a generated funnel
    /// arrives with no steps at all. Not an AI call, so repair always
    /// terminates.
    pub fn default_lead_capture() -> Self {
        Self {
            order: 1,
            kind: StepKind::LeadCapture,
            title: "Get in touch".to_string(),
            description: "Leave your details and we will reach out shortly.".to_string(),
            fields_config: serde_json::json!([
                { "name": "full_name", "label": "Full name", "required": true },
                { "name": "email", "label": "Email address", "required": true }
            ]),
            settings: serde_json::json!({ "submit_label": "Send" }),
        }
    }
}

/// The generation artifact: an ordered sequence of steps plus naming
/// metadata. A funnel without steps is incomplete and must go through the
/// repair pass before it can be served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStructure {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<FunnelStep>,
}

impl FunnelStructure {
    /// Orders are exactly `1..=N` in sequence position.
    pub fn orders_contiguous(&self) -> bool {
        self.steps
            .iter()
            .enumerate()
            .all(|(index, step)| step.order == index as u32 + 1)
    }
}

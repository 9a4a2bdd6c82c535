use super::domain::{ConditionOperator, LeadAttributes, RuleKind, RuleOutcome, ScoringRule};

/// Attribute value a rule condition is tested against.
enum Subject {
    Number(f64),
    Text(String),
}

pub(crate) fn evaluate_rule(rule: &ScoringRule, lead: &LeadAttributes) -> RuleOutcome {
    let applies = match subject_for(rule.kind, lead) {
        Some(subject) => condition_holds(rule.operator, &subject, &rule.operand),
        None => false,
    };

    RuleOutcome {
        applies,
        points: if applies { rule.points } else { 0 },
        kind: rule.kind,
    }
}

fn subject_for(kind: RuleKind, lead: &LeadAttributes) -> Option<Subject> {
    match kind {
        RuleKind::ResponseTime => lead.response_time_minutes.map(Subject::Number),
        RuleKind::MessageLength => lead.message_length.map(|length| Subject::Number(length as f64)),
        RuleKind::Source => lead
            .source
            .as_deref()
            .map(str::trim)
            .filter(|source| !source.is_empty())
            .map(|source| Subject::Text(source.to_string())),
        RuleKind::Tone => lead
            .message
            .as_deref()
            .and_then(derive_tone)
            .map(|tone| Subject::Text(tone.to_string())),
    }
}

/// Operator dispatch. Numeric operators fail closed on unparseable operands
/// or textual subjects; textual operators render numeric subjects first.
fn condition_holds(operator: ConditionOperator, subject: &Subject, operand: &str) -> bool {
    match operator {
        ConditionOperator::LessThan | ConditionOperator::GreaterThan => {
            let value = match subject {
                Subject::Number(value) => *value,
                Subject::Text(_) => return false,
            };
            let threshold = match operand.trim().parse::<f64>() {
                Ok(threshold) => threshold,
                Err(_) => return false,
            };
            match operator {
                ConditionOperator::LessThan => value < threshold,
                _ => value > threshold,
            }
        }
        ConditionOperator::Equals => render(subject).eq_ignore_ascii_case(operand.trim()),
        ConditionOperator::Contains => render(subject)
            .to_ascii_lowercase()
            .contains(&operand.trim().to_ascii_lowercase()),
    }
}

fn render(subject: &Subject) -> String {
    match subject {
        Subject::Number(value) => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{}", *value as i64)
            } else {
                format!("{value}")
            }
        }
        Subject::Text(text) => text.clone(),
    }
}

const URGENT_MARKERS: &[&str] = &["asap", "urgent", "immediately", "right away", "today"];
const POSITIVE_MARKERS: &[&str] = &["great", "love", "excited", "interested", "thanks", "perfect"];
const NEGATIVE_MARKERS: &[&str] = &["cancel", "refund", "disappointed", "unsubscribe", "complaint"];

/// Deterministic tone label for free text. Urgency outranks sentiment so a
/// terse "need this ASAP" still routes as urgent. Blank text yields no tone.
pub(crate) fn derive_tone(message: &str) -> Option<&'static str> {
    let text = message.trim().to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }

    if URGENT_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Some("urgent");
    }
    if NEGATIVE_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Some("negative");
    }
    if POSITIVE_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Some("positive");
    }

    Some("neutral")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::scoring::domain::RuleId;

    fn rule(kind: RuleKind, operator: ConditionOperator, operand: &str, points: i32) -> ScoringRule {
        ScoringRule {
            id: RuleId("rule-1".to_string()),
            name: "Test".to_string(),
            kind,
            operator,
            operand: operand.to_string(),
            points,
            is_active: true,
        }
    }

    #[test]
    fn numeric_comparison_applies_and_misses() {
        let fast_reply = rule(RuleKind::ResponseTime, ConditionOperator::LessThan, "10", 15);

        let lead = LeadAttributes {
            response_time_minutes: Some(5.0),
            ..LeadAttributes::default()
        };
        let outcome = evaluate_rule(&fast_reply, &lead);
        assert!(outcome.applies);
        assert_eq!(outcome.points, 15);

        let lead = LeadAttributes {
            response_time_minutes: Some(20.0),
            ..LeadAttributes::default()
        };
        let outcome = evaluate_rule(&fast_reply, &lead);
        assert!(!outcome.applies);
        assert_eq!(outcome.points, 0);
    }

    #[test]
    fn missing_attribute_fails_closed() {
        let fast_reply = rule(RuleKind::ResponseTime, ConditionOperator::LessThan, "10", 15);
        let outcome = evaluate_rule(&fast_reply, &LeadAttributes::default());
        assert!(!outcome.applies);
    }

    #[test]
    fn unparseable_operand_fails_closed() {
        let bad = rule(RuleKind::ResponseTime, ConditionOperator::GreaterThan, "soon", 5);
        let lead = LeadAttributes {
            response_time_minutes: Some(90.0),
            ..LeadAttributes::default()
        };
        assert!(!evaluate_rule(&bad, &lead).applies);
    }

    #[test]
    fn source_equality_is_case_insensitive() {
        let referral = rule(RuleKind::Source, ConditionOperator::Equals, "Referral", 20);
        let lead = LeadAttributes {
            source: Some("referral".to_string()),
            ..LeadAttributes::default()
        };
        assert!(evaluate_rule(&referral, &lead).applies);

        let lead = LeadAttributes {
            source: Some("   ".to_string()),
            ..LeadAttributes::default()
        };
        assert!(!evaluate_rule(&referral, &lead).applies);
    }

    #[test]
    fn message_length_contains_renders_number() {
        let contains = rule(RuleKind::MessageLength, ConditionOperator::Contains, "20", 5);
        let lead = LeadAttributes {
            message_length: Some(120),
            ..LeadAttributes::default()
        };
        assert!(evaluate_rule(&contains, &lead).applies);
    }

    #[test]
    fn tone_labels_are_deterministic() {
        assert_eq!(derive_tone("Need pricing ASAP please"), Some("urgent"));
        assert_eq!(derive_tone("I want a refund"), Some("negative"));
        assert_eq!(derive_tone("Love the product, very excited"), Some("positive"));
        assert_eq!(derive_tone("Following up on my earlier note"), Some("neutral"));
        assert_eq!(derive_tone("   "), None);
    }

    #[test]
    fn tone_rule_matches_derived_label() {
        let urgent = rule(RuleKind::Tone, ConditionOperator::Equals, "urgent", 25);
        let lead = LeadAttributes {
            message: Some("Please call me today, urgent request".to_string()),
            ..LeadAttributes::default()
        };
        assert!(evaluate_rule(&urgent, &lead).applies);

        let no_text = LeadAttributes::default();
        assert!(!evaluate_rule(&urgent, &no_text).applies);
    }
}

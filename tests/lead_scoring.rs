//! Integration tests for the lead scoring workflow: rule storage,
//! the scoring engine, outreach routing, and the CSV import path, exercised
//! through the public facade only.

mod common {
    use funnel_ai::workflows::scoring::domain::{
        ConditionOperator, RuleId, RuleKind, ScoringRule,
    };

    pub(super) fn rule(
        id: &str,
        name: &str,
        kind: RuleKind,
        operator: ConditionOperator,
        operand: &str,
        points: i32,
    ) -> ScoringRule {
        ScoringRule {
            id: RuleId(id.to_string()),
            name: name.to_string(),
            kind,
            operator,
            operand: operand.to_string(),
            points,
            is_active: true,
        }
    }

    pub(super) fn standard_rules() -> Vec<ScoringRule> {
        vec![
            rule(
                "r-fast",
                "FastReply",
                RuleKind::ResponseTime,
                ConditionOperator::LessThan,
                "10",
                15,
            ),
            rule(
                "r-long",
                "DetailedInquiry",
                RuleKind::MessageLength,
                ConditionOperator::GreaterThan,
                "200",
                10,
            ),
            rule(
                "r-ref",
                "ReferralSource",
                RuleKind::Source,
                ConditionOperator::Equals,
                "referral",
                20,
            ),
            rule(
                "r-urgent",
                "UrgentTone",
                RuleKind::Tone,
                ConditionOperator::Equals,
                "urgent",
                25,
            ),
        ]
    }
}

use std::io::Cursor;
use std::sync::Arc;

use funnel_ai::workflows::leads::import::LeadCsvImporter;
use funnel_ai::workflows::leads::{EmailTemplate, LeadScoringService, OutreachMatrix};
use funnel_ai::workflows::scoring::domain::{
    ConditionOperator, LeadAttributes, RuleKind, RuleSet,
};
use funnel_ai::workflows::scoring::store::{InMemoryRuleStore, RuleStore, RuleStoreError};
use funnel_ai::workflows::scoring::ScoringEngine;

fn service_with_standard_rules() -> LeadScoringService<InMemoryRuleStore> {
    let store = InMemoryRuleStore::seeded(common::standard_rules()).expect("valid seed");
    LeadScoringService::new(Arc::new(store), OutreachMatrix::default())
}

#[test]
fn fast_reply_scenario_matches_the_rule() {
    let rules = RuleSet::new(vec![common::rule(
        "r-fast",
        "FastReply",
        RuleKind::ResponseTime,
        ConditionOperator::LessThan,
        "10",
        15,
    )])
    .expect("valid set");
    let engine = ScoringEngine::new(rules);

    let fast = LeadAttributes {
        response_time_minutes: Some(5.0),
        ..LeadAttributes::default()
    };
    let breakdown = engine.score(&fast);
    assert_eq!(breakdown.total_score, 15);
    assert!(breakdown.entries["FastReply"].applies);
    assert_eq!(breakdown.entries["FastReply"].points, 15);

    let slow = LeadAttributes {
        response_time_minutes: Some(20.0),
        ..LeadAttributes::default()
    };
    let breakdown = engine.score(&slow);
    assert_eq!(breakdown.total_score, 0);
    assert!(!breakdown.entries["FastReply"].applies);
    assert_eq!(breakdown.entries["FastReply"].points, 0);

    // Absent attribute: the rule is skipped without error, never scored as 0
    // response time.
    let unknown = LeadAttributes::default();
    let breakdown = engine.score(&unknown);
    assert_eq!(breakdown.total_score, 0);
    assert!(!breakdown.entries["FastReply"].applies);
}

#[test]
fn service_routes_by_threshold() {
    let service = service_with_standard_rules();

    let hot = LeadAttributes {
        response_time_minutes: Some(3.0),
        message_length: Some(400),
        source: Some("Referral".to_string()),
        message: Some("We need this rolled out immediately".to_string()),
    };
    let report = service.score_lead(&hot).expect("scores");
    assert_eq!(report.total_score, 70);
    assert_eq!(report.template, EmailTemplate::HotLead);

    let warm = LeadAttributes {
        response_time_minutes: Some(30.0),
        message_length: Some(400),
        source: Some("referral".to_string()),
        message: None,
    };
    let report = service.score_lead(&warm).expect("scores");
    assert_eq!(report.total_score, 30);
    assert_eq!(report.template, EmailTemplate::WarmFollowUp);

    let cold = LeadAttributes::default();
    let report = service.score_lead(&cold).expect("scores");
    assert_eq!(report.template, EmailTemplate::Nurture);
}

#[test]
fn custom_matrix_changes_routing_without_touching_rules() {
    let store = InMemoryRuleStore::seeded(common::standard_rules()).expect("valid seed");
    let service = LeadScoringService::new(
        Arc::new(store),
        OutreachMatrix {
            hot_threshold: 10,
            warm_threshold: 5,
        },
    );

    let lead = LeadAttributes {
        response_time_minutes: Some(5.0),
        ..LeadAttributes::default()
    };
    let report = service.score_lead(&lead).expect("scores");
    assert_eq!(report.total_score, 15);
    assert_eq!(report.template, EmailTemplate::HotLead);
}

#[test]
fn duplicate_rule_names_are_rejected_before_scoring() {
    let store = InMemoryRuleStore::new();
    store
        .upsert(common::rule(
            "r-1",
            "Referral",
            RuleKind::Source,
            ConditionOperator::Equals,
            "referral",
            10,
        ))
        .expect("first rule");

    let error = store
        .upsert(common::rule(
            "r-2",
            "Referral",
            RuleKind::Source,
            ConditionOperator::Contains,
            "partner",
            5,
        ))
        .expect_err("duplicate name must not reach the breakdown map");
    assert!(matches!(error, RuleStoreError::NameTaken(_)));
}

#[test]
fn csv_import_feeds_the_scoring_pipeline() {
    let csv = "\
Lead ID,Source,Response Time Minutes,Message,Captured At
L-100,referral,4,Please send the proposal ASAP - we want to move fast and have budget approved,2026-03-02T08:00:00Z
L-101,ads,45,,
L-102,website,not-a-number,Just browsing,2026-03-02
";
    let records = LeadCsvImporter::from_reader(Cursor::new(csv)).expect("import");
    assert_eq!(records.len(), 3);

    let service = service_with_standard_rules();
    let reports: Vec<_> = records
        .iter()
        .map(|record| service.score_lead(&record.attributes).expect("scores"))
        .collect();

    // Fast referral with an urgent, short message: 15 + 20 + 25.
    assert_eq!(reports[0].total_score, 60);
    assert_eq!(reports[0].template, EmailTemplate::HotLead);

    // Slow, anonymous, no message: nothing applies.
    assert_eq!(reports[1].total_score, 0);
    assert_eq!(reports[1].template, EmailTemplate::Nurture);

    // Malformed response time fails closed; neutral tone matches nothing.
    assert_eq!(reports[2].total_score, 0);
}

#[test]
fn scoring_is_deterministic_across_invocations() {
    let service = service_with_standard_rules();
    let lead = LeadAttributes {
        response_time_minutes: Some(7.5),
        message_length: Some(250),
        source: Some("referral".to_string()),
        message: Some("Thanks, this looks great".to_string()),
    };

    let first = service.score_lead(&lead).expect("scores");
    for _ in 0..5 {
        let next = service.score_lead(&lead).expect("scores");
        assert_eq!(next, first);
    }
}

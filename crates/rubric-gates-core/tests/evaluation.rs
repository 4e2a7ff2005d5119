use rubric_gates_core::config::bundled_rubrics_dir;
use rubric_gates_core::{
    CheckEngine, Decision, EvaluatorConfig, RubricCatalog, RubricEvaluator, RubricSuite, Tier,
    UnknownCheckPolicy,
};
use serde_json::{json, Value};

fn evaluator() -> RubricEvaluator {
    RubricEvaluator::new(&EvaluatorConfig::default().with_rubrics_dir(bundled_rubrics_dir()))
        .unwrap()
}

fn artifact() -> Value {
    json!({"deterministic_executor": "duckdb+sql", "version": "1.0.0"})
}

fn context(jaccard: f64) -> Value {
    json!({
        "provenance": {"audit_trace_id": "t1"},
        "features": {"age": {"unit": "years"}},
        "index_time": "2024-01-01T00:00:00Z",
        "sql_executed": true,
        "cohort_jaccard": jaccard
    })
}

// ---- Concrete scenarios ----

#[test]
fn clean_artifact_is_approved() {
    let result = evaluator().evaluate(&artifact(), Some(&context(0.85)));
    for tier in Tier::ALL {
        assert!(result.tier(tier).unwrap().passed, "tier {tier} failed");
    }
    assert_eq!(result.gate_decision.decision, Decision::Approve);
    assert!(result.gate_decision.blocking_reasons.is_empty());
    assert!(!result.gate_decision.deferral_recommended);
}

#[test]
fn low_jaccard_is_revised() {
    let result = evaluator().evaluate(&artifact(), Some(&context(0.5)));
    assert!(result.tier(Tier::One).unwrap().passed);
    assert!(result.tier(Tier::Two).unwrap().passed);

    let tier3 = result.tier(Tier::Three).unwrap();
    let failed: Vec<&str> = tier3.failures().map(|c| c.id.as_str()).collect();
    assert_eq!(failed, vec!["tier3.cohort_overlap_jaccard"]);

    let jaccard = tier3
        .checks
        .iter()
        .find(|c| c.id == "tier3.cohort_overlap_jaccard")
        .unwrap();
    assert_eq!(jaccard.score, Some(0.5));
    assert_eq!(jaccard.threshold, Some(0.7));

    assert_eq!(result.gate_decision.decision, Decision::Revise);
    assert!(result
        .gate_decision
        .required_fixes
        .iter()
        .any(|fix| fix.contains("0.50 < 0.7")));
}

#[test]
fn missing_executor_is_blocked_with_deferral() {
    let result = evaluator().evaluate(&json!({"version": "1.0.0"}), Some(&context(0.85)));
    let tier1 = result.tier(Tier::One).unwrap();
    assert!(!tier1.passed);
    assert!(tier1
        .failures()
        .any(|c| c.id == "tier1.determinism_required"));

    let decision = &result.gate_decision;
    assert_eq!(decision.decision, Decision::Block);
    assert!(decision.deferral_recommended);
    assert_eq!(decision.deferral_to.as_deref(), Some("human_review"));
    assert!(decision
        .blocking_reasons
        .contains(&"Tier 1 violation: tier1.determinism_required".to_string()));
}

// ---- Properties ----

#[test]
fn evaluation_is_deterministic() {
    let ev = evaluator();
    for ctx in [context(0.85), context(0.5), json!({})] {
        let a = ev.evaluate(&artifact(), Some(&ctx));
        let b = ev.evaluate(&artifact(), Some(&ctx));
        assert_eq!(a, b);
    }
}

#[test]
fn tier1_failure_blocks_regardless_of_other_tiers() {
    let ev = evaluator();
    // tier 2 and 3 both pass, both fail, and one of each
    let contexts = [
        context(0.9),
        json!({"provenance": {"audit_trace_id": "t1"}}),
        json!({"provenance": {"audit_trace_id": "t1"}, "index_time": "x", "cohort_jaccard": 0.1}),
    ];
    for ctx in contexts {
        let result = ev.evaluate(&json!({}), Some(&ctx));
        assert_eq!(result.gate_decision.decision, Decision::Block);
    }
}

#[test]
fn tier2_failure_blocks() {
    let mut ctx = context(0.9);
    ctx["has_outcome_leakage"] = json!(true);
    let result = evaluator().evaluate(&artifact(), Some(&ctx));
    assert!(!result.tier(Tier::Two).unwrap().passed);
    assert_eq!(result.gate_decision.decision, Decision::Block);
    assert!(result.gate_decision.deferral_recommended);
}

#[test]
fn mistyped_context_fails_the_check_not_the_evaluation() {
    let mut ctx = context(0.9);
    ctx["features"] = json!(["age"]);
    let result = evaluator().evaluate(&artifact(), Some(&ctx));
    let unit = result
        .tier(Tier::Two)
        .unwrap()
        .checks
        .iter()
        .find(|c| c.id == "tier2.unit_consistency")
        .unwrap()
        .clone();
    assert!(!unit.passed);
    assert!(unit
        .message
        .as_deref()
        .unwrap()
        .starts_with("Check tier2.unit_consistency could not be evaluated"));
    assert_eq!(result.gate_decision.decision, Decision::Block);
}

fn future_suite() -> RubricSuite {
    serde_json::from_value(json!({
        "id": "tier1_future",
        "tier": 1,
        "version": "2.0.0",
        "checks": [{
            "id": "tier1.reserved_for_later",
            "description": "Not implemented by this engine",
            "check_type": "policy",
            "severity": "critical",
            "gate_action": "block"
        }]
    }))
    .unwrap()
}

#[test]
fn unknown_checks_fail_open_by_default() {
    let ev = RubricEvaluator::from_catalog(
        RubricCatalog::from_suites(vec![future_suite()]),
        CheckEngine::default(),
    );
    let result = ev.evaluate(&json!({}), None);
    let check = &result.tier(Tier::One).unwrap().checks[0];
    assert!(check.passed);
    assert_eq!(
        check.message.as_deref(),
        Some("Unknown check tier1.reserved_for_later - defaulting to pass")
    );
    assert_eq!(result.gate_decision.decision, Decision::Approve);
}

#[test]
fn fail_closed_policy_blocks_unknown_checks() {
    let ev = RubricEvaluator::from_catalog(
        RubricCatalog::from_suites(vec![future_suite()]),
        CheckEngine::new(UnknownCheckPolicy::FailClosed),
    );
    let result = ev.evaluate(&json!({}), None);
    assert!(!result.tier(Tier::One).unwrap().passed);
    assert_eq!(result.gate_decision.decision, Decision::Block);
}

#[test]
fn evaluator_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RubricEvaluator>();

    let ev = std::sync::Arc::new(evaluator());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ev = ev.clone();
            std::thread::spawn(move || {
                ev.evaluate(&artifact(), Some(&context(0.2 * i as f64)))
                    .gate_decision
                    .decision
            })
        })
        .collect();
    let decisions: Vec<Decision> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        decisions,
        vec![Decision::Revise, Decision::Revise, Decision::Revise, Decision::Revise]
    );
}

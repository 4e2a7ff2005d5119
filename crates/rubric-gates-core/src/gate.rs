//! Gate decision policy.
//!
//! Folds per-tier [`TierResult`]s into a [`GateDecision`] (approve, revise
//! or block) together with the reasons and fixes that justify it. The policy
//! is a pure function of the tier results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checks::TierResult;
use crate::rubric::Tier;

/// Who a deferred decision is handed to unless stated otherwise.
pub const HUMAN_REVIEW: &str = "human_review";

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Ternary gate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Revise,
    Block,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Revise => "revise",
            Decision::Block => "block",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final decision plus everything needed to act on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "GateDecisionRecord", from = "GateDecisionRecord")]
pub struct GateDecision {
    pub decision: Decision,
    /// `"Tier N violation: <check_id>"` for every failing check.
    pub blocking_reasons: Vec<String>,
    /// Non-empty messages of failing checks, same order as the reasons.
    pub required_fixes: Vec<String>,
    pub deferral_recommended: bool,
    pub deferral_to: Option<String>,
}

impl GateDecision {
    pub fn is_approved(&self) -> bool {
        self.decision == Decision::Approve
    }
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

/// Certificate representation: deferral is nested and always names a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GateDecisionRecord {
    decision: Decision,
    blocking_reasons: Vec<String>,
    required_fixes: Vec<String>,
    deferral: DeferralRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeferralRecord {
    recommended: bool,
    to: String,
}

impl From<GateDecision> for GateDecisionRecord {
    fn from(d: GateDecision) -> Self {
        Self {
            decision: d.decision,
            blocking_reasons: d.blocking_reasons,
            required_fixes: d.required_fixes,
            deferral: DeferralRecord {
                recommended: d.deferral_recommended,
                to: d.deferral_to.unwrap_or_else(|| HUMAN_REVIEW.to_string()),
            },
        }
    }
}

impl From<GateDecisionRecord> for GateDecision {
    fn from(r: GateDecisionRecord) -> Self {
        // A non-recommended deferral to the default target carries no information.
        let deferral_to = if !r.deferral.recommended && r.deferral.to == HUMAN_REVIEW {
            None
        } else {
            Some(r.deferral.to)
        };
        Self {
            decision: r.decision,
            blocking_reasons: r.blocking_reasons,
            required_fixes: r.required_fixes,
            deferral_recommended: r.deferral.recommended,
            deferral_to,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Compute the gate decision for a set of tier results.
///
/// | tier 1 | tier 2 | tier 3 | decision | deferral     |
/// |--------|--------|--------|----------|--------------|
/// | fail   | any    | any    | block    | human_review |
/// | pass   | fail   | any    | block    | human_review |
/// | pass   | pass   | fail   | revise   | none         |
/// | pass   | pass   | pass   | approve  | none         |
///
/// A tier with no result counts as passed. Reasons and fixes are collected
/// from every failing check in tiers 1–3, not only the deciding tier.
pub fn decide(tier_results: &BTreeMap<Tier, TierResult>) -> GateDecision {
    let mut blocking_reasons = Vec::new();
    let mut required_fixes = Vec::new();

    for tier in Tier::ALL {
        let Some(result) = tier_results.get(&tier) else {
            continue;
        };
        for check in result.failures() {
            blocking_reasons.push(format!("Tier {tier} violation: {}", check.id));
            if let Some(msg) = check.message.as_deref().filter(|m| !m.is_empty()) {
                required_fixes.push(msg.to_string());
            }
        }
    }

    let passed = |tier: Tier| tier_results.get(&tier).map_or(true, |r| r.passed);

    let (decision, deferral_recommended) = if !passed(Tier::One) || !passed(Tier::Two) {
        (Decision::Block, true)
    } else if !passed(Tier::Three) {
        (Decision::Revise, false)
    } else {
        (Decision::Approve, false)
    };

    GateDecision {
        decision,
        blocking_reasons,
        required_fixes,
        deferral_recommended,
        deferral_to: deferral_recommended.then(|| HUMAN_REVIEW.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckResult;
    use serde_json::json;

    fn tier(tier: Tier, checks: Vec<CheckResult>) -> (Tier, TierResult) {
        (tier, TierResult::from_checks(tier, checks))
    }

    fn results(t1: bool, t2: bool, t3: bool) -> BTreeMap<Tier, TierResult> {
        let mk = |ok: bool, id: &str| {
            if ok {
                CheckResult::pass(id)
            } else {
                CheckResult::fail(id, format!("{id} failed"))
            }
        };
        BTreeMap::from([
            tier(Tier::One, vec![mk(t1, "tier1.a")]),
            tier(Tier::Two, vec![mk(t2, "tier2.b")]),
            tier(Tier::Three, vec![mk(t3, "tier3.c")]),
        ])
    }

    #[test]
    fn tier1_failure_always_blocks() {
        for t2 in [true, false] {
            for t3 in [true, false] {
                let d = decide(&results(false, t2, t3));
                assert_eq!(d.decision, Decision::Block);
                assert!(d.deferral_recommended);
                assert_eq!(d.deferral_to.as_deref(), Some(HUMAN_REVIEW));
            }
        }
    }

    #[test]
    fn tier2_failure_blocks_with_deferral() {
        let d = decide(&results(true, false, true));
        assert_eq!(d.decision, Decision::Block);
        assert!(d.deferral_recommended);
    }

    #[test]
    fn tier3_failure_revises_without_deferral() {
        let d = decide(&results(true, true, false));
        assert_eq!(d.decision, Decision::Revise);
        assert!(!d.deferral_recommended);
        assert_eq!(d.deferral_to, None);
    }

    #[test]
    fn all_pass_approves() {
        let d = decide(&results(true, true, true));
        assert!(d.is_approved());
        assert!(d.blocking_reasons.is_empty());
        assert!(d.required_fixes.is_empty());
    }

    #[test]
    fn reasons_accumulate_across_all_tiers_in_order() {
        let d = decide(&results(false, false, false));
        assert_eq!(
            d.blocking_reasons,
            vec![
                "Tier 1 violation: tier1.a",
                "Tier 2 violation: tier2.b",
                "Tier 3 violation: tier3.c",
            ]
        );
        assert_eq!(
            d.required_fixes,
            vec!["tier1.a failed", "tier2.b failed", "tier3.c failed"]
        );
    }

    #[test]
    fn failures_without_message_add_reason_but_no_fix() {
        let mut silent = CheckResult::pass("tier3.silent");
        silent.passed = false;
        let map = BTreeMap::from([tier(Tier::Three, vec![silent])]);
        let d = decide(&map);
        assert_eq!(d.blocking_reasons.len(), 1);
        assert!(d.required_fixes.is_empty());
    }

    #[test]
    fn missing_tiers_count_as_passed() {
        assert_eq!(decide(&BTreeMap::new()).decision, Decision::Approve);
    }

    #[test]
    fn decision_is_deterministic() {
        let input = results(true, false, false);
        assert_eq!(decide(&input), decide(&input));
    }

    #[test]
    fn wire_form_nests_deferral() {
        let approve = decide(&results(true, true, true));
        let value = serde_json::to_value(&approve).unwrap();
        assert_eq!(
            value,
            json!({
                "decision": "approve",
                "blocking_reasons": [],
                "required_fixes": [],
                "deferral": {"recommended": false, "to": "human_review"}
            })
        );
        let back: GateDecision = serde_json::from_value(value).unwrap();
        assert_eq!(back, approve);
    }
}

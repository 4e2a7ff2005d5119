//! Check engine: runs rubric checks against an artifact and its context.
//!
//! Check ids dispatch through a fixed lookup table to a [`CheckKind`]. Every
//! predicate returns `Result<CheckResult, CheckFault>`; a fault becomes a
//! failing result carrying the diagnostic so one bad input never aborts the
//! rest of the evaluation. Ids missing from the table fall under the
//! configured [`UnknownCheckPolicy`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::UnknownCheckPolicy;
use crate::obs;
use crate::rubric::{RubricCheck, RubricSuite, Tier};

/// Lower-cased substrings that mark identifiable patient information.
pub const PHI_MARKERS: &[&str] = &[
    "ssn",
    "social security",
    "patient name",
    "mrn",
    "medical record",
];

/// Jaccard threshold when a check does not configure one.
pub const DEFAULT_JACCARD_THRESHOLD: f64 = 0.7;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    #[serde(rename = "pass")]
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn new(id: &str, passed: bool) -> Self {
        Self {
            id: id.to_string(),
            passed,
            score: None,
            threshold: None,
            message: None,
        }
    }

    /// Passing result without annotations.
    pub fn pass(id: &str) -> Self {
        Self::new(id, true)
    }

    /// Failing result with `message`.
    pub fn fail(id: &str, message: impl Into<String>) -> Self {
        Self::new(id, false).with_message(message)
    }

    /// `passed`, with `failure` attached only when the check failed.
    fn verdict(id: &str, passed: bool, failure: &str) -> Self {
        let result = Self::new(id, passed);
        if passed {
            result
        } else {
            result.with_message(failure)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = (!message.is_empty()).then_some(message);
        self
    }

    pub fn with_score(mut self, score: f64, threshold: f64) -> Self {
        self.score = Some(score);
        self.threshold = Some(threshold);
        self
    }
}

/// All check outcomes for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub tier: Tier,
    /// AND of every check in the tier; vacuously true when empty.
    #[serde(rename = "pass")]
    pub passed: bool,
    pub checks: Vec<CheckResult>,
}

impl TierResult {
    pub fn from_checks(tier: Tier, checks: Vec<CheckResult>) -> Self {
        let passed = checks.iter().all(|c| c.passed);
        Self {
            tier,
            passed,
            checks,
        }
    }

    /// Checks that did not pass, in evaluation order.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// Why a predicate could not reach a verdict.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckFault {
    #[error("{field} must be {expected}, found {found}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl CheckFault {
    fn unexpected(field: impl Into<String>, expected: &'static str, value: &Value) -> Self {
        Self::UnexpectedType {
            field: field.into(),
            expected,
            found: json_type(value),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every check the engine knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    DeterminismRequired,
    AuditTraceComplete,
    NoPhiInArtifacts,
    NoOutcomeClaimsWithoutValidation,
    UnitConsistency,
    PlausibleRanges,
    TemporalCoherence,
    OutcomeLeakagePrevention,
    SqlExecutes,
    CohortOverlapJaccard,
}

const REGISTRY: &[(&str, CheckKind)] = &[
    ("tier1.determinism_required", CheckKind::DeterminismRequired),
    ("tier1.audit_trace_complete", CheckKind::AuditTraceComplete),
    ("tier1.no_phi_in_artifacts", CheckKind::NoPhiInArtifacts),
    (
        "tier1.no_outcome_claims_without_validation",
        CheckKind::NoOutcomeClaimsWithoutValidation,
    ),
    ("tier2.unit_consistency", CheckKind::UnitConsistency),
    ("tier2.plausible_ranges", CheckKind::PlausibleRanges),
    ("tier2.temporal_coherence", CheckKind::TemporalCoherence),
    (
        "tier2.outcome_leakage_prevention",
        CheckKind::OutcomeLeakagePrevention,
    ),
    ("tier3.sql_executes", CheckKind::SqlExecutes),
    ("tier3.cohort_overlap_jaccard", CheckKind::CohortOverlapJaccard),
];

impl CheckKind {
    /// Resolve a rubric check id.
    pub fn from_id(id: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, kind)| *kind)
    }

    /// Canonical id for this check.
    pub fn id(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(id, _)| *id)
            .unwrap_or("unknown")
    }

    /// Ids of every registered check.
    pub fn registered_ids() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().map(|(id, _)| *id)
    }

    fn evaluate(
        self,
        check: &RubricCheck,
        artifact: &Value,
        context: &Value,
    ) -> Result<CheckResult, CheckFault> {
        let id = check.id.as_str();
        match self {
            CheckKind::DeterminismRequired => {
                let passed = truthy(artifact.get("deterministic_executor"))
                    && truthy(artifact.get("version"));
                Ok(CheckResult::verdict(
                    id,
                    passed,
                    "Missing deterministic_executor or version",
                ))
            }
            CheckKind::AuditTraceComplete => {
                let trace = context
                    .get("provenance")
                    .and_then(|p| p.get("audit_trace_id"));
                Ok(CheckResult::verdict(
                    id,
                    truthy(trace),
                    "Missing audit_trace_id in provenance",
                ))
            }
            CheckKind::NoPhiInArtifacts => {
                let summary = match artifact.get("inputs_summary") {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.to_lowercase(),
                    Some(other) => {
                        return Err(CheckFault::unexpected(
                            "artifact.inputs_summary",
                            "a string",
                            other,
                        ))
                    }
                };
                let has_phi = PHI_MARKERS.iter().any(|m| summary.contains(m));
                Ok(CheckResult::verdict(
                    id,
                    !has_phi,
                    "Potential PHI detected in inputs_summary",
                ))
            }
            CheckKind::NoOutcomeClaimsWithoutValidation => {
                Ok(CheckResult::pass(id).with_message("Policy check - requires human review"))
            }
            CheckKind::UnitConsistency => {
                let all_have_units = match context.get("features") {
                    None | Some(Value::Null) => true,
                    Some(Value::Object(features)) => {
                        let mut all = true;
                        for (name, feature) in features {
                            match feature {
                                Value::Object(f) => all &= truthy(f.get("unit")),
                                other => {
                                    return Err(CheckFault::unexpected(
                                        format!("context.features.{name}"),
                                        "an object",
                                        other,
                                    ))
                                }
                            }
                        }
                        all
                    }
                    Some(other) => {
                        return Err(CheckFault::unexpected(
                            "context.features",
                            "an object",
                            other,
                        ))
                    }
                };
                let score = if all_have_units { 1.0 } else { 0.0 };
                Ok(CheckResult::verdict(
                    id,
                    all_have_units,
                    "Some features missing unit declarations",
                )
                .with_score(score, 1.0))
            }
            CheckKind::PlausibleRanges => Ok(CheckResult::pass(id).with_score(1.0, 0.95)),
            CheckKind::TemporalCoherence => Ok(CheckResult::verdict(
                id,
                truthy(context.get("index_time")),
                "Missing index_time for temporal coherence check",
            )),
            CheckKind::OutcomeLeakagePrevention => {
                let leaked = truthy(context.get("has_outcome_leakage"));
                Ok(CheckResult::verdict(id, !leaked, "Outcome leakage detected"))
            }
            CheckKind::SqlExecutes => Ok(CheckResult::verdict(
                id,
                truthy(context.get("sql_executed")),
                "SQL did not execute successfully",
            )),
            CheckKind::CohortOverlapJaccard => {
                let jaccard = match context.get("cohort_jaccard") {
                    None | Some(Value::Null) => 0.0,
                    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                    Some(other) => {
                        return Err(CheckFault::unexpected(
                            "context.cohort_jaccard",
                            "a number",
                            other,
                        ))
                    }
                };
                // shown as written in the rubric, so `1.0` stays `1.0`
                let configured = check
                    .scoring_number("threshold")
                    .and_then(|n| n.as_f64().map(|f| (f, n.to_string())));
                let (threshold, shown) = configured.unwrap_or_else(|| {
                    (
                        DEFAULT_JACCARD_THRESHOLD,
                        DEFAULT_JACCARD_THRESHOLD.to_string(),
                    )
                });
                let passed = jaccard >= threshold;
                let cmp = if passed { "≥" } else { "<" };
                Ok(CheckResult::new(id, passed)
                    .with_score(jaccard, threshold)
                    .with_message(format!("Jaccard {jaccard:.2} {cmp} {shown}")))
            }
        }
    }
}

/// JSON truthiness: null, false, 0, "", [] and {} are falsy.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluates rubric checks. Holds no per-evaluation state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckEngine {
    unknown_check_policy: UnknownCheckPolicy,
}

impl CheckEngine {
    pub fn new(unknown_check_policy: UnknownCheckPolicy) -> Self {
        Self {
            unknown_check_policy,
        }
    }

    pub fn unknown_check_policy(&self) -> UnknownCheckPolicy {
        self.unknown_check_policy
    }

    /// Evaluate one check. Never fails: faults and unknown ids are folded
    /// into the returned result.
    pub fn evaluate_check(
        &self,
        check: &RubricCheck,
        artifact: &Value,
        context: &Value,
    ) -> CheckResult {
        let Some(kind) = CheckKind::from_id(&check.id) else {
            return self.unknown_check(&check.id);
        };

        match kind.evaluate(check, artifact, context) {
            Ok(result) => result,
            Err(fault) => {
                obs::emit_check_fault(&check.id, &fault);
                CheckResult::fail(
                    &check.id,
                    format!("Check {} could not be evaluated: {fault}", check.id),
                )
            }
        }
    }

    fn unknown_check(&self, id: &str) -> CheckResult {
        obs::emit_unknown_check(id, self.unknown_check_policy);
        match self.unknown_check_policy {
            UnknownCheckPolicy::FailOpen => CheckResult::pass(id)
                .with_message(format!("Unknown check {id} - defaulting to pass")),
            UnknownCheckPolicy::FailClosed => {
                CheckResult::fail(id, format!("Unknown check {id} - failing closed"))
            }
        }
    }

    /// Evaluate every check of every suite in `suites` (all belonging to
    /// `tier`). The tier passes iff every check passes.
    pub fn evaluate_tier(
        &self,
        tier: Tier,
        suites: &[RubricSuite],
        artifact: &Value,
        context: &Value,
    ) -> TierResult {
        let checks = suites
            .iter()
            .flat_map(|suite| suite.checks.iter())
            .map(|check| self.evaluate_check(check, artifact, context))
            .collect();
        TierResult::from_checks(tier, checks)
    }
}

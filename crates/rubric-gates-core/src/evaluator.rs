//! Rubric evaluator: catalog → check engine → gate policy.
//!
//! The evaluator is public; anyone can run it. It only consumes artifact
//! metadata and an evaluation context, never the generator that produced the
//! artifact.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::checks::{CheckEngine, CheckResult, TierResult};
use crate::config::EvaluatorConfig;
use crate::error::Result;
use crate::gate::{decide, GateDecision};
use crate::obs;
use crate::rubric::{RubricCatalog, RubricCheck, Tier};

/// Everything one evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub tier_results: BTreeMap<Tier, TierResult>,
    pub gate_decision: GateDecision,
    /// `suite_id → version` of every suite that took part.
    pub rubric_versions: BTreeMap<String, String>,
}

impl EvaluationResult {
    pub fn tier(&self, tier: Tier) -> Option<&TierResult> {
        self.tier_results.get(&tier)
    }
}

/// Runs artifacts through a loaded rubric catalog.
///
/// The catalog is read-only after construction, so a single evaluator can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct RubricEvaluator {
    catalog: RubricCatalog,
    engine: CheckEngine,
}

impl RubricEvaluator {
    /// Load the catalog described by `config`.
    pub fn new(config: &EvaluatorConfig) -> Result<Self> {
        let catalog = RubricCatalog::load(Some(&config.resolved_rubrics_dir()))?;
        Ok(Self::from_catalog(
            catalog,
            CheckEngine::new(config.unknown_check_policy),
        ))
    }

    pub fn from_catalog(catalog: RubricCatalog, engine: CheckEngine) -> Self {
        Self { catalog, engine }
    }

    pub fn catalog(&self) -> &RubricCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &CheckEngine {
        &self.engine
    }

    /// Evaluate a single check definition.
    pub fn evaluate_check(
        &self,
        check: &RubricCheck,
        artifact: &Value,
        context: &Value,
    ) -> CheckResult {
        self.engine.evaluate_check(check, artifact, context)
    }

    /// Evaluate every suite registered for `tier`.
    pub fn evaluate_tier(&self, tier: Tier, artifact: &Value, context: &Value) -> TierResult {
        self.engine
            .evaluate_tier(tier, self.catalog.suites(tier), artifact, context)
    }

    /// Evaluate an artifact against all three tiers and decide.
    ///
    /// A missing context is treated as an empty object.
    pub fn evaluate(&self, artifact: &Value, context: Option<&Value>) -> EvaluationResult {
        let empty = Value::Object(Map::new());
        let context = context.unwrap_or(&empty);

        let _span = obs::EvaluationSpan::enter(artifact_label(artifact));

        let tier_results: BTreeMap<Tier, TierResult> = Tier::ALL
            .into_iter()
            .map(|tier| (tier, self.evaluate_tier(tier, artifact, context)))
            .collect();

        let gate_decision = decide(&tier_results);
        obs::emit_gate_decided(&gate_decision, &tier_results);

        EvaluationResult {
            tier_results,
            gate_decision,
            rubric_versions: self.catalog.versions(),
        }
    }
}

fn artifact_label(artifact: &Value) -> &str {
    artifact
        .get("hash")
        .and_then(Value::as_str)
        .unwrap_or("<unhashed>")
}

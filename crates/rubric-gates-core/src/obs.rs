//! Structured observability hooks for evaluation, certification and
//! manifest events.
//!
//! Every event carries an `event` field (`gate.decided`,
//! `certificate.issued`, ...) so log pipelines can filter on it. Filtering and
//! output format are configured through [`crate::telemetry::init_tracing`].

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::certificate::Certificate;
use crate::checks::{CheckFault, TierResult};
use crate::config::UnknownCheckPolicy;
use crate::gate::GateDecision;
use crate::rubric::Tier;

/// RAII guard tagging everything logged during one evaluation with the
/// artifact hash.
///
/// ```ignore
/// let _span = EvaluationSpan::enter("9f86d081...");
/// ```
pub struct EvaluationSpan {
    _span: tracing::span::EnteredSpan,
}

impl EvaluationSpan {
    pub fn enter(artifact_hash: &str) -> Self {
        let span = tracing::info_span!("rubric_gates.evaluate", artifact_hash = %artifact_hash);
        Self {
            _span: span.entered(),
        }
    }
}

/// RAII guard for a benchmark run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("rubric_gates.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_catalog_loaded(root: &Path, suites: usize, skipped: usize) {
    info!(
        event = "catalog.loaded",
        root = %root.display(),
        suites = suites,
        skipped = skipped,
    );
}

/// A rubric file was not loaded (warning level).
pub fn emit_rubric_skipped(path: &Path, reason: &str) {
    warn!(event = "rubric.skipped", path = %path.display(), reason = %reason);
}

/// A predicate could not read its inputs; the check is recorded as failed.
pub fn emit_check_fault(check_id: &str, fault: &CheckFault) {
    warn!(event = "check.fault", check_id = %check_id, fault = %fault);
}

pub fn emit_unknown_check(check_id: &str, policy: UnknownCheckPolicy) {
    warn!(event = "check.unknown", check_id = %check_id, policy = %policy);
}

pub fn emit_gate_decided(decision: &GateDecision, tier_results: &BTreeMap<Tier, TierResult>) {
    let tier_passed = |tier: Tier| tier_results.get(&tier).map_or(true, |r| r.passed);
    info!(
        event = "gate.decided",
        decision = %decision.decision,
        tier_1 = tier_passed(Tier::One),
        tier_2 = tier_passed(Tier::Two),
        tier_3 = tier_passed(Tier::Three),
        blocking_reasons = decision.blocking_reasons.len(),
        deferral = decision.deferral_recommended,
    );
}

pub fn emit_certificate_issued(certificate: &Certificate) {
    info!(
        event = "certificate.issued",
        certificate_id = %certificate.certificate_id,
        decision = %certificate.gate_decision.decision,
        audit_trace_id = %certificate.provenance.audit_trace_id,
    );
}

pub fn emit_certificate_verified(certificate_id: Option<&str>, valid: bool, errors: usize) {
    info!(
        event = "certificate.verified",
        certificate_id = certificate_id.unwrap_or("<none>"),
        valid = valid,
        errors = errors,
    );
}

pub fn emit_manifest_created(dataset_id: &str, total_files: u64, root_hash: &str) {
    info!(
        event = "manifest.created",
        dataset_id = %dataset_id,
        total_files = total_files,
        root_hash = %root_hash,
    );
}

pub fn emit_manifest_verified(dataset_id: &str, valid: bool, errors: usize) {
    info!(
        event = "manifest.verified",
        dataset_id = %dataset_id,
        valid = valid,
        errors = errors,
    );
}

pub fn emit_dataset_evaluated(dataset_id: &str, artifacts: usize, duration_seconds: f64) {
    debug!(
        event = "run.dataset_evaluated",
        dataset_id = %dataset_id,
        artifacts = artifacts,
        duration_seconds = duration_seconds,
    );
}

pub fn emit_run_finished(run_id: &str, total_artifacts: usize, pass_rate: f64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        total_artifacts = total_artifacts,
        pass_rate = pass_rate,
    );
}

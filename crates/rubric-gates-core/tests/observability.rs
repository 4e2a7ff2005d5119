//! Structured tracing events emitted by evaluation, certification and
//! manifest operations.

use rubric_gates_core::config::bundled_rubrics_dir;
use rubric_gates_core::obs::{self, EvaluationSpan};
use rubric_gates_core::{
    create_manifest, verify_manifest, CertificateService, CertificateVerifier, EvaluatorConfig,
    ManifestOptions, RubricCatalog, RubricEvaluator,
};
use serde_json::{json, Map};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn evaluation_emits_gate_decision_inside_span() {
    let ev =
        RubricEvaluator::new(&EvaluatorConfig::default().with_rubrics_dir(bundled_rubrics_dir()))
            .unwrap();
    ev.evaluate(&json!({"hash": "cafebabe"}), None);

    assert!(logs_contain("catalog.loaded"));
    assert!(logs_contain("gate.decided"));
    assert!(logs_contain("cafebabe"));
}

#[traced_test]
#[test]
fn certificate_lifecycle_is_logged() {
    let catalog = RubricCatalog::from_suites(Vec::new());
    let ev = RubricEvaluator::from_catalog(catalog, Default::default());
    let evaluation = ev.evaluate(&json!({}), None);
    let cert = CertificateService::new().create(&json!({}), &evaluation, &Map::new());
    let verifier = CertificateVerifier::new().unwrap();
    verifier.verify(&cert.to_value().unwrap(), None);

    assert!(logs_contain("certificate.issued"));
    assert!(logs_contain("certificate.verified"));
    assert!(logs_contain(&cert.certificate_id.to_string()));
}

#[traced_test]
#[test]
fn skipped_rubric_logs_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("tier1")).unwrap();
    std::fs::write(dir.path().join("tier1/bad.yaml"), "rubric_suite: 3").unwrap();
    RubricCatalog::load(Some(dir.path())).unwrap();

    assert!(logs_contain("rubric.skipped"));
    assert!(logs_contain("bad.yaml"));
}

#[traced_test]
#[test]
fn manifest_events_carry_dataset_id() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.csv"), "1").unwrap();
    let m = create_manifest(dir.path(), "eicu", "2.0", &ManifestOptions::default()).unwrap();
    verify_manifest(&m, dir.path()).unwrap();

    assert!(logs_contain("manifest.created"));
    assert!(logs_contain("manifest.verified"));
    assert!(logs_contain("eicu"));
}

#[traced_test]
#[test]
fn span_guard_drops_cleanly() {
    {
        let _span = EvaluationSpan::enter("deadbeef");
        obs::emit_run_finished("run_x", 0, 0.0);
    }
    assert!(logs_contain("run.finished"));
}

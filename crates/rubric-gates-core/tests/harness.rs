use std::fs;

use rubric_gates_core::config::bundled_rubrics_dir;
use rubric_gates_core::{
    create_run_config, registry, verify_certificate_file, BenchmarkHarness, DatasetSpec,
};
use serde_json::{json, Value};

fn artifact() -> Value {
    json!({"deterministic_executor": "duckdb+sql", "version": "1.0.0"})
}

fn context(jaccard: f64) -> Value {
    json!({
        "provenance": {"audit_trace_id": "trace_bench"},
        "index_time": "2024-01-01T00:00:00Z",
        "sql_executed": true,
        "cohort_jaccard": jaccard
    })
}

fn harness(out: &std::path::Path, datasets: &[&str]) -> BenchmarkHarness {
    let specs = datasets
        .iter()
        .map(|id| DatasetSpec::from(registry::get(id).unwrap()))
        .collect();
    let mut config = create_run_config(specs, out, 7);
    config.rubrics_dir = Some(bundled_rubrics_dir());
    BenchmarkHarness::new(config).unwrap()
}

#[test]
fn run_counts_decisions_per_dataset() {
    let out = tempfile::tempdir().unwrap();
    let h = harness(out.path(), &["mimic_iv", "eicu"]);

    let result = h
        .run(|spec| match spec.id.as_str() {
            "mimic_iv" => vec![
                (artifact(), context(0.9)),
                (artifact(), context(0.4)),
                (json!({}), context(0.9)),
            ],
            _ => vec![(artifact(), context(0.95))],
        })
        .unwrap();

    let mimic = &result.dataset_results[0];
    assert_eq!(mimic.dataset_id, "mimic_iv");
    assert_eq!(
        (mimic.artifact_count, mimic.pass_count, mimic.revise_count, mimic.block_count),
        (3, 1, 1, 1)
    );
    let eicu = &result.dataset_results[1];
    assert_eq!((eicu.artifact_count, eicu.pass_count), (1, 1));

    let s = &result.summary;
    assert_eq!(s.total_datasets, 2);
    assert_eq!(s.total_artifacts, 4);
    assert!((s.pass_rate - 0.5).abs() < 1e-9);
    assert!((s.revise_rate - 0.25).abs() < 1e-9);
    assert!((s.block_rate - 0.25).abs() < 1e-9);
    assert_eq!(result.rubric_versions.len(), 3);
}

#[test]
fn certificates_carry_dataset_provenance() {
    let out = tempfile::tempdir().unwrap();
    let h = harness(out.path(), &["hirid"]);
    let result = h.run(|_| vec![(artifact(), context(0.9))]).unwrap();

    let cert = &result.dataset_results[0].certificates[0];
    assert_eq!(cert.provenance.audit_trace_id, "trace_bench");
    assert_eq!(cert.provenance.extra["dataset_id"], json!("hirid"));
    assert_eq!(cert.provenance.extra["dataset_version"], json!("1.1.1"));
}

#[test]
fn run_directory_layout() {
    let out = tempfile::tempdir().unwrap();
    let h = harness(out.path(), &["mimic_iv", "amsterdamumcdb"]);
    let result = h
        .run(|spec| {
            if spec.id == "mimic_iv" {
                vec![(artifact(), context(0.9)), (artifact(), context(0.1))]
            } else {
                Vec::new()
            }
        })
        .unwrap();

    let run_dir = out.path().join(&result.run_id);
    assert_eq!(run_dir, h.run_dir());

    let summary: Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["run_id"], json!(result.run_id));
    assert_eq!(summary["summary"]["total_artifacts"], json!(2));
    assert_eq!(summary["datasets"][0]["dataset_id"], json!("mimic_iv"));
    assert!(summary["datasets"][0].get("certificates").is_none());

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("run_manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["config"]["seed"], json!(7));
    assert_eq!(manifest["datasets"][1]["id"], json!("amsterdamumcdb"));

    for name in ["certificate_0000.json", "certificate_0001.json"] {
        let path = run_dir.join("mimic_iv").join(name);
        let verdict = verify_certificate_file(&path, None).unwrap();
        assert!(verdict.is_valid, "{name}: {:?}", verdict.errors);
    }
    assert!(!run_dir.join("mimic_iv/certificate_0002.json").exists());
    assert!(run_dir.join("amsterdamumcdb").is_dir());
}

#[test]
fn empty_run_has_zero_rates() {
    let out = tempfile::tempdir().unwrap();
    let h = harness(out.path(), &["mimic_iii"]);
    let result = h.run(|_| Vec::new()).unwrap();
    assert_eq!(result.summary.total_artifacts, 0);
    assert_eq!(result.summary.pass_rate, 0.0);
    assert_eq!(result.summary.revise_rate, 0.0);
}

#[test]
fn missing_rubrics_dir_fails_construction() {
    let out = tempfile::tempdir().unwrap();
    let mut config = create_run_config(Vec::new(), out.path(), 1);
    config.rubrics_dir = Some(out.path().join("no-rubrics"));
    assert!(BenchmarkHarness::new(config).is_err());
}

use std::fs;
use std::path::Path;

use rubric_gates_core::{create_manifest, verify_manifest, DatasetManifest, ManifestOptions};

fn populate(root: &Path) {
    fs::create_dir_all(root.join("hosp")).unwrap();
    fs::create_dir_all(root.join("icu")).unwrap();
    fs::write(root.join("hosp/patients.csv"), "subject_id,anchor_age\n1,54\n2,71\n").unwrap();
    fs::write(root.join("hosp/admissions.csv"), "hadm_id,subject_id\n10,1\n").unwrap();
    fs::write(root.join("icu/icustays.csv"), "stay_id,los\n100,2.5\n").unwrap();
}

fn manifest_for(root: &Path) -> DatasetManifest {
    create_manifest(root, "mimic_iv", "2.2", &ManifestOptions::default()).unwrap()
}

// ---- Merkle stability ----

#[test]
fn root_is_stable_across_recreation() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    assert_eq!(manifest_for(dir.path()).root_hash, manifest_for(dir.path()).root_hash);
}

#[test]
fn root_ignores_layout_when_content_is_unchanged() {
    let a = tempfile::tempdir().unwrap();
    populate(a.path());

    // same bytes, different names and nesting
    let b = tempfile::tempdir().unwrap();
    fs::create_dir_all(b.path().join("z/y")).unwrap();
    fs::copy(a.path().join("icu/icustays.csv"), b.path().join("a_first.csv")).unwrap();
    fs::copy(a.path().join("hosp/patients.csv"), b.path().join("z/y/p.csv")).unwrap();
    fs::copy(a.path().join("hosp/admissions.csv"), b.path().join("z/adm.csv")).unwrap();

    assert_eq!(manifest_for(a.path()).root_hash, manifest_for(b.path()).root_hash);
}

#[test]
fn one_byte_changes_root() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let before = manifest_for(dir.path()).root_hash;
    fs::write(dir.path().join("icu/icustays.csv"), "stay_id,los\n100,2.6\n").unwrap();
    assert_ne!(manifest_for(dir.path()).root_hash, before);
}

// ---- Verification ----

#[test]
fn untouched_dataset_verifies() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let m = manifest_for(dir.path());
    let v = verify_manifest(&m, dir.path()).unwrap();
    assert!(v.is_valid, "{:?}", v.errors);
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let m = manifest_for(dir.path());
    fs::remove_file(dir.path().join("hosp/admissions.csv")).unwrap();

    let v = verify_manifest(&m, dir.path()).unwrap();
    assert!(!v.is_valid);
    assert_eq!(v.errors[0], "Missing file: hosp/admissions.csv");
    assert!(v.errors.iter().any(|e| e.starts_with("Merkle root mismatch")));
}

#[test]
fn resized_file_reports_sizes_only() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let m = manifest_for(dir.path());
    let expected = m
        .files
        .iter()
        .find(|f| f.path == "icu/icustays.csv")
        .unwrap()
        .size_bytes;
    fs::write(dir.path().join("icu/icustays.csv"), "stay_id,los\n").unwrap();

    let v = verify_manifest(&m, dir.path()).unwrap();
    assert_eq!(
        v.errors[0],
        format!("Size mismatch for icu/icustays.csv: expected {expected}, got 12")
    );
    assert!(!v.errors.iter().any(|e| e.starts_with("Hash mismatch")));
}

#[test]
fn modified_file_reports_both_hashes() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let m = manifest_for(dir.path());
    let entry = m
        .files
        .iter()
        .find(|f| f.path == "hosp/patients.csv")
        .unwrap()
        .clone();
    // same length, different bytes
    fs::write(dir.path().join("hosp/patients.csv"), "subject_id,anchor_age\n1,54\n2,72\n").unwrap();

    let v = verify_manifest(&m, dir.path()).unwrap();
    assert_eq!(v.errors.len(), 2, "{:?}", v.errors);
    assert!(v.errors[0].starts_with(&format!(
        "Hash mismatch for hosp/patients.csv: expected {}, got ",
        entry.sha256
    )));
    assert!(v.errors[1].starts_with("Merkle root mismatch"));
}

#[test]
fn extra_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let m = manifest_for(dir.path());
    fs::write(dir.path().join("icu/chartevents.csv"), "x\n").unwrap();

    let v = verify_manifest(&m, dir.path()).unwrap();
    assert_eq!(v.errors[0], "Unexpected file: icu/chartevents.csv");
    assert!(v.errors[1].starts_with(&format!("Merkle root mismatch: expected {}, got ", m.root_hash)));
}

#[test]
fn default_excludes_skip_noise() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git/HEAD"), "ref: main").unwrap();
    fs::write(dir.path().join("hosp/.DS_Store"), "").unwrap();
    fs::write(dir.path().join("load.log"), "ok").unwrap();

    let m = manifest_for(dir.path());
    assert_eq!(m.total_files, 3);

    fs::write(dir.path().join("icu/debug.log"), "later noise").unwrap();
    assert!(verify_manifest(&m, dir.path()).unwrap().is_valid);
}

#[test]
fn manifest_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let m = create_manifest(
        dir.path(),
        "mimic_iv",
        "2.2",
        &ManifestOptions::default()
            .with_source("https://physionet.org/content/mimiciv/")
            .with_created_by("etl-bot"),
    )
    .unwrap();

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("manifest.json");
    m.save(&path).unwrap();
    let loaded = DatasetManifest::load(&path).unwrap();
    assert_eq!(loaded, m);
    assert!(verify_manifest(&loaded, dir.path()).unwrap().is_valid);
}

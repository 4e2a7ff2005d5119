//! Rubric Gates core library.
//!
//! Evaluates machine-generated clinical artifacts against tiered rubric
//! suites, folds the results into an approve / revise / block decision and
//! issues certificates that anyone can verify offline. Dataset manifests bind
//! the input data by Merkle root.

pub mod certificate;
pub mod checks;
pub mod clock;
pub mod config;
pub mod digest;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod harness;
pub mod manifest;
pub mod obs;
pub mod registry;
pub mod rubric;
pub mod schema;
pub mod telemetry;
pub mod verify;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use certificate::{Certificate, CertificateRubrics, CertificateService, Provenance, TierRecord};
pub use checks::{CheckEngine, CheckFault, CheckKind, CheckResult, TierResult};
pub use clock::{Clock, FixedClock, FixedIds, IdGenerator, RandomIds, SystemClock};
pub use config::{EvaluatorConfig, UnknownCheckPolicy};
pub use digest::{sha256_file, Digest};
pub use error::{GateError, Result};
pub use evaluator::{EvaluationResult, RubricEvaluator};
pub use gate::{decide, Decision, GateDecision};
pub use harness::{
    create_run_config, generate_run_manifest, BenchmarkHarness, BenchmarkResult,
    BenchmarkSummary, DatasetResult, DatasetSpec, RunConfig,
};
pub use manifest::{
    create_manifest, merkle_root, verify_manifest, DatasetManifest, FileInfo, ManifestOptions,
    ManifestVerification,
};
pub use registry::DatasetInfo;
pub use rubric::catalog::load_rubric_file;
pub use rubric::{GateAction, RubricCatalog, RubricCheck, RubricSuite, Severity, SkippedRubric, Tier};
pub use schema::{SchemaValidator, SchemaViolation};
pub use verify::{verify_certificate, verify_certificate_file, CertificateVerifier, VerifyResult};

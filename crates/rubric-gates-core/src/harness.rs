//! Benchmark harness: evaluate many artifacts per dataset and persist the
//! certificates plus a reproducibility summary.
//!
//! Output layout:
//!
//! ```text
//! <output_dir>/<run_id>/
//!   run_manifest.json
//!   summary.json
//!   <dataset_id>/certificate_0000.json
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::certificate::{Certificate, CertificateService};
use crate::config::EvaluatorConfig;
use crate::evaluator::RubricEvaluator;
use crate::gate::Decision;
use crate::obs;
use crate::registry::DatasetInfo;

pub const RUN_MANIFEST_SCHEMA_URI: &str =
    "https://github.com/Medtwin-ai/rubric-gates/schemas/run_manifest.schema.json";

pub const DEFAULT_OUTPUT_DIR: &str = "./runs";
pub const DEFAULT_SEED: u64 = 42;

/// A dataset taking part in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub id: String,
    pub name: String,
    /// e.g. `physionet/mimiciv` or a local path.
    pub source: String,
    pub version: String,
    /// SHA-256 (or manifest root) of the dataset bundle.
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub adapter: Option<String>,
}

impl From<&DatasetInfo> for DatasetSpec {
    fn from(info: &DatasetInfo) -> Self {
        Self {
            id: info.id.to_string(),
            name: info.name.to_string(),
            source: info.source.to_string(),
            version: info.version.to_string(),
            hash: None,
            adapter: Some(info.adapter.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_id: String,
    pub datasets: Vec<DatasetSpec>,
    #[serde(default)]
    pub rubrics_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub seed: u64,
}

/// `run_<YYYYmmdd_HHMMSS>_<8 hex>`.
pub fn new_run_id(now: DateTime<Utc>, nonce: Uuid) -> String {
    let hex = nonce.simple().to_string();
    format!("run_{}_{}", now.format("%Y%m%d_%H%M%S"), &hex[..8])
}

/// Build a run config with a fresh run id.
pub fn create_run_config(
    datasets: Vec<DatasetSpec>,
    output_dir: impl Into<PathBuf>,
    seed: u64,
) -> RunConfig {
    RunConfig {
        run_id: new_run_id(Utc::now(), Uuid::new_v4()),
        datasets,
        rubrics_dir: None,
        output_dir: output_dir.into(),
        seed,
    }
}

/// The reproducibility record for a run: datasets, rubric versions, seed.
pub fn generate_run_manifest(config: &RunConfig, rubric_versions: &BTreeMap<String, String>) -> Value {
    let datasets: Vec<Value> = config
        .datasets
        .iter()
        .map(|ds| {
            json!({
                "id": ds.id,
                "name": ds.name,
                "source": ds.source,
                "version": ds.version,
                "hash": ds.hash,
            })
        })
        .collect();

    json!({
        "$schema": RUN_MANIFEST_SCHEMA_URI,
        "run_id": config.run_id,
        "created_at": Utc::now().to_rfc3339(),
        "datasets": datasets,
        "rubric_versions": rubric_versions,
        "config": {
            "seed": config.seed,
            "rubrics_dir": config.rubrics_dir,
        },
    })
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetResult {
    pub dataset_id: String,
    pub artifact_count: usize,
    pub pass_count: usize,
    pub revise_count: usize,
    pub block_count: usize,
    #[serde(skip)]
    pub certificates: Vec<Certificate>,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    pub total_datasets: usize,
    pub total_artifacts: usize,
    pub pass_rate: f64,
    pub revise_rate: f64,
    pub block_rate: f64,
    pub total_duration_seconds: f64,
}

impl BenchmarkSummary {
    fn from_results(results: &[DatasetResult]) -> Self {
        let total: usize = results.iter().map(|r| r.artifact_count).sum();
        let rate = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };
        Self {
            total_datasets: results.len(),
            total_artifacts: total,
            pass_rate: rate(results.iter().map(|r| r.pass_count).sum()),
            revise_rate: rate(results.iter().map(|r| r.revise_count).sum()),
            block_rate: rate(results.iter().map(|r| r.block_count).sum()),
            total_duration_seconds: results.iter().map(|r| r.duration_seconds).sum(),
        }
    }
}

/// Serialized as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub rubric_versions: BTreeMap<String, String>,
    pub summary: BenchmarkSummary,
    #[serde(rename = "datasets")]
    pub dataset_results: Vec<DatasetResult>,
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct BenchmarkHarness {
    config: RunConfig,
    evaluator: RubricEvaluator,
    certificates: CertificateService,
}

impl BenchmarkHarness {
    /// Load rubrics (config dir, else environment, else bundled) and prepare
    /// the output directory.
    pub fn new(config: RunConfig) -> Result<Self> {
        let mut evaluator_config = EvaluatorConfig::from_env()?;
        if let Some(dir) = &config.rubrics_dir {
            evaluator_config = evaluator_config.with_rubrics_dir(dir.clone());
        }
        let evaluator = RubricEvaluator::new(&evaluator_config).context("load rubric catalog")?;
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("create output dir {:?}", config.output_dir))?;
        Ok(Self {
            config,
            evaluator,
            certificates: CertificateService::new(),
        })
    }

    pub fn with_certificate_service(mut self, certificates: CertificateService) -> Self {
        self.certificates = certificates;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run_dir(&self) -> PathBuf {
        self.config.output_dir.join(&self.config.run_id)
    }

    pub fn run_manifest(&self) -> Value {
        generate_run_manifest(&self.config, &self.evaluator.catalog().versions())
    }

    /// Evaluate every `(artifact, context)` pair `generator` yields for each
    /// dataset, then write the run directory.
    pub fn run<F>(&self, mut generator: F) -> Result<BenchmarkResult>
    where
        F: FnMut(&DatasetSpec) -> Vec<(Value, Value)>,
    {
        let _span = obs::RunSpan::enter(&self.config.run_id);
        let started_at = Utc::now();

        let dataset_results: Vec<DatasetResult> = self
            .config
            .datasets
            .iter()
            .map(|spec| self.evaluate_dataset(spec, generator(spec)))
            .collect();

        let result = BenchmarkResult {
            run_id: self.config.run_id.clone(),
            started_at,
            completed_at: Utc::now(),
            rubric_versions: self.evaluator.catalog().versions(),
            summary: BenchmarkSummary::from_results(&dataset_results),
            dataset_results,
        };

        self.save(&result)?;
        obs::emit_run_finished(
            &result.run_id,
            result.summary.total_artifacts,
            result.summary.pass_rate,
        );
        Ok(result)
    }

    fn evaluate_dataset(&self, spec: &DatasetSpec, pairs: Vec<(Value, Value)>) -> DatasetResult {
        let start = Instant::now();
        let mut result = DatasetResult {
            dataset_id: spec.id.clone(),
            artifact_count: 0,
            pass_count: 0,
            revise_count: 0,
            block_count: 0,
            certificates: Vec::with_capacity(pairs.len()),
            duration_seconds: 0.0,
        };

        for (artifact, mut context) in pairs {
            let provenance = inject_provenance(&mut context, spec);
            let evaluation = self.evaluator.evaluate(&artifact, Some(&context));
            let certificate = self.certificates.create(&artifact, &evaluation, &provenance);

            match certificate.gate_decision.decision {
                Decision::Approve => result.pass_count += 1,
                Decision::Revise => result.revise_count += 1,
                Decision::Block => result.block_count += 1,
            }
            result.certificates.push(certificate);
        }

        result.artifact_count = result.certificates.len();
        result.duration_seconds = start.elapsed().as_secs_f64();
        obs::emit_dataset_evaluated(&spec.id, result.artifact_count, result.duration_seconds);
        result
    }

    fn save(&self, result: &BenchmarkResult) -> Result<()> {
        let run_dir = self.run_dir();
        fs::create_dir_all(&run_dir).with_context(|| format!("create {:?}", run_dir))?;

        write_json(&run_dir.join("run_manifest.json"), &self.run_manifest())?;
        write_json(&run_dir.join("summary.json"), result)?;

        for ds in &result.dataset_results {
            let ds_dir = run_dir.join(&ds.dataset_id);
            fs::create_dir_all(&ds_dir).with_context(|| format!("create {:?}", ds_dir))?;
            for (i, cert) in ds.certificates.iter().enumerate() {
                write_json(&ds_dir.join(format!("certificate_{i:04}.json")), cert)?;
            }
        }
        Ok(())
    }
}

/// Force `context.provenance` to an object carrying the dataset id and
/// version, and return a copy of it.
fn inject_provenance(context: &mut Value, spec: &DatasetSpec) -> Map<String, Value> {
    if !context.is_object() {
        *context = Value::Object(Map::new());
    }
    let Value::Object(ctx) = context else {
        return Map::new();
    };
    let provenance = ctx
        .entry("provenance")
        .or_insert_with(|| Value::Object(Map::new()));
    if !provenance.is_object() {
        *provenance = Value::Object(Map::new());
    }
    let Value::Object(prov) = provenance else {
        return Map::new();
    };
    prov.insert("dataset_id".to_string(), Value::from(spec.id.clone()));
    prov.insert("dataset_version".to_string(), Value::from(spec.version.clone()));
    prov.clone()
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("serialize json")?;
    fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

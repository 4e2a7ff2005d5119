//! Rubric Gates CLI
//!
//! The `rubric-gates` command is the trust terminal: anyone can evaluate an
//! artifact, verify a certificate or pin a dataset without the generator that
//! produced the artifact.
//!
//! ## Commands
//!
//! - `evaluate`: Run an artifact through the rubric tiers and emit a certificate
//! - `verify`: Check a certificate against the schema and, optionally, its artifact
//! - `manifest create|verify`: Pin or check a dataset directory by Merkle root
//! - `info`: Show the loaded rubric suites
//! - `datasets`: List the known clinical datasets

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};

use rubric_gates_core::config::{RUBRICS_DIR_ENV, UNKNOWN_CHECKS_ENV};
use rubric_gates_core::manifest::DEFAULT_EXCLUDES;
use rubric_gates_core::{
    create_manifest, registry, verify_manifest, CertificateService, CertificateVerifier,
    DatasetManifest, Decision, EvaluatorConfig, ManifestOptions, RubricCatalog, RubricEvaluator,
    Tier, UnknownCheckPolicy,
};

/// Exit code when `evaluate` could not run at all.
const EXIT_EVALUATION_ERROR: u8 = 3;

#[derive(Parser)]
#[command(name = "rubric-gates")]
#[command(version = rubric_gates_core::VERSION)]
#[command(
    about = "Rubric Gates: evaluate artifacts, verify certificates, pin datasets",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an artifact and emit a certificate
    ///
    /// Exit code: 0 approve, 1 revise, 2 block, 3 evaluation error.
    Evaluate {
        /// Path to artifact metadata JSON
        artifact: PathBuf,

        /// Path to evaluation context JSON
        #[arg(long)]
        context: Option<PathBuf>,

        /// Rubrics root containing tier1/, tier2/, tier3/
        #[arg(long, env = RUBRICS_DIR_ENV)]
        rubrics_dir: Option<PathBuf>,

        /// How to treat checks the engine does not know
        #[arg(long, env = UNKNOWN_CHECKS_ENV)]
        unknown_checks: Option<UnknownCheckPolicy>,

        /// Write the certificate here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a certificate
    Verify {
        /// Path to certificate JSON
        certificate: PathBuf,

        /// Artifact file whose SHA-256 must match `artifact.hash`
        #[arg(long)]
        artifact: Option<PathBuf>,
    },

    /// Create or verify dataset manifests
    Manifest {
        #[command(subcommand)]
        action: ManifestAction,
    },

    /// Show loaded rubric suites
    Info {
        /// Rubrics root containing tier1/, tier2/, tier3/
        #[arg(long, env = RUBRICS_DIR_ENV)]
        rubrics_dir: Option<PathBuf>,
    },

    /// List known datasets
    Datasets,
}

#[derive(Subcommand)]
enum ManifestAction {
    /// Hash a dataset directory into a manifest
    Create {
        /// Dataset directory
        dir: PathBuf,

        #[arg(long)]
        dataset_id: String,

        #[arg(long)]
        version: String,

        /// Source URL or description
        #[arg(long, default_value = "")]
        source: String,

        /// Exclusion glob (repeatable; replaces the defaults)
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Write the manifest here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a dataset directory against a manifest
    Verify {
        /// Manifest JSON
        manifest: PathBuf,

        /// Dataset directory
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    rubric_gates_core::telemetry::init_tracing(cli.json, level);

    let failure_code = match cli.command {
        Commands::Evaluate { .. } => EXIT_EVALUATION_ERROR,
        _ => 1,
    };

    let result = match cli.command {
        Commands::Evaluate {
            artifact,
            context,
            rubrics_dir,
            unknown_checks,
            output,
        } => {
            let mut config = EvaluatorConfig::default();
            if let Some(dir) = rubrics_dir {
                config = config.with_rubrics_dir(dir);
            }
            if let Some(policy) = unknown_checks {
                config = config.with_unknown_check_policy(policy);
            }
            cmd_evaluate(&artifact, context.as_deref(), &config, output.as_deref())
                .map(exit_code_for)
        }
        Commands::Verify {
            certificate,
            artifact,
        } => cmd_verify(&certificate, artifact.as_deref()).map(|ok| u8::from(!ok)),
        Commands::Manifest { action } => match action {
            ManifestAction::Create {
                dir,
                dataset_id,
                version,
                source,
                exclude,
                output,
            } => cmd_manifest_create(
                &dir,
                &dataset_id,
                &version,
                &source,
                &exclude,
                output.as_deref(),
            )
            .map(|_| 0),
            ManifestAction::Verify { manifest, dir } => {
                cmd_manifest_verify(&manifest, &dir).map(|ok| u8::from(!ok))
            }
        },
        Commands::Info { rubrics_dir } => cmd_info(rubrics_dir.as_deref()).map(|_| 0),
        Commands::Datasets => {
            cmd_datasets();
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(failure_code)
        }
    }
}

/// 0 approve, 1 revise, 2 block.
fn exit_code_for(decision: Decision) -> u8 {
    match decision {
        Decision::Approve => 0,
        Decision::Revise => 1,
        Decision::Block => 2,
    }
}

fn read_json_file(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

/// Evaluate an artifact and write or print its certificate.
fn cmd_evaluate(
    artifact_path: &Path,
    context_path: Option<&Path>,
    config: &EvaluatorConfig,
    output: Option<&Path>,
) -> Result<Decision> {
    let artifact = read_json_file(artifact_path)?;
    let context = match context_path {
        Some(path) => read_json_file(path)?,
        None => Value::Object(Map::new()),
    };

    let evaluator = RubricEvaluator::new(config).context("Failed to load rubrics")?;
    let evaluation = evaluator.evaluate(&artifact, Some(&context));

    let provenance = context
        .get("provenance")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let certificate = CertificateService::new().create(&artifact, &evaluation, &provenance);

    if let Some(path) = output {
        certificate
            .save(path)
            .with_context(|| format!("Failed to write certificate to {:?}", path))?;
        println!("Certificate written to {}", path.display());
    } else {
        println!("{}", certificate.to_json_pretty()?);
    }

    let decision = certificate.gate_decision.decision;
    println!("\nGate decision: {decision}");
    for reason in &certificate.gate_decision.blocking_reasons {
        println!("  - {reason}");
    }
    Ok(decision)
}

/// Verify a certificate file. Returns whether it is valid.
fn cmd_verify(certificate: &Path, artifact: Option<&Path>) -> Result<bool> {
    let verifier = CertificateVerifier::new().context("Failed to compile certificate schema")?;
    let result = verifier.verify_file(certificate, artifact);

    if result.is_valid {
        println!("Certificate is valid");
    } else {
        println!("Certificate is invalid");
        for error in &result.errors {
            println!("  - {error}");
        }
    }
    Ok(result.is_valid)
}

fn cmd_manifest_create(
    dir: &Path,
    dataset_id: &str,
    version: &str,
    source: &str,
    exclude: &[String],
    output: Option<&Path>,
) -> Result<DatasetManifest> {
    let mut options = ManifestOptions::default().with_source(source);
    if !exclude.is_empty() {
        options = options.with_exclude(exclude.iter().cloned());
    }
    debug!(?dir, excludes = ?options.exclude, "creating manifest");

    let manifest = create_manifest(dir, dataset_id, version, &options)
        .with_context(|| format!("Failed to create manifest for {:?}", dir))?;

    if let Some(path) = output {
        manifest
            .save(path)
            .with_context(|| format!("Failed to write manifest to {:?}", path))?;
        println!(
            "Manifest written to {} ({} files, root {})",
            path.display(),
            manifest.total_files,
            manifest.root_hash
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    }
    Ok(manifest)
}

/// Verify a dataset directory. Returns whether it matches.
fn cmd_manifest_verify(manifest_path: &Path, dir: &Path) -> Result<bool> {
    let manifest = DatasetManifest::load(manifest_path)
        .with_context(|| format!("Failed to load manifest {:?}", manifest_path))?;
    let result = verify_manifest(&manifest, dir)
        .with_context(|| format!("Failed to verify {:?}", dir))?;

    if result.is_valid {
        println!(
            "Dataset {} v{} matches manifest ({} files)",
            manifest.dataset_id, manifest.version, manifest.total_files
        );
    } else {
        println!("Dataset {} does not match manifest", manifest.dataset_id);
        for error in &result.errors {
            println!("  - {error}");
        }
    }
    Ok(result.is_valid)
}

fn cmd_info(rubrics_dir: Option<&Path>) -> Result<RubricCatalog> {
    let catalog = RubricCatalog::load(rubrics_dir).context("Failed to load rubrics")?;

    println!("Rubric Gates {} - Loaded Rubrics", rubric_gates_core::VERSION);
    if let Some(root) = catalog.root() {
        println!("Root: {}", root.display());
    }
    println!("{}", "=".repeat(50));

    for tier in Tier::ALL {
        println!("\nTier {tier}:");
        let suites = catalog.suites(tier);
        if suites.is_empty() {
            println!("  (no rubrics loaded)");
            continue;
        }
        for suite in suites {
            println!("  {} v{}", suite.id, suite.version);
            if !suite.purpose.is_empty() {
                println!("     {}", suite.purpose.trim());
            }
            println!("     Checks ({}):", suite.checks.len());
            for check in &suite.checks {
                println!(
                    "       - {} [{}] -> {}",
                    check.id, check.severity, check.gate_action
                );
            }
        }
    }

    if !catalog.skipped().is_empty() {
        println!("\nSkipped files:");
        for skipped in catalog.skipped() {
            println!("  - {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    println!("\n{}", "=".repeat(50));
    println!("Total rubric suites: {}", catalog.suite_count());
    Ok(catalog)
}

fn cmd_datasets() {
    println!("{:<16} {:<16} {:<8} CREDENTIALED", "ID", "NAME", "VERSION");
    for ds in registry::list() {
        println!(
            "{:<16} {:<16} {:<8} {}",
            ds.id,
            ds.name,
            ds.version,
            if ds.credentialed { "yes" } else { "no" }
        );
    }
    println!("\nDefault manifest excludes: {}", DEFAULT_EXCLUDES.join(", "));
}

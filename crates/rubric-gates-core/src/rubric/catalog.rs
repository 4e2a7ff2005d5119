//! Rubric catalog: discovers, validates and indexes rubric suites by tier.
//!
//! Layout on disk:
//!
//! ```text
//! <rubrics_dir>/
//!   tier1/*.yaml
//!   tier2/*.yaml
//!   tier3/*.yaml
//! ```
//!
//! Loading is partial-success: a file that cannot be read, parsed or
//! validated is skipped (and recorded in [`RubricCatalog::skipped`]) while the
//! rest of the catalog loads. Only a missing rubrics root is fatal.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{RubricDocument, RubricSuite, Tier};
use crate::config::default_rubrics_dir;
use crate::error::{GateError, Result};
use crate::obs;
use crate::schema::SchemaValidator;

/// A rubric file that was not loaded, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRubric {
    pub path: PathBuf,
    pub reason: String,
}

/// Immutable index of rubric suites by tier.
#[derive(Debug, Clone, Default)]
pub struct RubricCatalog {
    root: Option<PathBuf>,
    suites: BTreeMap<Tier, Vec<RubricSuite>>,
    skipped: Vec<SkippedRubric>,
}

impl RubricCatalog {
    /// Load every suite under `rubrics_dir` (or the default rubrics root).
    ///
    /// Files are visited in sorted order so repeated loads of the same tree
    /// produce the same catalog.
    pub fn load(rubrics_dir: Option<&Path>) -> Result<Self> {
        let root = rubrics_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(default_rubrics_dir);
        let validator = SchemaValidator::rubric()?;
        Self::load_with(&root, &validator)
    }

    /// Load using an already-compiled rubric schema.
    pub fn load_with(root: &Path, validator: &SchemaValidator) -> Result<Self> {
        if !root.is_dir() {
            return Err(GateError::RubricsDirNotFound(root.to_path_buf()));
        }

        let mut catalog = Self {
            root: Some(root.to_path_buf()),
            ..Self::default()
        };

        for tier in Tier::ALL {
            let tier_dir = root.join(tier.dir_name());
            let files = match rubric_files(&tier_dir) {
                Ok(files) => files,
                Err(err) => {
                    catalog.skip(tier_dir, err.to_string());
                    continue;
                }
            };

            for path in files {
                match load_rubric_file(&path, Some(tier), validator) {
                    Ok(suite) => catalog.suites.entry(tier).or_default().push(suite),
                    Err(err) => catalog.skip(path, err.to_string()),
                }
            }
        }

        obs::emit_catalog_loaded(root, catalog.suite_count(), catalog.skipped.len());
        Ok(catalog)
    }

    /// Build a catalog directly from suites, indexed by each suite's tier.
    pub fn from_suites(suites: impl IntoIterator<Item = RubricSuite>) -> Self {
        let mut catalog = Self::default();
        for suite in suites {
            catalog.suites.entry(suite.tier).or_default().push(suite);
        }
        catalog
    }

    fn skip(&mut self, path: PathBuf, reason: String) {
        obs::emit_rubric_skipped(&path, &reason);
        self.skipped.push(SkippedRubric { path, reason });
    }

    /// Root directory this catalog was loaded from, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Suites registered for `tier`, in load order.
    pub fn suites(&self, tier: Tier) -> &[RubricSuite] {
        self.suites.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All suites, tier by tier.
    pub fn all_suites(&self) -> impl Iterator<Item = &RubricSuite> {
        self.suites.values().flatten()
    }

    pub fn suite_count(&self) -> usize {
        self.suites.values().map(Vec::len).sum()
    }

    /// Files that were not loaded.
    pub fn skipped(&self) -> &[SkippedRubric] {
        &self.skipped
    }

    /// `suite_id → version` for every loaded suite.
    pub fn versions(&self) -> BTreeMap<String, String> {
        self.all_suites()
            .map(|s| (s.id.clone(), s.version.clone()))
            .collect()
    }
}

/// Sorted `*.yaml` / `*.yml` files directly under `dir`. A missing tier
/// directory is an empty tier.
fn rubric_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse and validate a single rubric file.
///
/// When `expected_tier` is given, a suite declaring a different tier is
/// rejected.
pub fn load_rubric_file(
    path: &Path,
    expected_tier: Option<Tier>,
    validator: &SchemaValidator,
) -> Result<RubricSuite> {
    let text = fs::read_to_string(path)?;
    let raw: Value = serde_yaml::from_str(&text)?;

    let violations = validator.violations(&raw);
    if !violations.is_empty() {
        let reason = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(invalid(path, reason));
    }

    let doc: RubricDocument = serde_json::from_value(raw)?;
    let suite = doc.rubric_suite;

    if let Some(dup) = suite.duplicate_check_id() {
        return Err(invalid(path, format!("duplicate check id: {dup}")));
    }
    if let Some(expected) = expected_tier {
        if suite.tier != expected {
            return Err(invalid(
                path,
                format!(
                    "suite declares tier {} but lives under {}/",
                    suite.tier,
                    expected.dir_name()
                ),
            ));
        }
    }

    Ok(suite)
}

fn invalid(path: &Path, reason: String) -> GateError {
    GateError::InvalidRubric {
        path: path.to_path_buf(),
        reason,
    }
}

//! Dataset manifests: per-file SHA-256 plus a Merkle root over the set.
//!
//! A manifest pins the exact bytes of a dataset directory. Verification
//! re-enumerates the directory with the exclusion patterns recorded at
//! creation time, so a file added later is reported rather than silently
//! ignored.

mod merkle;
mod walk;

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::digest::sha256_file;
use crate::error::{GateError, Result};
use crate::obs;

pub use merkle::merkle_root;
pub use walk::{glob_match, is_excluded, walk_files, WalkedFile};

pub const MANIFEST_SCHEMA_URI: &str =
    "https://github.com/Medtwin-ai/rubric-gates/schemas/dataset_manifest.schema.json";

/// Patterns excluded when the caller gives none.
pub const DEFAULT_EXCLUDES: &[&str] = &[".DS_Store", "Thumbs.db", "*.log", "__pycache__", ".git"];

/// Metadata key under which the exclusion set is recorded.
pub const EXCLUDE_PATTERNS_KEY: &str = "exclude_patterns";

const DEFAULT_CREATED_BY: &str = "rubric-gates";

/// One file entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub modified_at: String,
}

/// Signed-by-hash description of a dataset directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    #[serde(rename = "$schema", default = "schema_uri")]
    pub schema: String,
    pub dataset_id: String,
    pub version: String,
    pub created_at: String,
    #[serde(default = "unknown")]
    pub created_by: String,
    #[serde(default)]
    pub source: String,
    pub total_files: u64,
    pub total_size_bytes: u64,
    pub root_hash: String,
    #[serde(default)]
    pub files: Vec<FileInfo>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn schema_uri() -> String {
    MANIFEST_SCHEMA_URI.to_string()
}

fn unknown() -> String {
    "unknown".to_string()
}

impl DatasetManifest {
    /// Exclusion patterns recorded at creation, or the defaults for manifests
    /// that predate the record.
    pub fn exclude_patterns(&self) -> Vec<String> {
        match self.metadata.get(EXCLUDE_PATTERNS_KEY).and_then(Value::as_array) {
            Some(list) => list
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => default_excludes(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Optional inputs to [`create_manifest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestOptions {
    pub source: String,
    pub created_by: String,
    pub metadata: Map<String, Value>,
    pub exclude: Vec<String>,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            source: String::new(),
            created_by: DEFAULT_CREATED_BY.to_string(),
            metadata: Map::new(),
            exclude: default_excludes(),
        }
    }
}

impl ManifestOptions {
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replace the exclusion set.
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }
}

/// Hash every file under `dir` and build the manifest.
pub fn create_manifest(
    dir: &Path,
    dataset_id: &str,
    version: &str,
    options: &ManifestOptions,
) -> Result<DatasetManifest> {
    if !dir.is_dir() {
        return Err(GateError::DatasetDirNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut total_size_bytes = 0u64;
    for walked in walk_files(dir, &options.exclude)? {
        let meta = fs::metadata(&walked.path)?;
        let modified_at: DateTime<Utc> = meta.modified()?.into();
        total_size_bytes += meta.len();
        files.push(FileInfo {
            sha256: sha256_file(&walked.path)?,
            path: walked.rel_path,
            size_bytes: meta.len(),
            modified_at: modified_at.to_rfc3339(),
        });
    }

    let hashes: Vec<&str> = files.iter().map(|f| f.sha256.as_str()).collect();
    let root_hash = merkle_root(&hashes);

    let mut metadata = options.metadata.clone();
    metadata.insert(
        EXCLUDE_PATTERNS_KEY.to_string(),
        Value::from(options.exclude.clone()),
    );

    let manifest = DatasetManifest {
        schema: schema_uri(),
        dataset_id: dataset_id.to_string(),
        version: version.to_string(),
        created_at: Utc::now().to_rfc3339(),
        created_by: options.created_by.clone(),
        source: options.source.clone(),
        total_files: files.len() as u64,
        total_size_bytes,
        root_hash,
        files,
        metadata,
    };

    obs::emit_manifest_created(
        &manifest.dataset_id,
        manifest.total_files,
        &manifest.root_hash,
    );
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Outcome of [`verify_manifest`]. `is_valid` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestVerification {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Check `dir` against `manifest`, accumulating every discrepancy.
///
/// Only a missing directory or a failed enumeration is an `Err`.
pub fn verify_manifest(manifest: &DatasetManifest, dir: &Path) -> Result<ManifestVerification> {
    if !dir.is_dir() {
        return Err(GateError::DatasetDirNotFound(dir.to_path_buf()));
    }

    let present = walk_files(dir, &manifest.exclude_patterns())?;
    let mut hashes = HashCache::default();
    let mut errors = Vec::new();

    for entry in &manifest.files {
        let path = dir.join(&entry.path);
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                errors.push(format!("Missing file: {}", entry.path));
                continue;
            }
        };

        if meta.len() != entry.size_bytes {
            errors.push(format!(
                "Size mismatch for {}: expected {}, got {}",
                entry.path,
                entry.size_bytes,
                meta.len()
            ));
            continue;
        }

        match hashes.get(&entry.path, &path) {
            Ok(actual) if actual != entry.sha256 => errors.push(format!(
                "Hash mismatch for {}: expected {}, got {}",
                entry.path, entry.sha256, actual
            )),
            Ok(_) => {}
            Err(err) => errors.push(format!("Cannot read {}: {err}", entry.path)),
        }
    }

    let listed: BTreeSet<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    let mut current = Vec::with_capacity(present.len());
    for file in &present {
        if !listed.contains(file.rel_path.as_str()) {
            errors.push(format!("Unexpected file: {}", file.rel_path));
        }
        match hashes.get(&file.rel_path, &file.path) {
            Ok(hash) => current.push(hash),
            Err(err) => errors.push(format!("Cannot read {}: {err}", file.rel_path)),
        }
    }

    let current_root = merkle_root(&current);
    if current_root != manifest.root_hash {
        errors.push(format!(
            "Merkle root mismatch: expected {}, got {}",
            manifest.root_hash, current_root
        ));
    }

    let verification = ManifestVerification {
        is_valid: errors.is_empty(),
        errors,
    };
    obs::emit_manifest_verified(
        &manifest.dataset_id,
        verification.is_valid,
        verification.errors.len(),
    );
    Ok(verification)
}

/// Each file is hashed at most once per verification.
#[derive(Default)]
struct HashCache {
    by_path: HashMap<String, String>,
}

impl HashCache {
    fn get(&mut self, rel_path: &str, path: &Path) -> std::io::Result<String> {
        if let Some(hash) = self.by_path.get(rel_path) {
            return Ok(hash.clone());
        }
        let hash = sha256_file(path)?;
        self.by_path.insert(rel_path.to_string(), hash.clone());
        Ok(hash)
    }
}

//! Error taxonomy for Rubric Gates.
//!
//! Only conditions that stop an enclosing operation outright live here.
//! Per-file, per-check and per-rubric problems are recovered at the smallest
//! unit and surfaced as structured results instead.

use std::path::PathBuf;

/// Rubric Gates errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("rubrics directory not found: {}", .0.display())]
    RubricsDirNotFound(PathBuf),

    #[error("dataset directory does not exist: {}", .0.display())]
    DatasetDirNotFound(PathBuf),

    #[error("invalid rubric file {}: {reason}", .path.display())]
    InvalidRubric { path: PathBuf, reason: String },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Rubric Gates operations.
pub type Result<T> = std::result::Result<T, GateError>;

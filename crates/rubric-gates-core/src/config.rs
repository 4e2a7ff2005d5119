//! Evaluator configuration.
//!
//! Defaults come from the environment when set:
//! - `RUBRIC_GATES_RUBRICS_DIR`: rubrics root (otherwise the bundled set)
//! - `RUBRIC_GATES_UNKNOWN_CHECKS`: `fail_open` (default) or `fail_closed`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GateError;

pub const RUBRICS_DIR_ENV: &str = "RUBRIC_GATES_RUBRICS_DIR";
pub const UNKNOWN_CHECKS_ENV: &str = "RUBRIC_GATES_UNKNOWN_CHECKS";

/// What the check engine does with a rubric check it has no predicate for.
///
/// Newer rubric files routinely reference checks an older engine has never
/// heard of; `FailOpen` keeps those evaluations passing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCheckPolicy {
    #[default]
    FailOpen,
    FailClosed,
}

impl fmt::Display for UnknownCheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailOpen => f.write_str("fail_open"),
            Self::FailClosed => f.write_str("fail_closed"),
        }
    }
}

impl FromStr for UnknownCheckPolicy {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => Err(GateError::Config(format!(
                "unknown check policy '{other}' (expected fail_open or fail_closed)"
            ))),
        }
    }
}

/// Configuration for a [`crate::RubricEvaluator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Rubrics root containing `tier1/`, `tier2/`, `tier3/`. `None` means the
    /// environment override or the bundled rubric set.
    pub rubrics_dir: Option<PathBuf>,
    pub unknown_check_policy: UnknownCheckPolicy,
}

impl EvaluatorConfig {
    /// Build a config from `RUBRIC_GATES_*` environment variables.
    ///
    /// An unparseable policy value is an error rather than a silent default.
    pub fn from_env() -> crate::Result<Self> {
        let rubrics_dir = std::env::var_os(RUBRICS_DIR_ENV).map(PathBuf::from);
        let unknown_check_policy = match std::env::var(UNKNOWN_CHECKS_ENV) {
            Ok(raw) => raw.parse()?,
            Err(_) => UnknownCheckPolicy::default(),
        };
        Ok(Self {
            rubrics_dir,
            unknown_check_policy,
        })
    }

    /// Use a specific rubrics directory.
    pub fn with_rubrics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rubrics_dir = Some(dir.into());
        self
    }

    /// Override the unknown-check policy.
    pub fn with_unknown_check_policy(mut self, policy: UnknownCheckPolicy) -> Self {
        self.unknown_check_policy = policy;
        self
    }

    /// The directory the catalog will actually load from.
    pub fn resolved_rubrics_dir(&self) -> PathBuf {
        match &self.rubrics_dir {
            Some(dir) => dir.clone(),
            None => default_rubrics_dir(),
        }
    }
}

/// `$RUBRIC_GATES_RUBRICS_DIR`, or the rubric set bundled with this crate.
pub fn default_rubrics_dir() -> PathBuf {
    std::env::var_os(RUBRICS_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(bundled_rubrics_dir)
}

/// The rubric set shipped alongside this crate's sources.
pub fn bundled_rubrics_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("rubrics")
}

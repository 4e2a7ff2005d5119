//! Rubric definitions: tiers, checks and suites.
//!
//! A [`RubricSuite`] is a versioned bundle of [`RubricCheck`]s belonging to
//! exactly one [`Tier`]. Suites are loaded from YAML by the
//! [`catalog::RubricCatalog`] and never mutated afterwards.

pub mod catalog;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub use catalog::{RubricCatalog, SkippedRubric};

/// Escalating severity band a suite belongs to.
///
/// Tier 1 is constitutional (always blocking), tier 2 holds clinical
/// invariants (blocking), tier 3 holds task benchmarks (revise only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Tier {
    /// All tiers in evaluation order.
    pub const ALL: [Tier; 3] = [Tier::One, Tier::Two, Tier::Three];

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Subdirectory of the rubrics root holding this tier's suites.
    pub fn dir_name(self) -> &'static str {
        match self {
            Tier::One => "tier1",
            Tier::Two => "tier2",
            Tier::Three => "tier3",
        }
    }

    /// Key under `rubrics` in a certificate.
    pub fn certificate_key(self) -> &'static str {
        match self {
            Tier::One => "tier_1",
            Tier::Two => "tier_2",
            Tier::Three => "tier_3",
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::One),
            2 => Ok(Tier::Two),
            3 => Ok(Tier::Three),
            other => Err(format!("tier must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.number()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// How bad a failing check is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

/// What a failing check asks the gate to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    Block,
    Revise,
    Warn,
    HumanReview,
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateAction::Block => "block",
            GateAction::Revise => "revise",
            GateAction::Warn => "warn",
            GateAction::HumanReview => "human_review",
        };
        f.write_str(s)
    }
}

/// A single check definition inside a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCheck {
    /// Stable identifier, e.g. `tier3.cohort_overlap_jaccard`.
    pub id: String,
    pub description: String,
    pub check_type: String,
    pub severity: Severity,
    /// Older rubric files spell this key `gate`.
    #[serde(alias = "gate")]
    pub gate_action: GateAction,
    #[serde(default)]
    pub required_fixes: Vec<String>,
    /// Check-specific scoring parameters (e.g. `threshold`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<Map<String, Value>>,
}

impl RubricCheck {
    /// Numeric scoring parameter `key`, as written in the rubric.
    pub fn scoring_number(&self, key: &str) -> Option<&Number> {
        match self.scoring.as_ref()?.get(key)? {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }
}

/// A versioned collection of checks for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricSuite {
    pub id: String,
    pub tier: Tier,
    pub version: String,
    #[serde(default)]
    pub purpose: String,
    pub checks: Vec<RubricCheck>,
}

impl RubricSuite {
    /// Look up a check by id.
    pub fn get_check(&self, check_id: &str) -> Option<&RubricCheck> {
        self.checks.iter().find(|c| c.id == check_id)
    }

    /// First check id that appears more than once, if any.
    pub fn duplicate_check_id(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.checks
            .iter()
            .map(|c| c.id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

/// On-disk envelope: the suite lives under a `rubric_suite` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RubricDocument {
    pub rubric_suite: RubricSuite,
}

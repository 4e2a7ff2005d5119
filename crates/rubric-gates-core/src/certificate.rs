//! Certificate construction.
//!
//! A [`Certificate`] binds artifact metadata, the three tier results, the
//! gate decision, rubric versions and provenance into one immutable record.
//! Only `certificate_id` and `created_at` differ between two certificates
//! built from identical inputs; both come from injectable providers.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::checks::{CheckResult, TierResult};
use crate::clock::{Clock, IdGenerator, RandomIds, SystemClock};
use crate::error::Result;
use crate::evaluator::EvaluationResult;
use crate::gate::GateDecision;
use crate::obs;
use crate::rubric::Tier;

/// One tier as embedded in a certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRecord {
    pub pass: bool,
    pub checks: Vec<CheckResult>,
}

impl TierRecord {
    /// Stand-in for a tier that was not evaluated.
    pub fn vacuous() -> Self {
        Self {
            pass: true,
            checks: Vec::new(),
        }
    }
}

impl From<&TierResult> for TierRecord {
    fn from(result: &TierResult) -> Self {
        Self {
            pass: result.passed,
            checks: result.checks.clone(),
        }
    }
}

/// The `rubrics` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRubrics {
    pub tier_1: TierRecord,
    pub tier_2: TierRecord,
    pub tier_3: TierRecord,
}

impl CertificateRubrics {
    fn from_results(results: &BTreeMap<Tier, TierResult>) -> Self {
        let record = |tier: Tier| {
            results
                .get(&tier)
                .map(TierRecord::from)
                .unwrap_or_else(TierRecord::vacuous)
        };
        Self {
            tier_1: record(Tier::One),
            tier_2: record(Tier::Two),
            tier_3: record(Tier::Three),
        }
    }

    pub fn get(&self, tier: Tier) -> &TierRecord {
        match tier {
            Tier::One => &self.tier_1,
            Tier::Two => &self.tier_2,
            Tier::Three => &self.tier_3,
        }
    }
}

/// The `provenance` block. Caller-supplied keys other than the two ids are
/// carried through unchanged in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub audit_trace_id: String,
    pub run_manifest_id: String,
    pub rubric_versions: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Signed-by-hash decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub certificate_id: Uuid,
    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
    pub artifact: Value,
    pub rubrics: CertificateRubrics,
    pub gate_decision: GateDecision,
    pub provenance: Provenance,
}

impl Certificate {
    /// The JSON document third parties verify.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the certificate as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// Builds certificates from evaluation results.
#[derive(Clone)]
pub struct CertificateService {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Default for CertificateService {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIds),
        }
    }
}

impl std::fmt::Debug for CertificateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateService").finish_non_exhaustive()
    }
}

impl CertificateService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Create a certificate for `artifact` from `evaluation`.
    ///
    /// `audit_trace_id` and `run_manifest_id` default to `trace_<id>` and
    /// `manifest_<id>` when the caller does not supply them.
    pub fn create(
        &self,
        artifact: &Value,
        evaluation: &EvaluationResult,
        provenance: &Map<String, Value>,
    ) -> Certificate {
        let certificate_id = self.ids.next_id();
        let created_at = self.clock.now();

        let mut extra = provenance.clone();
        let audit_trace_id = take_id(&mut extra, "audit_trace_id")
            .unwrap_or_else(|| format!("trace_{certificate_id}"));
        let run_manifest_id = take_id(&mut extra, "run_manifest_id")
            .unwrap_or_else(|| format!("manifest_{certificate_id}"));
        // The evaluated versions win over anything the caller passed.
        extra.remove("rubric_versions");

        let certificate = Certificate {
            certificate_id,
            created_at,
            artifact: artifact.clone(),
            rubrics: CertificateRubrics::from_results(&evaluation.tier_results),
            gate_decision: evaluation.gate_decision.clone(),
            provenance: Provenance {
                audit_trace_id,
                run_manifest_id,
                rubric_versions: evaluation.rubric_versions.clone(),
                extra,
            },
        };

        obs::emit_certificate_issued(&certificate);
        certificate
    }
}

/// Remove `key` from `map` and render it as an identifier string.
fn take_id(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

mod rfc3339 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Micros, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

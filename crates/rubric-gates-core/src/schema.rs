//! Embedded JSON Schemas and a validator that reports every violation.
//!
//! Schemas are compiled as Draft 2020-12. A schema that does not compile
//! under 2020-12 is retried as Draft 7 before giving up. `format` keywords
//! are asserted, not just annotated.

use std::fmt;

use jsonschema::{Draft, Validator};
use serde_json::Value;
use tracing::debug;

use crate::error::{GateError, Result};

/// Shape of a rubric suite file (`rubric_suite: {..}`).
pub const RUBRIC_SCHEMA: &str = include_str!("../schemas/rubric.schema.json");

/// Public certificate wire contract.
pub const CERTIFICATE_SCHEMA: &str = include_str!("../schemas/certificate.schema.json");

/// One schema violation: where it happened and what was wrong.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaViolation {
    /// Dotted instance path, `<root>` for the document itself.
    pub location: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// A compiled schema.
pub struct SchemaValidator {
    validator: Validator,
    draft: Draft,
}

impl SchemaValidator {
    /// Compile `raw` schema text.
    pub fn compile(raw: &str) -> Result<Self> {
        let schema: Value = serde_json::from_str(raw)?;
        let mut last_err = None;
        for draft in [Draft::Draft202012, Draft::Draft7] {
            match jsonschema::options()
                .with_draft(draft)
                .should_validate_formats(true)
                .build(&schema)
            {
                Ok(validator) => return Ok(Self { validator, draft }),
                Err(err) => {
                    debug!(?draft, error = %err, "schema did not compile, trying next draft");
                    last_err = Some(err.to_string());
                }
            }
        }
        Err(GateError::Schema(
            last_err.unwrap_or_else(|| "no draft accepted the schema".to_string()),
        ))
    }

    /// The rubric suite schema.
    pub fn rubric() -> Result<Self> {
        Self::compile(RUBRIC_SCHEMA)
    }

    /// The certificate schema.
    pub fn certificate() -> Result<Self> {
        Self::compile(CERTIFICATE_SCHEMA)
    }

    /// Draft the schema was compiled under.
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// All violations of `instance`, sorted by location then message.
    /// Array indices within a location compare numerically.
    pub fn violations(&self, instance: &Value) -> Vec<SchemaViolation> {
        let mut keyed: Vec<(Vec<PathSegment>, SchemaViolation)> = self
            .validator
            .iter_errors(instance)
            .map(|err| {
                let pointer = err.instance_path.to_string();
                let violation = SchemaViolation {
                    location: dotted_location(&pointer),
                    message: err.to_string(),
                };
                (location_key(&pointer), violation)
            })
            .collect();
        keyed.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.message.cmp(&b.message)));
        let mut out: Vec<SchemaViolation> = keyed.into_iter().map(|(_, v)| v).collect();
        out.dedup();
        out
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

/// `/a/b/0` → `a.b.0`; the empty pointer → `<root>`.
fn dotted_location(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        return "<root>".to_string();
    }
    trimmed
        .split('/')
        .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

/// One step of an instance path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PathSegment {
    Index(u64),
    Key(String),
}

/// Sort key for a JSON pointer. The root is the empty key and sorts first.
fn location_key(pointer: &str) -> Vec<PathSegment> {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('/')
        .map(|seg| match seg.parse::<u64>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::Key(seg.replace("~1", "/").replace("~0", "~")),
        })
        .collect()
}

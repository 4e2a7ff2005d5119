//! Offline certificate verification.
//!
//! Two steps: the document must satisfy the embedded certificate schema, and,
//! when an artifact file is supplied, its SHA-256 must equal `artifact.hash`.
//! Step two is skipped when step one fails.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::digest::sha256_file;
use crate::error::Result;
use crate::obs;
use crate::schema::SchemaValidator;

/// Outcome of a verification. `is_valid` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

pub const HASH_MISSING: &str =
    "artifact.hash missing from certificate (required for --artifact verification)";

/// Verifies certificate documents against the public contract.
pub struct CertificateVerifier {
    schema: SchemaValidator,
}

impl CertificateVerifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            schema: SchemaValidator::certificate()?,
        })
    }

    /// Verify a parsed certificate, optionally binding it to an artifact file.
    pub fn verify(&self, certificate: &Value, artifact: Option<&Path>) -> VerifyResult {
        let mut errors: Vec<String> = self
            .schema
            .violations(certificate)
            .iter()
            .map(ToString::to_string)
            .collect();

        if errors.is_empty() {
            if let Some(path) = artifact {
                errors.extend(check_artifact_hash(certificate, path));
            }
        }

        let result = VerifyResult::from_errors(errors);
        obs::emit_certificate_verified(
            certificate.get("certificate_id").and_then(Value::as_str),
            result.is_valid,
            result.errors.len(),
        );
        result
    }

    /// Read and verify a certificate file. Unreadable or malformed input is
    /// reported as an error rather than returned as `Err`.
    pub fn verify_file(&self, path: &Path, artifact: Option<&Path>) -> VerifyResult {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                return VerifyResult::from_errors(vec![format!(
                    "cannot read certificate {}: {err}",
                    path.display()
                )])
            }
        };
        let doc: Value = match serde_json::from_str(&text) {
            Ok(doc) => doc,
            Err(err) => {
                return VerifyResult::from_errors(vec![format!(
                    "certificate is not valid JSON: {err}"
                )])
            }
        };
        if !doc.is_object() {
            return VerifyResult::from_errors(vec![
                "certificate JSON must be an object".to_string()
            ]);
        }
        self.verify(&doc, artifact)
    }
}

fn check_artifact_hash(certificate: &Value, path: &Path) -> Vec<String> {
    let expected = match certificate
        .get("artifact")
        .and_then(|a| a.get("hash"))
        .and_then(Value::as_str)
    {
        Some(hash) if !hash.is_empty() => hash,
        _ => return vec![HASH_MISSING.to_string()],
    };

    let actual = match sha256_file(path) {
        Ok(hex) => hex,
        Err(err) => return vec![format!("cannot read artifact {}: {err}", path.display())],
    };

    if actual == expected {
        Vec::new()
    } else {
        vec![
            "artifact hash mismatch".to_string(),
            format!("expected: {expected}"),
            format!("actual:   {actual}"),
        ]
    }
}

/// Verify with a freshly compiled schema.
pub fn verify_certificate(certificate: &Value, artifact: Option<&Path>) -> Result<VerifyResult> {
    Ok(CertificateVerifier::new()?.verify(certificate, artifact))
}

/// [`verify_certificate`] for a file on disk.
pub fn verify_certificate_file(path: &Path, artifact: Option<&Path>) -> Result<VerifyResult> {
    Ok(CertificateVerifier::new()?.verify_file(path, artifact))
}

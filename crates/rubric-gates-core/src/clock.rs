//! Injectable sources of identifiers and wall-clock time.
//!
//! Certificates and manifests carry a fresh id and timestamp; everything else
//! about them is a pure function of their inputs. Tests swap these providers
//! for fixed ones to assert on whole documents.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Wall clock (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Always returns the same identifier.
#[derive(Debug, Clone, Copy)]
pub struct FixedIds(pub Uuid);

impl IdGenerator for FixedIds {
    fn next_id(&self) -> Uuid {
        self.0
    }
}

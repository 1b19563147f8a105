//! # Entity Results and Batch Reporting
//!
//! Per-entity terminal outcomes and the incremental batch-level tally. A
//! batch produces exactly one [`EntityResult`] per entity; the
//! [`BatchReportBuilder`] folds them into the summary emitted when the pool
//! drains. Individual entity failures influence the counts only, never the
//! batch-level status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Terminal outcome of one entity's work chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityOutcome {
    /// The chain completed with genuine computed data.
    Success,
    /// The sub-computation failed or answered malformed, the canonical
    /// default record was written instead.
    SubstitutedDefault,
    /// The chain failed before the destination write completed.
    Failed,
}

impl EntityOutcome {
    /// Whether the destination holds a record for this entity.
    pub fn wrote_destination(&self) -> bool {
        matches!(self, Self::Success | Self::SubstitutedDefault)
    }
}

impl fmt::Display for EntityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::SubstitutedDefault => write!(f, "substituted_default"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One entity's terminal result, produced exactly once per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResult {
    pub entity: String,
    pub outcome: EntityOutcome,
    /// Diagnostic for substituted or failed outcomes; present in logs only,
    /// never in the batch summary body.
    pub detail: Option<String>,
}

impl EntityResult {
    pub fn success(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            outcome: EntityOutcome::Success,
            detail: None,
        }
    }

    pub fn substituted(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            outcome: EntityOutcome::SubstitutedDefault,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            outcome: EntityOutcome::Failed,
            detail: Some(detail.into()),
        }
    }
}

/// Batch-level summary, finalized once every worker is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub job: String,
    pub total: usize,
    pub succeeded: usize,
    pub substituted: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    /// One-line summary for the response body and the final log record.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} entities processed in {}ms ({} succeeded, {} substituted, {} failed)",
            self.job, self.total, self.elapsed_ms, self.succeeded, self.substituted, self.failed
        )
    }
}

/// Incremental tally of entity results as they arrive, in any order.
#[derive(Debug)]
pub struct BatchReportBuilder {
    job: String,
    started_wall: DateTime<Utc>,
    started: Instant,
    succeeded: usize,
    substituted: usize,
    failed: usize,
}

impl BatchReportBuilder {
    pub fn start(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            started_wall: Utc::now(),
            started: Instant::now(),
            succeeded: 0,
            substituted: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, result: &EntityResult) {
        match result.outcome {
            EntityOutcome::Success => self.succeeded += 1,
            EntityOutcome::SubstitutedDefault => self.substituted += 1,
            EntityOutcome::Failed => self.failed += 1,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finalize(self) -> BatchReport {
        BatchReport {
            job: self.job,
            total: self.succeeded + self.substituted + self.failed,
            succeeded: self.succeeded,
            substituted: self.substituted,
            failed: self.failed,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            started_at: self.started_wall,
            completed_at: Utc::now(),
        }
    }
}

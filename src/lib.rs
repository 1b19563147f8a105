#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Recompute Core
//!
//! Bounded-concurrency batch orchestrator for recomputing derived warehouse
//! datasets. A batch fans out over an independent entity set (country codes,
//! archive keys) where each entity's chain drives one or more slow remote
//! operations to completion by polling, under a concurrency ceiling, with
//! per-entity fault isolation: one entity's failure never aborts the batch,
//! and the destination ends fully repopulated.
//!
//! ## Module Organization
//!
//! - [`remote`] - Contracts for the statement service, sub-computation, and
//!   object store, plus the statement polling loop
//! - [`execution`] - The reusable semaphore-gated fan-out executor
//! - [`orchestration`] - The batch lifecycle driver and entry-point responses
//! - [`state_machine`] - Batch lifecycle states and legal transitions
//! - [`results`] - Per-entity outcomes and the batch report
//! - [`jobs`] - The concrete recompute jobs (forecast, distance, ingestion,
//!   bulk load)
//! - [`config`] - Tunables with the reference defaults
//! - [`error`] - Structured error handling
//!
//! ## Failure Policy
//!
//! Errors before fan-out (source fetch, destination clear) abort the batch
//! with a 500-style response. Errors inside a worker are terminal only for
//! that entity; sub-computation failures in the forecast job are masked by
//! writing the canonical all-zero record, flagged as substituted in the
//! destination. A batch with entity failures still reports 200; the detail
//! lives in logs and the aggregate counts.

pub mod config;
pub mod error;
pub mod execution;
pub mod jobs;
pub mod logging;
pub mod orchestration;
pub mod remote;
pub mod results;
pub mod state_machine;

pub use config::RecomputeConfig;
pub use error::{BatchError, Result};
pub use execution::FanOutExecutor;
pub use orchestration::{into_response, BatchJob, BatchOrchestrator, BatchResponse};
pub use remote::{
    CellValue, Invocation, ObjectStore, Row, StatementHandle, StatementId, StatementPoller,
    StatementProbe, StatementService, StatementStatus, SubComputation,
};
pub use results::{BatchReport, BatchReportBuilder, EntityOutcome, EntityResult};
pub use state_machine::{BatchLifecycle, BatchState};

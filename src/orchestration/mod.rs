//! # Batch Orchestration
//!
//! The lifecycle driver shared by every batch job: fetch the source entity
//! set, clear the destination, fan the entities out under the job's
//! concurrency ceiling, aggregate the per-entity outcomes, and emit the
//! batch summary. Jobs plug in through the [`BatchJob`] trait.

pub mod batch;
pub mod response;

pub use batch::{BatchJob, BatchOrchestrator};
pub use response::{into_response, BatchResponse};

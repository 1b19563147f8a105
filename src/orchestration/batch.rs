//! # Batch Orchestrator
//!
//! Sequences one batch run through the lifecycle state machine. Stage
//! ordering is load-bearing: the source entity set is fetched before the
//! destination is touched, so a fetch failure aborts the batch with the
//! destination intact. Clear-then-repopulate is deliberately not atomic; a
//! batch aborting after the clear leaves the destination empty or partially
//! populated, which is accepted behavior.
//!
//! Once fan-out begins the batch can no longer abort: every worker failure
//! is contained to its entity, and the run always finishes with a summary
//! reported as success.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::Result;
use crate::execution::FanOutExecutor;
use crate::results::{BatchReport, BatchReportBuilder, EntityResult};
use crate::state_machine::{BatchLifecycle, BatchState};

/// One concrete batch job: how to enumerate its entities, how to prepare its
/// destination, and how to process a single entity.
///
/// `fetch_entities` and `prepare_destination` errors are batch-fatal.
/// `process` must itself convert every failure into a terminal
/// [`EntityResult`]; it has no error channel by design.
#[async_trait]
pub trait BatchJob: Send + Sync + 'static {
    /// Job name used in logs, state transitions, and the batch summary.
    fn name(&self) -> &str;

    /// Concurrency ceiling for this job's fan-out.
    fn concurrency(&self) -> usize;

    /// Enumerate the batch's entity set from the source. Runs before any
    /// destination mutation.
    async fn fetch_entities(&self) -> Result<Vec<String>>;

    /// Clear (or otherwise prepare) the destination for repopulation.
    async fn prepare_destination(&self) -> Result<()>;

    /// Execute one entity's work chain to a terminal outcome.
    async fn process(self: Arc<Self>, entity: String) -> EntityResult;
}

/// Drives any [`BatchJob`] through the batch lifecycle.
pub struct BatchOrchestrator;

impl BatchOrchestrator {
    /// Run one batch to completion.
    ///
    /// `Err` means the batch aborted in the fetch or clear stage; entity
    /// failures never surface here, only in the report counts.
    pub async fn run<J: BatchJob>(job: Arc<J>) -> Result<BatchReport> {
        let mut lifecycle = BatchLifecycle::new(job.name());
        let mut report = BatchReportBuilder::start(job.name());

        let entities = match job.fetch_entities().await {
            Ok(entities) => entities,
            Err(e) => {
                error!(job = job.name(), error = %e, "source fetch failed, aborting batch");
                lifecycle.transition_to(BatchState::Aborted)?;
                return Err(e);
            }
        };
        lifecycle.transition_to(BatchState::SourceFetched)?;
        info!(job = job.name(), entity_count = entities.len(), "source entity set fetched");

        if let Err(e) = job.prepare_destination().await {
            error!(job = job.name(), error = %e, "destination clear failed, aborting batch");
            lifecycle.transition_to(BatchState::Aborted)?;
            return Err(e);
        }
        lifecycle.transition_to(BatchState::DestinationCleared)?;

        lifecycle.transition_to(BatchState::FanningOut)?;
        let executor = FanOutExecutor::new(job.concurrency());
        let worker_job = Arc::clone(&job);
        let results = executor
            .run_all(entities, move |entity| {
                let job = Arc::clone(&worker_job);
                job.process(entity)
            })
            .await;

        lifecycle.transition_to(BatchState::Aggregating)?;
        for result in &results {
            report.record(result);
        }

        let report = report.finalize();
        lifecycle.transition_to(BatchState::Done)?;
        info!(job = job.name(), summary = %report.summary(), "batch complete");
        Ok(report)
    }
}

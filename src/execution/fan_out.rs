//! # Bounded Fan-Out Executor
//!
//! Runs one asynchronous task per entity under a concurrency ceiling. All
//! tasks are spawned up front; a semaphore gates how many execute at once,
//! the rest queue until a permit frees. Every task runs to a terminal
//! outcome: a panic or failure in one task is caught, logged, and converted
//! into a Failed entity result without cancelling or delaying siblings, and
//! the executor hands control back only once the pool has fully drained.
//! Completion order carries no meaning.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::BatchError;
use crate::results::{EntityOutcome, EntityResult};

/// Semaphore-gated worker pool shared by every batch job.
#[derive(Debug, Clone)]
pub struct FanOutExecutor {
    ceiling: usize,
}

impl FanOutExecutor {
    /// `ceiling` is the maximum number of concurrently executing tasks.
    /// A ceiling of zero would deadlock the pool, so it is lifted to one.
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Fan one task out per entity and collect exactly one [`EntityResult`]
    /// per entity, in completion order.
    pub async fn run_all<F, Fut>(&self, entities: Vec<String>, task: F) -> Vec<EntityResult>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = EntityResult> + Send + 'static,
    {
        let total = entities.len();
        let semaphore = Arc::new(Semaphore::new(self.ceiling));
        let mut join_set = JoinSet::new();

        info!(
            total_entities = total,
            ceiling = self.ceiling,
            "fanning out entity tasks"
        );

        for entity in entities {
            let permit_source = Arc::clone(&semaphore);
            let fut = task(entity.clone());
            join_set.spawn(async move {
                // Semaphore closed cannot happen: the pool owns it for the
                // whole drain.
                let _permit = permit_source
                    .acquire_owned()
                    .await
                    .expect("fan-out semaphore closed while tasks in flight");
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(entity = %entity, panic = %message, "entity task panicked");
                        EntityResult::failed(
                            entity.clone(),
                            BatchError::WorkerPanic {
                                entity,
                                message,
                            }
                            .to_string(),
                        )
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => {
                    debug!(
                        entity = %result.entity,
                        outcome = %result.outcome,
                        "entity task terminal"
                    );
                    results.push(result);
                }
                // Unreachable while panics are caught inside the task, kept
                // so a runtime-level join failure still cannot lose a slot.
                Err(join_error) => {
                    error!(error = %join_error, "entity task join failed");
                }
            }
        }

        let failed = results
            .iter()
            .filter(|r| r.outcome == EntityOutcome::Failed)
            .count();
        info!(
            total_entities = total,
            collected = results.len(),
            failed,
            "fan-out drained"
        );
        results
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

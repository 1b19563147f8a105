//! # Statement Polling Loop
//!
//! Drives a submitted [`StatementHandle`] to a terminal status. The status is
//! checked first and the fixed inter-poll delay only happens between checks,
//! never before the first one. The wait is a cancellable tokio timer rather
//! than a blocking sleep, and an optional deadline bounds the total wait;
//! without a deadline a statement that never terminates stalls its own
//! worker indefinitely, which is the reference behavior.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::RecomputeConfig;
use crate::error::{BatchError, Result};
use crate::remote::statement::{
    Row, StatementHandle, StatementService, StatementStatus,
};

/// Fixed-interval poller for asynchronous statements.
#[derive(Debug, Clone)]
pub struct StatementPoller {
    interval: Duration,
    deadline: Option<Duration>,
}

impl StatementPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Bound the total wait for any single statement. On expiry the poller
    /// returns [`BatchError::PollTimeout`]; whether that is entity-fatal or
    /// batch-fatal depends on where the caller sits.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn from_config(config: &RecomputeConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            deadline: config.poll_deadline(),
        }
    }

    /// Poll until the handle reaches a terminal status.
    ///
    /// Returns `Ok(())` on Finished. On Failed, returns the service-provided
    /// error text unmodified inside [`BatchError::Statement`]. The caller
    /// fetches result rows separately through the service.
    pub async fn await_terminal<S>(
        &self,
        service: &S,
        handle: &mut StatementHandle,
        operation: &str,
    ) -> Result<()>
    where
        S: StatementService + ?Sized,
    {
        let started = Instant::now();
        loop {
            let probe = service.describe(handle.id()).await?;
            handle.advance(probe.status, probe.error)?;

            match handle.status() {
                StatementStatus::Finished => {
                    debug!(
                        statement_id = %handle.id(),
                        operation,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "statement finished"
                    );
                    return Ok(());
                }
                StatementStatus::Failed => {
                    let message = handle
                        .error()
                        .unwrap_or("no error detail provided")
                        .to_string();
                    warn!(
                        statement_id = %handle.id(),
                        operation,
                        error = %message,
                        "statement failed"
                    );
                    return Err(BatchError::Statement {
                        operation: operation.to_string(),
                        message,
                    });
                }
                StatementStatus::Submitted | StatementStatus::Running => {
                    debug!(
                        statement_id = %handle.id(),
                        operation,
                        status = %handle.status(),
                        "waiting for statement to complete"
                    );
                }
            }

            if let Some(deadline) = self.deadline {
                if started.elapsed() >= deadline {
                    warn!(
                        statement_id = %handle.id(),
                        operation,
                        waited_secs = started.elapsed().as_secs(),
                        "statement polling deadline expired"
                    );
                    return Err(BatchError::PollTimeout {
                        operation: operation.to_string(),
                        statement_id: handle.id().to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            sleep(self.interval).await;
        }
    }

    /// Submit a statement and drive it to Finished, returning the consumed
    /// handle for result fetching.
    pub async fn run_to_completion<S>(
        &self,
        service: &S,
        sql: &str,
        operation: &str,
    ) -> Result<StatementHandle>
    where
        S: StatementService + ?Sized,
    {
        let mut handle = service.submit(sql).await?;
        debug!(statement_id = %handle.id(), operation, "statement submitted");
        self.await_terminal(service, &mut handle, operation).await?;
        Ok(handle)
    }

    /// Submit, poll to Finished, and fetch the result rows in one chain step.
    pub async fn fetch_all<S>(&self, service: &S, sql: &str, operation: &str) -> Result<Vec<Row>>
    where
        S: StatementService + ?Sized,
    {
        let handle = self.run_to_completion(service, sql, operation).await?;
        service.fetch(handle.id()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::statement::{StatementId, StatementProbe};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Statement service that replays a scripted status sequence and counts
    /// describe calls.
    struct ScriptedService {
        probes: Mutex<Vec<StatementProbe>>,
        describe_calls: Mutex<usize>,
        rows: Vec<Row>,
    }

    impl ScriptedService {
        fn new(probes: Vec<StatementProbe>) -> Arc<Self> {
            Arc::new(Self {
                probes: Mutex::new(probes),
                describe_calls: Mutex::new(0),
                rows: Vec::new(),
            })
        }

        fn describe_calls(&self) -> usize {
            *self.describe_calls.lock()
        }
    }

    #[async_trait]
    impl StatementService for ScriptedService {
        async fn submit(&self, _sql: &str) -> Result<StatementHandle> {
            Ok(StatementHandle::submitted(StatementId::new()))
        }

        async fn describe(&self, _id: &StatementId) -> Result<StatementProbe> {
            *self.describe_calls.lock() += 1;
            let mut probes = self.probes.lock();
            if probes.len() > 1 {
                Ok(probes.remove(0))
            } else {
                Ok(probes[0].clone())
            }
        }

        async fn fetch(&self, _id: &StatementId) -> Result<Vec<Row>> {
            Ok(self.rows.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_only_after_terminal_status() {
        let service = ScriptedService::new(vec![
            StatementProbe {
                status: StatementStatus::Submitted,
                error: None,
            },
            StatementProbe::running(),
            StatementProbe::running(),
            StatementProbe::finished(),
        ]);
        let poller = StatementPoller::new(Duration::from_secs(5));
        let handle = poller
            .run_to_completion(service.as_ref(), "SELECT 1", "test")
            .await
            .unwrap();
        assert_eq!(handle.status(), StatementStatus::Finished);
        assert_eq!(service.describe_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_surfaces_service_error_text() {
        let service = ScriptedService::new(vec![
            StatementProbe::running(),
            StatementProbe::failed("ERROR: permission denied for relation forecast"),
        ]);
        let poller = StatementPoller::new(Duration::from_secs(5));
        let err = poller
            .run_to_completion(service.as_ref(), "DELETE FROM forecast", "destination-clear")
            .await
            .unwrap_err();
        match err {
            BatchError::Statement { operation, message } => {
                assert_eq!(operation, "destination-clear");
                assert_eq!(message, "ERROR: permission denied for relation forecast");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_times_out() {
        // The scripted service never leaves Running.
        let service = ScriptedService::new(vec![StatementProbe::running()]);
        let poller =
            StatementPoller::new(Duration::from_secs(5)).with_deadline(Duration::from_secs(30));
        let err = poller
            .run_to_completion(service.as_ref(), "SELECT 1", "source-fetch")
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::PollTimeout { .. }));
        // 30s deadline at a 5s interval: first check immediate, then one per
        // tick until the deadline check trips.
        assert!(service.describe_calls() >= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn first_check_happens_before_any_wait() {
        let service = ScriptedService::new(vec![StatementProbe::finished()]);
        let poller = StatementPoller::new(Duration::from_secs(5));
        let start = Instant::now();
        poller
            .run_to_completion(service.as_ref(), "SELECT 1", "test")
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(service.describe_calls(), 1);
    }
}

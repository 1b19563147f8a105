//! # Forecast Population Job
//!
//! Repopulates the forecast table with one record per country. The entity
//! set is the distinct country codes in the source event table; each
//! worker's chain invokes the forecast-metrics sub-computation, validates
//! the payload structurally, and writes the record with its own
//! insert-and-poll statement.
//!
//! A failed, timed-out, or structurally invalid sub-computation does not
//! fail the entity: the canonical all-zero record is written instead so the
//! destination stays fully populated. Zero therefore means both "genuine
//! zero" and "could not compute"; the record's `substituted` column is the
//! only place the two are distinguished.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::RecomputeConfig;
use crate::error::{BatchError, Result};
use crate::orchestration::{into_response, BatchJob, BatchOrchestrator, BatchResponse};
use crate::remote::{StatementPoller, StatementService, SubComputation};
use crate::results::EntityResult;

pub const FORECAST_TABLE: &str = "forecast";
pub const SOURCE_TABLE: &str = "gdelt_event";

/// Field names the sub-computation payload must contain, checked by name;
/// absence of any one is treated identically to a hard call failure.
pub const REQUIRED_METRIC_FIELDS: [&str; 5] = [
    "TotalMentions",
    "TotalSources",
    "TotalArticles",
    "MedianAvgTone",
    "MedianGoldsteinScale",
];

/// One country's forecast metrics as written to the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(rename = "TotalMentions")]
    pub total_mentions: i64,
    #[serde(rename = "TotalSources")]
    pub total_sources: i64,
    #[serde(rename = "TotalArticles")]
    pub total_articles: i64,
    #[serde(rename = "MedianAvgTone")]
    pub median_avg_tone: f64,
    #[serde(rename = "MedianGoldsteinScale")]
    pub median_goldstein_scale: f64,
}

impl ForecastRecord {
    /// The canonical default written when the metrics could not be computed.
    pub fn zeroed() -> Self {
        Self {
            total_mentions: 0,
            total_sources: 0,
            total_articles: 0,
            median_avg_tone: 0.0,
            median_goldstein_scale: 0.0,
        }
    }

    /// Decode and structurally validate a sub-computation body. Every
    /// required field must be present by name and numeric.
    pub fn from_payload(entity: &str, body: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| BatchError::MalformedPayload {
                entity: entity.to_string(),
                reason: format!("body is not valid JSON: {e}"),
            })?;

        for field in REQUIRED_METRIC_FIELDS {
            match value.get(field) {
                None => {
                    return Err(BatchError::MalformedPayload {
                        entity: entity.to_string(),
                        reason: format!("missing field {field}"),
                    })
                }
                Some(v) if !v.is_number() => {
                    return Err(BatchError::MalformedPayload {
                        entity: entity.to_string(),
                        reason: format!("field {field} is not numeric"),
                    })
                }
                Some(_) => {}
            }
        }

        serde_json::from_value(value).map_err(|e| BatchError::MalformedPayload {
            entity: entity.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Batch job repopulating the forecast table.
pub struct ForecastJob<S, C> {
    statement: Arc<S>,
    subcompute: Arc<C>,
    poller: StatementPoller,
    concurrency: usize,
    lookback_months: u32,
}

impl<S, C> ForecastJob<S, C>
where
    S: StatementService + 'static,
    C: SubComputation + 'static,
{
    pub fn new(statement: Arc<S>, subcompute: Arc<C>, config: &RecomputeConfig) -> Self {
        Self {
            statement,
            subcompute,
            poller: StatementPoller::from_config(config),
            concurrency: config.record_concurrency,
            lookback_months: config.lookback_months,
        }
    }

    /// Build the job from an entry-point event. The lookback window is the
    /// only recognized parameter and is optional.
    pub fn from_event(
        event: &serde_json::Value,
        statement: Arc<S>,
        subcompute: Arc<C>,
        config: &RecomputeConfig,
    ) -> Result<Self> {
        let mut job = Self::new(statement, subcompute, config);
        if let Some(raw) = event.get("lookback_months") {
            let months = raw.as_u64().ok_or_else(|| BatchError::Configuration {
                message: format!("lookback_months must be a positive integer, got {raw}"),
            })?;
            job.lookback_months =
                u32::try_from(months).map_err(|_| BatchError::Configuration {
                    message: format!("lookback_months out of range: {months}"),
                })?;
        }
        Ok(job)
    }

    async fn compute_metrics(&self, entity: &str) -> Result<ForecastRecord> {
        let payload = serde_json::json!({
            "ActionGeo_CountryCode": entity,
            "lookback_months": self.lookback_months,
        });
        let invocation = self.subcompute.invoke(entity, &payload).await?;
        if !invocation.is_success() {
            return Err(BatchError::Invocation {
                entity: entity.to_string(),
                message: format!(
                    "sub-computation returned status {}: {}",
                    invocation.status_code, invocation.body
                ),
            });
        }
        ForecastRecord::from_payload(entity, &invocation.body)
    }

    async fn insert_record(
        &self,
        entity: &str,
        record: &ForecastRecord,
        substituted: bool,
    ) -> Result<()> {
        let sql = insert_sql(entity, record, substituted);
        self.poller
            .run_to_completion(self.statement.as_ref(), &sql, "forecast-insert")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<S, C> BatchJob for ForecastJob<S, C>
where
    S: StatementService + 'static,
    C: SubComputation + 'static,
{
    fn name(&self) -> &str {
        "forecast"
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    async fn fetch_entities(&self) -> Result<Vec<String>> {
        let sql = format!("SELECT DISTINCT(ActionGeo_CountryCode) FROM {SOURCE_TABLE}");
        let rows = self
            .poller
            .fetch_all(self.statement.as_ref(), &sql, "source-fetch")
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let code = row.first().and_then(|cell| cell.as_text());
                if code.is_none() {
                    warn!("skipping source row without a country code cell");
                }
                code.map(str::to_string)
            })
            .collect())
    }

    async fn prepare_destination(&self) -> Result<()> {
        let sql = format!("DELETE FROM {FORECAST_TABLE}");
        self.poller
            .run_to_completion(self.statement.as_ref(), &sql, "destination-clear")
            .await?;
        Ok(())
    }

    async fn process(self: Arc<Self>, entity: String) -> EntityResult {
        let (record, substitution) = match self.compute_metrics(&entity).await {
            Ok(record) => (record, None),
            Err(e) => {
                warn!(entity = %entity, error = %e, "substituting canonical default record");
                (ForecastRecord::zeroed(), Some(e.to_string()))
            }
        };

        match self
            .insert_record(&entity, &record, substitution.is_some())
            .await
        {
            Ok(()) => match substitution {
                None => EntityResult::success(entity),
                Some(detail) => EntityResult::substituted(entity, detail),
            },
            Err(e) => {
                error!(entity = %entity, error = %e, "forecast insert failed");
                EntityResult::failed(entity, e.to_string())
            }
        }
    }
}

/// Entry point: run one forecast batch for the given event.
pub async fn run_forecast_job<S, C>(
    event: &serde_json::Value,
    statement: Arc<S>,
    subcompute: Arc<C>,
    config: &RecomputeConfig,
) -> BatchResponse
where
    S: StatementService + 'static,
    C: SubComputation + 'static,
{
    match ForecastJob::from_event(event, statement, subcompute, config) {
        Ok(job) => into_response(BatchOrchestrator::run(Arc::new(job)).await),
        Err(e) => into_response(Err(e)),
    }
}

fn insert_sql(entity: &str, record: &ForecastRecord, substituted: bool) -> String {
    format!(
        "INSERT INTO {FORECAST_TABLE} \
         (country, TotalMentions, TotalSources, TotalArticles, MedianAvgTone, MedianGoldsteinScale, substituted) \
         VALUES ('{}', {}, {}, {}, {}, {}, {})",
        quote_literal(entity),
        record.total_mentions,
        record.total_sources,
        record.total_articles,
        record.median_avg_tone,
        record.median_goldstein_scale,
        substituted,
    )
}

fn quote_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

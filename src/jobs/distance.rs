//! # Distance Computation Job
//!
//! Scores every forecast record against a pre-trained clustering model and
//! repopulates the distance table. The model artifact is loaded from the
//! object store before the batch starts; scoring semantics live behind the
//! [`DistanceModel`] trait. Unlike the forecast job there is no default
//! substitution here: a country whose scoring or insert fails is simply
//! marked failed and the batch continues.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::RecomputeConfig;
use crate::error::{BatchError, Result};
use crate::orchestration::{into_response, BatchJob, BatchOrchestrator, BatchResponse};
use crate::remote::{ObjectStore, StatementPoller, StatementService};
use crate::results::EntityResult;

pub const DISTANCE_TABLE: &str = "distance";

/// Number of feature cells per forecast row, after the country code.
const FEATURE_WIDTH: usize = 5;

/// Pre-trained scoring model mapping one feature vector to a grid distance.
pub trait DistanceModel: Send + Sync {
    fn distance(&self, features: &[f64]) -> f64;
}

/// Decodes a serialized model artifact. Artifact format is the trainer's
/// concern.
pub trait ModelDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn DistanceModel>>;
}

/// Batch job repopulating the distance table.
pub struct DistanceJob<S> {
    statement: Arc<S>,
    model: Arc<dyn DistanceModel>,
    poller: StatementPoller,
    concurrency: usize,
    /// Feature vectors per country, populated during the source fetch and
    /// consumed one country at a time by the workers.
    features: Mutex<HashMap<String, Vec<Vec<f64>>>>,
}

impl<S> DistanceJob<S>
where
    S: StatementService + 'static,
{
    pub fn new(
        statement: Arc<S>,
        model: Arc<dyn DistanceModel>,
        config: &RecomputeConfig,
    ) -> Self {
        Self {
            statement,
            model,
            poller: StatementPoller::from_config(config),
            concurrency: config.record_concurrency,
            features: Mutex::new(HashMap::new()),
        }
    }

    /// Build the job from an entry-point event, loading the model artifact
    /// named by the required `model_key` parameter.
    pub async fn load<O, D>(
        event: &serde_json::Value,
        statement: Arc<S>,
        store: Arc<O>,
        decoder: &D,
        config: &RecomputeConfig,
    ) -> Result<Self>
    where
        O: ObjectStore,
        D: ModelDecoder + ?Sized,
    {
        let model_key = event
            .get("model_key")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| BatchError::MissingParameter {
                name: "model_key".to_string(),
            })?;
        let bytes = store.get(model_key).await?;
        let model = decoder.decode(&bytes)?;
        info!(model_key, artifact_bytes = bytes.len(), "distance model loaded");
        Ok(Self::new(statement, Arc::from(model), config))
    }

    async fn insert_distance(&self, entity: &str, distance: f64) -> Result<()> {
        let sql = format!(
            "INSERT INTO {DISTANCE_TABLE} (country, distance) VALUES ('{}', {})",
            entity.replace('\'', "''"),
            distance,
        );
        self.poller
            .run_to_completion(self.statement.as_ref(), &sql, "distance-insert")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<S> BatchJob for DistanceJob<S>
where
    S: StatementService + 'static,
{
    fn name(&self) -> &str {
        "distance"
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch all forecast rows and group their feature vectors by country.
    /// The entity set is the distinct countries seen.
    async fn fetch_entities(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT country, TotalMentions, TotalSources, TotalArticles, \
             MedianAvgTone, MedianGoldsteinScale FROM {}",
            crate::jobs::forecast::FORECAST_TABLE
        );
        let rows = self
            .poller
            .fetch_all(self.statement.as_ref(), &sql, "source-fetch")
            .await?;

        let mut grouped: HashMap<String, Vec<Vec<f64>>> = HashMap::new();
        for row in rows {
            let Some(country) = row.first().and_then(|cell| cell.as_text()) else {
                warn!("skipping forecast row without a country cell");
                continue;
            };
            let features: Vec<f64> = row
                .iter()
                .skip(1)
                .take(FEATURE_WIDTH)
                .filter_map(|cell| cell.as_f64())
                .collect();
            if features.len() != FEATURE_WIDTH {
                warn!(country, "skipping forecast row with non-numeric feature cells");
                continue;
            }
            grouped.entry(country.to_string()).or_default().push(features);
        }

        let mut entities: Vec<String> = grouped.keys().cloned().collect();
        entities.sort();
        *self.features.lock() = grouped;
        Ok(entities)
    }

    async fn prepare_destination(&self) -> Result<()> {
        let sql = format!("DELETE FROM {DISTANCE_TABLE}");
        self.poller
            .run_to_completion(self.statement.as_ref(), &sql, "destination-clear")
            .await?;
        Ok(())
    }

    async fn process(self: Arc<Self>, entity: String) -> EntityResult {
        let Some(vectors) = self.features.lock().remove(&entity) else {
            return EntityResult::failed(entity, "no feature vectors fetched for entity");
        };

        for vector in vectors {
            let distance = self.model.distance(&vector);
            if let Err(e) = self.insert_distance(&entity, distance).await {
                error!(entity = %entity, error = %e, "distance insert failed");
                return EntityResult::failed(entity, e.to_string());
            }
        }
        EntityResult::success(entity)
    }
}

/// Entry point: run one distance batch for the given event.
pub async fn run_distance_job<S, O, D>(
    event: &serde_json::Value,
    statement: Arc<S>,
    store: Arc<O>,
    decoder: &D,
    config: &RecomputeConfig,
) -> BatchResponse
where
    S: StatementService + 'static,
    O: ObjectStore,
    D: ModelDecoder + ?Sized,
{
    match DistanceJob::load(event, statement, store, decoder, config).await {
        Ok(job) => into_response(BatchOrchestrator::run(Arc::new(job)).await),
        Err(e) => into_response(Err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnitModel;

    impl DistanceModel for UnitModel {
        fn distance(&self, features: &[f64]) -> f64 {
            features.iter().sum()
        }
    }

    #[test]
    fn model_trait_objects_are_shareable() {
        let model: Arc<dyn DistanceModel> = Arc::new(UnitModel);
        assert_eq!(model.distance(&[1.0, 2.0, 3.0]), 6.0);
    }
}

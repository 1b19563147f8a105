//! # Batch Jobs
//!
//! The concrete recompute jobs built on the shared orchestrator: forecast
//! population, distance computation, archive ingestion, and the one-shot
//! warehouse bulk load. Each module exposes a `run_*` entry point returning
//! a [`crate::orchestration::BatchResponse`].

pub mod bulk_load;
pub mod distance;
pub mod forecast;
pub mod ingestion;

pub use bulk_load::run_bulk_load;
pub use distance::{run_distance_job, DistanceJob, DistanceModel, ModelDecoder};
pub use forecast::{run_forecast_job, ForecastJob, ForecastRecord};
pub use ingestion::{run_ingestion_job, ArchiveEntry, ArchiveReader, IngestionJob};

//! # Batch Error Types
//!
//! Structured error handling for the recompute core using thiserror.
//! Classification into batch-fatal versus entity-recoverable is positional:
//! the same `Statement` error aborts the batch when raised by the fetch or
//! clear stage, but only fails one entity when raised inside a worker.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// The remote statement service reported a Failed terminal status.
    /// Carries the service-provided error text unmodified.
    #[error("Statement failed during {operation}: {message}")]
    Statement { operation: String, message: String },

    /// A statement never reached a terminal status within the configured
    /// deadline.
    #[error("Statement {statement_id} did not reach a terminal status within {waited_secs}s ({operation})")]
    PollTimeout {
        operation: String,
        statement_id: String,
        waited_secs: u64,
    },

    /// The statement handle was asked to move backwards, e.g. Finished back
    /// to Running. Statuses only transition forward.
    #[error("Statement {statement_id} cannot transition from {from} to {to}")]
    StatusRegression {
        statement_id: String,
        from: String,
        to: String,
    },

    /// The per-entity sub-computation call failed outright.
    #[error("Sub-computation failed for entity {entity}: {message}")]
    Invocation { entity: String, message: String },

    /// The sub-computation answered, but its payload is missing a required
    /// field or is not decodable. Treated identically to a hard call failure.
    #[error("Malformed sub-computation payload for entity {entity}: {reason}")]
    MalformedPayload { entity: String, reason: String },

    /// Object store get/put/exists/list failure.
    #[error("Object store {operation} failed for {key}: {message}")]
    ObjectStore {
        operation: String,
        key: String,
        message: String,
    },

    /// A required entry-point parameter was absent. Maps to a 400 response.
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },

    /// A fan-out worker panicked. The panic is contained by the executor and
    /// surfaces as a Failed entity result carrying this error.
    #[error("Worker task panicked for entity {entity}: {message}")]
    WorkerPanic { entity: String, message: String },

    /// The batch state machine was asked to make an illegal transition.
    #[error("Invalid batch state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, BatchError>;

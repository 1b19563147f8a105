//! # Batch Entry-Point Responses
//!
//! Every job exposes one idempotent entry point returning a structured
//! status and body. The mapping is deliberately coarse: 400 for a missing
//! required input parameter, 500 for a fetch/clear-stage failure, and 200
//! for everything else, including batches where individual entities failed.
//! Which entities were substituted or failed is visible only in logs.

use serde::{Deserialize, Serialize};

use crate::error::BatchError;
use crate::results::BatchReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub status_code: u16,
    pub body: String,
}

impl BatchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: body.into(),
        }
    }

    pub fn internal_error(body: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Convert a batch outcome into the caller-visible response.
pub fn into_response(outcome: Result<BatchReport, BatchError>) -> BatchResponse {
    match outcome {
        Ok(report) => BatchResponse::ok(report.summary()),
        Err(e @ BatchError::MissingParameter { .. }) => BatchResponse::bad_request(e.to_string()),
        Err(e) => BatchResponse::internal_error(e.to_string()),
    }
}

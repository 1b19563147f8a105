//! Sub-computation invocation contract.
//!
//! One entity's work chain may start by invoking an external sub-computation
//! (itself a slow function that polls its own statements). The orchestrator
//! only sees a status code and a textual body; decoding and structural
//! validation of the body happen at the call site, and any validation
//! failure is treated identically to a failed call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Response from one sub-computation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub status_code: u16,
    pub body: String,
}

impl Invocation {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Remote per-entity sub-computation, e.g. the forecast-metrics function.
#[async_trait]
pub trait SubComputation: Send + Sync {
    async fn invoke(&self, entity: &str, payload: &serde_json::Value) -> Result<Invocation>;
}

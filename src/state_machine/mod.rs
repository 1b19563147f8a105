//! # Batch Lifecycle State Machine
//!
//! States a batch run moves through, with legal-transition checking. The
//! happy path is strictly linear; `Aborted` is reachable only from the
//! pre-fan-out stages because once workers launch, failures stay contained
//! to their entity and the batch always reaches `Done`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::error::{BatchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Batch accepted, nothing executed yet.
    Init,
    /// The source entity set has been fetched.
    SourceFetched,
    /// The destination store has been cleared for repopulation.
    DestinationCleared,
    /// Per-entity workers are in flight.
    FanningOut,
    /// All workers terminal, folding results into the report.
    Aggregating,
    /// Summary emitted. Terminal.
    Done,
    /// A fetch- or clear-stage failure ended the batch. Terminal.
    Aborted,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Legal transitions. `Aborted` is unreachable once fan-out has begun:
    /// from that point every failure is an entity-level failure.
    pub fn can_transition_to(&self, next: BatchState) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::SourceFetched)
                | (Self::Init, Self::Aborted)
                | (Self::SourceFetched, Self::DestinationCleared)
                | (Self::SourceFetched, Self::Aborted)
                | (Self::DestinationCleared, Self::FanningOut)
                | (Self::FanningOut, Self::Aggregating)
                | (Self::Aggregating, Self::Done)
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::SourceFetched => write!(f, "source_fetched"),
            Self::DestinationCleared => write!(f, "destination_cleared"),
            Self::FanningOut => write!(f, "fanning_out"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Tracks the current state of one batch run and enforces legal moves.
#[derive(Debug)]
pub struct BatchLifecycle {
    job: String,
    state: BatchState,
}

impl BatchLifecycle {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            state: BatchState::Init,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn transition_to(&mut self, next: BatchState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(BatchError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        info!(job = %self.job, from = %self.state, to = %next, "batch state transition");
        self.state = next;
        Ok(())
    }
}

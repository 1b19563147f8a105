//! # Statement Service Contract
//!
//! Types and trait for the asynchronous statement-execution service. A
//! submitted statement is represented by a [`StatementHandle`] that is
//! exclusively owned by the chain that submitted it and whose status only
//! moves forward: Submitted, Running, then one of the terminal statuses
//! Finished or Failed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{BatchError, Result};

/// Lifecycle status of one submitted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementStatus {
    /// Accepted by the service, not yet scheduled.
    Submitted,
    /// Executing remotely.
    Running,
    /// Completed successfully; results may be fetched.
    Finished,
    /// Completed with an error; diagnostic text is available.
    Failed,
}

impl StatementStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Position in the forward-only ordering. Terminal statuses share a rank
    /// because neither can follow the other.
    fn rank(&self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::Running => 1,
            Self::Finished | Self::Failed => 2,
        }
    }
}

impl fmt::Display for StatementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Opaque statement identifier issued at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementId(String);

impl StatementId {
    /// Mint a fresh identifier. Services with their own token scheme can use
    /// [`StatementId::from_token`] instead.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StatementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One in-flight asynchronous statement.
///
/// Created on submission, advanced by the poller, and dropped once its
/// terminal status has been consumed. Never shared across workers.
#[derive(Debug, Clone)]
pub struct StatementHandle {
    id: StatementId,
    status: StatementStatus,
    error: Option<String>,
}

impl StatementHandle {
    pub fn submitted(id: StatementId) -> Self {
        Self {
            id,
            status: StatementStatus::Submitted,
            error: None,
        }
    }

    pub fn id(&self) -> &StatementId {
        &self.id
    }

    pub fn status(&self) -> StatementStatus {
        self.status
    }

    /// Service-provided diagnostic, populated only once Failed is observed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record a freshly observed status. Rejects backward movement; statuses
    /// never revisit an earlier state and a terminal status never changes.
    pub fn advance(&mut self, status: StatementStatus, error: Option<String>) -> Result<()> {
        let regression = status.rank() < self.status.rank()
            || (self.status.is_terminal() && status != self.status);
        if regression {
            return Err(BatchError::StatusRegression {
                statement_id: self.id.to_string(),
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        if error.is_some() {
            self.error = error;
        }
        Ok(())
    }
}

/// One status observation from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementProbe {
    pub status: StatementStatus,
    pub error: Option<String>,
}

impl StatementProbe {
    pub fn running() -> Self {
        Self {
            status: StatementStatus::Running,
            error: None,
        }
    }

    pub fn finished() -> Self {
        Self {
            status: StatementStatus::Finished,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: StatementStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// One typed cell of a result row. No implicit null: every cell carries a
/// concrete value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell; text cells parse when they hold a number,
    /// matching how the warehouse returns numerics as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.parse().ok(),
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
        }
    }
}

pub type Row = Vec<CellValue>;

/// The asynchronous statement-execution service.
///
/// `submit` returns immediately with a handle; completion is observed through
/// repeated `describe` calls; result rows for a Finished statement come from
/// `fetch`. The client is shared read-only across workers.
#[async_trait]
pub trait StatementService: Send + Sync {
    async fn submit(&self, sql: &str) -> Result<StatementHandle>;

    async fn describe(&self, id: &StatementId) -> Result<StatementProbe>;

    async fn fetch(&self, id: &StatementId) -> Result<Vec<Row>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_advances_forward() {
        let mut handle = StatementHandle::submitted(StatementId::new());
        handle.advance(StatementStatus::Running, None).unwrap();
        handle
            .advance(StatementStatus::Finished, None)
            .unwrap();
        assert_eq!(handle.status(), StatementStatus::Finished);
    }

    #[test]
    fn handle_rejects_regression() {
        let mut handle = StatementHandle::submitted(StatementId::new());
        handle.advance(StatementStatus::Running, None).unwrap();
        handle
            .advance(StatementStatus::Failed, Some("boom".to_string()))
            .unwrap();
        let err = handle.advance(StatementStatus::Running, None).unwrap_err();
        assert!(matches!(err, BatchError::StatusRegression { .. }));
        assert_eq!(handle.error(), Some("boom"));
    }

    #[test]
    fn terminal_status_cannot_flip() {
        let mut handle = StatementHandle::submitted(StatementId::new());
        handle.advance(StatementStatus::Finished, None).unwrap();
        let err = handle
            .advance(StatementStatus::Failed, Some("late error".to_string()))
            .unwrap_err();
        assert!(matches!(err, BatchError::StatusRegression { .. }));
    }

    #[test]
    fn repeated_running_observations_are_fine() {
        let mut handle = StatementHandle::submitted(StatementId::new());
        handle.advance(StatementStatus::Running, None).unwrap();
        handle.advance(StatementStatus::Running, None).unwrap();
        assert_eq!(handle.status(), StatementStatus::Running);
    }

    #[test]
    fn numeric_text_cells_parse() {
        assert_eq!(CellValue::Text("4.5".to_string()).as_f64(), Some(4.5));
        assert_eq!(CellValue::Integer(7).as_f64(), Some(7.0));
        assert_eq!(CellValue::Text("USA".to_string()).as_f64(), None);
    }
}

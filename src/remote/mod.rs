//! # Remote Collaborator Interfaces
//!
//! Narrow contracts for the external services the orchestrator drives: the
//! asynchronous statement-execution service, the per-entity sub-computation
//! invocation, and the object store. Concrete wire formats live behind these
//! traits; the orchestrator only sees handles, statuses, rows, and byte
//! payloads.

pub mod object_store;
pub mod polling;
pub mod statement;
pub mod subcompute;

pub use object_store::ObjectStore;
pub use polling::StatementPoller;
pub use statement::{
    CellValue, Row, StatementHandle, StatementId, StatementProbe, StatementService,
    StatementStatus,
};
pub use subcompute::{Invocation, SubComputation};

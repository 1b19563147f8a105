//! # Warehouse Bulk Load
//!
//! One-shot submit-and-poll of the COPY statement that loads staged files
//! into the event table. No fan-out: this is a single statement chain, so
//! the entry point maps the poller outcome straight to a response.

use tracing::info;

use crate::orchestration::BatchResponse;
use crate::remote::{StatementPoller, StatementService};

/// Build the COPY statement for a manifest-driven load.
pub fn copy_sql(table: &str, manifest_url: &str, iam_role: &str) -> String {
    format!(
        "COPY {table} FROM '{manifest_url}' IAM_ROLE '{iam_role}' \
         FORMAT AS CSV DELIMITER '\\t' IGNOREHEADER 0 MANIFEST"
    )
}

/// Entry point: run the bulk load to completion.
pub async fn run_bulk_load<S>(
    service: &S,
    poller: &StatementPoller,
    table: &str,
    manifest_url: &str,
    iam_role: &str,
) -> BatchResponse
where
    S: StatementService + ?Sized,
{
    let sql = copy_sql(table, manifest_url, iam_role);
    match poller.run_to_completion(service, &sql, "bulk-load").await {
        Ok(handle) => {
            info!(table, statement_id = %handle.id(), "bulk load finished");
            BatchResponse::ok(format!("bulk load of {table} finished"))
        }
        Err(e) => BatchResponse::internal_error(e.to_string()),
    }
}

//! # Structured Logging Module
//!
//! Console-oriented structured logging for batch runs. Initialization is
//! idempotent so library consumers and tests can call it freely.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize tracing output with an environment-derived filter.
///
/// Honors `RUST_LOG`; defaults to `info` for the crate and `warn` elsewhere.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,recompute_core=info"));

        // A subscriber may already be installed by the embedding service.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .try_init();
    });
}

//! Bootstrap utilities for clubhouse binaries.
//!
//! Shared initialization code for processes embedding the persistence core.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LOG_ENV_VAR};
use crate::interfaces::{Backend, Result};
use crate::storage;

/// Initialize tracing with the CLUBHOUSE_LOG environment variable.
///
/// Defaults to "info" level if CLUBHOUSE_LOG is not set. Output goes to
/// stderr so stdout stays free for data. Safe to call more
/// than once; later calls leave the installed subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Connect the configured backend and install it as the process-wide one.
///
/// Returns the installed backend. Fails if a backend was already selected
/// or the connection could not be established.
pub async fn select_configured_backend(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend = storage::select_backend(&config.storage).await?;
    info!(backend = %backend.kind(), "Storage backend selected");
    Ok(backend)
}

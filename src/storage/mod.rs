//! Storage backends and the process-wide backend selector.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::config::StorageConfig;
use crate::interfaces::{Backend, BackendKind, Result, StorageError};

pub mod schema;
pub mod sql;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresBackend;
#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteBackend;
pub use sql::SqlBackend;

static ACTIVE: OnceLock<Arc<dyn Backend>> = OnceLock::new();

/// Connect the backend named by configuration.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn Backend>> {
    info!("Storage: {}", config.backend);

    match config.backend {
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => {
            let pool = sqlite::connect(&config.sqlite).await?;
            Ok(Arc::new(SqliteBackend::new(pool)))
        }
        #[cfg(not(feature = "sqlite"))]
        BackendKind::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::Config("sqlite feature not enabled".to_string()))
        }
        #[cfg(feature = "postgres")]
        BackendKind::Postgres => {
            let pool = postgres::connect(&config.postgres).await?;
            Ok(Arc::new(PostgresBackend::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        BackendKind::Postgres => {
            tracing::error!("PostgreSQL storage requested but 'postgres' feature is not enabled");
            Err(StorageError::Config("postgres feature not enabled".to_string()))
        }
    }
}

/// Connect the configured backend and fix it for the process lifetime.
pub async fn select_backend(config: &StorageConfig) -> Result<Arc<dyn Backend>> {
    if ACTIVE.get().is_some() {
        return Err(StorageError::AlreadySelected);
    }
    let backend = connect(config).await?;
    install(backend.clone())?;
    Ok(backend)
}

/// Fix an already-built backend for the process lifetime.
pub fn install(backend: Arc<dyn Backend>) -> Result<()> {
    ACTIVE
        .set(backend)
        .map_err(|_| StorageError::AlreadySelected)
}

/// The backend chosen for this process.
pub fn active_backend() -> Result<Arc<dyn Backend>> {
    ACTIVE.get().cloned().ok_or(StorageError::NotSelected)
}

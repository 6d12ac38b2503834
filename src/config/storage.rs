//! Storage configuration types.

use serde::Deserialize;

use crate::interfaces::BackendKind;

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend serves this process.
    pub backend: BackendKind,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
    /// PostgreSQL-specific configuration.
    pub postgres: PostgresConfig,
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path.
    pub path: String,
    /// Pool size.
    pub max_connections: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "data/clubhouse.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

/// PostgreSQL-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Pool size.
    pub max_connections: u32,
    /// How long a caller waits for a pooled connection.
    pub acquire_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "clubhouse".to_string(),
            password: String::new(),
            database: "clubhouse".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let storage = StorageConfig::default();
        assert_eq!(storage.backend, BackendKind::Sqlite);
        assert_eq!(storage.sqlite.path, "data/clubhouse.db");
        assert_eq!(storage.postgres.port, 5432);
        assert_eq!(storage.postgres.database, "clubhouse");
    }
}

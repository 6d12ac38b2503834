//! Unified SQL storage implementation.
//!
//! This module provides one `Backend` implementation shared by the SQL
//! engines (PostgreSQL, SQLite). The implementation is parameterized by
//! database type using the `SqlDatabase` trait.

mod backend;
mod query;

pub use backend::SqlBackend;
pub use query::SqlDatabase;

use serde_json::Value;

use crate::interfaces::StorageError;

/// Map a driver error to the storage taxonomy.
pub(crate) fn classify<DB: SqlDatabase>(err: sqlx::Error, table: &str) -> StorageError {
    if DB::is_missing_table(&err) {
        return StorageError::TableMissing {
            table: table.to_string(),
        };
    }
    let unavailable = matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_)
    );
    if unavailable {
        StorageError::Unavailable(err.to_string())
    } else {
        StorageError::Database(err)
    }
}

/// Convert a JSON scalar into a query-builder value.
///
/// Booleans are stored as 0/1 on both engines.
pub(crate) fn to_sql_value(value: Value) -> sea_query::Value {
    match value {
        Value::Null => sea_query::Value::String(None),
        Value::Bool(b) => sea_query::Value::BigInt(Some(i64::from(b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(f) = n.as_f64() {
                f.into()
            } else {
                n.to_string().into()
            }
        }
        Value::String(s) => s.into(),
        other => other.to_string().into(),
    }
}

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use sea_query::PostgresQueryBuilder;
    use sqlx::PgPool;

    use crate::interfaces::BackendKind;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    /// SQLSTATE for `undefined_table`.
    const UNDEFINED_TABLE: &str = "42P01";

    impl super::SqlDatabase for Postgres {
        type Pool = PgPool;

        const KIND: BackendKind = BackendKind::Postgres;

        const COLUMNS_SQL: &'static str = "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position";

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn is_missing_table(err: &sqlx::Error) -> bool {
            match err {
                sqlx::Error::Database(db) => db.code().as_deref() == Some(UNDEFINED_TABLE),
                _ => false,
            }
        }
    }

    /// PostgreSQL backend.
    pub type PostgresBackend = super::SqlBackend<Postgres>;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use sea_query::SqliteQueryBuilder;
    use sqlx::SqlitePool;

    use crate::interfaces::BackendKind;

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Pool = SqlitePool;

        const KIND: BackendKind = BackendKind::Sqlite;

        const COLUMNS_SQL: &'static str = "SELECT name FROM pragma_table_info(?1) ORDER BY cid";

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn is_missing_table(err: &sqlx::Error) -> bool {
            match err {
                sqlx::Error::Database(db) => db.message().contains("no such table"),
                _ => false,
            }
        }
    }

    /// SQLite backend.
    pub type SqliteBackend = super::SqlBackend<Sqlite>;
}

//! SQL database abstraction trait.

use crate::interfaces::BackendKind;

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite)
/// by providing the pool type, query building and the engine-specific
/// catalog and error details.
pub trait SqlDatabase: Send + Sync + 'static {
    /// The connection pool type for this database.
    type Pool: Clone + Send + Sync;

    /// Engine this marker stands for.
    const KIND: BackendKind;

    /// Query returning one column name per row for the table bound as the
    /// single parameter, in declaration order.
    const COLUMNS_SQL: &'static str;

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: sea_query::SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: sea_query::InsertStatement) -> String;

    /// Build a SQL query string from a sea-query DELETE statement.
    fn build_delete(stmt: sea_query::DeleteStatement) -> String;

    /// Whether the driver error reports a table that does not exist.
    fn is_missing_table(err: &sqlx::Error) -> bool;
}

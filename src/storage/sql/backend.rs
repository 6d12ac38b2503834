//! Unified SQL Backend implementation.
//!
//! Uses a macro to generate implementations for each SQL engine,
//! eliminating code duplication while maintaining type safety.

use std::marker::PhantomData;

use sea_query::{Alias, Asterisk, OnConflict, Query, SimpleExpr};
use serde_json::Value;

use super::{to_sql_value, SqlDatabase};
use crate::interfaces::{Result, StorageError, WriteOp};
use crate::storage::schema::Settings;

/// SQL-based implementation of Backend.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite). The pool is the process-wide
/// shared resource; the driver serializes physical connection access.
pub struct SqlBackend<DB: SqlDatabase> {
    pool: DB::Pool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlBackend<DB> {
    /// Create a new SQL backend with the given pool.
    pub fn new(pool: DB::Pool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DB::Pool {
        &self.pool
    }
}

fn select_all_sql<DB: SqlDatabase>(table: &str) -> String {
    let stmt = Query::select()
        .column(Asterisk)
        .from(Alias::new(table))
        .to_owned();
    DB::build_select(stmt)
}

fn delete_all_sql<DB: SqlDatabase>(table: &str) -> String {
    let stmt = Query::delete().from_table(Alias::new(table)).to_owned();
    DB::build_delete(stmt)
}

fn insert_sql<DB: SqlDatabase>(table: &str, columns: &[String], values: Vec<Value>) -> Result<String> {
    if columns.is_empty() || columns.len() != values.len() {
        return Err(StorageError::ColumnMismatch {
            table: table.to_string(),
            columns: columns.len(),
            values: values.len(),
        });
    }

    let stmt = Query::insert()
        .into_table(Alias::new(table))
        .columns(columns.iter().map(|c| Alias::new(c.as_str())))
        .values_panic(values.into_iter().map(|v| SimpleExpr::Value(to_sql_value(v))))
        .to_owned();
    Ok(DB::build_insert(stmt))
}

fn upsert_sql<DB: SqlDatabase>(table: &str, key: &str, value: &str) -> String {
    let stmt = Query::insert()
        .into_table(Alias::new(table))
        .columns([Settings::Key, Settings::Value])
        .values_panic([key.into(), value.into()])
        .on_conflict(
            OnConflict::column(Settings::Key)
                .update_column(Settings::Value)
                .to_owned(),
        )
        .to_owned();
    DB::build_insert(stmt)
}

fn op_sql<DB: SqlDatabase>(op: WriteOp) -> Result<(String, String)> {
    match op {
        WriteOp::DeleteAll { table } => {
            let sql = delete_all_sql::<DB>(&table);
            Ok((table, sql))
        }
        WriteOp::Insert {
            table,
            columns,
            values,
        } => {
            let sql = insert_sql::<DB>(&table, &columns, values)?;
            Ok((table, sql))
        }
    }
}

/// Macro to implement Backend for a specific SQL engine.
///
/// `$decode_row` turns the engine's row type into a JSON column map.
macro_rules! impl_backend {
    ($db_type:ty, $feature:literal, decode_row: $decode_row:path) => {
        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::Backend for SqlBackend<$db_type> {
            fn kind(&self) -> crate::interfaces::BackendKind {
                <$db_type as SqlDatabase>::KIND
            }

            async fn query_all(&self, table: &str) -> Result<Vec<crate::interfaces::Row>> {
                let sql = select_all_sql::<$db_type>(table);
                let rows = sqlx::query(&sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| super::classify::<$db_type>(e, table))?;

                Ok(rows.iter().map($decode_row).collect())
            }

            async fn introspect_columns(&self, table: &str) -> Result<Vec<String>> {
                use sqlx::Row;

                let rows = sqlx::query(<$db_type as SqlDatabase>::COLUMNS_SQL)
                    .bind(table)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| super::classify::<$db_type>(e, table))?;

                let columns = rows
                    .iter()
                    .map(|row| row.try_get::<String, _>(0))
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                if columns.is_empty() {
                    return Err(StorageError::TableMissing {
                        table: table.to_string(),
                    });
                }
                Ok(columns)
            }

            async fn delete_all(&self, table: &str) -> Result<()> {
                let sql = delete_all_sql::<$db_type>(table);
                sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| super::classify::<$db_type>(e, table))?;
                Ok(())
            }

            async fn insert_row(
                &self,
                table: &str,
                columns: &[String],
                values: Vec<Value>,
            ) -> Result<()> {
                let sql = insert_sql::<$db_type>(table, columns, values)?;
                sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| super::classify::<$db_type>(e, table))?;
                Ok(())
            }

            async fn run_in_transaction(&self, ops: Vec<WriteOp>) -> Result<()> {
                // Build every statement up front so a malformed op fails before BEGIN
                let statements = ops
                    .into_iter()
                    .map(op_sql::<$db_type>)
                    .collect::<Result<Vec<_>>>()?;

                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| super::classify::<$db_type>(e, ""))?;

                for (table, sql) in &statements {
                    if let Err(e) = sqlx::query(sql).execute(&mut *tx).await {
                        if let Err(rollback) = tx.rollback().await {
                            tracing::warn!(%table, error = %rollback, "Rollback failed");
                        }
                        return Err(super::classify::<$db_type>(e, table));
                    }
                }

                tx.commit()
                    .await
                    .map_err(|e| super::classify::<$db_type>(e, ""))?;

                Ok(())
            }

            async fn upsert_singleton(&self, table: &str, key: &str, value: &str) -> Result<()> {
                let sql = upsert_sql::<$db_type>(table, key, value);
                sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| super::classify::<$db_type>(e, table))?;
                Ok(())
            }
        }
    };
}

// Generate implementations for each SQL engine
impl_backend!(super::postgres::Postgres, "postgres", decode_row: crate::storage::postgres::decode_row);
impl_backend!(super::sqlite::Sqlite, "sqlite", decode_row: crate::storage::sqlite::decode_row);

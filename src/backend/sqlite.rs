//! SQLite session over a sqlx transaction.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction, TypeInfo, ValueRef};

use super::{BackendError, Session};
use crate::query::{CollectionQuery, CompiledSql, DeleteStatement, KeyValue, SqlCompiler, Value};
use crate::schema::SchemaRegistry;

/// Open a pool for `database_url`, creating the database file if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool, BackendError> {
    let url = if !database_url.starts_with("sqlite:") || database_url.contains("mode=") {
        database_url.to_string()
    } else if database_url.contains('?') {
        format!("{}&mode=rwc", database_url)
    } else {
        format!("{}?mode=rwc", database_url)
    };

    log::info!("[SQLite] Connecting to {}", url);
    SqlitePool::connect(&url).await.map_err(|e| {
        log::error!("[SQLite] Failed to connect to '{}': {}", url, e);
        BackendError::Database(e)
    })
}

/// A [`Session`] holding one open SQLite transaction.
///
/// Commit and rollback consume the transaction; any further call fails with
/// [`BackendError::TransactionClosed`]. Dropping an unfinished session rolls
/// the transaction back.
pub struct SqliteSession {
    schema: Arc<SchemaRegistry>,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteSession {
    pub async fn begin(pool: &SqlitePool, schema: Arc<SchemaRegistry>) -> Result<Self, BackendError> {
        let tx = pool.begin().await?;
        Ok(Self {
            schema,
            tx: Some(tx),
        })
    }

    pub fn is_open(&self) -> bool {
        self.tx.is_some()
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>, BackendError> {
        self.tx.as_mut().ok_or(BackendError::TransactionClosed)
    }
}

#[async_trait]
impl Session for SqliteSession {
    async fn fetch_keys(&mut self, query: &CollectionQuery) -> Result<Vec<KeyValue>, BackendError> {
        let compiled = SqlCompiler::new(&self.schema).compile_collection(query)?;
        log::debug!("[SQLite] {}", compiled);

        let tx = self.tx()?;
        let rows = bind_all(&compiled).fetch_all(&mut **tx).await?;

        let width = query.key_width();
        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            if row.len() != width {
                return Err(BackendError::UnexpectedRowShape {
                    table: query.table.clone(),
                    expected: width,
                    actual: row.len(),
                });
            }
            let values = (0..width)
                .map(|i| decode_value(row, i))
                .collect::<Result<Vec<_>, _>>()?;
            keys.push(KeyValue::from_row(values));
        }
        Ok(keys)
    }

    async fn execute_delete(&mut self, statement: &DeleteStatement) -> Result<u64, BackendError> {
        let compiled = SqlCompiler::new(&self.schema).compile_delete(statement)?;
        log::debug!("[SQLite] {}", compiled);

        let tx = self.tx()?;
        let result = bind_all(&compiled).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    async fn commit(&mut self) -> Result<(), BackendError> {
        let tx = self.tx.take().ok_or(BackendError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BackendError> {
        let tx = self.tx.take().ok_or(BackendError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), BackendError> {
        // Statements already ran inside the open transaction
        self.tx()?;
        Ok(())
    }
}

fn bind_all(compiled: &CompiledSql) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    compiled
        .params
        .iter()
        .fold(sqlx::query(&compiled.sql), bind_value)
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Integer(i) => query.bind(*i),
        Value::Real(r) => query.bind(*r),
        Value::Text(s) => query.bind(s.clone()),
        Value::Blob(b) => query.bind(b.clone()),
    }
}

/// Decode by the value's storage class, not the column's declared type.
fn decode_value(row: &SqliteRow, index: usize) -> Result<Value, BackendError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();
    let value = match storage.as_str() {
        "INTEGER" => Value::Integer(row.try_get(index)?),
        "REAL" => Value::Real(row.try_get(index)?),
        "BLOB" => Value::Blob(row.try_get(index)?),
        _ => Value::Text(row.try_get(index)?),
    };
    Ok(value)
}

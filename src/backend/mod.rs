//! Query execution backends
//!
//! The deleter talks to the database only through [`Session`]: one open
//! transaction that can run key-collection queries and batched deletes, and
//! then be committed, rolled back or flushed.

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::query::{CollectionQuery, CompileError, DeleteStatement, KeyValue};

pub use sqlite::SqliteSession;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to compile statement: {0}")]
    Compile(#[from] CompileError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Key query for '{table}' returned {actual} columns, expected {expected}")]
    UnexpectedRowShape {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Transaction is no longer open")]
    TransactionClosed,

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn other_with_context(error: impl std::fmt::Display, context: impl Into<String>) -> Self {
        BackendError::Other(format!("{}: {}", context.into(), error))
    }
}

/// One transaction against the database holding the tenant's rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send {
    /// Run a collection query and return its key rows, one [`KeyValue`] per row.
    async fn fetch_keys(&mut self, query: &CollectionQuery) -> Result<Vec<KeyValue>, BackendError>;

    /// Run one batched delete and return the number of rows affected.
    async fn execute_delete(&mut self, statement: &DeleteStatement) -> Result<u64, BackendError>;

    async fn commit(&mut self) -> Result<(), BackendError>;

    async fn rollback(&mut self) -> Result<(), BackendError>;

    /// Make pending changes visible inside the transaction without committing.
    async fn flush(&mut self) -> Result<(), BackendError>;
}

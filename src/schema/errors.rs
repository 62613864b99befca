//! # Schema Registry Error Types
//!
//! Errors raised while assembling a [`SchemaRegistry`](super::SchemaRegistry)
//! from table definitions, YAML schema files, or live database introspection.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("Table '{table}' is defined more than once")]
    DuplicateTable { table: String },
    #[error("Table '{table}' declares primary key column '{column}' which is not one of its columns")]
    UnknownPrimaryKeyColumn { table: String, column: String },
    #[error("Table '{table}' has a foreign key referencing unknown table '{referenced_table}'")]
    UnknownForeignKeyTarget {
        table: String,
        referenced_table: String,
    },
    #[error("Table '{table}' has a foreign key on unknown column '{column}'")]
    UnknownForeignKeyColumn { table: String, column: String },
    #[error("Foreign keys form a dependency cycle between tables: {tables:?}")]
    DependencyCycle { tables: Vec<String> },
    #[error("Model columns registered for unknown table '{table}'")]
    UnknownModelTable { table: String },
    #[error("Failed to read schema file: {error}")]
    ReadError { error: String },
    #[error("Failed to parse schema definition: {error}")]
    ParseError { error: String },
    #[error("Failed to introspect database schema: {error}")]
    IntrospectionError { error: String },
}

impl SchemaError {
    /// Create an introspection error with context information
    ///
    /// # Example
    /// ```ignore
    /// SchemaError::introspection_error_with_context(
    ///     err,
    ///     "While reading foreign keys of 'orders'"
    /// )
    /// ```
    pub fn introspection_error_with_context(
        error: impl std::fmt::Display,
        context: impl Into<String>,
    ) -> Self {
        SchemaError::IntrospectionError {
            error: format!("{}\n  Context: {}", error, context.into()),
        }
    }
}

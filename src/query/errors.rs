use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("Unknown table '{0}' in query")]
    UnknownTable(String),

    #[error("Column '{column}' refers to relation '{relation}' which is not part of the query")]
    RelationNotInScope { relation: String, column: String },

    #[error("Column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Cannot compare column '{column}' of type {expected:?} with {actual} literal {value}")]
    TypeMismatch {
        column: String,
        expected: crate::schema::SqlType,
        actual: &'static str,
        value: String,
    },

    #[error("IN list for column '{0}' is empty")]
    EmptyInList(String),

    #[error("Empty {0} group in predicate")]
    EmptyGroup(&'static str),

    #[error("Collection query for '{0}' has no branches")]
    EmptyUnion(String),

    #[error("Delete batch for '{0}' contains no keys")]
    EmptyKeyBatch(String),

    #[error("Key {key} has {actual} values but table '{table}' has {expected} key columns")]
    KeyArityMismatch {
        table: String,
        key: String,
        expected: usize,
        actual: usize,
    },
}

//! Backend-neutral statements built by the deletion planner.

use super::predicate::{Column, Predicate};
use super::value::KeyValue;

/// A table in a FROM or JOIN clause, optionally aliased
#[derive(Debug, Clone, PartialEq)]
pub struct TableSource {
    pub table: String,
    pub alias: Option<String>,
}

impl TableSource {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    pub fn aliased(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: Some(alias.into()),
        }
    }

    /// The name columns of this source are qualified with
    pub fn relation(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// `JOIN source ON left = right`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub source: TableSource,
    pub left: Column,
    pub right: Column,
}

/// A single SELECT; an empty column list selects the constant `1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub from: TableSource,
    pub columns: Vec<Column>,
    pub joins: Vec<JoinClause>,
    pub filter: Option<Predicate>,
}

impl SelectQuery {
    pub fn new(from: TableSource, columns: Vec<Column>) -> Self {
        Self {
            from,
            columns,
            joins: Vec::new(),
            filter: None,
        }
    }

    pub fn join(mut self, source: TableSource, left: Column, right: Column) -> Self {
        self.joins.push(JoinClause {
            source,
            left,
            right,
        });
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// All sources in scope, FROM first
    pub fn sources(&self) -> impl Iterator<Item = &TableSource> {
        std::iter::once(&self.from).chain(self.joins.iter().map(|j| &j.source))
    }
}

/// Primary-key collection query for one table: the UNION of one or more branches.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
    pub table: String,
    pub key_columns: Vec<String>,
    pub branches: Vec<SelectQuery>,
}

impl CollectionQuery {
    pub fn key_width(&self) -> usize {
        self.key_columns.len()
    }

    pub fn is_union(&self) -> bool {
        self.branches.len() > 1
    }
}

/// `DELETE FROM table WHERE key IN (...)` for one batch of keys.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub key_columns: Vec<String>,
    pub keys: Vec<KeyValue>,
}

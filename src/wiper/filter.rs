//! Tenant filters
//!
//! A tenant filter is a function from a table to the predicate selecting one
//! tenant's rows of it. Filters never see schema objects directly; they reach
//! columns through [`TableRef::column`], which lets the probe substitute a
//! recording stand-in for the real table.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::query::{Column, Predicate, Value};
use crate::schema::TableDef;

/// Table-like handle a filter builds its predicate against
pub trait TableRef {
    /// Real table name, regardless of any alias
    fn name(&self) -> &str;

    /// Marker for column `name` of this table
    fn column(&self, name: &str) -> Column;
}

/// Raised by a filter that cannot build a predicate at all
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{reason}")]
pub struct FilterBuildError {
    pub reason: String,
}

impl FilterBuildError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub type FilterFn = dyn Fn(&dyn TableRef) -> Result<Predicate, FilterBuildError> + Send + Sync;

/// A named tenant-match predicate builder. Cheap to clone.
#[derive(Clone)]
pub struct TenantFilter {
    source: String,
    build: Arc<FilterFn>,
}

impl TenantFilter {
    /// Filter from an infallible closure; `source` is shown in diagnostics.
    pub fn new<F>(source: impl Into<String>, build: F) -> Self
    where
        F: Fn(&dyn TableRef) -> Predicate + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            build: Arc::new(move |table| Ok(build(table))),
        }
    }

    pub fn try_new<F>(source: impl Into<String>, build: F) -> Self
    where
        F: Fn(&dyn TableRef) -> Result<Predicate, FilterBuildError> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            build: Arc::new(build),
        }
    }

    /// `table.column = value`
    pub fn column_equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        let source = format!("{} = {}", column, value);
        Self::new(source, move |table| table.column(&column).eq(value.clone()))
    }

    /// `table.column IN (values...)`
    pub fn column_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let column = column.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let source = format!("{} IN ({})", column, rendered.join(", "));
        Self::new(source, move |table| table.column(&column).is_in(values.clone()))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn apply(&self, table: &dyn TableRef) -> Result<Predicate, FilterBuildError> {
        (self.build)(table)
    }
}

impl fmt::Debug for TenantFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantFilter")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for TenantFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// A schema table as seen by a filter, optionally under a join alias.
pub struct BoundTable<'a> {
    table: &'a TableDef,
    alias: Option<&'a str>,
}

impl<'a> BoundTable<'a> {
    pub fn new(table: &'a TableDef) -> Self {
        Self { table, alias: None }
    }

    pub fn aliased(table: &'a TableDef, alias: &'a str) -> Self {
        Self {
            table,
            alias: Some(alias),
        }
    }

    pub fn relation(&self) -> &str {
        self.alias.unwrap_or(&self.table.name)
    }
}

impl TableRef for BoundTable<'_> {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn column(&self, name: &str) -> Column {
        Column::new(self.relation(), name)
    }
}

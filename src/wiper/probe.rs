//! Tenant filter probe
//!
//! Decides whether a filter applies to a table without running anything
//! against the database. The filter is first invoked against a
//! [`ColumnRecorder`] that only records which columns it asks for; if every
//! recorded column exists on the table, the filter is invoked again against the
//! real table and the result compiled into `SELECT 1 FROM table WHERE ...` to
//! catch predicates that would only fail at execution time.

use std::cell::RefCell;
use std::collections::BTreeSet;

use super::errors::WiperError;
use super::filter::{BoundTable, TableRef, TenantFilter};
use crate::query::{Column, Predicate, SelectQuery, SqlCompiler, TableSource};
use crate::schema::{SchemaRegistry, TableDef};

/// Table stand-in that records every column a filter touches
pub struct ColumnRecorder<'a> {
    table_name: &'a str,
    accessed: RefCell<BTreeSet<String>>,
}

impl<'a> ColumnRecorder<'a> {
    pub fn new(table_name: &'a str) -> Self {
        Self {
            table_name,
            accessed: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn accessed_columns(&self) -> BTreeSet<String> {
        self.accessed.borrow().clone()
    }
}

impl TableRef for ColumnRecorder<'_> {
    fn name(&self) -> &str {
        self.table_name
    }

    fn column(&self, name: &str) -> Column {
        self.accessed.borrow_mut().insert(name.to_string());
        Column::new(self.table_name, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterProbe {
    pub applicable: bool,
    pub referenced_columns: BTreeSet<String>,
}

/// Probe `filter` against `table`.
///
/// A filter that errors on the recorder is a [`WiperError::FilterSyntax`]; one
/// that references only existing columns but still fails to build or compile
/// is a [`WiperError::FilterApplication`]. Referencing a missing column just
/// makes the filter inapplicable.
pub fn probe_filter(
    schema: &SchemaRegistry,
    table: &TableDef,
    filter: &TenantFilter,
) -> Result<FilterProbe, WiperError> {
    let recorder = ColumnRecorder::new(&table.name);
    filter
        .apply(&recorder)
        .map_err(|e| WiperError::FilterSyntax {
            filter: filter.source().to_string(),
            reason: e.to_string(),
        })?;
    let referenced_columns = recorder.accessed_columns();

    if !referenced_columns.iter().all(|c| table.has_column(c)) {
        return Ok(FilterProbe {
            applicable: false,
            referenced_columns,
        });
    }

    let application_error = |reason: String| WiperError::FilterApplication {
        table: table.name.clone(),
        filter: filter.source().to_string(),
        reason,
    };
    let predicate = filter
        .apply(&BoundTable::new(table))
        .map_err(|e| application_error(e.to_string()))?;
    let trial = SelectQuery::new(TableSource::new(&table.name), Vec::new()).filter(predicate);
    SqlCompiler::new(schema)
        .compile_select(&trial)
        .map_err(|e| application_error(e.to_string()))?;

    Ok(FilterProbe {
        applicable: true,
        referenced_columns,
    })
}

/// Predicates of every filter applicable to `table`, built against `relation`
/// (the table name or its join alias). Order follows `filters`.
pub fn applicable_predicates(
    schema: &SchemaRegistry,
    table: &TableDef,
    relation: &str,
    filters: &[TenantFilter],
) -> Result<Vec<Predicate>, WiperError> {
    let bound = if relation == table.name {
        BoundTable::new(table)
    } else {
        BoundTable::aliased(table, relation)
    };

    let mut predicates = Vec::new();
    for filter in filters {
        if !probe_filter(schema, table, filter)?.applicable {
            continue;
        }
        let predicate = filter
            .apply(&bound)
            .map_err(|e| WiperError::FilterApplication {
                table: table.name.clone(),
                filter: filter.source().to_string(),
                reason: e.to_string(),
            })?;
        predicates.push(predicate);
    }
    Ok(predicates)
}

/// Whether at least one filter applies to `table`
pub fn is_directly_filterable(
    schema: &SchemaRegistry,
    table: &TableDef,
    filters: &[TenantFilter],
) -> Result<bool, WiperError> {
    for filter in filters {
        if probe_filter(schema, table, filter)?.applicable {
            return Ok(true);
        }
    }
    Ok(false)
}

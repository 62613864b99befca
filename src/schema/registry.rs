//! Schema registry: the catalog of tables the wiper is allowed to touch.
//!
//! The registry owns every [`TableDef`] and precomputes a stable,
//! dependency-safe ordering in which each table appears after all tables it
//! references through foreign keys. Deletion walks that order in reverse.
//!
//! An optional *model registry* maps a table name to a richer column set
//! (columns contributed by application models, e.g. inherited mappings).
//! Join-path validation consults it first and falls back to raw columns.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use super::errors::SchemaError;
use super::table::TableDef;

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableDef>,
    // Dependency-safe order, ties broken by table name
    sorted: Vec<String>,
    model_columns: HashMap<String, BTreeSet<String>>,
}

impl SchemaRegistry {
    /// Build a registry, checking keys and computing the dependency-safe order.
    pub fn new(tables: Vec<TableDef>) -> Result<Self, SchemaError> {
        let mut by_name: HashMap<String, TableDef> = HashMap::with_capacity(tables.len());
        for table in tables {
            if by_name.contains_key(&table.name) {
                return Err(SchemaError::DuplicateTable { table: table.name });
            }
            by_name.insert(table.name.clone(), table);
        }

        for table in by_name.values() {
            for pk in &table.primary_key {
                if !table.has_column(pk) {
                    return Err(SchemaError::UnknownPrimaryKeyColumn {
                        table: table.name.clone(),
                        column: pk.clone(),
                    });
                }
            }
            for fk in &table.foreign_keys {
                if !by_name.contains_key(&fk.referenced_table) {
                    return Err(SchemaError::UnknownForeignKeyTarget {
                        table: table.name.clone(),
                        referenced_table: fk.referenced_table.clone(),
                    });
                }
                if let Some(missing) = fk.columns.iter().find(|c| !table.has_column(c)) {
                    return Err(SchemaError::UnknownForeignKeyColumn {
                        table: table.name.clone(),
                        column: missing.clone(),
                    });
                }
            }
        }

        let sorted = dependency_order(&by_name)?;
        debug!("[Schema] dependency-safe table order: {:?}", sorted);

        Ok(Self {
            tables: by_name,
            sorted,
            model_columns: HashMap::new(),
        })
    }

    /// Register the model-level column set for a table.
    pub fn register_model_columns<I, S>(&mut self, table: &str, columns: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.tables.contains_key(table) {
            return Err(SchemaError::UnknownModelTable {
                table: table.to_string(),
            });
        }
        self.model_columns
            .entry(table.to_string())
            .or_default()
            .extend(columns.into_iter().map(Into::into));
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables in dependency-safe order (referenced tables first).
    pub fn sorted_tables(&self) -> impl DoubleEndedIterator<Item = &TableDef> + '_ {
        self.sorted.iter().filter_map(move |name| self.tables.get(name))
    }

    /// Tables in deletion order: the reverse of [`Self::sorted_tables`].
    pub fn deletion_order(&self) -> impl Iterator<Item = &TableDef> + '_ {
        self.sorted_tables().rev()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sorted.iter().map(String::as_str)
    }

    /// Every column of a table, preferring the model registry over raw columns.
    ///
    /// Returns an empty set for unknown tables.
    pub fn all_columns(&self, table: &str) -> BTreeSet<String> {
        if let Some(columns) = self.model_columns.get(table) {
            return columns.clone();
        }
        self.tables
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }
}

/// Kahn's algorithm over FK edges; self-references are ignored.
fn dependency_order(tables: &HashMap<String, TableDef>) -> Result<Vec<String>, SchemaError> {
    let mut pending: HashMap<&str, BTreeSet<&str>> = tables
        .values()
        .map(|t| (t.name.as_str(), t.dependencies().collect()))
        .collect();

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, deps)| deps.is_empty())
        .map(|(name, _)| *name)
        .collect();
    for name in &ready {
        pending.remove(name);
    }

    let mut order = Vec::with_capacity(tables.len());
    while let Some(next) = ready.pop_first() {
        order.push(next.to_string());
        let unblocked: Vec<&str> = pending
            .iter_mut()
            .filter_map(|(name, deps)| {
                deps.remove(next);
                deps.is_empty().then_some(*name)
            })
            .collect();
        for name in unblocked {
            pending.remove(name);
            ready.insert(name);
        }
    }

    if !pending.is_empty() {
        let mut cycle: Vec<String> = pending.keys().map(|s| s.to_string()).collect();
        cycle.sort();
        return Err(SchemaError::DependencyCycle { tables: cycle });
    }

    Ok(order)
}

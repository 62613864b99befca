//! Schema definitions loaded from YAML.
//!
//! Used when the database cannot be introspected (or should not be trusted) and
//! the table catalog is declared alongside the wiper configuration:
//!
//! ```yaml
//! tables:
//!   - name: users
//!     columns:
//!       - { name: id, type: INTEGER }
//!       - { name: tenant_id, type: VARCHAR(36) }
//!     primary_key: id
//!   - name: product_orders
//!     columns: [product_id, order_id, quantity]
//!     primary_key: [product_id, order_id]
//!     foreign_keys:
//!       - { columns: [order_id], references: orders, referenced_columns: [id] }
//! models:
//!   users: [id, tenant_id, org_id]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::SchemaError;
use super::registry::SchemaRegistry;
use super::table::{ColumnDef, ForeignKeyDef, SqlType, TableDef};

/// Key columns supporting both single and composite keys
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Identifier {
    /// Single column key
    Single(String),
    /// Composite key (multiple columns)
    Composite(Vec<String>),
}

impl Identifier {
    pub fn columns(&self) -> Vec<String> {
        match self {
            Identifier::Single(col) => vec![col.clone()],
            Identifier::Composite(cols) => cols.clone(),
        }
    }
}

/// A column entry: either a bare name or a name with declared type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ColumnDefinition {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type", default)]
        data_type: Option<String>,
    },
}

impl From<&ColumnDefinition> for ColumnDef {
    fn from(def: &ColumnDefinition) -> Self {
        match def {
            ColumnDefinition::Name(name) => ColumnDef::new(name.clone(), None),
            ColumnDefinition::Typed { name, data_type } => ColumnDef::new(
                name.clone(),
                data_type.as_deref().and_then(SqlType::from_declared),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub columns: Identifier,
    pub references: String,
    pub referenced_columns: Identifier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub primary_key: Option<Identifier>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

impl From<&TableDefinition> for TableDef {
    fn from(def: &TableDefinition) -> Self {
        TableDef {
            name: def.name.clone(),
            columns: def.columns.iter().map(ColumnDef::from).collect(),
            primary_key: def
                .primary_key
                .as_ref()
                .map(Identifier::columns)
                .unwrap_or_default(),
            foreign_keys: def
                .foreign_keys
                .iter()
                .map(|fk| ForeignKeyDef {
                    columns: fk.columns.columns(),
                    referenced_table: fk.references.clone(),
                    referenced_columns: fk.referenced_columns.columns(),
                })
                .collect(),
        }
    }
}

/// Complete schema definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub tables: Vec<TableDefinition>,
    /// Model-level column sets keyed by table name
    #[serde(default)]
    pub models: HashMap<String, Vec<String>>,
}

impl SchemaDefinition {
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(content).map_err(|e| SchemaError::ParseError {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::ReadError {
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Build the registry, including any model column sets.
    pub fn into_registry(&self) -> Result<SchemaRegistry, SchemaError> {
        let tables = self.tables.iter().map(TableDef::from).collect();
        let mut registry = SchemaRegistry::new(tables)?;
        for (table, columns) in &self.models {
            registry.register_model_columns(table, columns.iter().cloned())?;
        }
        Ok(registry)
    }
}

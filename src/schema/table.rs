//! Table, column and foreign-key descriptors.

use serde::{Deserialize, Serialize};

/// Storage class of a column, following SQLite's type-affinity rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
    /// SQLite's fallback affinity (`NUMERIC`, `DECIMAL`, `UUID`, `DATETIME`, ...):
    /// numeric-looking values are stored as numbers, anything else as text.
    Numeric,
}

impl SqlType {
    /// Resolve a declared column type (`VARCHAR(36)`, `BIGINT`, ...) to its affinity.
    ///
    /// Returns `None` for an empty declaration, which accepts any value.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return None;
        }
        if upper.starts_with("BOOL") {
            return Some(SqlType::Boolean);
        }
        if upper.contains("INT") {
            return Some(SqlType::Integer);
        }
        if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            return Some(SqlType::Text);
        }
        if upper.contains("BLOB") {
            return Some(SqlType::Blob);
        }
        if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            return Some(SqlType::Real);
        }
        Some(SqlType::Numeric)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Declared type; `None` means untyped.
    #[serde(default)]
    pub data_type: Option<SqlType>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: Option<SqlType>) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// A table known to the schema registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a column (builder style)
    pub fn column(mut self, name: impl Into<String>, data_type: SqlType) -> Self {
        self.columns.push(ColumnDef::new(name, Some(data_type)));
        self
    }

    /// Set the primary key columns (builder style)
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a foreign key (builder style)
    pub fn foreign_key<I, J, S, T>(
        mut self,
        columns: I,
        referenced_table: impl Into<String>,
        referenced_columns: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.foreign_keys.push(ForeignKeyDef {
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_table: referenced_table.into(),
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Tables this table depends on through foreign keys, excluding itself.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .filter(move |t| *t != self.name)
    }
}

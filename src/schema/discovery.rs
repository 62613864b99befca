//! Schema discovery for SQLite databases
//!
//! Builds a [`SchemaRegistry`] by introspecting `sqlite_master` and the
//! `pragma_table_info` / `pragma_foreign_key_list` table-valued functions.

use std::collections::BTreeMap;

use log::{debug, info};
use sqlx::{Row, SqlitePool};

use super::errors::SchemaError;
use super::registry::SchemaRegistry;
use super::table::{ColumnDef, ForeignKeyDef, SqlType, TableDef};

/// Introspect every user table of a SQLite database
pub async fn discover_sqlite_schema(pool: &SqlitePool) -> Result<SchemaRegistry, SchemaError> {
    let table_names = list_tables(pool).await?;
    let mut tables = Vec::with_capacity(table_names.len());

    for name in &table_names {
        let (columns, primary_key) = table_columns(pool, name).await?;
        let foreign_keys = foreign_keys(pool, name).await?;
        tables.push(TableDef {
            name: name.clone(),
            columns,
            primary_key,
            foreign_keys,
        });
    }

    resolve_implicit_references(&mut tables);
    info!("[Schema] discovered {} tables", tables.len());
    SchemaRegistry::new(tables)
}

async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>, SchemaError> {
    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| SchemaError::introspection_error_with_context(e, "While listing tables"))?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SchemaError::introspection_error_with_context(e, "While listing tables"))
}

async fn table_columns(
    pool: &SqlitePool,
    table: &str,
) -> Result<(Vec<ColumnDef>, Vec<String>), SchemaError> {
    let context = || format!("While reading columns of '{}'", table);
    let rows = sqlx::query("SELECT name, type, pk FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;

    let mut columns = Vec::with_capacity(rows.len());
    // pk holds the 1-based position within the primary key, 0 otherwise
    let mut key_positions: BTreeMap<i64, String> = BTreeMap::new();
    for row in rows {
        let name: String = row
            .try_get("name")
            .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;
        let declared: String = row
            .try_get("type")
            .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;
        let pk: i64 = row
            .try_get("pk")
            .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;

        if pk > 0 {
            key_positions.insert(pk, name.clone());
        }
        columns.push(ColumnDef::new(name, SqlType::from_declared(&declared)));
    }

    debug!(
        "[Schema] '{}' columns: {:?}, primary key: {:?}",
        table,
        columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        key_positions.values().collect::<Vec<_>>()
    );
    Ok((columns, key_positions.into_values().collect()))
}

async fn foreign_keys(pool: &SqlitePool, table: &str) -> Result<Vec<ForeignKeyDef>, SchemaError> {
    let context = || format!("While reading foreign keys of '{}'", table);
    let rows = sqlx::query(
        r#"SELECT "id", "table", "from", "to" FROM pragma_foreign_key_list(?) ORDER BY "id", "seq""#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;

    // Multi-column keys span several rows sharing an id
    let mut grouped: BTreeMap<i64, ForeignKeyDef> = BTreeMap::new();
    for row in rows {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;
        let referenced_table: String = row
            .try_get("table")
            .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;
        let from: String = row
            .try_get("from")
            .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;
        let to: Option<String> = row
            .try_get("to")
            .map_err(|e| SchemaError::introspection_error_with_context(e, context()))?;

        let fk = grouped.entry(id).or_insert_with(|| ForeignKeyDef {
            columns: Vec::new(),
            referenced_table,
            referenced_columns: Vec::new(),
        });
        fk.columns.push(from);
        if let Some(to) = to {
            fk.referenced_columns.push(to);
        }
    }

    Ok(grouped.into_values().collect())
}

/// `REFERENCES parent` without a column list targets the parent's primary key.
fn resolve_implicit_references(tables: &mut [TableDef]) {
    let primary_keys: BTreeMap<String, Vec<String>> = tables
        .iter()
        .map(|t| (t.name.clone(), t.primary_key.clone()))
        .collect();

    for table in tables.iter_mut() {
        for fk in table.foreign_keys.iter_mut() {
            if fk.referenced_columns.is_empty() {
                if let Some(pk) = primary_keys.get(&fk.referenced_table) {
                    fk.referenced_columns = pk.clone();
                }
            }
        }
    }
}

//! Generic SQL compilation.
//!
//! Statements compile to SQL text with `?` placeholders plus the ordered bind
//! parameters. Identifiers are always double-quoted. Compilation also checks
//! the statement against the schema registry: every column must belong to a
//! relation in scope and exist on its table, IN lists must be non-empty, and
//! literals must be comparable with the column's declared type. The tenant
//! filter probe relies on these checks to reject predicates that would fail
//! at execution time.

use std::collections::HashMap;
use std::fmt;

use super::errors::CompileError;
use super::plan::{CollectionQuery, DeleteStatement, SelectQuery};
use super::predicate::{Column, ComparisonOp, Predicate};
use super::value::{KeyValue, Value};
use crate::schema::{SchemaRegistry, TableDef};

/// SQL text with its bind parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<Value>,
}

impl fmt::Display for CompiledSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, " -- params: [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

type Scope<'q, 'a> = HashMap<&'q str, &'a TableDef>;

pub struct SqlCompiler<'a> {
    schema: &'a SchemaRegistry,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(schema: &'a SchemaRegistry) -> Self {
        Self { schema }
    }

    pub fn compile_select(&self, query: &SelectQuery) -> Result<CompiledSql, CompileError> {
        let mut params = Vec::new();
        let sql = self.render_select(query, &mut params)?;
        Ok(CompiledSql { sql, params })
    }

    pub fn compile_collection(&self, query: &CollectionQuery) -> Result<CompiledSql, CompileError> {
        if query.branches.is_empty() {
            return Err(CompileError::EmptyUnion(query.table.clone()));
        }
        let mut params = Vec::new();
        let mut parts = Vec::with_capacity(query.branches.len());
        for branch in &query.branches {
            parts.push(self.render_select(branch, &mut params)?);
        }
        Ok(CompiledSql {
            sql: parts.join(" UNION "),
            params,
        })
    }

    pub fn compile_delete(&self, stmt: &DeleteStatement) -> Result<CompiledSql, CompileError> {
        let table = self.lookup(&stmt.table)?;
        if stmt.keys.is_empty() {
            return Err(CompileError::EmptyKeyBatch(stmt.table.clone()));
        }
        for column in &stmt.key_columns {
            if !table.has_column(column) {
                return Err(CompileError::UnknownColumn {
                    table: stmt.table.clone(),
                    column: column.clone(),
                });
            }
        }

        let width = stmt.key_columns.len();
        let mut params = Vec::with_capacity(stmt.keys.len() * width);
        for key in &stmt.keys {
            if key.arity() != width {
                return Err(CompileError::KeyArityMismatch {
                    table: stmt.table.clone(),
                    key: key.to_string(),
                    expected: width,
                    actual: key.arity(),
                });
            }
            match key {
                KeyValue::Single(v) => params.push(v.clone()),
                KeyValue::Composite(values) => params.extend(values.iter().cloned()),
            }
        }

        let sql = if width == 1 {
            format!(
                "DELETE FROM {} WHERE {} IN ({})",
                quote_ident(&stmt.table),
                quote_ident(&stmt.key_columns[0]),
                placeholders(stmt.keys.len())
            )
        } else {
            let columns: Vec<String> = stmt.key_columns.iter().map(|c| quote_ident(c)).collect();
            let row = format!("({})", placeholders(width));
            let rows = vec![row; stmt.keys.len()].join(", ");
            format!(
                "DELETE FROM {} WHERE ({}) IN (VALUES {})",
                quote_ident(&stmt.table),
                columns.join(", "),
                rows
            )
        };

        Ok(CompiledSql { sql, params })
    }

    fn lookup(&self, table: &str) -> Result<&'a TableDef, CompileError> {
        self.schema
            .table(table)
            .ok_or_else(|| CompileError::UnknownTable(table.to_string()))
    }

    fn render_select(
        &self,
        query: &SelectQuery,
        params: &mut Vec<Value>,
    ) -> Result<String, CompileError> {
        let mut scope: Scope<'_, 'a> = HashMap::new();
        for source in query.sources() {
            scope.insert(source.relation(), self.lookup(&source.table)?);
        }

        let select_list = if query.columns.is_empty() {
            "1".to_string()
        } else {
            query
                .columns
                .iter()
                .map(|c| self.render_column(&scope, c).map(|(sql, _)| sql))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", select_list, render_source(&query.from));
        for join in &query.joins {
            let (left, _) = self.render_column(&scope, &join.left)?;
            let (right, _) = self.render_column(&scope, &join.right)?;
            sql.push_str(&format!(
                " JOIN {} ON {} = {}",
                render_source(&join.source),
                left,
                right
            ));
        }
        if let Some(filter) = &query.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render_predicate(&scope, filter, params)?);
        }
        Ok(sql)
    }

    fn render_column(
        &self,
        scope: &Scope<'_, 'a>,
        column: &Column,
    ) -> Result<(String, &'a TableDef), CompileError> {
        let table = scope
            .get(column.relation.as_str())
            .copied()
            .ok_or_else(|| CompileError::RelationNotInScope {
                relation: column.relation.clone(),
                column: column.name.clone(),
            })?;
        if !table.has_column(&column.name) {
            return Err(CompileError::UnknownColumn {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
        Ok((
            format!("{}.{}", quote_ident(&column.relation), quote_ident(&column.name)),
            table,
        ))
    }

    fn check_literal(
        &self,
        table: &TableDef,
        column: &Column,
        value: &Value,
    ) -> Result<(), CompileError> {
        let declared = table.get_column(&column.name).and_then(|c| c.data_type);
        match declared {
            Some(expected) if !value.is_compatible_with(expected) => Err(CompileError::TypeMismatch {
                column: column.to_string(),
                expected,
                actual: value.kind(),
                value: value.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn render_predicate(
        &self,
        scope: &Scope<'_, 'a>,
        predicate: &Predicate,
        params: &mut Vec<Value>,
    ) -> Result<String, CompileError> {
        match predicate {
            Predicate::Compare { column, op, value } => {
                let (col, table) = self.render_column(scope, column)?;
                if matches!(value, Value::Null) {
                    return Ok(match op {
                        ComparisonOp::NotEqual => format!("{} IS NOT NULL", col),
                        _ => format!("{} IS NULL", col),
                    });
                }
                self.check_literal(table, column, value)?;
                params.push(value.clone());
                Ok(format!("{} {} ?", col, op.to_sql()))
            }
            Predicate::In {
                column,
                values,
                negated,
            } => {
                let (col, table) = self.render_column(scope, column)?;
                if values.is_empty() {
                    return Err(CompileError::EmptyInList(column.to_string()));
                }
                for value in values {
                    self.check_literal(table, column, value)?;
                }
                params.extend(values.iter().cloned());
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", col, keyword, placeholders(values.len())))
            }
            Predicate::IsNull { column, negated } => {
                let (col, _) = self.render_column(scope, column)?;
                Ok(if *negated {
                    format!("{} IS NOT NULL", col)
                } else {
                    format!("{} IS NULL", col)
                })
            }
            Predicate::And(parts) => self.render_group(scope, parts, "AND", params),
            Predicate::Or(parts) => self.render_group(scope, parts, "OR", params),
            Predicate::Not(inner) => Ok(format!(
                "NOT ({})",
                self.render_predicate(scope, inner, params)?
            )),
        }
    }

    fn render_group(
        &self,
        scope: &Scope<'_, 'a>,
        parts: &[Predicate],
        keyword: &'static str,
        params: &mut Vec<Value>,
    ) -> Result<String, CompileError> {
        match parts {
            [] => Err(CompileError::EmptyGroup(keyword)),
            [single] => self.render_predicate(scope, single, params),
            _ => {
                let rendered = parts
                    .iter()
                    .map(|p| self.render_predicate(scope, p, params).map(|s| format!("({})", s)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rendered.join(&format!(" {} ", keyword)))
            }
        }
    }
}

fn render_source(source: &super::plan::TableSource) -> String {
    match &source.alias {
        Some(alias) => format!("{} AS {}", quote_ident(&source.table), quote_ident(alias)),
        None => quote_ident(&source.table),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

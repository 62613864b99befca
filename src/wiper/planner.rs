//! Primary-key collection planning
//!
//! For each table the planner builds the query selecting the primary keys of
//! the tenant's rows:
//!
//! - a table with an applicable tenant filter is filtered directly, with every
//!   applicable filter OR-ed together;
//! - otherwise every join path declared for the table becomes one branch that
//!   joins `t0` (the table itself) through `t1..tn` to the terminal table and
//!   filters the terminal table. Branches are combined with `UNION`.

use super::config::TenantWiperConfig;
use super::errors::WiperError;
use super::events::WiperEvent;
use super::join_path::{parse_join_path, JoinPath};
use super::probe::applicable_predicates;
use crate::query::{CollectionQuery, Column, Predicate, SelectQuery, TableSource};
use crate::schema::TableDef;

pub struct DeletionPlanner<'a> {
    config: &'a TenantWiperConfig,
}

impl<'a> DeletionPlanner<'a> {
    pub fn new(config: &'a TenantWiperConfig) -> Self {
        Self { config }
    }

    /// `Ok(None)` when neither a direct filter nor any join path yields a query.
    pub fn build_collection_query(
        &self,
        table: &TableDef,
    ) -> Result<Option<CollectionQuery>, WiperError> {
        if table.primary_key.is_empty() {
            return Err(WiperError::MissingPrimaryKey(table.name.clone()));
        }

        let schema = self.config.schema();
        let direct = applicable_predicates(schema, table, &table.name, self.config.tenant_filters())?;
        if let Some(filter) = Predicate::any_of(direct) {
            let columns = key_columns(table, &table.name);
            let branch = SelectQuery::new(TableSource::new(&table.name), columns).filter(filter);
            return Ok(Some(self.collection(table, vec![branch])));
        }

        let mut branches = Vec::new();
        for path in self.config.relationships().paths_for(&table.name) {
            if let Some(branch) = self.path_branch(table, path)? {
                branches.push(branch);
            }
        }

        if branches.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.collection(table, branches)))
    }

    fn collection(&self, table: &TableDef, branches: Vec<SelectQuery>) -> CollectionQuery {
        CollectionQuery {
            table: table.name.clone(),
            key_columns: table.primary_key.clone(),
            branches,
        }
    }

    /// One UNION branch for `path`, or `None` (with a `PathRejected` event) when
    /// the path cannot be used for this table.
    fn path_branch(&self, table: &TableDef, path: &str) -> Result<Option<SelectQuery>, WiperError> {
        let reject = |reason: String| -> Result<Option<SelectQuery>, WiperError> {
            self.config.events().emit(&WiperEvent::PathRejected {
                table: table.name.clone(),
                path: path.to_string(),
                reason,
            });
            Ok(None)
        };

        let parsed = match parse_join_path(path) {
            Ok(parsed) => parsed,
            Err(e) => return reject(e.to_string()),
        };
        if parsed.start_table != table.name {
            return reject(format!(
                "path starts at '{}', not '{}'",
                parsed.start_table, table.name
            ));
        }
        if let Some(missing) = parsed
            .tables()
            .into_iter()
            .find(|t| !self.config.schema().contains_table(t))
        {
            return reject(format!("table '{}' does not exist in schema", missing));
        }
        let Some(terminal) = self.config.schema().table(&parsed.final_table) else {
            return reject(format!("table '{}' does not exist in schema", parsed.final_table));
        };

        let terminal_alias = alias(parsed.steps.len());
        let predicates = applicable_predicates(
            self.config.schema(),
            terminal,
            &terminal_alias,
            self.config.tenant_filters(),
        )?;
        let Some(filter) = Predicate::any_of(predicates) else {
            return reject(format!(
                "no tenant filter applies to final table '{}'",
                parsed.final_table
            ));
        };

        Ok(Some(join_chain(table, &parsed).filter(filter)))
    }
}

fn alias(position: usize) -> String {
    format!("t{}", position)
}

fn key_columns(table: &TableDef, relation: &str) -> Vec<Column> {
    table
        .primary_key
        .iter()
        .map(|c| Column::new(relation, c))
        .collect()
}

/// `SELECT t0.<pk> FROM table AS t0 JOIN ... AS t1 ON t0.a = t1.b ...`
fn join_chain(table: &TableDef, path: &JoinPath) -> SelectQuery {
    let start = alias(0);
    let mut query = SelectQuery::new(
        TableSource::aliased(&table.name, &start),
        key_columns(table, &start),
    );
    for (i, step) in path.steps.iter().enumerate() {
        let (from, to) = (alias(i), alias(i + 1));
        query = query.join(
            TableSource::aliased(&step.to_table, &to),
            Column::new(&from, &step.from_key),
            Column::new(&to, &step.to_key),
        );
    }
    query
}

//! # Tenant Wiper Error Types
//!
//! ## Error Categories
//!
//! - **Path errors**: join path grammar, unknown tables/columns, unfilterable
//!   terminal tables and exclusion conflicts. Accumulated and reported together
//!   as [`WiperError::PathValidation`].
//! - **Coverage errors**: tables with neither a filter nor a path, reported
//!   together as [`WiperError::UncoveredTables`].
//! - **Filter errors**: a broken filter ([`WiperError::FilterSyntax`]) or one that
//!   cannot run against a table ([`WiperError::FilterApplication`]). Never
//!   accumulated.
//! - **Execution errors**: backend failures while collecting or deleting.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use super::join_path::JoinPathError;
use crate::backend::BackendError;
use crate::schema::SchemaError;

/// One problem found while validating the declared join paths
#[derive(Debug, Clone, PartialEq)]
pub enum PathIssue {
    /// Table is both excluded and the source of a join path
    ExclusionConflict { table: String },
    /// The path string does not parse
    Parse {
        table: String,
        path: String,
        error: JoinPathError,
    },
    UnknownTable {
        table: String,
        path: String,
        missing_table: String,
    },
    UnknownColumn {
        table: String,
        path: String,
        column_table: String,
        column: String,
    },
    /// The path's final table has no applicable tenant filter
    TerminalNotFilterable {
        table: String,
        path: String,
        final_table: String,
        available_columns: Vec<String>,
        filter_columns: Vec<BTreeSet<String>>,
    },
}

impl PathIssue {
    /// Table the offending path was declared for
    pub fn table(&self) -> &str {
        match self {
            PathIssue::ExclusionConflict { table }
            | PathIssue::Parse { table, .. }
            | PathIssue::UnknownTable { table, .. }
            | PathIssue::UnknownColumn { table, .. }
            | PathIssue::TerminalNotFilterable { table, .. } => table,
        }
    }
}

impl fmt::Display for PathIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathIssue::ExclusionConflict { table } => write!(
                f,
                "Configuration Error: Table '{}' is listed in both excluded_tables and join paths.",
                table
            ),
            PathIssue::Parse { table, path, error } => {
                write!(f, "Relationship '{}' path '{}': {}", table, path, error)
            }
            PathIssue::UnknownTable {
                table,
                path,
                missing_table,
            } => write!(
                f,
                "Relationship '{}' path '{}': Table '{}' does not exist in schema",
                table, path, missing_table
            ),
            PathIssue::UnknownColumn {
                table,
                path,
                column_table,
                column,
            } => write!(
                f,
                "Relationship '{}' path '{}': Column '{}' does not exist in table '{}'",
                table, path, column, column_table
            ),
            PathIssue::TerminalNotFilterable {
                table,
                path,
                final_table,
                available_columns,
                filter_columns,
            } => {
                let wanted: Vec<String> = filter_columns
                    .iter()
                    .map(|cols| format!("{:?}", cols.iter().collect::<Vec<_>>()))
                    .collect();
                write!(
                    f,
                    "Relationship '{}' path '{}': Final table '{}' cannot be filtered by any tenant filters. \
                     The final table in a join path must have columns ({}) that match the tenant filters. \
                     Available columns: {:?}",
                    table,
                    path,
                    final_table,
                    wanted.join(" or "),
                    available_columns
                )
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WiperError {
    #[error("Join path validation errors:\n{}", format_issues(.0))]
    PathValidation(Vec<PathIssue>),

    #[error(
        "Tables without tenant deletion coverage (no applicable tenant filter and no join path \
         such as \"table__from_key=to_key__tenant_table\"): {0:?}"
    )]
    UncoveredTables(Vec<String>),

    #[error("Filter syntax error in tenant filter `{filter}`: {reason}")]
    FilterSyntax { filter: String, reason: String },

    #[error(
        "Table '{table}': error applying tenant filter `{filter}`: {reason}. \
         Check the filter's compatibility with this table or fix it."
    )]
    FilterApplication {
        table: String,
        filter: String,
        reason: String,
    },

    #[error("Table '{0}' has no primary key, cannot collect PKs")]
    MissingPrimaryKey(String),

    #[error("Table '{0}' is in the schema, but has neither a usable join path nor an applicable tenant filter")]
    NoCoverage(String),

    #[error("Batch size must be a positive integer")]
    InvalidBatchSize,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Execution error: {0}")]
    Execution(#[from] BackendError),
}

impl WiperError {
    /// Accumulated join path issues, empty for other error kinds
    pub fn path_issues(&self) -> &[PathIssue] {
        match self {
            WiperError::PathValidation(issues) => issues,
            _ => &[],
        }
    }

    /// Whether this error reflects a broken filter rather than a coverage gap
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            WiperError::FilterSyntax { .. } | WiperError::FilterApplication { .. }
        )
    }
}

fn format_issues(issues: &[PathIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

//! Join path language
//!
//! A join path declares how rows of a table without tenant columns reach a
//! table that has them:
//!
//! ```text
//! products__id=product_id__product_orders__order_id=id__orders
//! ```
//!
//! Segments are separated by `__` and alternate between table names and join
//! conditions `from_key=to_key`, so a well-formed path always has an odd number
//! of segments. A single segment (`orders`) is a direct path with no steps.
//!
//! # Example
//!
//! ```ignore
//! let path = parse_join_path("product_orders__order_id=id__orders")?;
//! assert_eq!(path.start_table, "product_orders");
//! assert_eq!(path.final_table, "orders");
//! assert_eq!(path.steps.len(), 1);
//! ```

use std::fmt;

use thiserror::Error;

pub const SEGMENT_DELIMITER: &str = "__";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum JoinPathError {
    #[error("Malformed join path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Invalid join condition format '{condition}' in path '{path}'. Expected 'from_key=to_key'.")]
    InvalidJoinCondition { path: String, condition: String },
}

/// One equality join: `from_table.from_key = to_table.to_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub from_table: String,
    pub from_key: String,
    pub to_table: String,
    pub to_key: String,
}

impl fmt::Display for JoinStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}={}.{}",
            self.from_table, self.from_key, self.to_table, self.to_key
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPath {
    pub start_table: String,
    pub final_table: String,
    pub steps: Vec<JoinStep>,
}

impl JoinPath {
    /// A path with no steps: the start table is filtered directly
    pub fn is_direct(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every table along the path, start first
    pub fn tables(&self) -> Vec<&str> {
        let mut tables = vec![self.start_table.as_str()];
        tables.extend(self.steps.iter().map(|s| s.to_table.as_str()));
        tables
    }
}

impl fmt::Display for JoinPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start_table)?;
        for step in &self.steps {
            write!(
                f,
                "{d}{}={}{d}{}",
                step.from_key,
                step.to_key,
                step.to_table,
                d = SEGMENT_DELIMITER
            )?;
        }
        Ok(())
    }
}

/// The table a path string is declared for: the text before the first `__`.
pub fn source_table(path: &str) -> &str {
    path.split(SEGMENT_DELIMITER).next().unwrap_or(path).trim()
}

/// Parse a join path string into its start table, final table and steps
pub fn parse_join_path(path: &str) -> Result<JoinPath, JoinPathError> {
    let malformed = |reason: String| JoinPathError::MalformedPath {
        path: path.to_string(),
        reason,
    };

    if path.trim().is_empty() {
        return Err(malformed("path is empty".to_string()));
    }

    let segments: Vec<&str> = path.split(SEGMENT_DELIMITER).map(str::trim).collect();
    if segments.len() % 2 == 0 {
        return Err(malformed(format!(
            "must have an odd number of parts, found {}",
            segments.len()
        )));
    }

    let start_table = segments[0];
    if start_table.is_empty() {
        return Err(malformed("start table name is empty".to_string()));
    }

    let mut steps = Vec::with_capacity(segments.len() / 2);
    let mut from_table = start_table;
    for pair in segments[1..].chunks_exact(2) {
        let (condition, to_table) = (pair[0], pair[1]);

        let (from_key, to_key) = split_condition(condition).ok_or_else(|| {
            JoinPathError::InvalidJoinCondition {
                path: path.to_string(),
                condition: condition.to_string(),
            }
        })?;
        if to_table.is_empty() {
            return Err(malformed(format!(
                "incomplete join step after condition '{}'",
                condition
            )));
        }

        steps.push(JoinStep {
            from_table: from_table.to_string(),
            from_key: from_key.to_string(),
            to_table: to_table.to_string(),
            to_key: to_key.to_string(),
        });
        from_table = to_table;
    }

    Ok(JoinPath {
        start_table: start_table.to_string(),
        final_table: from_table.to_string(),
        steps,
    })
}

/// `from_key=to_key` with exactly one `=` and both sides non-empty
fn split_condition(condition: &str) -> Option<(&str, &str)> {
    let mut parts = condition.split('=');
    let from_key = parts.next()?.trim();
    let to_key = parts.next()?.trim();
    if parts.next().is_some() || from_key.is_empty() || to_key.is_empty() {
        return None;
    }
    Some((from_key, to_key))
}

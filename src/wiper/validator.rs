//! Configuration validation
//!
//! Proves, before any data is touched, that every table in the schema is
//! excluded, directly tenant-filterable, or the source of join paths that end
//! in a tenant-filterable table.
//!
//! Path problems are accumulated across every declared path and reported as one
//! [`WiperError::PathValidation`]; uncovered tables are reported together as
//! one [`WiperError::UncoveredTables`]. A filter that cannot even be probed
//! aborts immediately.

use std::collections::BTreeSet;

use super::config::TenantWiperConfig;
use super::errors::{PathIssue, WiperError};
use super::events::{Phase, ValidationSummary, WiperEvent};
use super::join_path::{parse_join_path, JoinPath};
use super::probe::{is_directly_filterable, probe_filter};

pub fn validate(config: &TenantWiperConfig) -> Result<ValidationSummary, WiperError> {
    let mut issues = Vec::new();

    for (table, paths) in config.relationships().iter() {
        if config.is_excluded(table) {
            issues.push(PathIssue::ExclusionConflict {
                table: table.to_string(),
            });
            continue;
        }
        for path in paths {
            issues.extend(validate_path(config, table, path)?);
        }
    }

    if !issues.is_empty() {
        return Err(WiperError::PathValidation(issues));
    }

    let summary = check_coverage(config)?;
    config
        .events()
        .emit(&WiperEvent::ValidationPassed(summary.clone()));
    Ok(summary)
}

/// Issues found for one declared path. Only filter probe failures are returned
/// as errors.
fn validate_path(
    config: &TenantWiperConfig,
    table: &str,
    path: &str,
) -> Result<Vec<PathIssue>, WiperError> {
    let parsed = match parse_join_path(path) {
        Ok(parsed) => parsed,
        Err(error) => {
            return Ok(vec![PathIssue::Parse {
                table: table.to_string(),
                path: path.to_string(),
                error,
            }])
        }
    };

    let issues = check_structure(config, table, path, &parsed);
    if !issues.is_empty() {
        return Ok(issues);
    }

    Ok(check_terminal(config, table, path, &parsed)?
        .into_iter()
        .collect())
}

fn check_structure(
    config: &TenantWiperConfig,
    table: &str,
    path: &str,
    parsed: &JoinPath,
) -> Vec<PathIssue> {
    let schema = config.schema();
    let mut issues = Vec::new();

    let mut missing = BTreeSet::new();
    for name in parsed.tables() {
        if !schema.contains_table(name) && missing.insert(name) {
            issues.push(PathIssue::UnknownTable {
                table: table.to_string(),
                path: path.to_string(),
                missing_table: name.to_string(),
            });
        }
    }

    for step in &parsed.steps {
        if missing.contains(step.from_table.as_str()) || missing.contains(step.to_table.as_str()) {
            continue;
        }
        let keys = [
            (&step.from_table, &step.from_key),
            (&step.to_table, &step.to_key),
        ];
        for (key_table, key) in keys {
            if !schema.all_columns(key_table).contains(key.as_str()) {
                issues.push(PathIssue::UnknownColumn {
                    table: table.to_string(),
                    path: path.to_string(),
                    column_table: key_table.clone(),
                    column: key.clone(),
                });
            }
        }
    }

    issues
}

/// The final table must accept at least one tenant filter.
fn check_terminal(
    config: &TenantWiperConfig,
    table: &str,
    path: &str,
    parsed: &JoinPath,
) -> Result<Option<PathIssue>, WiperError> {
    let schema = config.schema();
    let Some(final_table) = schema.table(&parsed.final_table) else {
        return Ok(None);
    };

    let mut filter_columns = Vec::new();
    for filter in config.tenant_filters() {
        let probe = probe_filter(schema, final_table, filter)?;
        if probe.applicable {
            return Ok(None);
        }
        filter_columns.push(probe.referenced_columns);
    }

    Ok(Some(PathIssue::TerminalNotFilterable {
        table: table.to_string(),
        path: path.to_string(),
        final_table: final_table.name.clone(),
        available_columns: final_table.column_names().iter().map(|c| c.to_string()).collect(),
        filter_columns,
    }))
}

fn check_coverage(config: &TenantWiperConfig) -> Result<ValidationSummary, WiperError> {
    let schema = config.schema();
    let filters = config.tenant_filters();
    let mut summary = ValidationSummary {
        tables: schema.len(),
        relationships: config.relationships().len(),
        directly_filterable: 0,
        excluded: 0,
    };
    let mut uncovered = Vec::new();

    for table in schema.sorted_tables() {
        if config.is_excluded(&table.name) {
            summary.excluded += 1;
            config.events().emit(&WiperEvent::ExcludedTableSkipped {
                table: table.name.clone(),
                phase: Phase::Validation,
            });
            continue;
        }

        let direct = is_directly_filterable(schema, table, filters)?;
        let related = config.relationships().contains(&table.name);
        if direct {
            summary.directly_filterable += 1;
            if related {
                config.events().emit(&WiperEvent::AmbiguousCoverage {
                    table: table.name.clone(),
                });
            }
        } else if !related {
            uncovered.push(table.name.clone());
        }
    }

    if !uncovered.is_empty() {
        return Err(WiperError::UncoveredTables(uncovered));
    }
    Ok(summary)
}

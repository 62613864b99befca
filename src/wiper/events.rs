//! Structured events emitted while validating and deleting.
//!
//! The configuration owns an [`EventSink`]. [`LogSink`] forwards every event to
//! the `log` facade; [`MemorySink`] keeps them for inspection.

use std::fmt;
use std::sync::Mutex;

use log::Level;
use serde::Serialize;

use super::report::DeletionReport;

/// Counts reported once validation succeeds
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationSummary {
    pub tables: usize,
    pub relationships: usize,
    pub directly_filterable: usize,
    pub excluded: usize,
}

/// Executor phase an event was emitted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validation,
    Collection,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Validation => write!(f, "validation"),
            Phase::Collection => write!(f, "collection"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WiperEvent {
    ValidationPassed(ValidationSummary),
    /// Table has both a direct filter and a join path; the direct filter wins
    AmbiguousCoverage {
        table: String,
    },
    ExcludedTableSkipped {
        table: String,
        phase: Phase,
    },
    PathRejected {
        table: String,
        path: String,
        reason: String,
    },
    KeysCollected {
        table: String,
        count: usize,
    },
    TableSkipped {
        table: String,
    },
    BatchDeleted {
        table: String,
        batch: usize,
        keys: usize,
        rows_affected: u64,
    },
    DryRunReported(DeletionReport),
    Committed,
    Flushed,
    RolledBack {
        error: String,
    },
    RollbackFailed {
        error: String,
    },
}

impl WiperEvent {
    pub fn level(&self) -> Level {
        match self {
            WiperEvent::AmbiguousCoverage { .. } | WiperEvent::PathRejected { .. } => Level::Warn,
            WiperEvent::RolledBack { .. } | WiperEvent::RollbackFailed { .. } => Level::Error,
            WiperEvent::ExcludedTableSkipped { .. }
            | WiperEvent::KeysCollected { .. }
            | WiperEvent::TableSkipped { .. }
            | WiperEvent::BatchDeleted { .. } => Level::Debug,
            WiperEvent::ValidationPassed(_)
            | WiperEvent::DryRunReported(_)
            | WiperEvent::Committed
            | WiperEvent::Flushed => Level::Info,
        }
    }

    /// Log prefix of the component emitting the event
    fn component(&self) -> &'static str {
        match self {
            WiperEvent::ValidationPassed(_) | WiperEvent::AmbiguousCoverage { .. } => "Tenant Wiper",
            WiperEvent::ExcludedTableSkipped {
                phase: Phase::Validation,
                ..
            } => "Tenant Wiper",
            _ => "Tenant Deleter",
        }
    }
}

impl fmt::Display for WiperEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.component())?;
        match self {
            WiperEvent::ValidationPassed(s) => write!(
                f,
                "Configuration validation passed: {} tables, {} relationships, {} directly filterable, {} excluded",
                s.tables, s.relationships, s.directly_filterable, s.excluded
            ),
            WiperEvent::AmbiguousCoverage { table } => write!(
                f,
                "Table '{}' has both a direct tenant filter and a join path. Using the direct filter.",
                table
            ),
            WiperEvent::ExcludedTableSkipped { table, phase } => {
                write!(f, "Skipping excluded table '{}' during {}", table, phase)
            }
            WiperEvent::PathRejected { table, path, reason } => {
                write!(f, "Skipping join path '{}' for '{}': {}", path, table, reason)
            }
            WiperEvent::KeysCollected { table, count } => {
                write!(f, "Collected {} primary keys from '{}'", count, table)
            }
            WiperEvent::TableSkipped { table } => {
                write!(f, "No rows to delete in '{}'", table)
            }
            WiperEvent::BatchDeleted {
                table,
                batch,
                keys,
                rows_affected,
            } => write!(
                f,
                "Deleted batch {} of '{}': {} keys, {} rows affected",
                batch, table, keys, rows_affected
            ),
            WiperEvent::DryRunReported(report) => {
                write!(
                    f,
                    "Dry run: would delete {} rows across {} tables",
                    report.total_collected(),
                    report.tables.len()
                )
            }
            WiperEvent::Committed => write!(f, "Tenant deletion committed"),
            WiperEvent::Flushed => write!(f, "Tenant deletion flushed without commit"),
            WiperEvent::RolledBack { error } => {
                write!(f, "Error during tenant deletion, rolled back: {}", error)
            }
            WiperEvent::RollbackFailed { error } => write!(f, "Rollback failed: {}", error),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &WiperEvent);
}

/// Default sink: renders events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &WiperEvent) {
        log::log!(event.level(), "{}", event);
        if let WiperEvent::DryRunReported(report) = event {
            for table in &report.tables {
                log::info!(
                    "[Tenant Deleter] Dry run: '{}' has {} rows to delete",
                    table.table,
                    table.collected
                );
            }
        }
    }
}

/// Collects events in memory; also forwards them to the log at debug level.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<WiperEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WiperEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count_matching(&self, predicate: impl Fn(&WiperEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &WiperEvent) {
        log::debug!("{}", event);
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

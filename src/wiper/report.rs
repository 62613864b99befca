//! Deletion reports returned by [`crate::wiper::TenantDeleter::delete`].

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    /// Primary keys collected in phase 1
    pub collected: usize,
    /// Rows reported deleted by the backend; always 0 for a dry run
    pub deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeletionReport {
    pub dry_run: bool,
    pub committed: bool,
    pub tables: Vec<TableReport>,
}

impl DeletionReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn collected(&self, name: &str) -> usize {
        self.table(name).map(|t| t.collected).unwrap_or(0)
    }

    pub fn total_collected(&self) -> usize {
        self.tables.iter().map(|t| t.collected).sum()
    }

    pub fn total_deleted(&self) -> u64 {
        self.tables.iter().map(|t| t.deleted).sum()
    }
}

impl fmt::Display for DeletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run {
            "dry run"
        } else if self.committed {
            "committed"
        } else {
            "not committed"
        };
        writeln!(f, "Tenant deletion report ({})", mode)?;

        let width = self
            .tables
            .iter()
            .map(|t| t.table.len())
            .max()
            .unwrap_or(0)
            .max("table".len());
        writeln!(f, "  {:<width$}  {:>9}  {:>9}", "table", "collected", "deleted")?;
        for t in &self.tables {
            writeln!(f, "  {:<width$}  {:>9}  {:>9}", t.table, t.collected, t.deleted)?;
        }
        write!(
            f,
            "  {:<width$}  {:>9}  {:>9}",
            "total",
            self.total_collected(),
            self.total_deleted()
        )
    }
}

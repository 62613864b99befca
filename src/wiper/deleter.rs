//! Two-phase tenant deletion
//!
//! Phase 1 collects the primary keys of the tenant's rows in every
//! non-excluded table. Phase 2 deletes them in batches, children before
//! parents, so no foreign key is left dangling. Both phases run inside the
//! caller's session; any failure rolls it back.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::config::TenantWiperConfig;
use super::errors::WiperError;
use super::events::{Phase, WiperEvent};
use super::planner::DeletionPlanner;
use super::report::{DeletionReport, TableReport};
use crate::backend::Session;
use crate::query::{DeleteStatement, KeyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Collect and report only
    pub dry_run: bool,
    /// Commit on success; otherwise flush and leave the transaction open
    pub commit: bool,
}

impl DeleteOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            commit: false,
        }
    }

    pub fn commit() -> Self {
        Self {
            dry_run: false,
            commit: true,
        }
    }

    pub fn no_commit() -> Self {
        Self {
            dry_run: false,
            commit: false,
        }
    }
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self::commit()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionState {
    Idle,
    Collecting,
    DryRunReported,
    Deleting,
    Committed,
    Flushed,
    RolledBack,
}

pub struct TenantDeleter {
    config: Arc<TenantWiperConfig>,
    /// Table -> distinct keys in collection order
    collected: BTreeMap<String, Vec<KeyValue>>,
    state: DeletionState,
}

impl TenantDeleter {
    pub fn new(config: Arc<TenantWiperConfig>) -> Self {
        Self {
            config,
            collected: BTreeMap::new(),
            state: DeletionState::Idle,
        }
    }

    pub fn config(&self) -> &TenantWiperConfig {
        &self.config
    }

    pub fn state(&self) -> DeletionState {
        self.state
    }

    /// Keys collected for `table` by the most recent `delete` call
    pub fn collected_keys(&self, table: &str) -> Option<&[KeyValue]> {
        self.collected.get(table).map(Vec::as_slice)
    }

    /// Delete every row of the tenant within `session`.
    ///
    /// Each call starts from an empty key collection. On error the session is
    /// rolled back and the original error returned.
    pub async fn delete<S>(
        &mut self,
        session: &mut S,
        options: DeleteOptions,
    ) -> Result<DeletionReport, WiperError>
    where
        S: Session + ?Sized,
    {
        self.collected.clear();
        self.state = DeletionState::Idle;

        match self.run(session, options).await {
            Ok(report) => Ok(report),
            Err(err) => {
                let events = self.config.events();
                events.emit(&WiperEvent::RolledBack {
                    error: err.to_string(),
                });
                if let Err(rollback_err) = session.rollback().await {
                    events.emit(&WiperEvent::RollbackFailed {
                        error: rollback_err.to_string(),
                    });
                }
                self.state = DeletionState::RolledBack;
                Err(err)
            }
        }
    }

    async fn run<S>(&mut self, session: &mut S, options: DeleteOptions) -> Result<DeletionReport, WiperError>
    where
        S: Session + ?Sized,
    {
        self.state = DeletionState::Collecting;
        self.collect(session).await?;

        if options.dry_run {
            let report = self.report(true, false, &BTreeMap::new());
            self.config
                .events()
                .emit(&WiperEvent::DryRunReported(report.clone()));
            self.state = DeletionState::DryRunReported;
            return Ok(report);
        }

        self.state = DeletionState::Deleting;
        let deleted = self.delete_collected(session).await?;

        if options.commit {
            session.commit().await?;
            self.state = DeletionState::Committed;
            self.config.events().emit(&WiperEvent::Committed);
        } else {
            session.flush().await?;
            self.state = DeletionState::Flushed;
            self.config.events().emit(&WiperEvent::Flushed);
        }
        Ok(self.report(false, options.commit, &deleted))
    }

    async fn collect<S>(&mut self, session: &mut S) -> Result<(), WiperError>
    where
        S: Session + ?Sized,
    {
        let config = Arc::clone(&self.config);
        let planner = DeletionPlanner::new(&config);

        for table in config.schema().sorted_tables() {
            if config.is_excluded(&table.name) {
                config.events().emit(&WiperEvent::ExcludedTableSkipped {
                    table: table.name.clone(),
                    phase: Phase::Collection,
                });
                continue;
            }

            let query = planner
                .build_collection_query(table)?
                .ok_or_else(|| WiperError::NoCoverage(table.name.clone()))?;
            let rows = session.fetch_keys(&query).await?;

            let mut seen = HashSet::with_capacity(rows.len());
            let keys: Vec<KeyValue> = rows.into_iter().filter(|k| seen.insert(k.clone())).collect();
            config.events().emit(&WiperEvent::KeysCollected {
                table: table.name.clone(),
                count: keys.len(),
            });
            self.collected.insert(table.name.clone(), keys);
        }
        Ok(())
    }

    /// Rows deleted per table
    async fn delete_collected<S>(&self, session: &mut S) -> Result<BTreeMap<String, u64>, WiperError>
    where
        S: Session + ?Sized,
    {
        let events = self.config.events();
        let batch_size = self.config.batch_size();
        let mut deleted = BTreeMap::new();

        for table in self.config.schema().deletion_order() {
            let Some(keys) = self.collected.get(&table.name) else {
                continue;
            };
            if keys.is_empty() {
                events.emit(&WiperEvent::TableSkipped {
                    table: table.name.clone(),
                });
                continue;
            }

            let mut total = 0;
            for (batch, chunk) in keys.chunks(batch_size).enumerate() {
                let statement = DeleteStatement {
                    table: table.name.clone(),
                    key_columns: table.primary_key.clone(),
                    keys: chunk.to_vec(),
                };
                let rows_affected = session.execute_delete(&statement).await?;
                events.emit(&WiperEvent::BatchDeleted {
                    table: table.name.clone(),
                    batch: batch + 1,
                    keys: chunk.len(),
                    rows_affected,
                });
                total += rows_affected;
            }
            deleted.insert(table.name.clone(), total);
        }
        Ok(deleted)
    }

    /// Tables in collection order
    fn report(&self, dry_run: bool, committed: bool, deleted: &BTreeMap<String, u64>) -> DeletionReport {
        let tables = self
            .config
            .schema()
            .sorted_tables()
            .filter_map(|table| {
                self.collected.get(&table.name).map(|keys| TableReport {
                    table: table.name.clone(),
                    collected: keys.len(),
                    deleted: deleted.get(&table.name).copied().unwrap_or(0),
                })
            })
            .collect();
        DeletionReport {
            dry_run,
            committed,
            tables,
        }
    }
}

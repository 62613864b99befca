//! Tenant wiper configuration
//!
//! A [`TenantWiperConfig`] is immutable once built. Construction goes through
//! [`TenantWiperConfigBuilder`], which indexes join paths by their source table
//! and, unless disabled, runs [`crate::wiper::validator::validate`] before
//! handing the config out.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::errors::WiperError;
use super::events::{EventSink, LogSink, ValidationSummary};
use super::filter::TenantFilter;
use super::join_path::source_table;
use super::validator;
use crate::schema::SchemaRegistry;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Source table name -> join paths declared for it, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipIndex {
    entries: Vec<(String, Vec<String>)>,
}

impl RelationshipIndex {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for path in paths {
            index.insert(path.as_ref());
        }
        index
    }

    fn insert(&mut self, path: &str) {
        let table = source_table(path);
        match self.entries.iter_mut().find(|(t, _)| t == table) {
            Some((_, paths)) => paths.push(path.to_string()),
            None => self.entries.push((table.to_string(), vec![path.to_string()])),
        }
    }

    pub fn paths_for(&self, table: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, paths)| paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, table: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == table)
    }

    /// Number of source tables with at least one path
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(table, paths)| (table.as_str(), paths.as_slice()))
    }
}

pub struct TenantWiperConfig {
    schema: Arc<SchemaRegistry>,
    tenant_filters: Vec<TenantFilter>,
    join_paths: Vec<String>,
    relationships: RelationshipIndex,
    excluded_tables: BTreeSet<String>,
    batch_size: usize,
    events: Arc<dyn EventSink>,
}

impl TenantWiperConfig {
    pub fn builder(schema: Arc<SchemaRegistry>) -> TenantWiperConfigBuilder {
        TenantWiperConfigBuilder::new(schema)
    }

    /// Prove every table is excluded, directly filterable, or reachable through
    /// a valid join path. See [`validator::validate`].
    pub fn validate(&self) -> Result<ValidationSummary, WiperError> {
        validator::validate(self)
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn shared_schema(&self) -> Arc<SchemaRegistry> {
        Arc::clone(&self.schema)
    }

    pub fn tenant_filters(&self) -> &[TenantFilter] {
        &self.tenant_filters
    }

    pub fn join_paths(&self) -> &[String] {
        &self.join_paths
    }

    pub fn relationships(&self) -> &RelationshipIndex {
        &self.relationships
    }

    pub fn excluded_tables(&self) -> &BTreeSet<String> {
        &self.excluded_tables
    }

    pub fn is_excluded(&self, table: &str) -> bool {
        self.excluded_tables.contains(table)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }
}

impl fmt::Debug for TenantWiperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantWiperConfig")
            .field("tables", &self.schema.len())
            .field("tenant_filters", &self.tenant_filters)
            .field("relationships", &self.relationships)
            .field("excluded_tables", &self.excluded_tables)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

pub struct TenantWiperConfigBuilder {
    schema: Arc<SchemaRegistry>,
    tenant_filters: Vec<TenantFilter>,
    join_paths: Vec<String>,
    excluded_tables: BTreeSet<String>,
    batch_size: usize,
    validate_on_build: bool,
    events: Arc<dyn EventSink>,
}

impl TenantWiperConfigBuilder {
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self {
            schema,
            tenant_filters: Vec::new(),
            join_paths: Vec::new(),
            excluded_tables: BTreeSet::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            validate_on_build: true,
            events: Arc::new(LogSink),
        }
    }

    pub fn tenant_filter(mut self, filter: TenantFilter) -> Self {
        self.tenant_filters.push(filter);
        self
    }

    pub fn tenant_filters(mut self, filters: impl IntoIterator<Item = TenantFilter>) -> Self {
        self.tenant_filters.extend(filters);
        self
    }

    pub fn join_path(mut self, path: impl Into<String>) -> Self {
        self.join_paths.push(path.into());
        self
    }

    pub fn join_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.join_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn exclude_table(mut self, table: impl Into<String>) -> Self {
        self.excluded_tables.insert(table.into());
        self
    }

    pub fn excluded_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_tables.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate_on_build(mut self, validate: bool) -> Self {
        self.validate_on_build = validate;
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn build(self) -> Result<TenantWiperConfig, WiperError> {
        if self.batch_size == 0 {
            return Err(WiperError::InvalidBatchSize);
        }

        let relationships = RelationshipIndex::from_paths(&self.join_paths);
        let config = TenantWiperConfig {
            schema: self.schema,
            tenant_filters: self.tenant_filters,
            join_paths: self.join_paths,
            relationships,
            excluded_tables: self.excluded_tables,
            batch_size: self.batch_size,
            events: self.events,
        };

        if self.validate_on_build {
            config.validate()?;
        }
        Ok(config)
    }
}


impl fmt::Debug for TenantWiperConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantWiperConfigBuilder")
            .field("tables", &self.schema.len())
            .field("tenant_filters", &self.tenant_filters)
            .field("join_paths", &self.join_paths)
            .field("excluded_tables", &self.excluded_tables)
            .field("batch_size", &self.batch_size)
            .field("validate_on_build", &self.validate_on_build)
            .finish()
    }
}

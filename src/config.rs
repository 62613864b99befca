use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::query::Value;
use crate::schema::{SchemaDefinition, SchemaError, SchemaRegistry};
use crate::wiper::{TenantFilter, TenantWiperConfig, TenantWiperConfigBuilder, DEFAULT_BATCH_SIZE};

pub const DATABASE_URL_ENV: &str = "TENANT_WIPER_DATABASE_URL";
pub const BATCH_SIZE_ENV: &str = "TENANT_WIPER_BATCH_SIZE";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Tenant filter on '{column}' has no value and no tenant id was supplied")]
    MissingTenantId { column: String },

    #[error("Tenant filter on '{column}': {reason}")]
    InvalidFilterRule { column: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Comparison used by a declarative filter rule
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    #[default]
    Eq,
    In,
}

/// Declarative tenant filter: `column = value` or `column IN (values)`.
///
/// A rule without `value`/`values` binds the tenant id supplied at run time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FilterRule {
    pub column: String,

    #[serde(default)]
    pub op: FilterOp,

    #[serde(default)]
    pub value: Option<Value>,

    #[serde(default)]
    pub values: Option<Vec<Value>>,

    /// Bind the run-time tenant id as an integer instead of text
    #[serde(default)]
    pub integer_id: bool,
}

impl Validate for FilterRule {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.column.trim().is_empty() {
            errors.add(
                "column",
                ValidationError::new("length").with_message("Filter column cannot be empty".into()),
            );
        }

        let shape = match self.op {
            FilterOp::Eq if self.values.is_some() => {
                Some(("values", "'values' is only allowed with op: in"))
            }
            FilterOp::In if self.value.is_some() => Some(("value", "op: in takes 'values', not 'value'")),
            FilterOp::In if self.values.as_ref().is_some_and(|v| v.is_empty()) => {
                Some(("values", "'values' cannot be empty"))
            }
            _ => None,
        };
        if let Some((field, message)) = shape {
            errors.add(field, ValidationError::new("shape").with_message(message.into()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl FilterRule {
    pub fn to_filter(&self, tenant_id: Option<&str>) -> Result<TenantFilter, ConfigError> {
        let explicit = match self.op {
            FilterOp::Eq => self.value.clone().map(|v| vec![v]),
            FilterOp::In => self.values.clone(),
        };
        let values = match explicit {
            Some(values) => values,
            None => vec![self.tenant_value(tenant_id)?],
        };

        match self.op {
            FilterOp::Eq => {
                let value = values.into_iter().next().ok_or_else(|| ConfigError::InvalidFilterRule {
                    column: self.column.clone(),
                    reason: "no value to compare with".to_string(),
                })?;
                Ok(TenantFilter::column_equals(self.column.clone(), value))
            }
            FilterOp::In => Ok(TenantFilter::column_in(self.column.clone(), values)),
        }
    }

    fn tenant_value(&self, tenant_id: Option<&str>) -> Result<Value, ConfigError> {
        let tenant_id = tenant_id.ok_or_else(|| ConfigError::MissingTenantId {
            column: self.column.clone(),
        })?;
        if !self.integer_id {
            return Ok(Value::from(tenant_id));
        }
        tenant_id
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| ConfigError::Parse {
                field: "tenant_id".to_string(),
                value: tenant_id.to_string(),
                source: Box::new(e),
            })
    }
}

/// Tenant wiper configuration file with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct WiperFileConfig {
    /// Database to wipe; discovered schema is read from here too
    #[serde(default)]
    pub database_url: Option<String>,

    /// Inline schema; discovered from the database when absent
    #[serde(default)]
    pub schema: Option<SchemaDefinition>,

    #[validate(nested)]
    #[serde(default)]
    pub tenant_filters: Vec<FilterRule>,

    #[serde(default)]
    pub join_paths: Vec<String>,

    #[serde(default)]
    pub excluded_tables: Vec<String>,

    /// Keys per delete statement (1-100000)
    #[validate(range(
        min = 1,
        max = 100000,
        message = "Batch size must be between 1 and 100000"
    ))]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_validate_on_build")]
    pub validate_on_build: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_validate_on_build() -> bool {
    true
}

impl Default for WiperFileConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            schema: None,
            tenant_filters: Vec::new(),
            join_paths: Vec::new(),
            excluded_tables: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            validate_on_build: true,
        }
    }
}

impl WiperFileConfig {
    /// Parse YAML content without validating
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content.to_string(),
            source: Box::new(e),
        })
    }

    /// Load a YAML file, apply environment overrides, then validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// `TENANT_WIPER_DATABASE_URL` and `TENANT_WIPER_BATCH_SIZE` win over the file
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var(DATABASE_URL_ENV) {
            self.database_url = Some(url);
        }
        if let Some(batch_size) = parse_optional_env_var(BATCH_SIZE_ENV)? {
            self.batch_size = batch_size;
        }
        Ok(())
    }

    pub fn tenant_filters(&self, tenant_id: Option<&str>) -> Result<Vec<TenantFilter>, ConfigError> {
        self.tenant_filters
            .iter()
            .map(|rule| rule.to_filter(tenant_id))
            .collect()
    }

    /// Schema registry from the inline `schema` section, if present
    pub fn inline_schema(&self) -> Result<Option<SchemaRegistry>, ConfigError> {
        match &self.schema {
            Some(definition) => Ok(Some(definition.into_registry()?)),
            None => Ok(None),
        }
    }

    /// Builder preloaded with everything this file declares
    pub fn to_builder(
        &self,
        schema: Arc<SchemaRegistry>,
        tenant_id: Option<&str>,
    ) -> Result<TenantWiperConfigBuilder, ConfigError> {
        Ok(TenantWiperConfig::builder(schema)
            .tenant_filters(self.tenant_filters(tenant_id)?)
            .join_paths(self.join_paths.iter().cloned())
            .excluded_tables(self.excluded_tables.iter().cloned())
            .batch_size(self.batch_size)
            .validate_on_build(self.validate_on_build))
    }
}

/// Parse an environment variable if it is set
fn parse_optional_env_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|e| ConfigError::Parse {
            field: key.to_string(),
            value,
            source: Box::new(e),
        }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvVar(e)),
    }
}

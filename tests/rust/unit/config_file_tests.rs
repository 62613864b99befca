//! Unit tests for YAML config loading and environment overrides

#[cfg(test)]
mod config_file_tests {
    use std::env;
    use std::io::Write;
    use std::sync::Arc;

    use serial_test::serial;
    use tempfile::NamedTempFile;
    use tenant_wiper::config::{ConfigError, WiperFileConfig, BATCH_SIZE_ENV, DATABASE_URL_ENV};
    use tenant_wiper::schema::SchemaRegistry;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
database_url: sqlite://from-file.db
tenant_filters:
  - column: tenant_id
batch_size: 100
"#;

    #[test]
    #[serial]
    fn test_env_overrides() {
        let file = write_config(MINIMAL);

        env::remove_var(DATABASE_URL_ENV);
        env::remove_var(BATCH_SIZE_ENV);
        let config = WiperFileConfig::load(file.path()).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite://from-file.db"));
        assert_eq!(config.batch_size, 100);

        env::set_var(DATABASE_URL_ENV, "sqlite://from-env.db");
        env::set_var(BATCH_SIZE_ENV, "25");
        let config = WiperFileConfig::load(file.path()).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite://from-env.db"));
        assert_eq!(config.batch_size, 25);

        env::set_var(BATCH_SIZE_ENV, "lots");
        let err = WiperFileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref field, .. } if field == BATCH_SIZE_ENV));

        // Overrides are validated like file values
        env::set_var(BATCH_SIZE_ENV, "0");
        let err = WiperFileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        env::remove_var(DATABASE_URL_ENV);
        env::remove_var(BATCH_SIZE_ENV);
    }

    #[test]
    #[serial]
    fn test_missing_file() {
        let err = WiperFileConfig::load("/nonexistent/tenant-wiper.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref field, .. } if field == "yaml_file"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = WiperFileConfig::from_yaml_str("tenant_filters: {column: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref field, .. } if field == "yaml_content"));
    }

    #[test]
    fn test_builder_carries_file_settings() {
        let file = WiperFileConfig::from_yaml_str(
            r#"
tenant_filters:
  - column: tenant_id
    value: acme
excluded_tables: [audit_logs]
batch_size: 7
validate_on_build: false
"#,
        )
        .unwrap();

        // Empty schema: nothing to validate, nothing to cover
        let schema = Arc::new(SchemaRegistry::new(Vec::new()).unwrap());
        let config = file.to_builder(schema, None).unwrap().build().unwrap();
        assert_eq!(config.batch_size(), 7);
        assert!(config.is_excluded("audit_logs"));
        assert_eq!(config.tenant_filters().len(), 1);
        assert_eq!(config.tenant_filters()[0].source(), "tenant_id = 'acme'");
    }

    #[test]
    fn test_missing_tenant_id_reported_per_column() {
        let file = WiperFileConfig::from_yaml_str("tenant_filters:\n  - column: org_id\n").unwrap();
        let schema = Arc::new(SchemaRegistry::new(Vec::new()).unwrap());
        let err = file.to_builder(schema, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTenantId { column } if column == "org_id"));
    }
}

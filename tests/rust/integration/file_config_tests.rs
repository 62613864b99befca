//! Wiper runs driven by a YAML configuration file and a file-backed database

#[cfg(test)]
mod file_config_tests {
    use std::io::Write;
    use std::sync::Arc;

    use tempfile::{NamedTempFile, TempDir};
    use tenant_wiper::backend::sqlite;
    use tenant_wiper::config::WiperFileConfig;
    use tenant_wiper::schema::discover_sqlite_schema;
    use tenant_wiper::{DeleteOptions, SqliteSession, TenantDeleter, WiperError};

    use crate::fixtures;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// Config file + discovered schema + tenant id from the command line
    #[tokio::test]
    async fn test_yaml_driven_deletion_on_file_database() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("shop.db").display());
        let pool = sqlite::connect(&url).await.unwrap();
        fixtures::create_shop_tables(&pool).await;
        let tenants = fixtures::Tenants::for_tests();
        fixtures::seed_shop(&pool, &tenants).await;

        let config_file = write_config(&format!(
            r#"
database_url: "{}"
tenant_filters:
  - column: tenant_id
join_paths:
  - product_orders__order_id=id__orders
  - products__id=product_id__product_orders__order_id=id__orders
excluded_tables: [audit_logs]
batch_size: 1
"#,
            url
        ));
        let file = WiperFileConfig::load(config_file.path()).unwrap();
        assert_eq!(file.database_url.as_deref(), Some(url.as_str()));

        let schema = Arc::new(discover_sqlite_schema(&pool).await.unwrap());
        let config = file
            .to_builder(Arc::clone(&schema), Some(tenants.target_tenant_id.as_str()))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.batch_size(), 1);

        let mut session = SqliteSession::begin(&pool, schema).await.unwrap();
        let report = TenantDeleter::new(Arc::new(config))
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap();

        assert_eq!(report.total_deleted(), 8);
        assert_eq!(fixtures::count(&pool, "users").await, 1);
        assert_eq!(fixtures::count(&pool, "products").await, 1);
        assert_eq!(fixtures::count(&pool, "audit_logs").await, 2);
    }

    /// An inline schema replaces discovery, and validation runs on build
    #[tokio::test]
    async fn test_inline_schema_validation_failure() {
        let file = WiperFileConfig::from_yaml_str(
            r#"
schema:
  tables:
    - name: users
      columns:
        - { name: id, type: INTEGER }
        - { name: tenant_id, type: VARCHAR(36) }
      primary_key: id
    - name: products
      columns: [id, name]
      primary_key: id
tenant_filters:
  - column: tenant_id
    value: acme
"#,
        )
        .unwrap();

        let schema = file.inline_schema().unwrap().unwrap();
        assert_eq!(schema.len(), 2);

        let err = file
            .to_builder(Arc::new(schema), None)
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, WiperError::UncoveredTables(tables) if tables == vec!["products".to_string()]));
    }
}

//! End-to-end tenant deletion against a seeded SQLite database

#[cfg(test)]
mod sqlite_deletion_tests {
    use std::sync::Arc;

    use tenant_wiper::wiper::{DeletionState, MemorySink, WiperEvent};
    use tenant_wiper::{DeleteOptions, Session, TenantDeleter, TenantFilter, TenantWiperConfig};

    use crate::fixtures::{self, RecordingSession, Shop, SHOP_PATHS};

    fn shop_config(shop: &Shop, excluded: &[&str]) -> Arc<TenantWiperConfig> {
        Arc::new(
            TenantWiperConfig::builder(Arc::clone(&shop.schema))
                .tenant_filter(TenantFilter::column_equals(
                    "tenant_id",
                    shop.tenants.target_tenant_id.as_str(),
                ))
                .join_paths(SHOP_PATHS)
                .excluded_tables(excluded.iter().copied())
                .build()
                .unwrap(),
        )
    }

    /// Full workflow: only the other tenant's rows survive
    #[tokio::test]
    async fn test_tenant_deletion_with_real_data() {
        let shop = fixtures::shop().await;
        assert_eq!(shop.count("users").await, 3);
        assert_eq!(shop.count("orders").await, 3);
        assert_eq!(shop.count("audit_logs").await, 2);

        let mut deleter = TenantDeleter::new(shop_config(&shop, &["audit_logs"]));
        let mut session = shop.session().await;
        let report = deleter
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap();

        assert!(report.committed);
        assert_eq!(deleter.state(), DeletionState::Committed);

        assert_eq!(shop.count("users").await, 1);
        assert_eq!(
            shop.count_where("users", "tenant_id", &shop.tenants.other_tenant_id)
                .await,
            1
        );
        assert_eq!(shop.count("orders").await, 1);
        assert_eq!(
            shop.count_where("orders", "tenant_id", &shop.tenants.other_tenant_id)
                .await,
            1
        );
        assert_eq!(shop.count("product_orders").await, 1);
        // product 3 is only joined to the other tenant's order
        assert_eq!(shop.ids("products").await, vec![3]);
        assert_eq!(shop.count("audit_logs").await, 2);

        assert_eq!(report.collected("users"), 2);
        assert_eq!(report.collected("product_orders"), 2);
        assert_eq!(report.table("products").unwrap().deleted, 2);
        assert!(report.table("audit_logs").is_none());
    }

    /// Dry run reports phase 1 counts and leaves every table intact
    #[tokio::test]
    async fn test_dry_run_reports_correctly() {
        let shop = fixtures::shop().await;
        let sink = Arc::new(MemorySink::new());
        let config = TenantWiperConfig::builder(Arc::clone(&shop.schema))
            .tenant_filter(TenantFilter::column_equals(
                "tenant_id",
                shop.tenants.target_tenant_id.as_str(),
            ))
            .join_paths(SHOP_PATHS)
            .exclude_table("audit_logs")
            .event_sink(sink.clone())
            .build()
            .unwrap();

        let mut deleter = TenantDeleter::new(Arc::new(config));
        let mut session = RecordingSession::new(shop.session().await);
        let report = deleter
            .delete(&mut session, DeleteOptions::dry_run())
            .await
            .unwrap();
        session.rollback().await.unwrap();

        assert!(report.dry_run);
        assert!(!report.committed);
        assert!(session.statements().is_empty());
        assert_eq!(report.collected("users"), 2);
        assert_eq!(report.collected("orders"), 2);
        assert_eq!(report.collected("product_orders"), 2);
        assert_eq!(report.collected("products"), 2);
        assert_eq!(report.total_deleted(), 0);
        assert_eq!(deleter.collected_keys("orders").map(|k| k.len()), Some(2));

        assert_eq!(shop.count("users").await, 3);
        assert_eq!(shop.count("orders").await, 3);
        assert_eq!(shop.count("product_orders").await, 3);
        assert_eq!(
            sink.count_matching(|e| matches!(e, WiperEvent::DryRunReported(r) if r == &report)),
            1
        );
    }

    /// A failure mid-delete rolls everything back and returns the original error
    #[tokio::test]
    async fn test_error_handling_with_rollback() {
        let shop = fixtures::shop().await;
        let before = [
            shop.count("users").await,
            shop.count("orders").await,
            shop.count("products").await,
            shop.count("product_orders").await,
        ];

        let mut deleter = TenantDeleter::new(shop_config(&shop, &["audit_logs"]));
        // product_orders and orders succeed, users fails
        let mut session = RecordingSession::new(shop.session().await).failing_on_delete(3);
        let err = deleter
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Database error"));
        assert_eq!(deleter.state(), DeletionState::RolledBack);
        assert_eq!(session.statements().len(), 2);

        let after = [
            shop.count("users").await,
            shop.count("orders").await,
            shop.count("products").await,
            shop.count("product_orders").await,
        ];
        assert_eq!(before, after);
    }

    /// Excluding products keeps them while their join rows are deleted
    #[tokio::test]
    async fn test_relationship_based_deletion_with_composite_keys() {
        let shop = fixtures::shop().await;
        let config = Arc::new(
            TenantWiperConfig::builder(Arc::clone(&shop.schema))
                .tenant_filter(TenantFilter::column_equals(
                    "tenant_id",
                    shop.tenants.target_tenant_id.as_str(),
                ))
                .join_path(SHOP_PATHS[0])
                .excluded_tables(["audit_logs", "products"])
                .build()
                .unwrap(),
        );

        let mut deleter = TenantDeleter::new(config);
        let mut session = shop.session().await;
        deleter
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap();

        assert_eq!(shop.count("product_orders").await, 1);
        assert_eq!(shop.count("products").await, 3);
        let remaining_order = shop.ids("orders").await;
        assert_eq!(remaining_order, vec![3]);
    }

    /// Filters are OR-ed: a user matching only the org filter is deleted too
    #[tokio::test]
    async fn test_multiple_tenant_filters() {
        let shop = fixtures::shop().await;
        shop.execute(&format!(
            "INSERT INTO users (id, name, tenant_id, org_id) VALUES (4, 'Ann', 'someone-else', '{}')",
            shop.tenants.target_org_id
        ))
        .await;

        let config = Arc::new(
            TenantWiperConfig::builder(Arc::clone(&shop.schema))
                .tenant_filters([
                    TenantFilter::column_equals("tenant_id", shop.tenants.target_tenant_id.as_str()),
                    TenantFilter::column_equals("org_id", shop.tenants.target_org_id.as_str()),
                ])
                .join_paths(SHOP_PATHS)
                .exclude_table("audit_logs")
                .build()
                .unwrap(),
        );

        let mut deleter = TenantDeleter::new(config);
        let mut session = shop.session().await;
        let report = deleter
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap();

        assert_eq!(report.collected("users"), 3);
        assert_eq!(shop.ids("users").await, vec![3]);
        assert_eq!(
            shop.count_where("users", "org_id", &shop.tenants.target_org_id)
                .await,
            0
        );
        assert_eq!(shop.ids("orders").await, vec![3]);
    }

    /// Batch size 2 over 5 matching rows issues 3 statements
    #[tokio::test]
    async fn test_batched_deletes() {
        let pool = fixtures::memory_pool().await;
        sqlx::query("CREATE TABLE events (id INTEGER PRIMARY KEY, tenant_id TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO events (id, tenant_id) VALUES (1, 'T'), (2, 'T'), (3, 'O'), (4, 'T'), (5, 'T'), (6, 'T')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let schema = Arc::new(
            tenant_wiper::schema::discover_sqlite_schema(&pool)
                .await
                .unwrap(),
        );

        let config = Arc::new(
            TenantWiperConfig::builder(Arc::clone(&schema))
                .tenant_filter(TenantFilter::column_equals("tenant_id", "T"))
                .batch_size(2)
                .build()
                .unwrap(),
        );
        let mut session = RecordingSession::new(
            tenant_wiper::SqliteSession::begin(&pool, schema).await.unwrap(),
        );
        let report = TenantDeleter::new(config)
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap();

        let sizes: Vec<usize> = session.statements().iter().map(|(_, n)| *n).collect();
        assert_eq!(sizes.len(), 3);
        assert!(sizes.iter().all(|n| *n <= 2));
        assert_eq!(sizes.iter().sum::<usize>(), 5);
        assert_eq!(report.total_deleted(), 5);
        assert_eq!(fixtures::count(&pool, "events").await, 1);
    }

    /// Keys reachable through either of two paths are all deleted, once
    #[tokio::test]
    async fn test_multiple_paths_union() {
        let pool = fixtures::memory_pool().await;
        for statement in [
            "CREATE TABLE vendors (id INTEGER PRIMARY KEY, tenant_id TEXT)",
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, tenant_id TEXT)",
            "CREATE TABLE products (id INTEGER PRIMARY KEY, vendor_id INTEGER REFERENCES vendors(id))",
            "CREATE TABLE product_orders (product_id INTEGER REFERENCES products(id), order_id INTEGER REFERENCES orders(id), PRIMARY KEY (product_id, order_id))",
            "INSERT INTO vendors VALUES (1, 'T'), (2, 'O')",
            "INSERT INTO orders VALUES (1, 'T'), (2, 'O')",
            "INSERT INTO products VALUES (1, 2), (2, 1), (3, 2), (4, 1)",
            "INSERT INTO product_orders VALUES (1, 1), (4, 1), (3, 2)",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        let schema = Arc::new(
            tenant_wiper::schema::discover_sqlite_schema(&pool)
                .await
                .unwrap(),
        );

        let config = Arc::new(
            TenantWiperConfig::builder(Arc::clone(&schema))
                .tenant_filter(TenantFilter::column_equals("tenant_id", "T"))
                .join_paths([
                    "product_orders__order_id=id__orders",
                    "products__id=product_id__product_orders__order_id=id__orders",
                    "products__vendor_id=id__vendors",
                ])
                .build()
                .unwrap(),
        );
        let mut session = tenant_wiper::SqliteSession::begin(&pool, schema).await.unwrap();
        let report = TenantDeleter::new(config)
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap();

        // 1 via orders, 2 via vendors, 4 via both
        assert_eq!(report.collected("products"), 3);
        let remaining: Vec<i64> = sqlx::query_scalar("SELECT id FROM products ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, vec![3]);
        assert_eq!(fixtures::count(&pool, "vendors").await, 1);
        assert_eq!(fixtures::count(&pool, "product_orders").await, 1);
    }

    /// Declared types outside SQLite's named affinities still accept text tenant ids
    #[tokio::test]
    async fn test_uuid_and_datetime_tenant_columns() {
        let pool = fixtures::memory_pool().await;
        let tenants = fixtures::Tenants::for_tests();
        sqlx::query(
            "CREATE TABLE accounts (id INTEGER PRIMARY KEY, tenant_id UUID, created_at DATETIME)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let rows = [
            (1, &tenants.target_tenant_id, "2024-01-01 10:00:00"),
            (2, &tenants.target_tenant_id, "2024-02-01 10:00:00"),
            (3, &tenants.other_tenant_id, "2024-01-01 10:00:00"),
        ];
        for (id, tenant, created_at) in rows {
            sqlx::query("INSERT INTO accounts (id, tenant_id, created_at) VALUES (?, ?, ?)")
                .bind(id)
                .bind(tenant)
                .bind(created_at)
                .execute(&pool)
                .await
                .unwrap();
        }
        let schema = Arc::new(
            tenant_wiper::schema::discover_sqlite_schema(&pool)
                .await
                .unwrap(),
        );

        let config = Arc::new(
            TenantWiperConfig::builder(Arc::clone(&schema))
                .tenant_filter(TenantFilter::column_equals(
                    "tenant_id",
                    tenants.target_tenant_id.as_str(),
                ))
                .build()
                .unwrap(),
        );
        let mut session = tenant_wiper::SqliteSession::begin(&pool, schema).await.unwrap();
        let report = TenantDeleter::new(config)
            .delete(&mut session, DeleteOptions::commit())
            .await
            .unwrap();

        assert_eq!(report.table("accounts").unwrap().deleted, 2);
        let remaining: Vec<i64> = sqlx::query_scalar("SELECT id FROM accounts ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, vec![3]);

        // Text comparisons against a DATETIME column compile too
        let by_date = TenantWiperConfig::builder(Arc::new(
            tenant_wiper::schema::discover_sqlite_schema(&pool)
                .await
                .unwrap(),
        ))
        .tenant_filter(TenantFilter::column_equals("created_at", "2024-01-01 10:00:00"))
        .build();
        assert!(by_date.is_ok());
    }

    /// Deleting without commit leaves the transaction open for the caller
    #[tokio::test]
    async fn test_no_commit_leaves_decision_to_caller() {
        let shop = fixtures::shop().await;
        let mut deleter = TenantDeleter::new(shop_config(&shop, &["audit_logs"]));
        let mut session = shop.session().await;
        let report = deleter
            .delete(&mut session, DeleteOptions::no_commit())
            .await
            .unwrap();
        assert!(!report.committed);
        assert_eq!(deleter.state(), DeletionState::Flushed);
        assert!(session.is_open());

        session.rollback().await.unwrap();
        assert_eq!(shop.count("users").await, 3);
    }
}

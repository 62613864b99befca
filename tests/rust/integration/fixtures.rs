//! Shared SQLite fixtures for integration tests
//!
//! The shop fixture holds two tenants: the target tenant owns users 1-2,
//! orders 1-2 and product_orders (1,1) and (2,2); the other tenant owns user
//! 3, order 3 and product_order (3,3). Products have no tenant column and
//! audit_logs belongs to nobody.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use tenant_wiper::query::{CollectionQuery, DeleteStatement, KeyValue};
use tenant_wiper::schema::discover_sqlite_schema;
use tenant_wiper::{BackendError, SchemaRegistry, Session, SqliteSession};

pub const SHOP_PATHS: [&str; 2] = [
    "product_orders__order_id=id__orders",
    "products__id=product_id__product_orders__order_id=id__orders",
];

const SHOP_DDL: &[&str] = &[
    "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50), tenant_id VARCHAR(36), org_id VARCHAR(36))",
    "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id), tenant_id VARCHAR(36), amount INTEGER)",
    "CREATE TABLE products (id INTEGER PRIMARY KEY, name VARCHAR(100))",
    "CREATE TABLE product_orders (product_id INTEGER REFERENCES products(id), order_id INTEGER REFERENCES orders(id), quantity INTEGER, PRIMARY KEY (product_id, order_id))",
    "CREATE TABLE audit_logs (id INTEGER PRIMARY KEY, action VARCHAR(50))",
];

pub struct Tenants {
    pub target_tenant_id: String,
    pub target_org_id: String,
    pub other_tenant_id: String,
    pub other_org_id: String,
}

impl Tenants {
    pub fn for_tests() -> Self {
        Self {
            target_tenant_id: Uuid::new_v4().to_string(),
            target_org_id: Uuid::new_v4().to_string(),
            other_tenant_id: Uuid::new_v4().to_string(),
            other_org_id: Uuid::new_v4().to_string(),
        }
    }
}

pub struct Shop {
    pub pool: SqlitePool,
    pub schema: Arc<SchemaRegistry>,
    pub tenants: Tenants,
}

impl Shop {
    pub async fn session(&self) -> SqliteSession {
        SqliteSession::begin(&self.pool, Arc::clone(&self.schema))
            .await
            .unwrap()
    }

    pub async fn count(&self, table: &str) -> i64 {
        count(&self.pool, table).await
    }

    pub async fn count_where(&self, table: &str, condition: &str, value: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) AS n FROM {} WHERE {} = ?", table, condition);
        sqlx::query(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .unwrap()
            .get("n")
    }

    pub async fn ids(&self, table: &str) -> Vec<i64> {
        let sql = format!("SELECT id FROM {} ORDER BY id", table);
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .unwrap()
            .iter()
            .map(|row| row.get("id"))
            .collect()
    }

    pub async fn execute(&self, sql: &str) {
        sqlx::query(sql).execute(&self.pool).await.unwrap();
    }
}

/// Single-connection in-memory database; every pooled connection to
/// `sqlite::memory:` would otherwise be a separate database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) AS n FROM {}", table);
    sqlx::query(&sql).fetch_one(pool).await.unwrap().get("n")
}

pub async fn create_shop_tables(pool: &SqlitePool) {
    for ddl in SHOP_DDL {
        sqlx::query(ddl).execute(pool).await.unwrap();
    }
}

pub async fn seed_shop(pool: &SqlitePool, tenants: &Tenants) {
    let users = [
        (1, "John", &tenants.target_tenant_id, &tenants.target_org_id),
        (2, "Jane", &tenants.target_tenant_id, &tenants.target_org_id),
        (3, "Bob", &tenants.other_tenant_id, &tenants.other_org_id),
    ];
    for (id, name, tenant, org) in users {
        sqlx::query("INSERT INTO users (id, name, tenant_id, org_id) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(tenant)
            .bind(org)
            .execute(pool)
            .await
            .unwrap();
    }

    let orders = [
        (1, 1, &tenants.target_tenant_id, 100),
        (2, 2, &tenants.target_tenant_id, 200),
        (3, 3, &tenants.other_tenant_id, 300),
    ];
    for (id, user_id, tenant, amount) in orders {
        sqlx::query("INSERT INTO orders (id, user_id, tenant_id, amount) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(user_id)
            .bind(tenant)
            .bind(amount)
            .execute(pool)
            .await
            .unwrap();
    }

    for statement in [
        "INSERT INTO products (id, name) VALUES (1, 'Widget'), (2, 'Gadget'), (3, 'Tool')",
        "INSERT INTO product_orders (product_id, order_id, quantity) VALUES (1, 1, 5), (2, 2, 3), (3, 3, 7)",
        "INSERT INTO audit_logs (id, action) VALUES (1, 'login'), (2, 'logout')",
    ] {
        sqlx::query(statement).execute(pool).await.unwrap();
    }
}

/// Seeded shop database with its discovered schema
pub async fn shop() -> Shop {
    let pool = memory_pool().await;
    create_shop_tables(&pool).await;
    let tenants = Tenants::for_tests();
    seed_shop(&pool, &tenants).await;
    let schema = Arc::new(discover_sqlite_schema(&pool).await.unwrap());
    Shop {
        pool,
        schema,
        tenants,
    }
}

/// Session wrapper recording every delete statement; can fail the Nth one.
pub struct RecordingSession<S> {
    inner: S,
    fail_on_delete: Option<usize>,
    pub deletes: Arc<Mutex<Vec<(String, usize)>>>,
}

impl<S: Session> RecordingSession<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_on_delete: None,
            deletes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the `n`th delete statement (1-based) without running it
    pub fn failing_on_delete(mut self, n: usize) -> Self {
        self.fail_on_delete = Some(n);
        self
    }

    pub fn statements(&self) -> Vec<(String, usize)> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl<S: Session> Session for RecordingSession<S> {
    async fn fetch_keys(&mut self, query: &CollectionQuery) -> Result<Vec<KeyValue>, BackendError> {
        self.inner.fetch_keys(query).await
    }

    async fn execute_delete(&mut self, statement: &DeleteStatement) -> Result<u64, BackendError> {
        let attempt = self.deletes.lock().unwrap().len() + 1;
        if self.fail_on_delete == Some(attempt) {
            return Err(BackendError::other_with_context(
                "Database error",
                format!("delete statement {}", attempt),
            ));
        }
        let affected = self.inner.execute_delete(statement).await?;
        self.deletes
            .lock()
            .unwrap()
            .push((statement.table.clone(), statement.keys.len()));
        Ok(affected)
    }

    async fn commit(&mut self) -> Result<(), BackendError> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), BackendError> {
        self.inner.rollback().await
    }

    async fn flush(&mut self) -> Result<(), BackendError> {
        self.inner.flush().await
    }
}

//! Tenant Wiper - declarative, FK-safe deletion of one tenant's rows
//!
//! This crate deletes every row belonging to a tenant across a relational
//! schema through:
//! - Tenant filters matching rows directly by tenant columns
//! - Join paths reaching tenant columns through foreign-key chains
//! - Up-front validation that every table is covered or excluded
//! - Two-phase collect/delete in dependency order inside one transaction
//!
//! # Example
//!
//! ```ignore
//! let schema = Arc::new(discover_sqlite_schema(&pool).await?);
//! let config = Arc::new(
//!     TenantWiperConfig::builder(schema.clone())
//!         .tenant_filter(TenantFilter::column_equals("tenant_id", "acme"))
//!         .join_path("product_orders__order_id=id__orders")
//!         .exclude_table("audit_logs")
//!         .build()?,
//! );
//! let mut session = SqliteSession::begin(&pool, schema).await?;
//! let report = TenantDeleter::new(config)
//!     .delete(&mut session, DeleteOptions::commit())
//!     .await?;
//! ```

pub mod backend;
pub mod config;
pub mod query;
pub mod schema;
pub mod wiper;

pub use backend::{BackendError, Session, SqliteSession};
pub use schema::{SchemaRegistry, TableDef};
pub use wiper::{
    DeleteOptions, DeletionReport, TenantDeleter, TenantFilter, TenantWiperConfig, WiperError,
};

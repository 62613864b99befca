pub mod config;
pub mod discovery;
pub mod errors;
pub mod registry;
pub mod table;

pub use config::SchemaDefinition;
pub use discovery::discover_sqlite_schema;
pub use errors::SchemaError;
pub use registry::SchemaRegistry;
pub use table::{ColumnDef, ForeignKeyDef, SqlType, TableDef};

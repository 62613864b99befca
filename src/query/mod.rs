//! Query model shared by the planner, the filter probe and the backends.

pub mod errors;
pub mod plan;
pub mod predicate;
pub mod sql;
pub mod value;

pub use errors::CompileError;
pub use plan::{CollectionQuery, DeleteStatement, JoinClause, SelectQuery, TableSource};
pub use predicate::{Column, ComparisonOp, Predicate};
pub use sql::{CompiledSql, SqlCompiler};
pub use value::{KeyValue, Value};

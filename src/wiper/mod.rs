//! Tenant wiper core: join paths, validation, planning and two-phase deletion.

pub mod config;
pub mod deleter;
pub mod errors;
pub mod events;
pub mod filter;
pub mod join_path;
pub mod planner;
pub mod probe;
pub mod report;
pub mod validator;

pub use config::{RelationshipIndex, TenantWiperConfig, TenantWiperConfigBuilder, DEFAULT_BATCH_SIZE};
pub use deleter::{DeleteOptions, DeletionState, TenantDeleter};
pub use errors::{PathIssue, WiperError};
pub use events::{EventSink, LogSink, MemorySink, Phase, ValidationSummary, WiperEvent};
pub use filter::{BoundTable, FilterBuildError, TableRef, TenantFilter};
pub use join_path::{parse_join_path, JoinPath, JoinPathError, JoinStep};
pub use planner::DeletionPlanner;
pub use probe::{probe_filter, ColumnRecorder, FilterProbe};
pub use report::{DeletionReport, TableReport};

//! Network pipeline for the quakefeed workspace: cancellable fetch tasks,
//! the dependency-aware task graph, provider query builders, and the
//! tolerant response parsers that normalize USGS/EMSC payloads into
//! canonical records.

pub mod activity;
pub mod error;
pub mod graph;
pub mod parse;
pub mod providers;
pub mod task;

pub use activity::{ActivityGauge, ActivityGuard};
pub use error::{ParseError, QueryError, TaskError};
pub use graph::TaskGraph;
pub use providers::{EmscQuery, ProviderQuery, UsgsQuery};
pub use task::{FetchTask, TaskContext, TaskState};

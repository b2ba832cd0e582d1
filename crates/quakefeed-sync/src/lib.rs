//! Fetch-and-sync orchestration: runs provider fetches through the task
//! graph and reconciles the results with the local store.

pub mod coordinator;
pub mod summary;

pub use coordinator::{SyncCoordinator, SyncError};
pub use summary::FetchSummary;

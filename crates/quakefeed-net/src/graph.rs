//! Runs a set of [`FetchTask`]s under one concurrency gate.
//!
//! The graph holds nothing but the pending tasks and the gate; results and
//! errors stay on the tasks themselves. Dependency edges are declared on the
//! tasks (see [`FetchTask::after`]) and must form a DAG.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::task::{FetchTask, TaskContext};

/// Object-safe view of a task so one graph can hold tasks with different
/// output types.
trait Runnable: Send + Sync {
    fn drive<'a>(
        &'a self,
        ctx: &'a TaskContext,
        gate: &'a Semaphore,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl<O: Send + 'static> Runnable for FetchTask<O> {
    fn drive<'a>(
        &'a self,
        ctx: &'a TaskContext,
        gate: &'a Semaphore,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.run(ctx, gate))
    }
}

/// A batch of tasks plus the gate bounding how many execute at once.
pub struct TaskGraph {
    tasks: Vec<Arc<dyn Runnable>>,
    gate: Semaphore,
}

impl TaskGraph {
    /// One task executing at a time. Used for dependency chains such as
    /// detail → nearby-cities.
    #[must_use]
    pub fn serial() -> Self {
        Self::with_limit(1)
    }

    /// No effective bound. Used for independent top-level fetches.
    #[must_use]
    pub fn concurrent() -> Self {
        Self::with_limit(Semaphore::MAX_PERMITS)
    }

    #[must_use]
    pub fn with_limit(max_executing: usize) -> Self {
        Self {
            tasks: Vec::new(),
            gate: Semaphore::new(max_executing),
        }
    }

    pub fn add<O: Send + 'static>(&mut self, task: Arc<FetchTask<O>>) {
        self.tasks.push(task);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drives every task to `Finished`. Completion and results are observed
    /// per task through its state watch and output accessor.
    pub async fn run(&self, ctx: &TaskContext) {
        join_all(self.tasks.iter().map(|task| task.drive(ctx, &self.gate))).await;
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.tasks.len())
            .field("available_permits", &self.gate.available_permits())
            .finish()
    }
}

//! Cancellable, observable unit of network work.
//!
//! A [`FetchTask`] represents exactly one HTTP request: it waits for its
//! declared dependencies to finish, issues the request, decodes the body into
//! a typed output slot, and moves through the `Ready → Executing → Finished`
//! lifecycle. Dependents read a finished task's output through
//! [`FetchTask::output`] — that accessor is the only data channel between
//! tasks; there is no shared mutable state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use reqwest::{StatusCode, Url};
use tokio::sync::{watch, Notify, Semaphore};

use crate::activity::ActivityGauge;
use crate::error::{ParseError, TaskError};

/// Task lifecycle. Transitions are strictly forward; `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Executing,
    Finished,
}

impl TaskState {
    /// The one authoritative transition rule: `Ready → Executing`,
    /// `Ready → Finished` (cancellation or self-cancel before start), and
    /// `Executing → Finished`. Everything else is refused.
    fn may_advance_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Ready, TaskState::Executing)
                | (TaskState::Ready | TaskState::Executing, TaskState::Finished)
        )
    }

    #[must_use]
    pub fn is_finished(self) -> bool {
        self == TaskState::Finished
    }
}

/// Everything a task needs from its environment to run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub client: reqwest::Client,
    pub gauge: ActivityGauge,
}

impl TaskContext {
    #[must_use]
    pub fn new(client: reqwest::Client, gauge: ActivityGauge) -> Self {
        Self { client, gauge }
    }
}

type DecodeFn<O> = Box<dyn Fn(&[u8]) -> Result<O, ParseError> + Send + Sync>;
type ResolveFn = Box<dyn Fn() -> Option<Url> + Send + Sync>;

/// Where the request goes: either a URL known up front, or one resolved at
/// start time by reading a finished dependency's output. A deferred target
/// that resolves to `None` makes the task cancel itself without issuing a
/// request.
enum Target {
    Fixed(Url),
    Deferred(ResolveFn),
}

impl Target {
    fn resolve(&self) -> Option<Url> {
        match self {
            Target::Fixed(url) => Some(url.clone()),
            Target::Deferred(resolve) => resolve(),
        }
    }
}

/// One cancellable HTTP request with a typed result slot.
pub struct FetchTask<O> {
    target: Target,
    body: Option<serde_json::Value>,
    decode: DecodeFn<O>,
    state_tx: watch::Sender<TaskState>,
    deps: Vec<watch::Receiver<TaskState>>,
    output: Mutex<Option<O>>,
    error: Mutex<Option<TaskError>>,
    cancelled: AtomicBool,
    cancel_notify: Notify,
}

impl<O: Send + 'static> FetchTask<O> {
    /// A GET task with a fixed target URL.
    pub fn get<D>(url: Url, decode: D) -> Self
    where
        D: Fn(&[u8]) -> Result<O, ParseError> + Send + Sync + 'static,
    {
        Self::build(Target::Fixed(url), None, Box::new(decode))
    }

    /// A POST task carrying a JSON body.
    pub fn post<D>(url: Url, body: serde_json::Value, decode: D) -> Self
    where
        D: Fn(&[u8]) -> Result<O, ParseError> + Send + Sync + 'static,
    {
        Self::build(Target::Fixed(url), Some(body), Box::new(decode))
    }

    /// A GET task whose URL is resolved only when the task starts, typically
    /// by reading the output of a finished dependency.
    pub fn deferred<R, D>(resolve: R, decode: D) -> Self
    where
        R: Fn() -> Option<Url> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<O, ParseError> + Send + Sync + 'static,
    {
        Self::build(Target::Deferred(Box::new(resolve)), None, Box::new(decode))
    }

    fn build(target: Target, body: Option<serde_json::Value>, decode: DecodeFn<O>) -> Self {
        let (state_tx, _) = watch::channel(TaskState::Ready);
        Self {
            target,
            body,
            decode,
            state_tx,
            deps: Vec::new(),
            output: Mutex::new(None),
            error: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            cancel_notify: Notify::new(),
        }
    }

    /// Declares that this task must not start before `dep` reaches
    /// `Finished`, whether `dep` succeeded, failed, or was cancelled.
    /// Dependency edges must form a DAG; a cycle is a programming error.
    pub fn after<P: Send + 'static>(&mut self, dep: &FetchTask<P>) {
        self.deps.push(dep.subscribe());
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        *self.state_tx.borrow()
    }

    /// A receiver that observes every state transition of this task.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state_tx.subscribe()
    }

    /// Forces `Finished` immediately from any state and aborts in-flight
    /// I/O. Idempotent. Dependents are NOT cancelled; each still waits for
    /// this task's `Finished` state and then decides on its own that it has
    /// nothing to read.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_notify.notify_one();
        self.advance(TaskState::Finished);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The decoded result. Valid only after `Finished`; returns `None`
    /// before that, and `None` for a task that finished without a result
    /// (cancelled, no-content, transport or parse failure).
    #[must_use]
    pub fn output(&self) -> Option<O>
    where
        O: Clone,
    {
        if !self.state().is_finished() {
            return None;
        }
        self.output.lock().unwrap().clone()
    }

    /// Removes and returns the terminal error, if the task recorded one.
    pub fn take_error(&self) -> Option<TaskError> {
        self.error.lock().unwrap().take()
    }

    /// Drives the task to `Finished`: waits for dependencies, takes a
    /// concurrency permit from `gate`, issues the request, and decodes the
    /// body. Never returns an error; failures land in the error slot.
    pub async fn run(&self, ctx: &TaskContext, gate: &Semaphore) {
        for dep in &self.deps {
            let mut dep = dep.clone();
            // A closed channel means the dependency was dropped; treat it
            // as finished rather than blocking forever.
            let _ = dep.wait_for(|state| state.is_finished()).await;
        }

        if self.is_cancelled() {
            self.finish();
            return;
        }

        let Some(url) = self.target.resolve() else {
            tracing::debug!("no target URL resolved, task self-cancelling");
            self.finish();
            return;
        };

        // The permit is taken only after dependencies finish, so a serial
        // gate cannot deadlock on a dependency chain.
        let Ok(_permit) = gate.acquire().await else {
            self.finish();
            return;
        };

        if self.is_cancelled() || !self.advance(TaskState::Executing) {
            self.finish();
            return;
        }
        let _activity = ctx.gauge.begin();

        let request = match &self.body {
            Some(body) => ctx.client.post(url.clone()).json(body),
            None => ctx.client.get(url.clone()),
        };

        let cancel = self.cancel_notify.notified();
        tokio::pin!(cancel);

        let response = tokio::select! {
            () = &mut cancel => {
                self.finish();
                return;
            }
            result = request.send() => result,
        };
        let response = match response {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(url = %url, %error, "request failed");
                self.record_error(TaskError::Http(error));
                self.finish();
                return;
            }
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            // "No data for this query" — zero results, not a failure.
            tracing::debug!(url = %url, %status, "no data for query, task self-cancelling");
            self.finish();
            return;
        }
        if !status.is_success() {
            self.record_error(TaskError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
            self.finish();
            return;
        }

        let bytes = tokio::select! {
            () = &mut cancel => {
                self.finish();
                return;
            }
            result = response.bytes() => result,
        };
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(url = %url, %error, "reading response body failed");
                self.record_error(TaskError::Http(error));
                self.finish();
                return;
            }
        };

        match (self.decode)(&bytes) {
            Ok(output) => {
                if !self.is_cancelled() {
                    *self.output.lock().unwrap() = Some(output);
                }
            }
            Err(error) => {
                tracing::warn!(url = %url, %error, "decoding response failed");
                self.record_error(TaskError::Parse(error));
            }
        }
        self.finish();
    }

    fn advance(&self, next: TaskState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if state.may_advance_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn finish(&self) {
        self.advance(TaskState::Finished);
    }

    fn record_error(&self, error: TaskError) {
        *self.error.lock().unwrap() = Some(error);
    }
}

impl<O: Send + 'static> std::fmt::Debug for FetchTask<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTask")
            .field("state", &*self.state_tx.borrow())
            .field("deps", &self.deps.len())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_task() -> FetchTask<()> {
        let url = Url::parse("http://localhost/query").unwrap();
        FetchTask::get(url, |_| Ok(()))
    }

    #[test]
    fn transitions_are_strictly_forward() {
        assert!(TaskState::Ready.may_advance_to(TaskState::Executing));
        assert!(TaskState::Ready.may_advance_to(TaskState::Finished));
        assert!(TaskState::Executing.may_advance_to(TaskState::Finished));

        assert!(!TaskState::Executing.may_advance_to(TaskState::Ready));
        assert!(!TaskState::Finished.may_advance_to(TaskState::Ready));
        assert!(!TaskState::Finished.may_advance_to(TaskState::Executing));
        assert!(!TaskState::Ready.may_advance_to(TaskState::Ready));
    }

    #[test]
    fn cancel_forces_finished_and_is_idempotent() {
        let task = noop_task();
        assert_eq!(task.state(), TaskState::Ready);

        task.cancel();
        assert_eq!(task.state(), TaskState::Finished);
        assert!(task.is_cancelled());

        task.cancel();
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[test]
    fn output_is_unreadable_before_finished() {
        let task = noop_task();
        *task.output.lock().unwrap() = Some(());
        assert_eq!(task.output(), None);

        task.advance(TaskState::Finished);
        assert_eq!(task.output(), Some(()));
    }

    #[test]
    fn advance_refuses_backward_transitions() {
        let task = noop_task();
        assert!(task.advance(TaskState::Executing));
        assert!(task.advance(TaskState::Finished));
        assert!(!task.advance(TaskState::Executing));
        assert_eq!(task.state(), TaskState::Finished);
    }
}

//! Supervised tasks
//!
//! The engine runs one [`SessionRunner`](crate::SessionRunner) per tenant.
//! Supervised tasks share a single cancellation token. A panic in one of
//! them is logged with its tenant instead of aborting the process.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What a supervised task does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Drives one tenant session until shutdown
    SessionRunner,
    /// Housekeeping that may finish on its own
    Maintenance,
}

impl TaskKind {
    /// Whether returning before shutdown is a fault
    const fn runs_until_shutdown(&self) -> bool {
        matches!(self, Self::SessionRunner)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SessionRunner => "session_runner",
            Self::Maintenance => "maintenance",
        })
    }
}

struct Supervised {
    tenant: String,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Registry of supervised tasks
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let (runner, handle) = SessionRunner::new(session, tasks.shutdown_token());
/// tasks.spawn("tenant-1", TaskKind::SessionRunner, async move {
///     runner.run().await;
/// });
/// tasks.shutdown().await;
/// ```
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<Supervised>,
    shutdown: CancellationToken,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token every supervised task listens on
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start a task for a tenant
    pub fn spawn<F>(&mut self, tenant: impl Into<String>, kind: TaskKind, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let tenant = tenant.into();
        let label = tenant.clone();
        let shutdown = self.shutdown.clone();

        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(()) if kind.runs_until_shutdown() && !shutdown.is_cancelled() => {
                    tracing::warn!(tenant = %label, kind = %kind, "Task returned before shutdown");
                }
                Ok(()) => {}
                Err(payload) => {
                    tracing::error!(
                        tenant = %label,
                        kind = %kind,
                        panic = %panic_message(payload.as_ref()),
                        "Task panicked"
                    );
                }
            }
        });

        tracing::debug!(tenant = %tenant, kind = %kind, "Task supervised");
        self.tasks.push(Supervised {
            tenant,
            kind,
            handle,
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tenants whose session runner stopped before shutdown
    pub fn stopped_runners(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.kind.runs_until_shutdown() && t.handle.is_finished())
            .map(|t| t.tenant.as_str())
            .collect()
    }

    /// Cancel every task and wait for all of them
    pub async fn shutdown(self) {
        tracing::info!(tasks = self.tasks.len(), "Stopping supervised tasks");
        self.shutdown.cancel();

        for task in self.tasks {
            if let Err(e) = task.handle.await
                && !e.is_cancelled()
            {
                tracing::error!(tenant = %task.tenant, kind = %task.kind, error = ?e, "Task join failed");
            }
        }

        tracing::info!("Supervised tasks stopped");
    }
}

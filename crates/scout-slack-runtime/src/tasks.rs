//! Tracking for detached command continuations.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tracing::{debug, error};

/// Detached tasks that must finish before the process exits.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the current runtime. Finished tasks are reaped first.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }
        tasks.spawn(task);
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Waits until every spawned task, including ones spawned while waiting,
    /// has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut drained = {
                let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *tasks)
            };
            if drained.is_empty() {
                return;
            }
            debug!(pending = drained.len(), "waiting for background continuations");
            while let Some(result) = drained.join_next().await {
                log_join_result(result);
            }
        }
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(join_error) = result {
        error!(error = %join_error, "background continuation aborted");
    }
}

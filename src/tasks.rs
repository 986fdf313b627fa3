//! Background execution for long-running operations.
//!
//! Start, stop, restart and backup creation can take seconds to minutes. A
//! [`BackgroundTask`] runs one of them on the runtime and hands the result
//! back through [`BackgroundTask::join`], so front-ends never block on them.
//!
//! Cancelling only drops the waiting future. A process that was already
//! spawned keeps running until `ServerRunner::stop` ends it.

use crate::error::{LauncherError, LauncherResult};
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct BackgroundTask<T> {
    name: String,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn spawn<F>(name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let name = name.into();
        debug!(task = %name, "spawning background task");
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        debug!(task = %self.name, "cancelling background task");
        self.handle.abort();
    }

    /// Waits for completion. A cancelled or panicked task yields
    /// `TaskCancelled`.
    pub async fn join(self) -> LauncherResult<T> {
        self.handle.await.map_err(|err| {
            debug!(task = %self.name, error = %err, "background task did not complete");
            LauncherError::TaskCancelled(self.name.clone())
        })
    }
}

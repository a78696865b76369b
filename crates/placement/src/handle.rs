//! Caller-side handle to a spawned placement.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use domain::PlacementOutcome;
use tokio::task::JoinHandle;

use crate::error::PlacementError;

/// Resolves to the outcome of a placement running on its own task.
///
/// Dropping the handle detaches the task, which still runs to completion.
/// [`abort`](Self::abort) is best effort: a placement cancelled before its
/// save leaves nothing behind, and the save itself is atomic.
#[derive(Debug)]
#[must_use = "a placement handle does nothing unless awaited"]
pub struct PlacementHandle {
    task: JoinHandle<Result<PlacementOutcome, PlacementError>>,
}

impl PlacementHandle {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<PlacementOutcome, PlacementError>> + Send + 'static,
    {
        Self {
            task: tokio::spawn(future),
        }
    }

    /// Requests cancellation of the placement.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Returns true once the placement has finished or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for PlacementHandle {
    type Output = Result<PlacementOutcome, PlacementError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "placement task did not complete");
                Err(PlacementError::TaskAborted(e.to_string()))
            }
        })
    }
}

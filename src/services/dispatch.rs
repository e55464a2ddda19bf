//! Background execution for store operations.
//!
//! Callers that cannot await (UI event handlers, signal hooks) hand futures to
//! a [`TaskScope`]. Everything still running when the scope is cancelled or
//! dropped is aborted; there is no per-task cancellation.

use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, error};

pub struct TaskScope {
    name: &'static str,
    tasks: JoinSet<()>,
}

impl TaskScope {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tasks: JoinSet::new(),
        }
    }

    /// Runs `future` in the background, discarding its output.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(async move {
            future.await;
        });
    }

    /// Runs `future` and hands its output to `callback` on completion.
    ///
    /// The callback never runs if the scope is cancelled first.
    pub fn spawn_with_callback<F, T, C>(&mut self, future: F, callback: C)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        self.tasks.spawn(async move {
            callback(future.await);
        });
    }

    /// Aborts every task still running in this scope.
    pub fn cancel_all(&mut self) {
        if !self.tasks.is_empty() {
            debug!(scope = self.name, tasks = self.tasks.len(), "Cancelling tasks");
        }
        self.tasks.abort_all();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every task to finish. Returns how many ran to completion.
    pub async fn join_all(&mut self) -> usize {
        let mut completed = 0;
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(()) => completed += 1,
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!(scope = self.name, error = %e, "Background task panicked"),
            }
        }
        completed
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn callback_receives_output() {
        let mut scope = TaskScope::new("test");
        let (tx, rx) = oneshot::channel();

        scope.spawn_with_callback(async { 40 + 2 }, move |value| {
            let _ = tx.send(value);
        });

        assert_eq!(rx.await.unwrap(), 42);
        assert_eq!(scope.join_all().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_in_flight_work() {
        let mut scope = TaskScope::new("test");
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        scope.spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(scope.len(), 1);

        scope.cancel_all();
        assert_eq!(scope.join_all().await, 0);
        assert!(scope.is_empty());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drop_aborts_tasks() {
        let (tx, rx) = oneshot::channel::<()>();
        {
            let mut scope = TaskScope::new("test");
            scope.spawn(async move {
                let _held = tx;
                std::future::pending::<()>().await;
            });
        }

        assert!(rx.await.is_err());
    }
}

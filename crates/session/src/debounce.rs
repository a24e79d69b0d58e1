use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs at most one delayed job at a time. Scheduling a new job aborts the
/// one still waiting.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `job` once the settle window elapses, unless another call to
    /// `schedule` or [`Debouncer::cancel`] comes first.
    pub fn schedule<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            job.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

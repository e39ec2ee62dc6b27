//! Debounce gate for keystroke-driven searches.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Keeps at most one scheduled call alive. A new trigger cancels the
/// previous one if its delay has not elapsed yet; once a call has been
/// dispatched it runs to completion.
#[derive(Debug, Default)]
pub struct DebounceGate {
    pending: Option<CancellationToken>,
}

impl DebounceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger<F>(&mut self, delay: Duration, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let token = CancellationToken::new();
        self.pending = Some(token.clone());
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            task.await;
        })
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for DebounceGate {
    fn drop(&mut self) {
        self.cancel();
    }
}

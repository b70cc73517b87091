//! Cooperative cancellation of a pipeline run.

use stackzy_core::{Result, StackzyError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable token signalling that the caller wants the run to stop
///
/// Every clone observes the same flag. Futures raced against
/// [`Cancellation::guard`] are dropped on cancel, which kills subprocesses
/// spawned with `kill_on_drop`.
#[derive(Debug, Clone)]
pub struct Cancellation {
    tx: Arc<watch::Sender<bool>>,
}

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Fail with [`StackzyError::Cancelled`] if cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StackzyError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `fut` unless cancelled first
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(StackzyError::Cancelled),
            result = fut => result,
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_passes_through() {
        let cancel = Cancellation::new();
        let value = cancel.guard(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_guard_interrupts_pending_future() {
        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result: Result<()> = cancel
            .guard(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StackzyError::Cancelled)));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_cancelled_wakes_waiter() {
        let cancel = Cancellation::new();
        let mut waiter = tokio_test::task::spawn(cancel.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        cancel.cancel();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let result: Result<()> = cancel.guard(async { panic!("must not run") }).await;
        assert!(result.unwrap_err().is_cancelled());
    }
}

//! Run cancellation
//!
//! A [`CancellationHandle`] flips a watch channel; every
//! [`CancellationSignal`] clone observes it. Once cancelled, a signal stays
//! cancelled.

use tokio::sync::watch;

/// Trigger side of a cancellation pair
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl CancellationHandle {
    /// Request cancellation
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Check if cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Observer side of a cancellation pair
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// Create a linked handle and signal
    #[must_use]
    pub fn pair() -> (CancellationHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        (CancellationHandle { sender }, Self { receiver })
    }

    /// Signal that never fires
    #[must_use]
    pub fn never() -> Self {
        let (handle, signal) = Self::pair();
        // Dropping the handle closes the channel; `cancelled` then pends forever.
        drop(handle);
        signal
    }

    /// Check if cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation is requested
    ///
    /// Pends forever if the handle was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        let closed = receiver.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let (handle, signal) = CancellationSignal::pair();
        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(signal.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_before_wait_resolves_immediately() {
        let (handle, signal) = CancellationSignal::pair();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn never_signal_stays_pending() {
        let signal = CancellationSignal::never();
        assert!(!signal.is_cancelled());
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
    }
}

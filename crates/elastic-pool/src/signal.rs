//! A reusable async single-release signaling primitive.
//!
//! [`SignalEvent`] releases exactly one waiter per [`signal`] call. Waiters
//! are released in FIFO order; a signal with no waiter is remembered and
//! consumed by the next [`wait`]. This is the building block behind
//! "cancel exactly one subscriber" scale-down semantics.
//!
//! [`signal`]: SignalEvent::signal
//! [`wait`]: SignalEvent::wait

use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// A reusable async event that satisfies exactly one `wait` per `signal`.
///
/// Unlike a broadcast-style notifier, each call to [`signal`] releases at
/// most one waiter. Signals issued while nobody is waiting accumulate as
/// pending releases and are consumed, one each, by subsequent [`wait`]
/// calls. There is no lost-wakeup window: the check-and-enqueue in `wait`
/// and the check-and-dequeue in `signal` are serialized under one lock.
///
/// A waiter whose future is dropped before it is released is skipped; its
/// release is handed to the next queued waiter, or kept pending if the
/// queue is empty.
///
/// [`signal`]: SignalEvent::signal
/// [`wait`]: SignalEvent::wait
#[derive(Debug, Default)]
pub struct SignalEvent {
    state: Mutex<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    waiters: VecDeque<oneshot::Sender<()>>,
    pending: usize,
}

impl SignalEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases the oldest live waiter, or records a pending release if no
    /// waiter is queued.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            // A send error means the waiting future was dropped; fall
            // through to the next waiter in line.
            if waiter.send(()).is_ok() {
                return;
            }
        }
        state.pending += 1;
    }

    /// Waits until released by one [`signal`] call.
    ///
    /// Completes immediately if a pending release is available, consuming
    /// it; otherwise enqueues behind any earlier waiters.
    ///
    /// [`signal`]: SignalEvent::signal
    pub async fn wait(&self) {
        let receiver = {
            let mut state = self.state.lock();
            if state.pending > 0 {
                state.pending -= 1;
                return;
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            receiver
        };
        // The sender is only dropped if the event itself is dropped while
        // we wait; treat that as a release so callers can unwind.
        let _ = receiver.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use std::sync::Arc;
    use tokio::time::timeout;

    fn completes_now<F: Future>(fut: F) -> impl Future<Output = bool> {
        async move { timeout(Duration::ZERO, fut).await.is_ok() }
    }

    #[tokio::test(start_paused = true)]
    async fn pending_signals_satisfy_later_waits_in_order() {
        let event = SignalEvent::new();

        for _ in 0..3 {
            event.signal();
        }
        for _ in 0..3 {
            assert!(completes_now(event.wait()).await);
        }

        // The fourth wait has no pending release left and must block.
        assert!(!completes_now(event.wait()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn each_signal_releases_exactly_one_waiter() {
        let event = Arc::new(SignalEvent::new());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for tag in 0..2 {
            let event = Arc::clone(&event);
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                event.wait().await;
                order.lock().push(tag);
            });
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(order.lock().is_empty());

        event.signal();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(order.lock().len(), 1);

        event.signal();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*order.lock(), vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_waiter_does_not_consume_a_release() {
        let event = Arc::new(SignalEvent::new());

        // Enqueue a waiter, then drop it before any signal arrives.
        {
            let wait = event.wait();
            tokio::pin!(wait);
            assert!(
                timeout(Duration::ZERO, wait.as_mut()).await.is_err(),
                "wait must block with no pending release"
            );
        }

        // The release must skip the dead waiter and stay pending for the
        // next live one.
        event.signal();
        assert!(completes_now(event.wait()).await);
    }
}

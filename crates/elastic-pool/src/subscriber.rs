//! Channel-backed subscriber pools.
//!
//! A [`SubscriberPool`] is the externally-scaled cousin of a
//! [`PoolDescriptor`]: a fixed-plus-adjustable count of subscriber
//! workers draining one shared queue. Subscribers never self-scale and
//! never auto-restart; the embedding application drives the count through
//! [`increase`] and [`decrease`], and suspends or revives the whole
//! subscription through [`pause`] and [`resume`].
//!
//! Scale-down uses a [`SignalEvent`]: each `decrease` signals the event
//! once per retired subscriber, and each signal cancels exactly one
//! subscriber's private handle, whether or not that subscriber is
//! currently blocked in its queue read.
//!
//! [`PoolDescriptor`]: crate::PoolDescriptor
//! [`increase`]: SubscriberPool::increase
//! [`decrease`]: SubscriberPool::decrease
//! [`pause`]: SubscriberPool::pause
//! [`resume`]: SubscriberPool::resume

use crate::{
    error::{BoxError, Error, Result, StepError},
    observer::{NoopObserver, PoolObserver},
    pool::{PoolId, StepOutcome, WorkerId, bounded_step},
    signal::SignalEvent,
};
use core::time::Duration;
use parking_lot::Mutex;
use portable_atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One unit of subscription execution, supplied by the embedding
/// application. Processes a single payload drained from the shared queue.
#[async_trait::async_trait]
pub trait Subscriber<T: Send + 'static>: Send {
    /// Processes one payload, cooperating with the given cancellation
    /// handle.
    async fn process(&mut self, payload: T, cancel: CancellationToken) -> Result<(), StepError>;
}

/// Builds one new subscriber bound to its pool.
pub type SubscriberFactory<T> =
    Box<dyn Fn() -> core::result::Result<Box<dyn Subscriber<T>>, BoxError> + Send + Sync>;

/// Static configuration for one subscriber pool.
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Identity used in logs and observer notifications.
    pub pool_id: PoolId,
    /// Display name used in logs.
    pub name: String,
    /// Number of subscribers launched at construction (and relaunched on
    /// resume).
    pub initial_count: usize,
    /// Per-payload cap layered on the subscription's cancellation.
    pub execution_timeout: Option<Duration>,
    /// Queue bound; `None` is unbounded. A bounded queue blocks
    /// publishers when full rather than dropping payloads.
    pub queue_capacity: Option<usize>,
}

impl SubscriberConfig {
    pub fn new(pool_id: PoolId, name: impl Into<String>, initial_count: usize) -> Self {
        Self {
            pool_id,
            name: name.into(),
            initial_count,
            execution_timeout: None,
            queue_capacity: None,
        }
    }

    /// Sets the per-payload execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    /// Bounds the queue; publishers block when it is full.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }
}

enum QueueSender<T> {
    Bounded(mpsc::Sender<T>),
    Unbounded(mpsc::UnboundedSender<T>),
}

impl<T> QueueSender<T> {
    async fn send(&self, payload: T) -> core::result::Result<(), ()> {
        match self {
            Self::Bounded(tx) => tx.send(payload).await.map_err(|_| ()),
            Self::Unbounded(tx) => tx.send(payload).map_err(|_| ()),
        }
    }
}

enum QueueReceiver<T> {
    Bounded(mpsc::Receiver<T>),
    Unbounded(mpsc::UnboundedReceiver<T>),
}

impl<T> QueueReceiver<T> {
    async fn recv(&mut self) -> Option<T> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// Mutable subscription state, serialized under one guard so concurrent
/// scale and pause/resume requests cannot interleave.
struct SubscriberState {
    target: usize,
    token: CancellationToken,
    cancel_one: Arc<SignalEvent>,
}

struct SubscriberInner<T> {
    pool_id: PoolId,
    name: String,
    execution_timeout: Option<Duration>,
    running: AtomicI64,
    factory: SubscriberFactory<T>,
    observer: Arc<dyn PoolObserver>,
    queue_tx: QueueSender<T>,
    // The single receiver is shared among subscribers; whichever one
    // holds the lock drains the next payload.
    queue_rx: tokio::sync::Mutex<QueueReceiver<T>>,
    state: Mutex<SubscriberState>,
}

/// A pool of subscriber workers draining one shared queue.
///
/// Cheap to clone; clones share one subscription. Must be constructed
/// inside a Tokio runtime, since the initial subscribers are spawned
/// immediately.
pub struct SubscriberPool<T> {
    inner: Arc<SubscriberInner<T>>,
}

impl<T> Clone for SubscriberPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> SubscriberPool<T> {
    /// Creates a pool with the default (no-op) observer and launches the
    /// initial subscribers.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroCapacity`] when a bounded queue of zero capacity is
    /// requested.
    pub fn new(
        config: SubscriberConfig,
        factory: impl Fn() -> core::result::Result<Box<dyn Subscriber<T>>, BoxError>
        + Send
        + Sync
        + 'static,
    ) -> Result<Self> {
        Self::with_observer(config, factory, Arc::new(NoopObserver))
    }

    /// Creates a pool that reports lifecycle checkpoints to the given
    /// observer and launches the initial subscribers.
    pub fn with_observer(
        config: SubscriberConfig,
        factory: impl Fn() -> core::result::Result<Box<dyn Subscriber<T>>, BoxError>
        + Send
        + Sync
        + 'static,
        observer: Arc<dyn PoolObserver>,
    ) -> Result<Self> {
        let (queue_tx, queue_rx) = match config.queue_capacity {
            Some(0) => return Err(Error::ZeroCapacity),
            Some(capacity) => {
                let (tx, rx) = mpsc::channel(capacity);
                (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
            }
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
            }
        };

        let pool = Self {
            inner: Arc::new(SubscriberInner {
                pool_id: config.pool_id,
                name: config.name,
                execution_timeout: config.execution_timeout,
                running: AtomicI64::new(0),
                factory: Box::new(factory),
                observer,
                queue_tx,
                queue_rx: tokio::sync::Mutex::new(queue_rx),
                state: Mutex::new(SubscriberState {
                    target: config.initial_count,
                    token: CancellationToken::new(),
                    cancel_one: Arc::new(SignalEvent::new()),
                }),
            }),
        };

        let (token, cancel_one) = {
            let state = pool.inner.state.lock();
            (state.token.clone(), Arc::clone(&state.cancel_one))
        };
        pool.launch(config.initial_count, token, cancel_one);
        Ok(pool)
    }

    pub fn pool_id(&self) -> PoolId {
        self.inner.pool_id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Externally-declared desired subscriber count.
    pub fn target(&self) -> usize {
        self.inner.state.lock().target
    }

    /// Number of subscribers currently running.
    pub fn running_count(&self) -> i64 {
        self.inner.running.load(Ordering::Relaxed)
    }

    /// Whether the subscription has been paused (or stopped).
    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().token.is_cancelled()
    }

    /// Adds `count` to the target and launches that many subscribers.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCount`] for a zero count, [`Error::Paused`] while
    /// the subscription is paused.
    pub fn increase(&self, count: usize) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.token.is_cancelled() {
            return Err(Error::Paused);
        }
        if count == 0 {
            return Err(Error::InvalidCount {
                requested: count,
                target: state.target,
            });
        }
        state.target += count;
        let (token, cancel_one) = (state.token.clone(), Arc::clone(&state.cancel_one));
        drop(state);

        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %self.inner.pool_id, count, "scaling subscribers up");
        self.launch(count, token, cancel_one);
        Ok(())
    }

    /// Retires `count` subscribers, one per signal of the cancel-one
    /// event. Subscribers not currently blocked in a queue read observe
    /// the cancellation at their next checkpoint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCount`] when `count` is zero or exceeds the
    /// current target, [`Error::Paused`] while the subscription is
    /// paused.
    pub fn decrease(&self, count: usize) -> Result<()> {
        let state = self.inner.state.lock();
        if state.token.is_cancelled() {
            return Err(Error::Paused);
        }
        if count == 0 || count > state.target {
            return Err(Error::InvalidCount {
                requested: count,
                target: state.target,
            });
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %self.inner.pool_id, count, "scaling subscribers down");
        for _ in 0..count {
            state.cancel_one.signal();
        }
        Ok(())
    }

    /// Cancels the subscription-wide handle: running subscribers drain
    /// out, and `publish` is rejected until [`resume`].
    ///
    /// # Errors
    ///
    /// [`Error::Paused`] when the subscription is already paused.
    ///
    /// [`resume`]: SubscriberPool::resume
    pub fn pause(&self) -> Result<()> {
        let state = self.inner.state.lock();
        if state.token.is_cancelled() {
            return Err(Error::Paused);
        }
        #[cfg(feature = "tracing")]
        tracing::info!(pool = %self.inner.pool_id, name = %self.inner.name, "subscription paused");
        state.token.cancel();
        Ok(())
    }

    /// Installs a fresh cancellation handle and cancel-one event, then
    /// relaunches `target` subscribers. Payloads queued while paused are
    /// drained by the relaunched subscribers.
    ///
    /// # Errors
    ///
    /// [`Error::NotPaused`] when the subscription is running.
    pub fn resume(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if !state.token.is_cancelled() {
            return Err(Error::NotPaused);
        }
        state.token = CancellationToken::new();
        state.cancel_one = Arc::new(SignalEvent::new());
        let (target, token, cancel_one) = (
            state.target,
            state.token.clone(),
            Arc::clone(&state.cancel_one),
        );
        drop(state);

        #[cfg(feature = "tracing")]
        tracing::info!(pool = %self.inner.pool_id, name = %self.inner.name, target, "subscription resumed");
        self.launch(target, token, cancel_one);
        Ok(())
    }

    /// Writes one payload to the queue, suspending when a bounded queue
    /// is full.
    ///
    /// # Errors
    ///
    /// [`Error::Paused`] when the subscription's cancellation has fired,
    /// [`Error::Cancelled`] when `caller` fires while waiting for queue
    /// space.
    pub async fn publish(&self, payload: T, caller: &CancellationToken) -> Result<()> {
        if self.is_paused() {
            return Err(Error::Paused);
        }
        tokio::select! {
            biased;
            () = caller.cancelled() => Err(Error::Cancelled),
            sent = self.inner.queue_tx.send(payload) => sent.map_err(|()| Error::QueueClosed),
        }
    }

    fn launch(&self, count: usize, token: CancellationToken, cancel_one: Arc<SignalEvent>) {
        for _ in 0..count {
            tokio::spawn(run_subscriber(
                Arc::clone(&self.inner),
                token.clone(),
                Arc::clone(&cancel_one),
            ));
        }
    }
}

/// Decrements the running counter exactly once when a subscriber's scope
/// unwinds.
struct SubscriberSlot<T> {
    inner: Arc<SubscriberInner<T>>,
}

impl<T> Drop for SubscriberSlot<T> {
    fn drop(&mut self) {
        self.inner.running.fetch_sub(1, Ordering::Relaxed);
    }
}

async fn run_subscriber<T: Send + 'static>(
    inner: Arc<SubscriberInner<T>>,
    subscription: CancellationToken,
    cancel_one: Arc<SignalEvent>,
) {
    // Counted from the moment the launch is committed, factory failures
    // included, so scale requests are never double-applied.
    inner.running.fetch_add(1, Ordering::Relaxed);
    let slot = SubscriberSlot {
        inner: Arc::clone(&inner),
    };

    let mut subscriber = match (inner.factory)() {
        Ok(subscriber) => subscriber,
        Err(error) => {
            #[cfg(feature = "tracing")]
            tracing::error!(pool = %inner.pool_id, name = %inner.name, error = %error, "activation factory failed");
            inner.observer.activation_failed(inner.pool_id, &error);
            return;
        }
    };

    let worker_id = WorkerId::next();
    // The private handle this subscriber retires on: the subscription
    // token covers pause/stop, the cancel-one event covers scale-down.
    // The waiter is registered for the subscriber's whole lifetime, so a
    // decrease lands even when no subscriber is blocked in a queue read.
    let instance = subscription.child_token();
    {
        let instance = instance.clone();
        let cancel_one = Arc::clone(&cancel_one);
        tokio::spawn(async move {
            tokio::select! {
                () = cancel_one.wait() => instance.cancel(),
                () = instance.cancelled() => {}
            }
        });
    }

    inner.observer.worker_started(inner.pool_id, worker_id);
    #[cfg(feature = "tracing")]
    tracing::trace!(pool = %inner.pool_id, worker = %worker_id, "subscriber started");

    loop {
        let payload = tokio::select! {
            biased;
            () = instance.cancelled() => break,
            payload = async {
                let mut queue = inner.queue_rx.lock().await;
                queue.recv().await
            } => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        inner.observer.execution_starting(inner.pool_id, worker_id);
        let outcome = bounded_step(&instance, inner.execution_timeout, |cancel| {
            subscriber.process(payload, cancel)
        })
        .await;
        match outcome {
            StepOutcome::Completed => {
                inner.observer.execution_finished(inner.pool_id, worker_id);
            }
            StepOutcome::TimedOut => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    pool = %inner.pool_id,
                    worker = %worker_id,
                    timeout = ?inner.execution_timeout,
                    "payload cancelled after exceeding its execution timeout"
                );
                inner.observer.execution_timed_out(inner.pool_id, worker_id);
            }
            StepOutcome::Cancelled => {
                inner.observer.execution_cancelled(inner.pool_id, worker_id);
                break;
            }
            StepOutcome::Failed(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(pool = %inner.pool_id, worker = %worker_id, error = %error, "payload failed");
                inner.observer.execution_failed(inner.pool_id, worker_id, &error);
            }
        }

        if instance.is_cancelled() {
            break;
        }
    }

    // Stops the cancel-one waiter task without consuming a pending
    // signal.
    instance.cancel();
    drop(slot);

    inner.observer.worker_stopped(inner.pool_id, worker_id);
    #[cfg(feature = "tracing")]
    tracing::trace!(pool = %inner.pool_id, worker = %worker_id, "subscriber exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::AtomicUsize;

    async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for: {what}");
    }

    struct Collector {
        seen: Arc<Mutex<Vec<u32>>>,
    }

    #[async_trait::async_trait]
    impl Subscriber<u32> for Collector {
        async fn process(
            &mut self,
            payload: u32,
            _cancel: CancellationToken,
        ) -> Result<(), StepError> {
            self.seen.lock().push(payload);
            Ok(())
        }
    }

    fn collector_pool(
        pool_id: i32,
        count: usize,
        seen: &Arc<Mutex<Vec<u32>>>,
    ) -> SubscriberPool<u32> {
        let seen = Arc::clone(seen);
        SubscriberPool::new(
            SubscriberConfig::new(PoolId(pool_id), "collector", count),
            move || {
                Ok(Box::new(Collector {
                    seen: Arc::clone(&seen),
                }) as Box<dyn Subscriber<u32>>)
            },
        )
        .expect("valid configuration")
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_drain_published_payloads() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = collector_pool(10, 2, &seen);
        let caller = CancellationToken::new();

        for payload in 0..4u32 {
            pool.publish(payload, &caller).await.unwrap();
        }
        wait_until("payload drain", || seen.lock().len() == 4).await;

        let mut drained = seen.lock().clone();
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert_eq!(pool.running_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn decrease_retires_exactly_the_requested_count() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = collector_pool(11, 3, &seen);

        wait_until("subscriber spawn", || pool.running_count() == 3).await;
        pool.decrease(2).unwrap();
        wait_until("scale down", || pool.running_count() == 1).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.running_count(), 1, "exactly one subscriber survives");
    }

    #[tokio::test(start_paused = true)]
    async fn decrease_lands_even_before_subscribers_block() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = collector_pool(12, 3, &seen);

        // No subscriber is necessarily waiting yet; the releases stay
        // pending and are consumed as each subscriber registers.
        pool.decrease(2).unwrap();
        wait_until("scale down", || pool.running_count() == 1).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.running_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scale_requests_are_validated() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = collector_pool(13, 2, &seen);

        assert!(matches!(
            pool.decrease(0),
            Err(Error::InvalidCount {
                requested: 0,
                target: 2
            })
        ));
        assert!(matches!(
            pool.decrease(3),
            Err(Error::InvalidCount {
                requested: 3,
                target: 2
            })
        ));
        assert!(matches!(pool.increase(0), Err(Error::InvalidCount { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn increase_adds_to_target_and_launches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = collector_pool(14, 1, &seen);

        wait_until("initial spawn", || pool.running_count() == 1).await;
        pool.increase(2).unwrap();
        assert_eq!(pool.target(), 3);
        wait_until("scale up", || pool.running_count() == 3).await;
    }

    #[tokio::test(start_paused = true)]
    async fn pause_rejects_publish_and_resume_recovers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = collector_pool(15, 1, &seen);
        let caller = CancellationToken::new();

        wait_until("initial spawn", || pool.running_count() == 1).await;

        pool.pause().unwrap();
        wait_until("subscribers drain out", || pool.running_count() == 0).await;
        assert!(matches!(pool.publish(7, &caller).await, Err(Error::Paused)));
        assert!(matches!(pool.pause(), Err(Error::Paused)));
        assert!(matches!(pool.increase(1), Err(Error::Paused)));
        assert!(matches!(pool.decrease(1), Err(Error::Paused)));

        pool.resume().unwrap();
        assert!(matches!(pool.resume(), Err(Error::NotPaused)));
        wait_until("relaunch", || pool.running_count() == 1).await;

        pool.publish(7, &caller).await.unwrap();
        wait_until("payload observed", || seen.lock().contains(&7)).await;
    }

    struct SlowSubscriber;

    #[async_trait::async_trait]
    impl Subscriber<u32> for SlowSubscriber {
        async fn process(
            &mut self,
            _payload: u32,
            cancel: CancellationToken,
        ) -> Result<(), StepError> {
            cancel.cancelled().await;
            Err(StepError::Cancelled)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn payload_timeouts_are_non_fatal() {
        let timeouts = Arc::new(AtomicUsize::new(0));

        struct TimeoutObserver {
            timeouts: Arc<AtomicUsize>,
        }
        impl crate::observer::PoolObserver for TimeoutObserver {
            fn execution_timed_out(&self, _pool: PoolId, _worker: WorkerId) {
                self.timeouts.fetch_add(1, Ordering::SeqCst);
            }
        }

        let pool = SubscriberPool::with_observer(
            SubscriberConfig::new(PoolId(16), "slow", 1)
                .with_timeout(Duration::from_millis(20)),
            || Ok(Box::new(SlowSubscriber) as Box<dyn Subscriber<u32>>),
            Arc::new(TimeoutObserver {
                timeouts: Arc::clone(&timeouts),
            }),
        )
        .unwrap();
        let caller = CancellationToken::new();

        pool.publish(1, &caller).await.unwrap();
        pool.publish(2, &caller).await.unwrap();
        wait_until("both payloads time out", || {
            timeouts.load(Ordering::SeqCst) >= 2
        })
        .await;
        assert_eq!(pool.running_count(), 1, "subscriber survives timeouts");
    }

    struct Picky {
        seen: Arc<Mutex<Vec<u32>>>,
    }

    #[async_trait::async_trait]
    impl Subscriber<u32> for Picky {
        async fn process(
            &mut self,
            payload: u32,
            _cancel: CancellationToken,
        ) -> Result<(), StepError> {
            if payload == 13 {
                return Err(StepError::failed(std::io::Error::other("unlucky")));
            }
            self.seen.lock().push(payload);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_payloads_do_not_kill_the_subscriber() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = {
            let seen = Arc::clone(&seen);
            SubscriberPool::new(SubscriberConfig::new(PoolId(17), "picky", 1), move || {
                Ok(Box::new(Picky {
                    seen: Arc::clone(&seen),
                }) as Box<dyn Subscriber<u32>>)
            })
            .unwrap()
        };
        let caller = CancellationToken::new();

        pool.publish(13, &caller).await.unwrap();
        pool.publish(7, &caller).await.unwrap();
        wait_until("surviving payload", || seen.lock().contains(&7)).await;
        assert_eq!(pool.running_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_queue_blocks_publishers_when_full() {
        let pool = SubscriberPool::<u32>::new(
            SubscriberConfig::new(PoolId(18), "bounded", 0).with_capacity(1),
            || Ok(Box::new(SlowSubscriber) as Box<dyn Subscriber<u32>>),
        )
        .unwrap();
        let caller = CancellationToken::new();

        pool.publish(1, &caller).await.unwrap();
        // No subscriber drains the queue, so the second publish suspends.
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            pool.publish(2, &caller),
        )
        .await;
        assert!(blocked.is_err(), "publish must block on a full queue");
    }

    #[tokio::test(start_paused = true)]
    async fn publish_honors_the_caller_token() {
        let pool = SubscriberPool::<u32>::new(
            SubscriberConfig::new(PoolId(19), "bounded", 0).with_capacity(1),
            || Ok(Box::new(SlowSubscriber) as Box<dyn Subscriber<u32>>),
        )
        .unwrap();

        let caller = CancellationToken::new();
        pool.publish(1, &caller).await.unwrap();

        {
            let caller = caller.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                caller.cancel();
            });
        }
        assert!(matches!(
            pool.publish(2, &caller).await,
            Err(Error::Cancelled)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_capacity_queue_is_rejected() {
        let result = SubscriberPool::<u32>::new(
            SubscriberConfig::new(PoolId(20), "invalid", 1).with_capacity(0),
            || Ok(Box::new(SlowSubscriber) as Box<dyn Subscriber<u32>>),
        );
        assert!(matches!(result, Err(Error::ZeroCapacity)));
    }
}

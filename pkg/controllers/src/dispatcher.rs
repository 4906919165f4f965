//! Keyed work dispatcher: serializes reconciliation per endpoints key
//! while letting distinct keys proceed in parallel.

use async_trait::async_trait;
use pkg_state::reader::{SnapshotReader, parse_endpoints_key};
use pkg_state::watch::WatchEvent;
use pkg_types::key::ServiceKey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ReconcileError;

/// One reconciliation pass over a single key. Implementations must be
/// idempotent: the dispatcher delivers at-least-once.
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(
        &self,
        key: &ServiceKey,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError>;
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ServiceKey>,
    queued: HashSet<ServiceKey>,
    inflight: HashSet<ServiceKey>,
    attempts: HashMap<ServiceKey, u32>,
}

/// Deduplicating queue with at-most-one in-flight pass per key.
/// A key enqueued while in flight waits until the current pass
/// finishes, then runs again with fresh state.
struct Queue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Queue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    fn enqueue(&self, key: ServiceKey) {
        {
            let mut state = self.state.lock().unwrap();
            if state.queued.contains(&key) {
                return;
            }
            state.queued.insert(key.clone());
            state.pending.push_back(key);
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Next key no other worker is processing, marked in flight.
    fn pop(&self) -> Option<ServiceKey> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .pending
            .iter()
            .position(|k| !state.inflight.contains(k))?;
        let key = state.pending.remove(idx)?;
        state.queued.remove(&key);
        state.inflight.insert(key.clone());
        Some(key)
    }

    /// Finish a pass. Returns the attempt count to use for backoff when
    /// `success` is false; resets it when true.
    fn done(&self, key: &ServiceKey, success: bool) -> u32 {
        let mut state = self.state.lock().unwrap();
        state.inflight.remove(key);
        let attempts = if success {
            state.attempts.remove(key);
            0
        } else {
            let entry = state.attempts.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        // A key enqueued while in flight is now eligible again.
        if state.queued.contains(key) {
            drop(state);
            self.notify.notify_one();
        }
        attempts
    }
}

/// Drives a pool of reconciliation workers from three inputs: watch
/// events, periodic resync, and failure requeues with backoff.
pub struct Dispatcher {
    reconciler: Arc<dyn Reconciler>,
    snapshots: Arc<dyn SnapshotReader>,
    queue: Arc<Queue>,
    workers: usize,
    resync_interval: Duration,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl Dispatcher {
    pub fn new(
        reconciler: Arc<dyn Reconciler>,
        snapshots: Arc<dyn SnapshotReader>,
        workers: usize,
        resync_interval: Duration,
    ) -> Self {
        Self {
            reconciler,
            snapshots,
            queue: Arc::new(Queue::new()),
            workers: workers.max(1),
            resync_interval,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }

    /// Override retry timing; used to keep tests fast.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max;
        self
    }

    /// Queue a key for reconciliation.
    pub fn enqueue(&self, key: ServiceKey) {
        self.queue.enqueue(key);
    }

    fn backoff_for(&self, attempts: u32) -> Duration {
        let exp = attempts.saturating_sub(1).min(16);
        let delay = self.base_backoff.saturating_mul(1u32 << exp);
        delay.min(self.max_backoff)
    }

    /// Run until `cancel` fires. Consumes watch events from `events`,
    /// resyncs every `resync_interval`, and fans work out to the pool.
    pub async fn run(
        self: Arc<Self>,
        events: broadcast::Receiver<WatchEvent>,
        cancel: CancellationToken,
    ) {
        let mut handles = Vec::new();

        for worker_id in 0..self.workers {
            let dispatcher = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.worker_loop(worker_id, cancel).await;
            }));
        }

        {
            let dispatcher = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.resync_loop(cancel).await;
            }));
        }
        {
            let dispatcher = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.watch_loop(events, cancel).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        info!("Dispatcher stopped");
    }

    async fn worker_loop(&self, worker_id: usize, cancel: CancellationToken) {
        loop {
            let Some(key) = self.queue.pop() else {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = self.queue.notify.notified() => continue,
                }
            };
            debug!("Worker {} reconciling {}", worker_id, key);

            match self.reconciler.reconcile(&key, &cancel).await {
                Ok(()) => {
                    self.queue.done(&key, true);
                }
                Err(ReconcileError::Cancelled) => {
                    self.queue.done(&key, true);
                    if cancel.is_cancelled() {
                        return;
                    }
                }
                Err(e) if e.is_fatal() => {
                    // Retrying cannot fix static input; drop the key
                    // until its object changes again.
                    error!("Reconcile {} failed permanently: {}", key, e);
                    self.queue.done(&key, true);
                }
                Err(e) => {
                    let attempts = self.queue.done(&key, false);
                    let delay = self.backoff_for(attempts);
                    warn!(
                        "Reconcile {} failed (attempt {}), retrying in {:?}: {}",
                        key, attempts, delay, e
                    );
                    let queue = self.queue.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = tokio::time::sleep(delay) => queue.enqueue(key),
                        }
                    });
                }
            }
        }
    }

    /// Periodic full resync: every known endpoints key is requeued so
    /// drift introduced outside the watch stream is repaired.
    async fn resync_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.resync_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            match self.snapshots.list_endpoint_keys().await {
                Ok(keys) => {
                    debug!("Resync: enqueueing {} endpoints keys", keys.len());
                    for key in keys {
                        self.queue.enqueue(key);
                    }
                }
                Err(e) => warn!("Resync listing failed: {}", e),
            }
        }
    }

    async fn watch_loop(
        &self,
        mut events: broadcast::Receiver<WatchEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return,
                event = events.recv() => event,
            };
            match event {
                Ok(event) => {
                    if let Some(key) = parse_endpoints_key(&event.key) {
                        self.queue.enqueue(key);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Dropped events are recovered by a full resync.
                    warn!("Watch stream lagged by {} events, resyncing", missed);
                    if let Ok(keys) = self.snapshots.list_endpoint_keys().await {
                        for key in keys {
                            self.queue.enqueue(key);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

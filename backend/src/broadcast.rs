// Fan-out of accepted telemetry states to connected observers.
// Invariants: publish never waits on an observer; a full or closed observer queue removes that observer;
// an observer only ever receives states with a higher message_count than the last one it was sent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, warn};

use soilwatch_core::model::CountedState;

use crate::store::TelemetryStore;

pub type ObserverId = u64;
pub type ObserverEvent = Arc<CountedState>;

struct ObserverSlot {
    tx: mpsc::Sender<ObserverEvent>,
    last_sent: u64,
}

type ObserverMap = HashMap<ObserverId, ObserverSlot>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
    pub skipped: usize,
}

pub struct Broadcaster {
    store: Arc<TelemetryStore>,
    observers: Arc<Mutex<ObserverMap>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Broadcaster {
    pub fn new(store: Arc<TelemetryStore>, queue_capacity: usize) -> Self {
        Self {
            store,
            observers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        // snapshot under the registry lock so no publish slips in before registration
        let mut observers = lock(&self.observers);
        let snapshot = self.store.snapshot();
        let last_sent = snapshot.message_count;
        // fresh queue with capacity >= 1
        let _ = tx.try_send(Arc::new(snapshot));
        observers.insert(id, ObserverSlot { tx, last_sent });
        debug!(observer = id, observers = observers.len(), "observer subscribed");
        drop(observers);

        Subscription {
            id,
            receiver: rx,
            observers: self.observers.clone(),
        }
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = lock(&self.observers).remove(&id).is_some();
        if removed {
            debug!(observer = id, "observer unsubscribed");
        }
        removed
    }

    pub fn publish(&self, state: &CountedState) -> PublishReport {
        let event: ObserverEvent = Arc::new(state.clone());
        let mut report = PublishReport::default();

        lock(&self.observers).retain(|id, slot| {
            if state.message_count <= slot.last_sent {
                report.skipped += 1;
                return true;
            }
            match slot.tx.try_send(event.clone()) {
                Ok(()) => {
                    slot.last_sent = state.message_count;
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(observer = id, "observer queue full; dropping observer");
                    report.dropped += 1;
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(observer = id, "observer queue closed; dropping observer");
                    report.dropped += 1;
                    false
                }
            }
        });
        report
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }
}

/// Receiving end of one observer; dropping it unsubscribes.
pub struct Subscription {
    id: ObserverId,
    receiver: mpsc::Receiver<ObserverEvent>,
    observers: Arc<Mutex<ObserverMap>>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// `None` once the broadcaster has dropped this observer and the queue is drained.
    pub async fn recv(&mut self) -> Option<ObserverEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<ObserverEvent, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        lock(&self.observers).remove(&self.id);
    }
}

fn lock(observers: &Mutex<ObserverMap>) -> MutexGuard<'_, ObserverMap> {
    observers.lock().unwrap_or_else(PoisonError::into_inner)
}

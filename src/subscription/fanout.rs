use crate::device::DeviceUpdate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Per-subscriber buffer. A subscriber that stops reading blocks the
/// fan-out task once this buffer fills, which in turn backpressures
/// ingestion; nothing is dropped.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 32;

struct Registry {
    senders: Mutex<HashMap<u64, mpsc::Sender<DeviceUpdate>>>,
    next_id: AtomicU64,
    subscriber_capacity: usize,
}

/// Distributes one ordered update stream to any number of subscribers.
///
/// Every subscriber observes every event in source order. Subscribers may
/// join and leave at any time; when the source stream closes, all
/// subscriptions observe end-of-stream.
pub struct Subscriptions {
    registry: Arc<Registry>,
}

impl Subscriptions {
    /// Takes ownership of the source stream and spawns the fan-out task.
    pub fn new(source: mpsc::Receiver<DeviceUpdate>) -> Self {
        Self::with_subscriber_capacity(source, DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn with_subscriber_capacity(
        source: mpsc::Receiver<DeviceUpdate>,
        subscriber_capacity: usize,
    ) -> Self {
        let registry = Arc::new(Registry {
            senders: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            subscriber_capacity,
        });
        tokio::spawn(run_fanout(Arc::clone(&registry), source));
        Self { registry }
    }

    /// Registers a new subscriber and returns its receiving handle.
    /// Dropping the handle unsubscribes.
    pub fn subscribe(&self) -> SubscriptionHandle {
        let (tx, rx) = mpsc::channel(self.registry.subscriber_capacity);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.senders.lock().unwrap().insert(id, tx);
        debug!(subscriber = id, "Subscriber registered");
        SubscriptionHandle {
            id,
            updates: rx,
            registry: Arc::clone(&self.registry),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.senders.lock().unwrap().len()
    }
}

/// Receiving end of one subscription.
pub struct SubscriptionHandle {
    id: u64,
    updates: mpsc::Receiver<DeviceUpdate>,
    registry: Arc<Registry>,
}

impl SubscriptionHandle {
    /// Next update, or `None` once the source stream has closed.
    pub async fn recv(&mut self) -> Option<DeviceUpdate> {
        self.updates.recv().await
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.registry.senders.lock().unwrap().remove(&self.id);
        debug!(subscriber = self.id, "Subscriber removed");
    }
}

async fn run_fanout(registry: Arc<Registry>, mut source: mpsc::Receiver<DeviceUpdate>) {
    while let Some(update) = source.recv().await {
        // Snapshot the current subscribers so slow sends happen outside
        // the registry lock.
        let targets: Vec<(u64, mpsc::Sender<DeviceUpdate>)> = {
            let senders = registry.senders.lock().unwrap();
            senders.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        for (id, tx) in targets {
            if tx.send(update.clone()).await.is_err() {
                // Handle dropped mid-send; make sure the registry agrees.
                registry.senders.lock().unwrap().remove(&id);
            }
        }
    }

    info!("Update stream closed, ending all subscriptions");
    registry.senders.lock().unwrap().clear();
}

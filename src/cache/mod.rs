use crate::device::{CapabilityArgument, CapabilityKey, DeviceId, DeviceSpec, DeviceUpdate};
use crate::filter::{AttributeFilter, FilterError};
use crate::store::{DeviceNotFound, DeviceStore};
use crate::upstream::{UpstreamError, UpstreamSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[cfg(test)]
mod tests;

/// Capacity of the channel between the ingest loop and the fan-out. A full
/// channel blocks ingestion rather than dropping events.
pub const DEFAULT_FORWARD_CAPACITY: usize = 10;

/// Facade over the mirrored device state: snapshot loading, ordered update
/// ingestion, queries, and capability passthrough.
pub struct DeviceCache {
    upstream: Arc<dyn UpstreamSource>,
    store: Arc<DeviceStore>,
    forward_capacity: usize,
    initialized: AtomicBool,
}

impl DeviceCache {
    pub fn new(upstream: Arc<dyn UpstreamSource>) -> Self {
        Self::with_forward_capacity(upstream, DEFAULT_FORWARD_CAPACITY)
    }

    pub fn with_forward_capacity(upstream: Arc<dyn UpstreamSource>, forward_capacity: usize) -> Self {
        Self {
            upstream,
            store: Arc::new(DeviceStore::new()),
            forward_capacity,
            initialized: AtomicBool::new(false),
        }
    }

    /// Loads the upstream snapshot into the store and starts the ingest
    /// loop. Returns the initial device list and the downstream update
    /// stream for broadcast.
    ///
    /// # Panics
    ///
    /// Panics when called a second time on the same cache: a second ingest
    /// loop would break the single-writer discipline on the store, so this
    /// is a lifecycle violation rather than a recoverable error.
    pub async fn initialize(
        &self,
    ) -> Result<(Vec<DeviceSpec>, mpsc::Receiver<DeviceUpdate>), UpstreamError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            panic!("device cache initialized twice");
        }

        let (snapshot, upstream_rx) = self.upstream.initialize().await?;
        for spec in &snapshot {
            self.store.insert(spec.clone());
        }
        info!(devices = snapshot.len(), "Loaded device snapshot");

        let (forward_tx, forward_rx) = mpsc::channel(self.forward_capacity);
        tokio::spawn(run_ingest_loop(
            Arc::clone(&self.store),
            upstream_rx,
            forward_tx,
        ));

        Ok((snapshot, forward_rx))
    }

    /// Point lookup against the mirrored state.
    pub fn device(&self, id: &DeviceId) -> Result<DeviceSpec, DeviceNotFound> {
        self.store.get(id).ok_or_else(|| DeviceNotFound(id.clone()))
    }

    /// Filtered listing against the mirrored state.
    pub fn devices(&self, filters: &[AttributeFilter]) -> Result<Vec<DeviceSpec>, FilterError> {
        self.store.list(filters)
    }

    /// Passes a capability invocation through to the upstream hub. The
    /// cache holds no capability state and does not reinterpret the result.
    pub async fn trigger_capability(
        &self,
        device: &DeviceId,
        capability: &CapabilityKey,
        argument: CapabilityArgument,
    ) -> Result<(), UpstreamError> {
        self.upstream
            .trigger_capability(device, capability, &argument)
            .await
    }
}

/// Applies every upstream event to the store, in arrival order, then
/// forwards the identical event for broadcast.
///
/// Runs until the upstream stream closes; dropping the forward sender then
/// closes the downstream stream as well.
async fn run_ingest_loop(
    store: Arc<DeviceStore>,
    mut upstream_rx: mpsc::Receiver<DeviceUpdate>,
    forward_tx: mpsc::Sender<DeviceUpdate>,
) {
    while let Some(update) = upstream_rx.recv().await {
        info!(device = %update.id, "Received device update");

        if let Err(DeviceNotFound(id)) = store.apply_diff(&update) {
            // Never seen in the snapshot. The mirror stays as-is; the
            // event is still forwarded below.
            warn!(device = %id, "Update for unknown device");
        }

        // Blocks when the fan-out falls behind by more than the channel
        // capacity. No event is ever dropped.
        if forward_tx.send(update).await.is_err() {
            warn!("Downstream update channel closed, stopping ingest");
            return;
        }
    }

    info!("Upstream update stream closed, stopping ingest");
}

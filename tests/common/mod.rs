#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use devmirror::api::{create_api_router, ApiState};
use devmirror::auth::SessionRegistry;
use devmirror::cache::DeviceCache;
use devmirror::device::{
    AttributeSpec, AttributeState, CapabilityArgument, CapabilityKey, DeviceId, DeviceSpec,
    DeviceUpdate,
};
use devmirror::subscription::Subscriptions;
use devmirror::upstream::{UpstreamError, UpstreamSource};
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Upstream stub: a fixed snapshot plus an update channel the test feeds by
/// hand. Capability triggers succeed for snapshot devices and answer
/// NotFound for everything else, like the real hub.
pub struct StubUpstream {
    snapshot: Vec<DeviceSpec>,
    updates: Mutex<Option<mpsc::Receiver<DeviceUpdate>>>,
    pub triggered: Mutex<Vec<(DeviceId, CapabilityKey, CapabilityArgument)>>,
}

impl StubUpstream {
    pub fn new(snapshot: Vec<DeviceSpec>) -> (Arc<Self>, mpsc::Sender<DeviceUpdate>) {
        let (tx, rx) = mpsc::channel(64);
        let stub = Arc::new(Self {
            snapshot,
            updates: Mutex::new(Some(rx)),
            triggered: Mutex::new(Vec::new()),
        });
        (stub, tx)
    }
}

#[async_trait]
impl UpstreamSource for StubUpstream {
    async fn initialize(
        &self,
    ) -> Result<(Vec<DeviceSpec>, mpsc::Receiver<DeviceUpdate>), UpstreamError> {
        let rx = self
            .updates
            .lock()
            .unwrap()
            .take()
            .expect("stub initialized twice");
        Ok((self.snapshot.clone(), rx))
    }

    async fn trigger_capability(
        &self,
        device: &DeviceId,
        capability: &CapabilityKey,
        argument: &CapabilityArgument,
    ) -> Result<(), UpstreamError> {
        if !self.snapshot.iter().any(|spec| &spec.id == device) {
            return Err(UpstreamError::DeviceNotFound(device.clone()));
        }
        self.triggered
            .lock()
            .unwrap()
            .push((device.clone(), capability.clone(), argument.clone()));
        Ok(())
    }
}

pub fn device(id: &str, attributes: Vec<(&str, AttributeState)>) -> DeviceSpec {
    DeviceSpec {
        id: DeviceId::from(id),
        attributes: attributes
            .into_iter()
            .map(|(key, state)| (key.into(), AttributeSpec::new(state)))
            .collect(),
    }
}

pub fn update(id: &str, attributes: Vec<(&str, AttributeState)>) -> DeviceUpdate {
    DeviceUpdate {
        id: DeviceId::from(id),
        attributes: attributes
            .into_iter()
            .map(|(key, state)| (key.into(), state))
            .collect(),
    }
}

pub struct TestApi {
    pub router: Router,
    pub upstream: Arc<StubUpstream>,
    pub updates_tx: mpsc::Sender<DeviceUpdate>,
    pub sessions: Arc<SessionRegistry>,
}

/// Builds a fully wired API router over a stub upstream.
pub async fn api_over(snapshot: Vec<DeviceSpec>, auth_enabled: bool) -> TestApi {
    let (upstream, updates_tx) = StubUpstream::new(snapshot);
    let cache = Arc::new(DeviceCache::new(
        Arc::clone(&upstream) as Arc<dyn UpstreamSource>
    ));
    let (_, updates) = cache.initialize().await.unwrap();
    let subscriptions = Arc::new(Subscriptions::new(updates));
    let sessions = Arc::new(SessionRegistry::new("admin", "hunter2", 5));

    let router = create_api_router(ApiState {
        cache,
        subscriptions,
        sessions: Arc::clone(&sessions),
        auth_enabled,
    });

    TestApi {
        router,
        upstream,
        updates_tx,
        sessions,
    }
}

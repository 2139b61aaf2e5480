use super::*;
use crate::device::{AttributeSpec, AttributeState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;

struct StubUpstream {
    snapshot: Vec<DeviceSpec>,
    updates: Mutex<Option<mpsc::Receiver<DeviceUpdate>>>,
    triggered: AtomicUsize,
}

impl StubUpstream {
    fn new(snapshot: Vec<DeviceSpec>) -> (Arc<Self>, mpsc::Sender<DeviceUpdate>) {
        let (tx, rx) = mpsc::channel(64);
        let stub = Arc::new(Self {
            snapshot,
            updates: Mutex::new(Some(rx)),
            triggered: AtomicUsize::new(0),
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
        _device: &DeviceId,
        _capability: &CapabilityKey,
        _argument: &CapabilityArgument,
    ) -> Result<(), UpstreamError> {
        self.triggered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn lamp(id: &str, brightness: f64) -> DeviceSpec {
    let mut attributes = HashMap::new();
    attributes.insert(
        "brightness".into(),
        AttributeSpec::new(AttributeState::numeric(brightness)),
    );
    DeviceSpec {
        id: DeviceId::from(id),
        attributes,
    }
}

fn brightness_update(id: &str, brightness: f64) -> DeviceUpdate {
    let mut attributes = HashMap::new();
    attributes.insert("brightness".into(), AttributeState::numeric(brightness));
    DeviceUpdate {
        id: DeviceId::from(id),
        attributes,
    }
}

#[tokio::test]
async fn initialize_loads_snapshot() {
    let (upstream, _tx) = StubUpstream::new(vec![lamp("lamp-1", 50.0), lamp("lamp-2", 10.0)]);
    let cache = DeviceCache::new(upstream);

    let (snapshot, _rx) = cache.initialize().await.unwrap();
    assert_eq!(snapshot.len(), 2);

    let found = cache.device(&DeviceId::from("lamp-1")).unwrap();
    assert_eq!(
        found.attributes.get("brightness").unwrap().state,
        AttributeState::numeric(50.0)
    );
    assert_eq!(
        cache.device(&DeviceId::from("ghost")),
        Err(DeviceNotFound(DeviceId::from("ghost")))
    );
}

#[tokio::test]
#[should_panic(expected = "initialized twice")]
async fn initialize_twice_panics() {
    let (upstream, _tx) = StubUpstream::new(vec![]);
    let cache = DeviceCache::new(upstream);

    cache.initialize().await.unwrap();
    let _ = cache.initialize().await;
}

#[tokio::test]
async fn updates_apply_and_forward_in_order() {
    let (upstream, tx) = StubUpstream::new(vec![lamp("lamp-1", 50.0)]);
    let cache = DeviceCache::new(upstream);
    let (_, mut rx) = cache.initialize().await.unwrap();

    for brightness in [60.0, 70.0, 80.0] {
        tx.send(brightness_update("lamp-1", brightness)).await.unwrap();
    }

    for expected in [60.0, 70.0, 80.0] {
        let update = rx.recv().await.unwrap();
        assert_eq!(
            update.attributes.get("brightness"),
            Some(&AttributeState::numeric(expected))
        );
    }

    let found = cache.device(&DeviceId::from("lamp-1")).unwrap();
    assert_eq!(
        found.attributes.get("brightness").unwrap().state,
        AttributeState::numeric(80.0)
    );
}

#[tokio::test]
async fn unknown_device_update_is_still_forwarded() {
    let (upstream, tx) = StubUpstream::new(vec![lamp("lamp-1", 50.0)]);
    let cache = DeviceCache::new(upstream);
    let (_, mut rx) = cache.initialize().await.unwrap();

    tx.send(brightness_update("ghost", 1.0)).await.unwrap();

    let forwarded = rx.recv().await.unwrap();
    assert_eq!(forwarded.id, DeviceId::from("ghost"));
    // The mirror itself is untouched.
    assert!(cache.device(&DeviceId::from("ghost")).is_err());
}

#[tokio::test]
async fn no_update_is_lost_past_the_forward_capacity() {
    let (upstream, tx) = StubUpstream::new(vec![lamp("lamp-1", 0.0)]);
    let cache = DeviceCache::with_forward_capacity(upstream, 2);
    let (_, mut rx) = cache.initialize().await.unwrap();

    // Far more events than the forward channel can hold. The ingest loop
    // blocks on the full channel instead of dropping anything.
    for n in 0..20 {
        tx.send(brightness_update("lamp-1", f64::from(n))).await.unwrap();
    }
    drop(tx);

    let mut received = Vec::new();
    while let Some(update) = rx.recv().await {
        received.push(update.attributes.get("brightness").cloned().unwrap());
    }
    let expected: Vec<AttributeState> =
        (0..20).map(|n| AttributeState::numeric(f64::from(n))).collect();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn closing_upstream_closes_the_downstream_stream() {
    let (upstream, tx) = StubUpstream::new(vec![lamp("lamp-1", 0.0)]);
    let cache = DeviceCache::new(upstream);
    let (_, mut rx) = cache.initialize().await.unwrap();

    tx.send(brightness_update("lamp-1", 1.0)).await.unwrap();
    drop(tx);

    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn devices_applies_filters() {
    let (upstream, _tx) = StubUpstream::new(vec![lamp("lamp-1", 50.0), lamp("lamp-2", 5.0)]);
    let cache = DeviceCache::new(upstream);
    cache.initialize().await.unwrap();

    let filters: Vec<AttributeFilter> =
        serde_json::from_str(r#"[{"operator": "gte", "value": 10, "key": "brightness"}]"#).unwrap();
    let listed = cache.devices(&filters).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, DeviceId::from("lamp-1"));

    let bad: Vec<AttributeFilter> =
        serde_json::from_str(r#"[{"operator": "eq", "value": "50", "key": "brightness"}]"#).unwrap();
    assert!(matches!(
        cache.devices(&bad),
        Err(FilterError::TypeMismatch { .. })
    ));
}

#[tokio::test]
async fn trigger_capability_delegates_to_upstream() {
    let (upstream, _tx) = StubUpstream::new(vec![lamp("lamp-1", 50.0)]);
    let cache = DeviceCache::new(Arc::clone(&upstream) as Arc<dyn UpstreamSource>);
    cache.initialize().await.unwrap();

    cache
        .trigger_capability(
            &DeviceId::from("lamp-1"),
            &CapabilityKey::from("toggle"),
            CapabilityArgument::default(),
        )
        .await
        .unwrap();

    assert_eq!(upstream.triggered.load(Ordering::SeqCst), 1);
}

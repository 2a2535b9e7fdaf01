//! Scenario tests for the sync engine

use super::*;
use crate::state::{
    load_all, ControlId, ControlSnapshot, ControlState, ControlStore, MemoryStore,
};
use crate::surface::{Page, ResyncScope, Surface, SurfaceId};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Refresh(ControlId, i32),
    Local(ControlId, i32),
    Publish(ControlSnapshot),
    Resync(ResyncScope, ControlSnapshot),
}

struct RecordingSurface {
    id: SurfaceId,
    calls: Mutex<Vec<Call>>,
}

impl RecordingSurface {
    fn new(id: SurfaceId) -> Arc<Self> {
        Arc::new(Self {
            id,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn refreshes(&self) -> Vec<(ControlId, i32)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Refresh(id, v) => Some((*id, *v)),
                _ => None,
            })
            .collect()
    }

    fn locals(&self) -> Vec<(ControlId, i32)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Local(id, v) => Some((*id, *v)),
                _ => None,
            })
            .collect()
    }

    fn publishes(&self) -> Vec<ControlSnapshot> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Publish(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn resyncs(&self) -> Vec<ResyncScope> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Resync(scope, _) => Some(*scope),
                _ => None,
            })
            .collect()
    }

    fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Surface for RecordingSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn refresh(&self, control: ControlId, value: i32) {
        self.calls.lock().push(Call::Refresh(control, value));
    }

    fn applied_locally(&self, control: ControlId, value: i32) {
        self.calls.lock().push(Call::Local(control, value));
    }

    fn publish(&self, snapshot: &ControlSnapshot) {
        self.calls.lock().push(Call::Publish(snapshot.clone()));
    }

    fn resync(&self, scope: ResyncScope, snapshot: &ControlSnapshot) {
        self.calls.lock().push(Call::Resync(scope, snapshot.clone()));
    }
}

struct Harness {
    engine: EngineHandle,
    store: Arc<MemoryStore>,
    screen: Arc<RecordingSurface>,
    peer: Arc<RecordingSurface>,
    console: Arc<RecordingSurface>,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::spawn(load_all(store.as_ref()), Box::new(store.clone()));

    let screen = RecordingSurface::new(SurfaceId::Touchscreen);
    let peer = RecordingSurface::new(SurfaceId::PeerLink);
    let console = RecordingSurface::new(SurfaceId::Console);
    engine.register_surface(screen.clone());
    engine.register_surface(peer.clone());
    engine.register_surface(console.clone());

    // Barrier: registrations are processed before this query
    engine.snapshot().await.unwrap();
    screen.clear();
    peer.clear();
    console.clear();

    Harness {
        engine,
        store,
        screen,
        peer,
        console,
    }
}

#[tokio::test]
async fn test_apply_then_get_returns_normalized_value() {
    let h = harness().await;

    for id in ControlId::all() {
        for raw in [0i64, 1, 7, 255, 256, -1] {
            let applied = h
                .engine
                .apply_change(SurfaceId::Console, id, raw)
                .await
                .unwrap();
            assert_eq!(applied.value, id.kind().normalize(raw));
            assert_eq!(h.engine.get(id).await.unwrap(), applied.value);
        }
    }
}

#[tokio::test]
async fn test_slider_clamping() {
    let h = harness().await;

    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Slider, 300)
        .await
        .unwrap();
    assert_eq!(h.engine.get(ControlId::Slider).await.unwrap(), 255);

    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Slider, -5)
        .await
        .unwrap();
    assert_eq!(h.engine.get(ControlId::Slider).await.unwrap(), 0);
}

#[tokio::test]
async fn test_origin_never_receives_its_own_refresh() {
    let h = harness().await;

    h.engine
        .apply_change(SurfaceId::Touchscreen, ControlId::Button(1), 1)
        .await
        .unwrap();

    assert!(h.screen.refreshes().is_empty());
    assert_eq!(h.peer.refreshes(), vec![(ControlId::Button(1), 1)]);
    assert_eq!(h.console.refreshes(), vec![(ControlId::Button(1), 1)]);

    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Slider, 128)
        .await
        .unwrap();

    assert_eq!(h.screen.refreshes(), vec![(ControlId::Slider, 128)]);
    assert_eq!(h.peer.refreshes(), vec![(ControlId::Button(1), 1)]);
}

#[tokio::test]
async fn test_origin_is_told_of_its_own_change_in_order() {
    let h = harness().await;

    h.engine
        .apply_change(SurfaceId::Touchscreen, ControlId::Slider, 300)
        .await
        .unwrap();
    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Slider, 10)
        .await
        .unwrap();

    assert_eq!(h.screen.locals(), vec![(ControlId::Slider, 255)]);
    assert_eq!(h.peer.locals(), vec![(ControlId::Slider, 10)]);
    assert!(h.console.locals().is_empty());

    // The screen hears of its own clamp before the peer's later change
    let calls = h.screen.calls.lock().clone();
    let local = calls
        .iter()
        .position(|c| *c == Call::Local(ControlId::Slider, 255))
        .unwrap();
    let refresh = calls
        .iter()
        .position(|c| *c == Call::Refresh(ControlId::Slider, 10))
        .unwrap();
    assert!(local < refresh);
}

#[tokio::test]
async fn test_same_change_twice_refreshes_both_times() {
    let h = harness().await;

    let first = h
        .engine
        .apply_change(SurfaceId::PeerLink, ControlId::PageButton(3), 1)
        .await
        .unwrap();
    let state_after_first = h.engine.snapshot().await.unwrap();

    let second = h
        .engine
        .apply_change(SurfaceId::PeerLink, ControlId::PageButton(3), 1)
        .await
        .unwrap();
    let state_after_second = h.engine.snapshot().await.unwrap();

    assert!(first.changed());
    assert!(!second.changed());
    assert_eq!(state_after_first, state_after_second);
    assert_eq!(
        h.screen.refreshes(),
        vec![(ControlId::PageButton(3), 1), (ControlId::PageButton(3), 1)]
    );
    assert!(h.peer.refreshes().is_empty());
}

#[tokio::test]
async fn test_every_mutation_publishes_full_state_once() {
    let h = harness().await;

    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Button(2), 1)
        .await
        .unwrap();
    h.engine
        .apply_change(SurfaceId::Touchscreen, ControlId::Slider, 42)
        .await
        .unwrap();

    // The origin gets the publish too: the peer protocol always wants the full state
    let published = h.peer.publishes();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].value(ControlId::Button(2)), 1);
    assert_eq!(published[0].value(ControlId::Slider), 0);
    assert_eq!(published[1].value(ControlId::Slider), 42);
    assert_eq!(published[1].value(ControlId::Button(2)), 1);
}

#[tokio::test]
async fn test_write_through_survives_restart() {
    let h = harness().await;

    h.engine
        .apply_change(SurfaceId::Touchscreen, ControlId::Button(3), 1)
        .await
        .unwrap();
    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Slider, 192)
        .await
        .unwrap();
    h.engine
        .apply_change(SurfaceId::Console, ControlId::PageButton(10), 1)
        .await
        .unwrap();

    assert_eq!(h.store.raw("p1b2"), Some(vec![1]));
    assert_eq!(h.store.raw("slider1"), Some(192i32.to_le_bytes().to_vec()));

    let before = h.engine.snapshot().await.unwrap();
    h.engine.shutdown().await;

    let restarted = load_all(h.store.as_ref());
    assert_eq!(restarted.snapshot(), before);
}

#[tokio::test]
async fn test_persist_failure_does_not_block_propagation() {
    let h = harness().await;
    h.store.set_fail_writes(true);

    let applied = h
        .engine
        .apply_change(SurfaceId::PeerLink, ControlId::Button(1), 1)
        .await
        .unwrap();

    assert_eq!(applied.value, 1);
    assert_eq!(h.engine.get(ControlId::Button(1)).await.unwrap(), 1);
    assert_eq!(h.screen.refreshes(), vec![(ControlId::Button(1), 1)]);
    assert_eq!(h.peer.publishes().len(), 1);
    assert!(h.store.raw("p1b0").is_none());
}

#[tokio::test]
async fn test_failed_persist_retried_on_next_mutation() {
    let h = harness().await;

    h.store.set_fail_writes(true);
    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Button(1), 1)
        .await
        .unwrap();
    assert!(h.store.raw("p1b0").is_none());

    h.store.set_fail_writes(false);
    h.engine
        .apply_change(SurfaceId::PeerLink, ControlId::Slider, 10)
        .await
        .unwrap();

    assert_eq!(h.store.raw("p1b0"), Some(vec![1]));
    assert_eq!(h.store.raw("slider1"), Some(10i32.to_le_bytes().to_vec()));
}

#[tokio::test]
async fn test_unknown_control_is_rejected_without_side_effects() {
    let h = harness().await;

    let result = h
        .engine
        .apply_change(SurfaceId::PeerLink, ControlId::Button(9), 1)
        .await;

    assert!(matches!(result, Err(EngineError::UnknownControl(ref id)) if id == "btn9"));
    assert!(h.screen.refreshes().is_empty());
    assert!(h.peer.publishes().is_empty());
    assert!(matches!(
        h.engine.get(ControlId::PageButton(11)).await,
        Err(EngineError::UnknownControl(_))
    ));
}

#[tokio::test]
async fn test_toggle_is_atomic_per_call() {
    let h = harness().await;

    let first = h
        .engine
        .toggle(SurfaceId::Touchscreen, ControlId::Button(2))
        .await
        .unwrap();
    let second = h
        .engine
        .toggle(SurfaceId::Touchscreen, ControlId::Button(2))
        .await
        .unwrap();

    assert_eq!((first.previous, first.value), (0, 1));
    assert_eq!((second.previous, second.value), (1, 0));
    assert_eq!(
        h.peer.refreshes(),
        vec![(ControlId::Button(2), 1), (ControlId::Button(2), 0)]
    );
}

#[tokio::test]
async fn test_concurrent_changes_are_all_reflected() {
    let h = harness().await;

    let a = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            engine
                .apply_change(SurfaceId::PeerLink, ControlId::Button(1), 1)
                .await
        })
    };
    let b = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            engine
                .apply_change(SurfaceId::Touchscreen, ControlId::Slider, 77)
                .await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let published = h.peer.publishes();
    assert_eq!(published.len(), 2);
    let last = published.last().unwrap();
    assert_eq!(last.value(ControlId::Button(1)), 1);
    assert_eq!(last.value(ControlId::Slider), 77);
}

#[tokio::test]
async fn test_many_concurrent_toggles_lose_nothing() {
    let h = harness().await;

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let engine = h.engine.clone();
        tasks.push(tokio::spawn(async move {
            engine
                .toggle(SurfaceId::Console, ControlId::PageButton(1))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // An even number of toggles lands back on the initial value
    assert_eq!(h.engine.get(ControlId::PageButton(1)).await.unwrap(), 0);
    assert_eq!(h.screen.refreshes().len(), 50);
}

#[tokio::test]
async fn test_resync_targets_one_surface() {
    let h = harness().await;

    h.engine
        .resync(SurfaceId::Touchscreen, ResyncScope::Page(Page::Secondary));
    h.engine.snapshot().await.unwrap();

    assert_eq!(
        h.screen.resyncs(),
        vec![ResyncScope::Page(Page::Secondary)]
    );
    assert!(h.peer.resyncs().is_empty());
    assert!(h.console.resyncs().is_empty());
}

#[tokio::test]
async fn test_register_resyncs_and_replaces() {
    let store = MemoryStore::new();
    store.put("slider1", &99i32.to_le_bytes()).unwrap();
    let engine = SyncEngine::spawn(load_all(&store), Box::new(store));

    let first = RecordingSurface::new(SurfaceId::Touchscreen);
    let second = RecordingSurface::new(SurfaceId::Touchscreen);
    engine.register_surface(first.clone());
    engine.register_surface(second.clone());

    engine
        .apply_change(SurfaceId::PeerLink, ControlId::Button(1), 1)
        .await
        .unwrap();

    assert_eq!(first.resyncs(), vec![ResyncScope::All]);
    match &first.calls.lock()[0] {
        Call::Resync(_, snapshot) => assert_eq!(snapshot.value(ControlId::Slider), 99),
        other => panic!("unexpected call {:?}", other),
    }
    // Only the replacement is still refreshed
    assert!(first.refreshes().is_empty());
    assert_eq!(second.refreshes(), vec![(ControlId::Button(1), 1)]);
}

#[tokio::test]
async fn test_partial_catalog_reports_unknown_control() {
    let state = ControlState::from_controls([ControlId::Slider.control()]);
    let engine = SyncEngine::spawn(state, Box::new(MemoryStore::new()));

    assert!(engine
        .apply_change(SurfaceId::Console, ControlId::Slider, 5)
        .await
        .is_ok());
    assert!(matches!(
        engine
            .apply_change(SurfaceId::Console, ControlId::Button(1), 1)
            .await,
        Err(EngineError::UnknownControl(_))
    ));
}

#[tokio::test]
async fn test_shutdown_stops_engine() {
    let h = harness().await;
    h.engine.flush().await.unwrap();
    h.engine.shutdown().await;

    assert!(matches!(
        h.engine.get(ControlId::Slider).await,
        Err(EngineError::Stopped)
    ));
}

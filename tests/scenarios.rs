use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use labelwarden::{
    Admission, Config, EnforcementToggle, Event, EventKind, LifecycleEvent, MemoryCatalog,
    MemoryRegistry, Subscribe, Tag, Warden, WorkerId, WorkerKind, WorkerStatus,
};
use tokio::sync::broadcast::error::TryRecvError;

fn cfg() -> Config {
    Config {
        debounce: Duration::from_millis(20),
        max_debounce: Duration::from_millis(500),
        scan_interval: Duration::ZERO,
        disconnect_timeout: Duration::from_secs(1),
        grace: Duration::from_secs(2),
        ..Config::default()
    }
}

fn fleet() -> (Arc<MemoryCatalog>, Arc<MemoryRegistry>) {
    let catalog = Arc::new(MemoryCatalog::new().with_forbidden(["barfoo"]));
    let registry = Arc::new(MemoryRegistry::new());
    (catalog, registry)
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn scenario_a_persistent_worker_is_quarantined_and_blocked() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["barfoo", "linux"]);
    let warden = Warden::builder(cfg()).build(catalog, registry.clone());
    warden.start();

    let w1 = WorkerId::from("w1");
    let verdict = warden.pre_admission(&w1).await.unwrap();
    assert_eq!(verdict.forbidden_tag(), Some(&Tag::forbidden("barfoo")));

    let status = registry.status_of("w1").unwrap();
    assert!(status.is_policy_quarantine());
    assert!(status.cause().unwrap().message().contains("barfoo"));

    match warden.can_assign(&w1) {
        Admission::Block(blockage) => assert!(blockage.to_string().contains("barfoo")),
        Admission::Allow => panic!("non-compliant worker must be blocked"),
    }
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn scenario_b_ephemeral_worker_is_disconnected() {
    let (catalog, registry) = fleet();
    registry.add("w2", WorkerKind::Ephemeral, ["barfoo"]);
    let warden = Warden::builder(cfg()).build(catalog, registry.clone());
    warden.start();

    warden.pre_admission(&WorkerId::from("w2")).await.unwrap();

    let status = registry.status_of("w2").unwrap();
    assert!(status.is_policy_disconnect());
    assert!(status.cause().unwrap().message().contains("barfoo"));
    assert_ne!(status, WorkerStatus::Online);
    assert_eq!(registry.disconnect_calls("w2"), 1);
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn scenario_c_disabled_toggle_only_caches_the_verdict() {
    let (catalog, registry) = fleet();
    registry.add("w3", WorkerKind::Persistent, ["barfoo"]);
    let warden = Warden::builder(cfg())
        .with_toggle(EnforcementToggle::new(false))
        .build(catalog, registry.clone());
    warden.start();

    let w3 = WorkerId::from("w3");
    let verdict = warden.pre_admission(&w3).await.unwrap();

    assert!(!verdict.is_compliant());
    assert_eq!(registry.status_of("w3"), Some(WorkerStatus::Offline));
    assert_eq!(registry.quarantine_calls("w3"), 0);
    assert_eq!(warden.can_assign(&w3), Admission::Allow);
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn scenario_d_newly_forbidden_tag_reaches_the_whole_fleet() {
    let (catalog, registry) = fleet();
    registry.add("a", WorkerKind::Persistent, ["linux"]);
    registry.add("b", WorkerKind::Ephemeral, ["linux", "x86"]);
    registry.add("c", WorkerKind::Persistent, ["windows"]);
    let warden = Warden::builder(cfg()).build(catalog.clone(), registry.clone());
    warden.start();
    warden.engine().wait_for_refresh().await.unwrap();

    catalog.set_forbidden("linux", true);
    warden.engine().schedule_refresh_all();
    warden.engine().wait_for_refresh().await.unwrap();

    for id in ["a", "b"] {
        let verdict = warden.engine().cached(&WorkerId::from(id)).unwrap();
        assert_eq!(verdict.forbidden_tag(), Some(&Tag::forbidden("linux")));
    }
    assert!(registry.status_of("a").unwrap().is_policy_quarantine());
    assert!(registry.status_of("b").unwrap().is_policy_disconnect());

    let c = WorkerId::from("c");
    assert!(warden.engine().cached(&c).unwrap().is_compliant());
    assert_eq!(registry.status_of("c"), Some(WorkerStatus::Offline));
    assert_eq!(warden.can_assign(&c), Admission::Allow);
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn repeated_passes_do_not_reapply_enforcement() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
    registry.add("w2", WorkerKind::Ephemeral, ["barfoo"]);
    let warden = Warden::builder(cfg()).build(catalog, registry.clone());
    warden.start();

    for _ in 0..3 {
        warden.engine().schedule_refresh_all();
        warden.engine().wait_for_refresh().await.unwrap();
    }

    assert_eq!(registry.quarantine_calls("w1"), 1);
    assert_eq!(registry.disconnect_calls("w2"), 1);
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn restoration_round_trip() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
    let warden = Warden::builder(cfg()).build(catalog, registry.clone());
    warden.start();

    let w1 = WorkerId::from("w1");
    warden.pre_admission(&w1).await.unwrap();
    assert!(!warden.can_assign(&w1).is_allowed());

    registry.set_tags("w1", ["linux"]).unwrap();
    let generation = warden.synchronizer().on_configuration_changed();
    warden.engine().wait_for_generation(generation).await.unwrap();

    assert_eq!(registry.status_of("w1"), Some(WorkerStatus::Online));
    assert!(warden.can_assign(&w1).is_allowed());
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn gate_vetoes_right_after_becoming_reachable() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["linux"]);
    let warden = Warden::builder(cfg()).build(catalog.clone(), registry.clone());
    warden.start();

    let w1 = WorkerId::from("w1");
    warden.pre_admission(&w1).await.unwrap();
    registry.set_status("w1", WorkerStatus::Online).unwrap();
    assert!(warden.can_assign(&w1).is_allowed());

    catalog.set_forbidden("linux", true);
    warden.synchronizer().on_reachable(&w1).await;

    assert!(matches!(warden.can_assign(&w1), Admission::Block(_)));
    assert!(registry.status_of("w1").unwrap().is_policy_quarantine());
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn burst_of_triggers_coalesces_into_one_pass() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["linux"]);
    let config = Config {
        debounce: Duration::from_millis(100),
        ..cfg()
    };
    let warden = Warden::builder(config).build(catalog, registry);
    warden.start();
    warden.engine().wait_for_refresh().await.unwrap();

    let mut rx = warden.bus().subscribe();
    let mut last = 0;
    for _ in 0..10 {
        last = warden.engine().schedule_refresh_all();
    }
    warden.engine().wait_for_generation(last).await.unwrap();

    let mut started = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) if ev.kind == EventKind::RefreshStarted => started.push(ev.generation),
            Ok(_) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
    assert_eq!(started, vec![Some(last)]);
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn catalog_outage_fails_open() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
    catalog.set_available(false);
    let warden = Warden::builder(cfg()).build(catalog, registry.clone());
    warden.start();

    let w1 = WorkerId::from("w1");
    let verdict = warden.pre_admission(&w1).await.unwrap();

    assert!(verdict.is_compliant());
    assert_eq!(registry.quarantine_calls("w1"), 0);
    assert!(warden.can_assign(&w1).is_allowed());
    assert!(warden.can_assign(&WorkerId::from("never-seen")).is_allowed());
    warden.shutdown().await.unwrap();
}

#[tokio::test]
async fn reenabling_enforcement_applies_cached_violations() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
    let warden = Warden::builder(cfg())
        .with_toggle(EnforcementToggle::new(false))
        .build(catalog, registry.clone());
    warden.start();
    warden.engine().wait_for_refresh().await.unwrap();
    assert_eq!(registry.quarantine_calls("w1"), 0);

    assert!(!warden.set_enforcement(true));
    warden.engine().wait_for_refresh().await.unwrap();

    assert!(registry.status_of("w1").unwrap().is_policy_quarantine());
    warden.shutdown().await.unwrap();
}

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn lifecycle_events_drive_enforcement_and_reach_subscribers() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["barfoo"]);
    let recorder = Arc::new(Recorder::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
    let warden = Warden::builder(cfg())
        .with_subscribers(subs)
        .build(catalog, registry.clone());
    warden.start();

    warden
        .lifecycle()
        .send(LifecycleEvent::BecameReachable(WorkerId::from("w1")))
        .await
        .unwrap();

    assert!(eventually(|| registry.quarantine_calls("w1") == 1).await);
    assert!(
        eventually(|| recorder
            .kinds
            .lock()
            .unwrap()
            .contains(&EventKind::WorkerQuarantined))
        .await
    );

    warden
        .lifecycle()
        .send(LifecycleEvent::TemporarilyOnline(WorkerId::from("w1")))
        .await
        .unwrap();
    assert!(eventually(|| warden.policy_summary().any()).await);
    warden.shutdown().await.unwrap();
}

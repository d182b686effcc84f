use std::sync::Arc;
use std::time::Duration;

use labelwarden::{
    Config, Event, EventKind, MemoryCatalog, MemoryRegistry, Warden, WorkerKind,
};
use tokio::sync::broadcast::{self, error::TryRecvError};

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

/// Fleet whose first pass is slow: disconnecting `w2` takes 500ms.
fn slow_fleet() -> (Arc<MemoryCatalog>, Arc<MemoryRegistry>) {
    let (catalog, registry) = fleet();
    registry.add("w2", WorkerKind::Ephemeral, ["barfoo"]);
    registry.set_disconnect_delay(Some(Duration::from_millis(500)));
    (catalog, registry)
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => events.push(ev),
            Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    events
}

fn started(events: &[Event]) -> Vec<u64> {
    events
        .iter()
        .filter(|ev| ev.kind == EventKind::RefreshStarted)
        .filter_map(|ev| ev.generation)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn periodic_scan_refreshes_without_triggers() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["linux"]);
    let config = Config {
        scan_interval: Duration::from_secs(1),
        ..cfg()
    };
    let warden = Warden::builder(config).build(catalog.clone(), registry.clone());
    warden.start();
    warden.engine().wait_for_refresh().await.unwrap();

    let mut rx = warden.bus().subscribe();
    catalog.set_forbidden("linux", true);
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let generations = started(&drain(&mut rx));
    assert_eq!(generations.len(), 3);
    assert!(generations.windows(2).all(|w| w[0] < w[1]));
    assert!(registry.status_of("w1").unwrap().is_policy_quarantine());
    warden.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn continuous_triggers_are_capped_by_max_debounce() {
    let (catalog, registry) = fleet();
    registry.add("w1", WorkerKind::Persistent, ["linux"]);
    let config = Config {
        debounce: Duration::from_millis(100),
        max_debounce: Duration::from_millis(300),
        ..cfg()
    };
    let warden = Warden::builder(config).build(catalog, registry);
    warden.start();
    warden.engine().wait_for_refresh().await.unwrap();

    let mut rx = warden.bus().subscribe();
    for _ in 0..20 {
        warden.engine().schedule_refresh_all();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // The quiet period never elapses while triggers keep coming; only the cap
    // lets passes through.
    let generations = started(&drain(&mut rx));
    assert!(generations.len() >= 2, "passes during trigger stream: {generations:?}");
    warden.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn trigger_during_pass_runs_another_pass() {
    let (catalog, registry) = slow_fleet();
    let warden = Warden::builder(cfg()).build(catalog, registry.clone());
    let mut rx = warden.bus().subscribe();
    warden.start();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(started(&drain(&mut rx)), vec![1]);

    let generation = warden.engine().schedule_refresh_all();
    assert_eq!(generation, 2);
    warden.engine().wait_for_generation(generation).await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(started(&events), vec![2]);
    let first_done = events
        .iter()
        .position(|ev| ev.kind == EventKind::RefreshCompleted && ev.generation == Some(1))
        .unwrap();
    let second_start = events
        .iter()
        .position(|ev| ev.kind == EventKind::RefreshStarted && ev.generation == Some(2))
        .unwrap();
    assert!(first_done < second_start);
    assert_eq!(registry.disconnect_calls("w2"), 1);
    warden.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn waiting_during_pass_joins_it() {
    let (catalog, registry) = slow_fleet();
    let warden = Warden::builder(cfg()).build(catalog, registry.clone());
    let mut rx = warden.bus().subscribe();
    warden.start();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(warden.engine().wait_for_refresh().await, Ok(1));
    assert!(registry.status_of("w2").unwrap().is_policy_disconnect());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(started(&drain(&mut rx)), vec![1]);
    warden.shutdown().await.unwrap();
}

mod support;

use lectio_delta::{Allowlist, UpdateManifest};
use lectio_updates::{
    spawn_update_scheduler, CheckOptions, CheckOutcome, UpdateConfig, UpdateError, UpdateNotice,
    UpdateOrchestrator,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::*;

#[tokio::test]
async fn check_now_runs_through_the_orchestrator() {
    let store = seeded_store(6);
    let source = Arc::new(MockSource::serving(john_manifest(6, 7)));
    let orch = Arc::new(UpdateOrchestrator::new(
        store.clone(),
        source.clone(),
        Allowlist::bundled(),
        UpdateConfig::default(),
    ));
    let (handle, task) = spawn_update_scheduler(orch, Duration::from_secs(3600));

    let outcome = handle.check_now(CheckOptions::default()).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::Applied { to_version: 7, .. }));
    assert_eq!(store.data_version().unwrap(), 7);

    let again = handle.check_now(CheckOptions::default()).await.unwrap();
    assert!(matches!(again, CheckOutcome::Skipped { .. }));
    assert_eq!(source.calls(), 1);

    handle.stop().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn stopped_scheduler_rejects_commands() {
    let store = seeded_store(0);
    let source = Arc::new(MockSource::serving(UpdateManifest::up_to_date(0)));
    let orch = Arc::new(UpdateOrchestrator::new(
        store,
        source,
        Allowlist::bundled(),
        UpdateConfig::default(),
    ));
    let (handle, task) = spawn_update_scheduler(orch, Duration::from_secs(3600));

    handle.stop().await.unwrap();
    task.await.unwrap();

    assert!(matches!(
        handle.check_now(CheckOptions::forced()).await,
        Err(UpdateError::SchedulerStopped)
    ));
    assert!(matches!(handle.stop().await, Err(UpdateError::SchedulerStopped)));
}

#[tokio::test]
async fn periodic_tick_checks_for_updates() {
    let store = seeded_store(6);
    let source = Arc::new(MockSource::serving(john_manifest(6, 7)));
    let orch = Arc::new(UpdateOrchestrator::new(
        store.clone(),
        source.clone(),
        Allowlist::bundled(),
        UpdateConfig::default(),
    ));
    let (handle, task) = spawn_update_scheduler(orch, Duration::from_millis(20));

    for _ in 0..100 {
        if source.calls() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(source.calls(), 1);

    handle.stop().await.unwrap();
    task.await.unwrap();
    assert_eq!(store.data_version().unwrap(), 7);
}

#[tokio::test]
async fn periodic_failures_stay_silent() {
    let store = seeded_store(6);
    let source = Arc::new(MockSource::failing());
    let notices: Arc<Mutex<Vec<UpdateNotice>>> = Arc::default();
    let sink = notices.clone();
    let orch = Arc::new(
        UpdateOrchestrator::new(
            store.clone(),
            source.clone(),
            Allowlist::bundled(),
            UpdateConfig::default(),
        )
        .with_notifier(move |n| sink.lock().unwrap().push(n.clone())),
    );
    let (handle, task) = spawn_update_scheduler(orch, Duration::from_millis(20));

    for _ in 0..100 {
        if source.calls() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(source.calls(), 1);
    assert!(notices.lock().unwrap().is_empty());

    // an explicit non-silent request still reports the failure
    let outcome = handle.check_now(CheckOptions::forced()).await.unwrap();
    assert!(matches!(outcome, CheckOutcome::Failed { .. }));
    assert!(matches!(
        notices.lock().unwrap().as_slice(),
        [UpdateNotice::Failed { .. }]
    ));

    handle.stop().await.unwrap();
    task.await.unwrap();
}

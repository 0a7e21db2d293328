//! Responses that arrive after a newer request for the same slot are dropped.

use std::sync::Arc;

use integration_tests::{ids, park, ScriptedStore};
use pd_core::{PlaygroundId, StoreError};
use pd_search::{Controller, FetchOutcome};

#[tokio::test]
async fn slow_load_does_not_clobber_newer_one() {
    let store = Arc::new(ScriptedStore::new());
    let release = store.push_gated_playgrounds(Ok(vec![park("old", "10001", "Old")]));
    store.push_playgrounds(Ok(vec![park("new", "10001", "New")]));
    let controller = Arc::new(Controller::new(store.clone()));

    let slow = tokio::spawn({
        let controller = controller.clone();
        async move { controller.reload().await }
    });
    store.wait_for_calls(1).await;

    assert_eq!(controller.reload().await, FetchOutcome::Applied(1));
    release.send(()).unwrap();
    assert_eq!(slow.await.unwrap(), FetchOutcome::Stale);

    assert_eq!(controller.read(|s| ids(s.visible())).await, vec!["new"]);
}

#[tokio::test]
async fn slow_failure_does_not_mark_a_newer_load_failed() {
    let store = Arc::new(ScriptedStore::new());
    let release = store.push_gated_playgrounds(Err(StoreError::unavailable("timeout")));
    store.push_playgrounds(Ok(vec![park("p1", "10001", "Park A")]));
    let controller = Arc::new(Controller::new(store.clone()));

    let slow = tokio::spawn({
        let controller = controller.clone();
        async move { controller.reload().await }
    });
    store.wait_for_calls(1).await;
    controller.reload().await;
    release.send(()).unwrap();

    assert_eq!(slow.await.unwrap(), FetchOutcome::Stale);
    assert_eq!(
        controller.read(|s| s.load_status().clone()).await,
        pd_search::LoadStatus::Loaded
    );
}

#[tokio::test]
async fn slow_review_fetch_is_discarded() {
    let p1 = PlaygroundId::new("p1");
    let store = Arc::new(ScriptedStore::new());
    let release = store.push_gated_reviews(Err(StoreError::unavailable("slow network")));
    store.push_reviews(Ok(vec![]));
    let controller = Arc::new(Controller::new(store.clone()));

    let slow = tokio::spawn({
        let controller = controller.clone();
        let p1 = p1.clone();
        async move { controller.expand_reviews(&p1).await }
    });
    store.wait_for_calls(1).await;

    assert_eq!(controller.expand_reviews(&p1).await, FetchOutcome::Applied(0));
    release.send(()).unwrap();
    assert_eq!(slow.await.unwrap(), FetchOutcome::Stale);

    controller
        .read(|state| {
            assert_eq!(state.reviews_for(&p1).map(|reviews| reviews.len()), Some(0));
            assert!(state.review_failure(&p1).is_none());
        })
        .await;
}

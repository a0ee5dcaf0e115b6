//! Expiry behavior with paused tokio time

mod common;

use std::time::Duration;

use common::HarnessBuilder;
use nowhere::domain::{ActorId, IntentId, JoinIntent, PostMessage};
use nowhere::repo::keys;
use nowhere::services::{ExpiryReaper, ReapReport};
use nowhere::store::GeoPoint;
use nowhere::ErrorKind;

const TTL: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn expired_intent_disappears_everywhere() {
    let h = HarnessBuilder::new().intent_ttl(TTL).build();
    let intent = h.create("alice", "Coffee run", 40.7128, -74.0060).await;
    h.join(intent.id(), "bob").await;

    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(h.services.queries.get(intent.id()).await.is_ok());

    tokio::time::advance(Duration::from_secs(31)).await;

    let err = h.services.queries.get(intent.id()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let nearby = h
        .services
        .queries
        .nearby(intent.latitude(), intent.longitude(), Some(1.0), None)
        .await
        .unwrap();
    assert!(nearby.is_empty());

    let err = h
        .services
        .intents
        .handle_join_intent(JoinIntent::new(intent.id(), ActorId::new("carol"), h.now()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .services
        .intents
        .handle_post_message(PostMessage::new(intent.id(), ActorId::new("bob"), "still on?", h.now()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(h.services.queries.messages(intent.id(), None).await.unwrap().is_empty());
    assert!(h
        .services
        .queries
        .intents_by_owner(&ActorId::new("alice"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn flagging_keeps_remaining_lifetime() {
    let h = HarnessBuilder::new().intent_ttl(TTL).build();
    let intent = h.create("alice", "Hoops?", 1.0, 1.0).await;

    tokio::time::advance(Duration::from_secs(50)).await;
    h.services.repos.intents.flag_now(intent.id()).await.unwrap();

    tokio::time::advance(Duration::from_secs(11)).await;
    let err = h.services.queries.get(intent.id()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn reaper_clears_expired_index_entries() {
    let h = HarnessBuilder::new().intent_ttl(TTL).build();
    let intent = h.create("alice", "Jamming", 5.0, 5.0).await;

    // Before expiry the entry is queued but not due
    assert_eq!(h.services.reaper.reap_once().await.unwrap(), ReapReport::default());

    tokio::time::advance(Duration::from_secs(61)).await;
    h.clock.advance(chrono::Duration::seconds(61));

    // Zombie geo entries still count until something cleans them
    assert_eq!(
        h.services.queries.count_nearby(5.0, 5.0, Some(1.0)).await.unwrap(),
        1
    );

    let report = h.services.reaper.reap_once().await.unwrap();
    assert_eq!(
        report,
        ReapReport {
            due: 1,
            reaped: 1,
            still_live: 0
        }
    );

    assert_eq!(
        h.services.queries.count_nearby(5.0, 5.0, Some(1.0)).await.unwrap(),
        0
    );
    assert!(h
        .services
        .queries
        .clusters(5.0, 5.0, Some(10.0))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(h.services.reaper.reap_once().await.unwrap(), ReapReport::default());
    assert!(h.services.queries.get(intent.id()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn reaper_leaves_live_intents_queued() {
    let h = HarnessBuilder::new().intent_ttl(TTL).build();
    h.create("alice", "Study session", 6.0, 6.0).await;

    // Wall clock runs ahead of the store's own expiry
    h.clock.advance(chrono::Duration::seconds(61));

    let report = h.services.reaper.reap_once().await.unwrap();
    assert_eq!(report.due, 1);
    assert_eq!(report.still_live, 1);
    assert_eq!(
        h.services.queries.count_nearby(6.0, 6.0, Some(1.0)).await.unwrap(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn live_head_of_queue_does_not_block_expired_entries() {
    let h = HarnessBuilder::new().intent_ttl(TTL).build();
    let store = h.services.store.clone();
    let now = h.now().timestamp() as f64;

    // Due first but still alive
    let live = IntentId::new();
    store
        .set(&keys::intent(live), "{}".into(), Some(Duration::from_secs(3600)))
        .await
        .unwrap();
    store.zadd(keys::EXPIRY_QUEUE, &live.to_string(), now - 10.0).await.unwrap();

    // Due second with its blob gone
    let gone = IntentId::new();
    store
        .geo_add(keys::GEO_INDEX, &gone.to_string(), GeoPoint::new(7.0, 7.0))
        .await
        .unwrap();
    store.zadd(keys::EXPIRY_QUEUE, &gone.to_string(), now - 5.0).await.unwrap();

    let reaper = ExpiryReaper::new(store.clone(), h.clock.clone()).with_batch_limit(1);
    assert_eq!(
        reaper.reap_once().await.unwrap(),
        ReapReport {
            due: 1,
            reaped: 0,
            still_live: 1
        }
    );
    assert_eq!(
        reaper.reap_once().await.unwrap(),
        ReapReport {
            due: 1,
            reaped: 1,
            still_live: 0
        }
    );
    assert_eq!(reaper.reap_once().await.unwrap(), ReapReport::default());

    let queued = store
        .zrange_by_score(keys::EXPIRY_QUEUE, f64::NEG_INFINITY, f64::INFINITY, None)
        .await
        .unwrap();
    assert_eq!(queued, vec![live.to_string()]);
    assert_eq!(
        h.services.queries.count_nearby(7.0, 7.0, Some(1.0)).await.unwrap(),
        0
    );
}

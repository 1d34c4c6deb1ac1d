//! Integration tests for reconnect behaviour against a local upstream

mod common;

use common::{eventually, FakeUpstream, Script, ServerEvent};
use price_relay::cache::{PriceCache, PriceRecord, RecordType};
use price_relay::config::FeedConfig;
use price_relay::feed::{subscribe_message, FeedManager};
use price_relay::ws::{ConnectionState, ReconnectConfig, WsClient, WsConfig, WsMessage};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

async fn next_client_event(rx: &mut mpsc::Receiver<WsMessage>) -> WsMessage {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for client event")
        .expect("client event channel closed")
}

#[tokio::test]
async fn test_close_triggers_one_reconnect_after_delay() {
    let delay = Duration::from_millis(300);
    let mut upstream = FakeUpstream::start(vec![Script {
        frames: vec![],
        close: true,
        ..Script::default()
    }])
    .await;

    let client = WsClient::new(
        WsConfig::new(format!("{}/us?api_token=test", upstream.base_url()))
            .reconnect(ReconnectConfig::fixed(delay))
            .on_connect(r#"{"action":"subscribe","symbols":"AAPL.US"}"#),
    );
    let status = client.status();
    let (mut rx, control) = client.connect();

    // First connection: subscribe, then the server closes it
    assert!(matches!(
        next_client_event(&mut rx).await,
        WsMessage::Connected { .. }
    ));
    let first_id = match next_client_event(&mut rx).await {
        WsMessage::Disconnected { connection_id, .. } => connection_id,
        other => panic!("expected disconnect, got {other:?}"),
    };
    match next_client_event(&mut rx).await {
        WsMessage::Reconnecting { attempt, delay: d } => {
            assert_eq!(attempt, 1);
            assert_eq!(d, delay);
        }
        other => panic!("expected reconnect, got {other:?}"),
    }
    let second_id = match next_client_event(&mut rx).await {
        WsMessage::Connected { connection_id } => connection_id,
        other => panic!("expected connect, got {other:?}"),
    };
    assert_ne!(first_id, second_id);
    assert!(eventually(WAIT, || status.get() == ConnectionState::Open).await);

    // Server side: the second accept comes no earlier than the delay
    let closed_at = match upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::ClosedByServer { index: 0, .. }))
        .await
    {
        ServerEvent::ClosedByServer { at, .. } => at,
        _ => unreachable!(),
    };
    let reopened_at = match upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::Accepted { index: 1, .. }))
        .await
    {
        ServerEvent::Accepted { at, .. } => at,
        _ => unreachable!(),
    };
    // closed_at is stamped after the close frame flushes, so allow a little slack
    let gap = reopened_at.duration_since(closed_at);
    assert!(
        gap + Duration::from_millis(20) >= delay,
        "reconnected after {gap:?}, before the delay"
    );
    assert!(gap < delay + Duration::from_secs(2), "reconnect took {gap:?}");

    // Exactly one reconnect: nothing else is accepted while the second holds
    let later = upstream.drain(delay * 3).await;
    assert!(
        !later
            .iter()
            .any(|e| matches!(e, ServerEvent::Accepted { index: 2, .. })),
        "unexpected extra connection: {later:?}"
    );
    assert_eq!(upstream.max_open.load(Ordering::SeqCst), 1);

    control.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_feed_manager_resubscribes_and_updates_cache() {
    let mut upstream = FakeUpstream::start(vec![
        Script {
            frames: vec![
                "pong".to_string(),
                r#"{"s":"AAPL.US","p":189.5,"t":1700000000000}"#.to_string(),
            ],
            close: true,
            ..Script::default()
        },
        Script {
            frames: vec![r#"{"s":"AAPL.US","p":190.0,"t":1700000001000}"#.to_string()],
            close: false,
            ..Script::default()
        },
    ])
    .await;

    let config = FeedConfig {
        base_url: upstream.base_url(),
        reconnect_delay_secs: 1,
        ..FeedConfig::default()
    };
    let cache = PriceCache::shared();
    let manager = FeedManager::new(&config, "test-token", cache.clone()).unwrap();
    let expected_subscribe = subscribe_message(manager.symbols());
    let handle = manager.start();

    // A fresh subscribe on each connection's open
    for index in 0..2 {
        match upstream
            .wait_for(Duration::from_secs(5), |e| {
                matches!(e, ServerEvent::Subscribed { index: i, .. } if *i == index)
            })
            .await
        {
            ServerEvent::Subscribed { text, .. } => assert_eq!(text, expected_subscribe),
            _ => unreachable!(),
        }
    }

    let updated = eventually(WAIT, || {
        cache.get("aapl.us")
            == Some(PriceRecord::new(190.0, 1_700_000_001_000, RecordType::Trade))
    })
    .await;
    assert!(updated, "cache holds {:?}", cache.get("AAPL.US"));
    assert_eq!(cache.size(), 1);
    assert_eq!(handle.state(), ConnectionState::Open);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_manual_reconnect_closes_open_connection_first() {
    let mut upstream = FakeUpstream::start(vec![]).await;

    let config = FeedConfig {
        base_url: upstream.base_url(),
        reconnect_delay_secs: 30,
        ..FeedConfig::default()
    };
    let handle = FeedManager::new(&config, "test-token", PriceCache::shared())
        .unwrap()
        .start();

    upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::Subscribed { index: 0, .. }))
        .await;
    assert!(eventually(WAIT, || handle.state() == ConnectionState::Open).await);

    handle.reconnect().await.unwrap();

    // The old connection receives a close frame and the new one opens
    // without waiting out the 30 second delay
    upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::ClientClosed { index: 0 }))
        .await;
    upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::Subscribed { index: 1, .. }))
        .await;
    assert!(eventually(WAIT, || handle.state() == ConnectionState::Open).await);
    assert_eq!(upstream.max_open.load(Ordering::SeqCst), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_gives_up_on_unanswered_close() {
    let mut upstream = FakeUpstream::start(vec![Script {
        go_silent: true,
        ..Script::default()
    }])
    .await;

    let client = WsClient::new(
        WsConfig::new(format!("{}/us?api_token=test", upstream.base_url()))
            .reconnect(ReconnectConfig::fixed(Duration::from_secs(30)))
            .pong_timeout(Duration::from_millis(300))
            .on_connect(r#"{"action":"subscribe","symbols":"AAPL.US"}"#),
    );
    let (mut rx, control) = client.connect();
    assert!(matches!(
        next_client_event(&mut rx).await,
        WsMessage::Connected { .. }
    ));

    // The peer never answers the close frame; the client must still move on
    control.reconnect().await.unwrap();
    assert!(matches!(
        next_client_event(&mut rx).await,
        WsMessage::Connected { .. }
    ));
    upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::Subscribed { index: 1, .. }))
        .await;

    tokio::time::timeout(WAIT, control.shutdown())
        .await
        .expect("shutdown blocked")
        .unwrap();
}

#[tokio::test]
async fn test_no_reconnect_before_fixed_delay() {
    let delay = Duration::from_secs(5);
    // Nothing listens on port 1, so each attempt fails straight away
    let client = WsClient::new(
        WsConfig::new("ws://127.0.0.1:1").reconnect(ReconnectConfig::fixed(delay)),
    );
    let status = client.status();
    let (mut rx, control) = client.connect();

    assert!(matches!(
        next_client_event(&mut rx).await,
        WsMessage::Error(_)
    ));
    match next_client_event(&mut rx).await {
        WsMessage::Reconnecting { attempt: 1, delay: d } => assert_eq!(d, delay),
        other => panic!("expected first reconnect, got {other:?}"),
    }

    tokio::time::pause();

    tokio::time::advance(delay - Duration::from_millis(100)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(rx.try_recv().is_err(), "attempted before the delay elapsed");
    assert_eq!(status.get(), ConnectionState::Closed);

    tokio::time::advance(Duration::from_millis(200)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::resume();

    // Exactly one new attempt: it fails, then schedules the second reconnect
    assert!(matches!(
        next_client_event(&mut rx).await,
        WsMessage::Error(_)
    ));
    match next_client_event(&mut rx).await {
        WsMessage::Reconnecting { attempt: 2, delay: d } => assert_eq!(d, delay),
        other => panic!("expected second reconnect, got {other:?}"),
    }

    control.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_connection() {
    let mut upstream = FakeUpstream::start(vec![]).await;

    let config = FeedConfig {
        base_url: upstream.base_url(),
        ..FeedConfig::default()
    };
    let handle = FeedManager::new(&config, "test-token", PriceCache::shared())
        .unwrap()
        .start();
    let status = handle.status();

    upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::Subscribed { index: 0, .. }))
        .await;

    tokio::time::timeout(WAIT, handle.shutdown())
        .await
        .expect("shutdown timed out")
        .unwrap();

    assert_eq!(status.get(), ConnectionState::Closed);
    upstream
        .wait_for(WAIT, |e| matches!(e, ServerEvent::ClientClosed { index: 0 }))
        .await;
}

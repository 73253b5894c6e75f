//! WebSocket connection and streaming protocol tests.

use marketdata_client::{WsClient, WsMessage};
use marketdata_tests::create_test_client;
use std::time::Duration;

#[tokio::test]
async fn test_websocket_connection() {
    let ws_url = create_test_client()
        .expect("Failed to create client")
        .ws_url();
    let mut ws = WsClient::connect(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");

    // First message should be the welcome event.
    let timeout = tokio::time::timeout(Duration::from_secs(5), ws.recv()).await;

    match timeout {
        Ok(Some(WsMessage::Connected { message })) => {
            assert!(!message.is_empty());
        }
        Ok(Some(other)) => panic!("expected connected event, got {other:?}"),
        Ok(None) => panic!("WebSocket closed unexpectedly"),
        Err(_) => panic!("Timeout waiting for WebSocket message"),
    }
}

#[tokio::test]
async fn test_websocket_subscribe_confirmation() {
    let ws_url = create_test_client()
        .expect("Failed to create client")
        .ws_url();
    let mut ws = WsClient::connect(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");

    ws.subscribe("AAPL")
        .await
        .expect("Failed to send subscribe command");

    // Expect subscription_confirmed within the first few messages. A cached
    // price snapshot may arrive before the confirmation.
    let mut confirmed = false;
    for _ in 0..5 {
        match tokio::time::timeout(Duration::from_secs(5), ws.recv()).await {
            Ok(Some(WsMessage::SubscriptionConfirmed { symbol })) => {
                assert_eq!(symbol, "AAPL");
                confirmed = true;
                break;
            }
            Ok(Some(_)) => {}
            Ok(None) => panic!("WebSocket closed unexpectedly"),
            Err(_) => panic!("Timeout waiting for subscription confirmation"),
        }
    }
    assert!(confirmed, "never received subscription_confirmed");

    ws.unsubscribe("AAPL")
        .await
        .expect("Failed to send unsubscribe command");
}

#[tokio::test]
async fn test_websocket_ping_pong() {
    let ws_url = create_test_client()
        .expect("Failed to create client")
        .ws_url();
    let mut ws = WsClient::connect(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");

    ws.ping().await.expect("Failed to send ping");

    let mut got_pong = false;
    for _ in 0..5 {
        match tokio::time::timeout(Duration::from_secs(5), ws.recv()).await {
            Ok(Some(WsMessage::Pong { timestamp })) => {
                assert!(timestamp > 0);
                got_pong = true;
                break;
            }
            Ok(Some(_)) => {}
            Ok(None) => panic!("WebSocket closed unexpectedly"),
            Err(_) => panic!("Timeout waiting for pong"),
        }
    }
    assert!(got_pong, "never received pong");
}

#[tokio::test]
async fn test_websocket_subscribe_many() {
    let ws_url = create_test_client()
        .expect("Failed to create client")
        .ws_url();
    let mut ws = WsClient::connect(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");

    ws.subscribe_many(&["AAPL", "MSFT"])
        .await
        .expect("Failed to send batch subscribe");

    // Collect confirmations for both symbols.
    let mut pending = vec!["AAPL".to_string(), "MSFT".to_string()];
    for _ in 0..10 {
        if pending.is_empty() {
            break;
        }
        match tokio::time::timeout(Duration::from_secs(5), ws.recv()).await {
            Ok(Some(WsMessage::SubscriptionConfirmed { symbol })) => {
                pending.retain(|s| s != &symbol);
            }
            Ok(Some(_)) => {}
            Ok(None) => panic!("WebSocket closed unexpectedly"),
            Err(_) => panic!("Timeout waiting for batch confirmations"),
        }
    }
    assert!(pending.is_empty(), "missing confirmations for {pending:?}");
}

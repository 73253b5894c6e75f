//! Health check endpoint tests.

use marketdata_tests::create_test_client;

#[tokio::test]
async fn test_health_check() {
    let client = create_test_client().expect("Failed to create client");

    let health = client.health_check().await.expect("Health check failed");

    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
    assert!(!health.feed_state.is_empty());
}

#[tokio::test]
async fn test_feed_status() {
    let client = create_test_client().expect("Failed to create client");

    let status = client.feed_status().await.expect("Failed to get status");

    // The reported state must be one of the machine states.
    assert!(matches!(
        status.state.as_str(),
        "disconnected" | "connecting" | "connected" | "rate_limited"
    ));

    // A connected feed implies the state string agrees.
    if status.connected {
        assert_eq!(status.state, "connected");
    }
}

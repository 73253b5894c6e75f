//! WebSocket endpoint for downstream real-time consumers.

use crate::hub::{BroadcastHub, ClientId, ServerEvent};
use crate::state::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Interval between server-initiated heartbeats.
const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// WebSocket upgrade handler.
#[utoipa::path(
    get,
    path = "/ws",
    responses(
        (status = 101, description = "WebSocket connection established")
    ),
    tag = "WebSocket"
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (id, mut outbox) = state.hub.register();

    // Send connection confirmation
    let connected = ServerEvent::Connected {
        message: "Connected to market data stream".to_string(),
    };
    if let Ok(json) = serde_json::to_string(&connected) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    info!("WebSocket client connected");

    // Handle incoming client commands
    let hub = Arc::clone(&state.hub);
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!("Received WebSocket message: {}", text);
                    handle_client_message(&text, &hub, id).await;
                }
                Ok(Message::Ping(_data)) => {
                    debug!("Received ping");
                    // Pong is handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket client disconnected");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Forward hub events to the client, with a periodic heartbeat
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = outbox.recv() => {
                    match event {
                        Some(event) => {
                            if let Ok(json) = serde_json::to_string(&event)
                                && sender.send(Message::Text(json.into())).await.is_err()
                            {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    let heartbeat = ServerEvent::Pong {
                        timestamp: chrono::Utc::now().timestamp_millis(),
                    };
                    if let Ok(json) = serde_json::to_string(&heartbeat)
                        && sender.send(Message::Text(json.into())).await.is_err()
                    {
                        break;
                    }
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = recv_task => {}
        _ = send_task => {}
    }

    // Mandatory cleanup: a stale membership would leak fan-out targets.
    state.hub.disconnect(id);

    info!("WebSocket connection closed");
}

/// Handle incoming client messages.
async fn handle_client_message(text: &str, hub: &Arc<BroadcastHub>, id: ClientId) {
    #[derive(serde::Deserialize)]
    struct ClientCommand {
        action: String,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        symbols: Option<Vec<String>>,
    }

    let Ok(cmd) = serde_json::from_str::<ClientCommand>(text) else {
        debug!("Ignoring malformed client command");
        return;
    };

    match cmd.action.as_str() {
        "subscribe" => {
            if let Some(symbol) = cmd.symbol {
                hub.join(id, &symbol).await;
            }
        }
        "unsubscribe" => {
            if let Some(symbol) = cmd.symbol {
                hub.leave(id, &symbol);
            }
        }
        "subscribe_many" => {
            if let Some(symbols) = cmd.symbols {
                for symbol in symbols {
                    hub.join(id, &symbol).await;
                }
            }
        }
        "get_price" => {
            if let Some(symbol) = cmd.symbol {
                hub.current_price(id, &symbol).await;
            }
        }
        "ping" => {
            hub.heartbeat(id);
        }
        _ => {
            debug!("Unknown command: {}", cmd.action);
        }
    }
}

//! WebSocket client for real-time price streaming.

use crate::error::Error;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket message types received from the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// Connection established.
    #[serde(rename = "connected")]
    Connected {
        /// Welcome message.
        message: String,
    },
    /// Latest price for a symbol. Broadcast to all consumers.
    #[serde(rename = "price_update")]
    PriceUpdate {
        /// Uppercase ticker symbol.
        symbol: String,
        /// Trade price.
        price: f64,
        /// Timestamp in epoch milliseconds.
        timestamp: i64,
    },
    /// Trade detail, delivered only when subscribed to the symbol.
    #[serde(rename = "trade")]
    Trade {
        /// Uppercase ticker symbol.
        symbol: String,
        /// Trade price.
        price: f64,
        /// Trade volume.
        volume: f64,
        /// Timestamp in epoch milliseconds.
        timestamp: i64,
    },
    /// Subscription confirmation.
    #[serde(rename = "subscription_confirmed")]
    SubscriptionConfirmed {
        /// Symbol subscribed to.
        symbol: String,
    },
    /// Unsubscription confirmation.
    #[serde(rename = "unsubscription_confirmed")]
    UnsubscriptionConfirmed {
        /// Symbol unsubscribed from.
        symbol: String,
    },
    /// Liveness acknowledgment.
    #[serde(rename = "pong")]
    Pong {
        /// Server time in epoch milliseconds.
        timestamp: i64,
    },
}

/// Commands that can be sent to the server.
#[derive(Debug, Clone, Serialize)]
pub struct ClientCommand {
    /// Action to perform.
    pub action: String,
    /// Optional symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Optional symbol batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
}

impl ClientCommand {
    /// Creates a subscribe command.
    #[must_use]
    pub fn subscribe(symbol: &str) -> Self {
        Self {
            action: "subscribe".to_string(),
            symbol: Some(symbol.to_string()),
            symbols: None,
        }
    }

    /// Creates an unsubscribe command.
    #[must_use]
    pub fn unsubscribe(symbol: &str) -> Self {
        Self {
            action: "unsubscribe".to_string(),
            symbol: Some(symbol.to_string()),
            symbols: None,
        }
    }

    /// Creates a batch subscribe command.
    #[must_use]
    pub fn subscribe_many(symbols: &[&str]) -> Self {
        Self {
            action: "subscribe_many".to_string(),
            symbol: None,
            symbols: Some(symbols.iter().map(ToString::to_string).collect()),
        }
    }

    /// Creates a get_price command.
    #[must_use]
    pub fn get_price(symbol: &str) -> Self {
        Self {
            action: "get_price".to_string(),
            symbol: Some(symbol.to_string()),
            symbols: None,
        }
    }

    /// Creates a ping command.
    #[must_use]
    pub fn ping() -> Self {
        Self {
            action: "ping".to_string(),
            symbol: None,
            symbols: None,
        }
    }
}

/// WebSocket client for receiving real-time price updates.
pub struct WsClient {
    rx: mpsc::Receiver<WsMessage>,
    tx: mpsc::Sender<ClientCommand>,
}

impl WsClient {
    /// Connects to the WebSocket server.
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:8080/ws")
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let (ws_stream, _) = connect_async(url).await.map_err(Box::new)?;
        let (mut write, mut read) = ws_stream.split();

        // Channel for receiving messages
        let (msg_tx, msg_rx) = mpsc::channel::<WsMessage>(100);

        // Channel for sending commands
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ClientCommand>(100);

        // Spawn task to read messages
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Ok(ws_msg) = serde_json::from_str::<WsMessage>(&text)
                            && msg_tx.send(ws_msg).await.is_err()
                        {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Err(_) => break,
                    _ => {}
                }
            }
        });

        // Spawn task to send commands
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                if let Ok(json) = serde_json::to_string(&cmd)
                    && write.send(Message::Text(json.into())).await.is_err()
                {
                    break;
                }
            }
        });

        Ok(Self {
            rx: msg_rx,
            tx: cmd_tx,
        })
    }

    /// Receives the next message from the server.
    ///
    /// Returns `None` if the connection is closed.
    pub async fn recv(&mut self) -> Option<WsMessage> {
        self.rx.recv().await
    }

    /// Sends a command to the server.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn send(&self, cmd: ClientCommand) -> Result<(), Error> {
        self.tx.send(cmd).await.map_err(|_| Error::ConnectionClosed)
    }

    /// Subscribes to trade updates for a symbol.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn subscribe(&self, symbol: &str) -> Result<(), Error> {
        self.send(ClientCommand::subscribe(symbol)).await
    }

    /// Unsubscribes from trade updates for a symbol.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn unsubscribe(&self, symbol: &str) -> Result<(), Error> {
        self.send(ClientCommand::unsubscribe(symbol)).await
    }

    /// Subscribes to trade updates for multiple symbols at once.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn subscribe_many(&self, symbols: &[&str]) -> Result<(), Error> {
        self.send(ClientCommand::subscribe_many(symbols)).await
    }

    /// Requests the latest cached price for a symbol.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn get_price(&self, symbol: &str) -> Result<(), Error> {
        self.send(ClientCommand::get_price(symbol)).await
    }

    /// Sends a liveness ping.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn ping(&self) -> Result<(), Error> {
        self.send(ClientCommand::ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_command_serialization() {
        let cmd = ClientCommand::subscribe("AAPL");
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["action"], "subscribe");
        assert_eq!(json["symbol"], "AAPL");
        assert!(json.get("symbols").is_none());
    }

    #[test]
    fn test_subscribe_many_command_serialization() {
        let cmd = ClientCommand::subscribe_many(&["AAPL", "TSLA"]);
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["action"], "subscribe_many");
        assert!(json.get("symbol").is_none());
        assert_eq!(json["symbols"][0], "AAPL");
        assert_eq!(json["symbols"][1], "TSLA");
    }

    #[test]
    fn test_ping_command_serialization() {
        let cmd = ClientCommand::ping();
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["action"], "ping");
        assert!(json.get("symbol").is_none());
    }

    #[test]
    fn test_ws_message_price_update_deserialization() {
        let raw = r#"{"type":"price_update","data":{"symbol":"AAPL","price":189.5,"timestamp":1700000000000}}"#;
        let msg: WsMessage = serde_json::from_str(raw).unwrap();

        match msg {
            WsMessage::PriceUpdate {
                symbol,
                price,
                timestamp,
            } => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(price, 189.5);
                assert_eq!(timestamp, 1_700_000_000_000);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_ws_message_pong_deserialization() {
        let raw = r#"{"type":"pong","data":{"timestamp":1700000000000}}"#;
        let msg: WsMessage = serde_json::from_str(raw).unwrap();

        assert!(matches!(msg, WsMessage::Pong { .. }));
    }
}

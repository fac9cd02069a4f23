//! DevTools protocol client over a WebSocket connection.
//!
//! The flow is strictly sequential, so this client keeps the simple
//! request/response shape: send a command, read frames until the response
//! with the matching id arrives, skip everything else. No event
//! subscription machinery is needed because waits are done by polling
//! `Runtime.evaluate`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::errors::{AutofillError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CdpClient {
    stream: Mutex<WsStream>,
    next_id: AtomicU64,
}

impl CdpClient {
    /// Connect to a DevTools WebSocket endpoint
    /// (`ws://{host}:{port}/devtools/page/{target_id}` or the browser-level
    /// URL from `/json/version`).
    pub async fn connect(ws_url: &str) -> Result<Self> {
        tracing::debug!(url = ws_url, "connecting to DevTools WebSocket");

        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| {
                AutofillError::Cdp(format!("failed to connect to {}: {}", ws_url, e))
            })?;

        Ok(Self {
            stream: Mutex::new(stream),
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a command and wait for its response.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = serde_json::to_string(&json!({
            "id": id,
            "method": method,
            "params": params,
        }))?;

        let mut stream = self.stream.lock().await;
        tracing::debug!(id = id, method = method, "sending CDP command");

        tokio::time::timeout(COMMAND_TIMEOUT, async {
            stream
                .send(Message::Text(payload.into()))
                .await
                .map_err(|e| AutofillError::Cdp(format!("failed to send command: {}", e)))?;

            loop {
                let frame = stream
                    .next()
                    .await
                    .ok_or_else(|| {
                        AutofillError::Cdp("connection closed before response".to_string())
                    })?
                    .map_err(|e| AutofillError::Cdp(format!("WebSocket read failed: {}", e)))?;

                let text = match frame {
                    Message::Text(t) => t.to_string(),
                    Message::Close(_) => {
                        return Err(AutofillError::Cdp(
                            "connection closed by remote".to_string(),
                        ))
                    }
                    _ => continue,
                };

                let value: Value = serde_json::from_str(&text)?;
                match outcome_for(&value, id) {
                    Some(Ok(result)) => return Ok(result),
                    Some(Err(message)) => {
                        return Err(AutofillError::Cdp(format!("{}: {}", method, message)))
                    }
                    None => continue,
                }
            }
        })
        .await
        .map_err(|_| AutofillError::Timeout(format!("CDP command {} timed out", method)))?
    }

    /// Enable a protocol domain (e.g. "Runtime").
    pub async fn enable_domain(&self, domain: &str) -> Result<()> {
        self.call(&format!("{}.enable", domain), json!({})).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        let mut stream = self.stream.lock().await;
        stream
            .close(None)
            .await
            .map_err(|e| AutofillError::Cdp(format!("failed to close connection: {}", e)))
    }
}

/// Interpret a received frame relative to the command with `id`:
/// `Some(Ok)` for the matching result, `Some(Err)` for the matching error
/// message, `None` for events and stale responses.
pub fn outcome_for(frame: &Value, id: u64) -> Option<std::result::Result<Value, String>> {
    if frame.get("id").and_then(Value::as_u64) != Some(id) {
        return None;
    }
    if let Some(error) = frame.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown CDP error");
        return Some(Err(message.to_string()));
    }
    Some(Ok(frame.get("result").cloned().unwrap_or(Value::Null)))
}

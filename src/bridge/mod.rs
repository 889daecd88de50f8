//! Client Bridge (spec §4.2) — the persistent, authenticated,
//! request/response-correlated WebSocket channel to a single game client.
//!
//! Grounded in `WrldBld-Game`'s desktop WebSocket client
//! (`crates/player-adapters/src/infrastructure/websocket/desktop/client.rs`):
//! a pending-requests map of `oneshot::Sender`s guarded by a mutex, a single
//! reader task that demultiplexes frames by request id, and a writer task
//! fed by an mpsc channel. Generalized here to VibeCraft's envelope shape,
//! plus the five-state connection machine, reconnect backoff, and capability
//! cache spec.md's Client Bridge requires.

pub mod protocol;

use crate::config::BridgeConfig;
use crate::error::VibeCraftError;
use futures_util::{SinkExt, StreamExt};
use protocol::{BridgeRequest, BridgeResponse, Capabilities, MessageType};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};
use uuid::Uuid;

/// Connection state machine (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    Closing,
}

/// Removes a pending-request entry on every exit path of [`ClientBridge::request`]
/// — normal completion, timeout, or caller cancellation — so invariant 6
/// ("pending-request entries are freed on every terminal path") holds even
/// when the enclosing future is dropped mid-await.
struct PendingGuard {
    pending: Arc<StdMutex<HashMap<String, oneshot::Sender<BridgeResponse>>>>,
    id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.lock().unwrap().remove(&self.id);
    }
}

pub struct ClientBridge {
    config: BridgeConfig,
    state: RwLock<ConnectionState>,
    write_tx: StdMutex<Option<mpsc::UnboundedSender<Message>>>,
    pending: Arc<StdMutex<HashMap<String, oneshot::Sender<BridgeResponse>>>>,
    capabilities: RwLock<Capabilities>,
    closing: AtomicBool,
    permanently_failed: AtomicBool,
}

impl ClientBridge {
    pub fn new(config: BridgeConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: RwLock::new(ConnectionState::Disconnected),
            write_tx: StdMutex::new(None),
            pending: Arc::new(StdMutex::new(HashMap::new())),
            capabilities: RwLock::new(Capabilities::default()),
            closing: AtomicBool::new(false),
            permanently_failed: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    async fn set_state(&self, new_state: ConnectionState) {
        let mut guard = self.state.write().await;
        if *guard != new_state {
            info!("bridge connection state: {:?} -> {:?}", *guard, new_state);
        }
        *guard = new_state;
    }

    /// Cached capabilities from the last `hello` handshake (spec §3); empty
    /// until `start()` returns.
    pub async fn capabilities(&self) -> Capabilities {
        self.capabilities.read().await.clone()
    }

    /// Open the WebSocket, perform the `hello` handshake, cache capabilities.
    pub async fn start(self: &Arc<Self>) -> Result<(), VibeCraftError> {
        self.connect_and_handshake().await
    }

    /// Fire-and-forget variant of [`Self::start`]: the server should come up
    /// even if no game client is listening yet. Spawns the first connection
    /// attempt in the background and, on anything but a terminal auth
    /// failure, hands off to the same reconnect-with-backoff loop the reader
    /// task uses after a later disconnect.
    pub fn start_in_background(self: &Arc<Self>) {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            match bridge.connect_and_handshake().await {
                Ok(()) => {}
                Err(VibeCraftError::BridgeAuthFailed) => {
                    warn!("bridge: authentication failed, not retrying");
                }
                Err(e) => {
                    warn!("bridge: initial connection failed ({}), retrying in background", e);
                    reconnect_with_backoff(bridge).await;
                }
            }
        });
    }

    async fn connect_and_handshake(self: &Arc<Self>) -> Result<(), VibeCraftError> {
        self.set_state(ConnectionState::Connecting).await;
        let url = self.config.url();

        let (ws_stream, _) = connect_async(&url).await.map_err(|e| {
            warn!("bridge connect failed: {}", e);
            VibeCraftError::BridgeUnavailable
        })?;

        self.set_state(ConnectionState::Handshaking).await;
        let (mut write, mut read) = ws_stream.split();
        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<Message>();
        *self.write_tx.lock().unwrap() = Some(write_tx);

        let pending = Arc::clone(&self.pending);
        let bridge_for_reader = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<BridgeResponse>(&text) {
                        Ok(response) => {
                            let sender = pending.lock().unwrap().remove(&response.id);
                            match sender {
                                Some(tx) => {
                                    let _ = tx.send(response);
                                }
                                None => warn!("bridge: response for unknown request id {}", response.id),
                            }
                        }
                        Err(e) => warn!("bridge: failed to parse response frame: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        info!("bridge: peer closed connection");
                        break;
                    }
                    Err(e) => {
                        warn!("bridge: websocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            // Unexpected or peer-initiated disconnect: fail every waiter with
            // connection_lost by dropping their senders, then maybe reconnect.
            pending.lock().unwrap().clear();
            bridge_for_reader.set_state(ConnectionState::Disconnected).await;
            if !bridge_for_reader.closing.load(Ordering::SeqCst)
                && !bridge_for_reader.permanently_failed.load(Ordering::SeqCst)
            {
                tokio::spawn(reconnect_with_backoff(bridge_for_reader));
            }
        });

        tokio::spawn(async move {
            while let Some(msg) = write_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    warn!("bridge: failed to write frame: {}", e);
                    break;
                }
            }
        });

        let hello_timeout = Duration::from_secs(self.config.request_timeout_secs);
        match self
            .request(MessageType::Hello, serde_json::json!({}), hello_timeout)
            .await
        {
            Ok(result) => {
                let caps: Capabilities = serde_json::from_value(result).unwrap_or_default();
                *self.capabilities.write().await = caps;
                self.set_state(ConnectionState::Ready).await;
                Ok(())
            }
            Err(VibeCraftError::PeerError(msg)) if msg.to_lowercase().contains("authentication") => {
                self.permanently_failed.store(true, Ordering::SeqCst);
                self.set_state(ConnectionState::Disconnected).await;
                Err(VibeCraftError::BridgeAuthFailed)
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected).await;
                Err(e)
            }
        }
    }

    /// Send a request, return the peer's result or a typed error. Safe to
    /// call concurrently from many callers; many in-flight requests allowed.
    pub async fn request(&self, message_type: MessageType, payload: Value, timeout: Duration) -> Result<Value, VibeCraftError> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id.clone(), tx);
        let _guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            id: id.clone(),
        };

        let envelope = BridgeRequest {
            id: id.clone(),
            kind: message_type.as_str().to_string(),
            token: self.config.token.clone(),
            payload,
        };
        self.send_envelope(&envelope)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response.into_result().map_err(VibeCraftError::PeerError),
            Ok(Err(_)) => Err(VibeCraftError::BridgeUnavailable),
            Err(_) => Err(VibeCraftError::RequestTimeout),
        }
    }

    fn send_envelope(&self, envelope: &BridgeRequest) -> Result<(), VibeCraftError> {
        let json = serde_json::to_string(envelope).map_err(|e| VibeCraftError::PeerError(e.to_string()))?;
        let tx = self.write_tx.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(Message::Text(json)).map_err(|_| VibeCraftError::BridgeUnavailable),
            None => Err(VibeCraftError::BridgeUnavailable),
        }
    }

    /// Drain and shut down. In-flight requests fail with `connection_lost`.
    pub async fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        self.set_state(ConnectionState::Closing).await;

        // Bounded grace period for in-flight requests to resolve naturally.
        for _ in 0..20 {
            if self.pending.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.pending.lock().unwrap().clear();
        *self.write_tx.lock().unwrap() = None;
        self.set_state(ConnectionState::Disconnected).await;
    }
}

async fn reconnect_with_backoff(bridge: Arc<ClientBridge>) {
    let base = Duration::from_secs(1);
    let cap = Duration::from_secs(30);
    let mut delay = base;

    loop {
        if bridge.closing.load(Ordering::SeqCst) || bridge.permanently_failed.load(Ordering::SeqCst) {
            return;
        }
        let jitter = rand::random::<f64>() * 0.25;
        tokio::time::sleep(delay.mul_f64(1.0 + jitter)).await;

        match bridge.connect_and_handshake().await {
            Ok(()) => {
                info!("bridge: reconnected successfully");
                return;
            }
            Err(VibeCraftError::BridgeAuthFailed) => return,
            Err(_) => {
                delay = std::cmp::min(delay * 2, cap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_defaults_disconnected() {
        // Construction alone must not attempt any I/O.
        let bridge = ClientBridge::new(BridgeConfig::default());
        assert!(!bridge.closing.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn request_without_connection_returns_bridge_unavailable() {
        let bridge = ClientBridge::new(BridgeConfig::default());
        let result = bridge
            .request(MessageType::CommandExecute, serde_json::json!({}), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(VibeCraftError::BridgeUnavailable)));
    }

    #[tokio::test]
    async fn pending_map_is_empty_after_unavailable_request() {
        let bridge = ClientBridge::new(BridgeConfig::default());
        let _ = bridge
            .request(MessageType::CommandExecute, serde_json::json!({}), Duration::from_millis(50))
            .await;
        assert!(bridge.pending.lock().unwrap().is_empty());
    }

    /// Binds an ephemeral localhost listener and accepts exactly one
    /// WebSocket connection, replying to `hello` immediately and then
    /// running `on_request` for every subsequent frame it receives.
    async fn spawn_mock_peer<F>(on_request: F) -> BridgeConfig
    where
        F: Fn(protocol::BridgeRequest) -> PeerAction + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let (mut write, mut read) = ws.split();

            while let Some(Ok(Message::Text(text))) = read.next().await {
                let req: protocol::BridgeRequest = serde_json::from_str(&text).unwrap();
                if req.kind == "hello" {
                    let response = protocol::BridgeResponse {
                        id: req.id,
                        ok: true,
                        result: Some(serde_json::json!({})),
                        error: None,
                    };
                    let _ = write.send(Message::Text(serde_json::to_string(&response).unwrap())).await;
                    continue;
                }

                match on_request(req) {
                    PeerAction::DelayThenReply(delay, response) => {
                        tokio::time::sleep(delay).await;
                        let _ = write.send(Message::Text(serde_json::to_string(&response).unwrap())).await;
                    }
                    PeerAction::Disconnect => break,
                }
            }
        });

        BridgeConfig {
            host: "127.0.0.1".to_string(),
            port,
            path: "/vibecraft".to_string(),
            token: None,
            request_timeout_secs: 30,
        }
    }

    enum PeerAction {
        DelayThenReply(Duration, protocol::BridgeResponse),
        Disconnect,
    }

    #[tokio::test]
    async fn scenario_e_request_times_out_before_a_deliberately_delayed_response() {
        let config = spawn_mock_peer(|req| {
            PeerAction::DelayThenReply(
                Duration::from_millis(200),
                protocol::BridgeResponse { id: req.id, ok: true, result: Some(serde_json::json!({})), error: None },
            )
        })
        .await;

        let bridge = ClientBridge::new(config);
        bridge.start().await.unwrap();

        let result = bridge
            .request(MessageType::CommandExecute, serde_json::json!({}), Duration::from_millis(30))
            .await;
        assert!(matches!(result, Err(VibeCraftError::RequestTimeout)));
        assert!(bridge.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scenario_f_peer_disconnect_fails_in_flight_requests_with_connection_lost() {
        let config = spawn_mock_peer(|_| PeerAction::Disconnect).await;

        let bridge = ClientBridge::new(config);
        bridge.start().await.unwrap();

        let (a, b, c) = tokio::join!(
            bridge.request(MessageType::CommandExecute, serde_json::json!({"n": 1}), Duration::from_millis(500)),
            bridge.request(MessageType::CommandExecute, serde_json::json!({"n": 2}), Duration::from_millis(500)),
            bridge.request(MessageType::CommandExecute, serde_json::json!({"n": 3}), Duration::from_millis(500)),
        );

        for result in [a, b, c] {
            assert!(matches!(result, Err(VibeCraftError::BridgeUnavailable)));
        }
        assert!(bridge.pending.lock().unwrap().is_empty());
    }
}

//! WebSocket endpoint and update fan-out.
//!
//! Every accepted paint is published by the board to a broadcast channel;
//! each connection task forwards the channel to its socket and answers its
//! own requests.

use crate::protocol::{
    ClientMessage, ProtocolError, Request, ServerMessage, encode_pixels, validate_chunk,
    validate_paint,
};
use axum::{
    Router,
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use paintboard_core::{CanvasService, PixelUpdate, SubscriptionId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 4096;

/// Shared state of all connections.
pub struct BroadcastHub {
    service: Arc<CanvasService>,
    updates: broadcast::Sender<PixelUpdate>,
    subscription: SubscriptionId,
    peers: DashMap<Uuid, SocketAddr>,
    accepting: AtomicBool,
    disconnect: CancellationToken,
    connections: TaskTracker,
}

impl BroadcastHub {
    pub fn new(service: Arc<CanvasService>) -> Arc<Self> {
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        let tx = updates.clone();
        let subscription = service.subscribe(move |update| {
            // No receivers is fine.
            let _ = tx.send(*update);
        });
        Arc::new(Self {
            service,
            updates,
            subscription,
            peers: DashMap::new(),
            accepting: AtomicBool::new(true),
            disconnect: CancellationToken::new(),
            connections: TaskTracker::new(),
        })
    }

    pub fn service(&self) -> &Arc<CanvasService> {
        &self.service
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Reject paints from now on. Reads keep working.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Close every open connection, and any opened afterwards.
    pub fn disconnect_all(&self) {
        self.disconnect.cancel();
    }

    /// Wait until every connection task has finished, up to `timeout`.
    /// Returns whether the hub drained.
    pub async fn wait_for_peers(&self, timeout: Duration) -> bool {
        self.connections.close();
        tokio::time::timeout(timeout, self.connections.wait()).await.is_ok()
    }

    fn welcome(&self, connection_id: Uuid) -> ServerMessage {
        ServerMessage::Welcome {
            connection_id: connection_id.to_string(),
            width: self.service.width(),
            height: self.service.height(),
            colors: self.service.palette().colors().to_vec(),
        }
    }

    /// Answer one text frame. Paints produce no direct reply; their update
    /// arrives through the broadcast like everyone else's.
    pub fn handle_text(&self, text: &str) -> Option<ServerMessage> {
        match Request::parse(text) {
            Ok(Request { seq, message }) => match self.handle_request(seq, message) {
                Ok(reply) => reply,
                Err(e) => Some(ServerMessage::error(seq, &e)),
            },
            Err((seq, e)) => Some(ServerMessage::error(seq, &e)),
        }
    }

    fn handle_request(
        &self,
        seq: Option<u64>,
        message: ClientMessage,
    ) -> Result<Option<ServerMessage>, ProtocolError> {
        match message {
            ClientMessage::GetBoard => Ok(Some(ServerMessage::Board {
                seq,
                width: self.service.width(),
                height: self.service.height(),
                data: encode_pixels(&self.service.get_board()),
            })),
            ClientMessage::GetChunk { x, y, cx, cy } => {
                let chunk = validate_chunk(x, y, cx, cy)?;
                let data = self
                    .service
                    .get_board_area(chunk.x, chunk.y, chunk.cx, chunk.cy);
                Ok(Some(ServerMessage::Chunk {
                    seq,
                    x: chunk.x,
                    y: chunk.y,
                    cx: chunk.cx,
                    cy: chunk.cy,
                    data: encode_pixels(&data),
                }))
            }
            ClientMessage::Paint { x, y, color } => {
                if !self.is_accepting() {
                    return Err(ProtocolError::Stopping);
                }
                let paint = validate_paint(
                    x,
                    y,
                    color,
                    self.service.width(),
                    self.service.height(),
                    self.service.palette().len(),
                )?;
                self.service.set_pixel(paint.x, paint.y, paint.color);
                Ok(None)
            }
        }
    }
}

impl Drop for BroadcastHub {
    fn drop(&mut self) {
        self.service.unsubscribe(self.subscription);
    }
}

/// HTTP routes of the board server.
pub fn router(hub: Arc<BroadcastHub>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/board/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(hub)
}

async fn index() -> &'static str {
    "Paintboard Server - Connect via WebSocket at /board/ws"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(hub): State<Arc<BroadcastHub>>,
) -> impl IntoResponse {
    let connections = hub.connections.clone();
    ws.on_upgrade(move |socket| connections.track_future(handle_socket(socket, addr, hub)))
}

type Sink = SplitSink<WebSocket, Message>;

async fn send_json(sender: &mut Sink, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, hub: Arc<BroadcastHub>) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the welcome so no update after it is missed.
    let mut updates = hub.updates.subscribe();
    hub.peers.insert(connection_id, addr);
    info!(%connection_id, %addr, peers = hub.peer_count(), "Peer connected");

    if send_json(&mut sender, &hub.welcome(connection_id)).await.is_ok() {
        serve_peer(connection_id, &hub, &mut sender, &mut receiver, &mut updates).await;
    }

    hub.peers.remove(&connection_id);
    info!(%connection_id, peers = hub.peer_count(), "Peer disconnected");
}

async fn serve_peer(
    connection_id: Uuid,
    hub: &BroadcastHub,
    sender: &mut Sink,
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    updates: &mut broadcast::Receiver<PixelUpdate>,
) {
    loop {
        tokio::select! {
            _ = hub.disconnect.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = hub.handle_text(text.as_str()) {
                        if let ServerMessage::Error { id, message, .. } = &reply {
                            debug!(%connection_id, %id, %message, "Rejected request");
                        }
                        if send_json(sender, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    let err = ProtocolError::Parameter("binary frames are not supported".to_string());
                    if send_json(sender, &ServerMessage::error(None, &err)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // Ping/pong
                Some(Err(e)) => {
                    warn!(%connection_id, error = %e, "WebSocket error");
                    break;
                }
            },

            update = updates.recv() => match update {
                Ok(PixelUpdate { x, y, color }) => {
                    if send_json(sender, &ServerMessage::Update { x, y, color }).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%connection_id, skipped, "Peer fell behind, updates dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

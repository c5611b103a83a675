//! Connection gateway – WebSocket termination and fan-out.
//!
//! ## Routes
//!
//! | Route              | Purpose                                        |
//! |--------------------|------------------------------------------------|
//! | `GET /ws`          | WebSocket upgrade; one connection per client   |
//! | `GET /health`      | `{status, players, rooms, connections}`        |
//! | `GET /rooms/{id}`  | `RoomInfo` for a live room, 404 otherwise      |
//!
//! ## Threading model
//!
//! ```text
//! reader task (per conn)         Hub (one Mutex)                writer task (per conn)
//! ──────────────────────         ───────────────────────        ──────────────────────
//! ws frame → ClientEvent  ──►    relay.handle()                 outbox.recv()
//!                                → Vec<Delivery>                → ws.send(frame)
//!                                → outbox.send(frame) ─────────►
//! ```
//!
//! Registry mutation, scope computation and enqueueing onto the unbounded
//! per-connection outboxes all happen under the hub lock, so two concurrent
//! events are never interleaved and every member of a room sees room-wide
//! events in the same order. Socket writes happen outside the lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::{ClientEvent, RoomInfo, ServerEvent, Welcome};
use crate::relay::{Delivery, EventRelay};
use crate::types::{ConnId, RelayStats};

/// Outbound frame queue for one connection.
pub type Outbox = mpsc::UnboundedReceiver<Utf8Bytes>;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port for both the WebSocket and the HTTP status routes.
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3001,
        }
    }
}

impl GatewayConfig {
    /// Defaults, overlaid with the TOML file at `path` when given.
    pub fn load(path: Option<&std::path::Path>) -> crate::error::Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?;
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Toml),
            );
        }
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Single owner of the relay plus the outbound queue of every open
/// connection.
pub struct Hub {
    inner: Mutex<HubInner>,
}

struct HubInner {
    relay: EventRelay,
    outboxes: HashMap<ConnId, mpsc::UnboundedSender<Utf8Bytes>>,
}

impl Hub {
    pub fn new(relay: EventRelay) -> Self {
        Self {
            inner: Mutex::new(HubInner {
                relay,
                outboxes: HashMap::new(),
            }),
        }
    }

    /// Register a new connection. Its outbox already holds the `connected`
    /// greeting carrying the assigned id.
    pub fn open(&self) -> (ConnId, Outbox) {
        let conn = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut inner = self.inner.lock();
        inner.outboxes.insert(conn.clone(), tx);
        inner.deliver(vec![Delivery::to_one(
            &conn,
            ServerEvent::Connected(Welcome { id: conn.clone() }),
        )]);

        (conn, rx)
    }

    /// Apply one inbound event and enqueue its fan-out atomically.
    pub fn dispatch(&self, conn: &str, event: ClientEvent) {
        let name = event.name();
        let mut inner = self.inner.lock();
        let deliveries = inner.relay.handle(conn, event);
        debug!(conn_id = conn, event = name, deliveries = deliveries.len(), "dispatched");
        inner.deliver(deliveries);
    }

    /// The connection's transport closed: drop its outbox and tell its room.
    /// Safe to call more than once.
    pub fn close(&self, conn: &str) {
        let mut inner = self.inner.lock();
        inner.outboxes.remove(conn);
        let deliveries = inner.relay.disconnect(conn);
        inner.deliver(deliveries);
    }

    pub fn stats(&self) -> RelayStats {
        self.inner.lock().relay.stats()
    }

    pub fn room_info(&self, room_id: &str) -> Option<RoomInfo> {
        self.inner.lock().relay.room_info(room_id)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().outboxes.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(EventRelay::new())
    }
}

impl HubInner {
    /// Serialise each event once and push it to every target's outbox.
    ///
    /// Targets without an outbox (already closed) are skipped; a send to a
    /// writer that has gone away is ignored because its reader will call
    /// [`Hub::close`] shortly.
    fn deliver(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            let frame = match delivery.event.to_json() {
                Ok(json) => Utf8Bytes::from(json),
                Err(e) => {
                    warn!(event = delivery.event.name(), error = %e, "failed to encode event");
                    continue;
                }
            };
            for target in &delivery.targets {
                if let Some(outbox) = self.outboxes.get(target) {
                    let _ = outbox.send(frame.clone());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RelayGateway
// ---------------------------------------------------------------------------

/// Serves the hub over HTTP/WebSocket.
///
/// Call [`RelayGateway::run`] inside a Tokio runtime to start serving until
/// SIGINT.
pub struct RelayGateway {
    config: GatewayConfig,
    hub: Arc<Hub>,
}

impl RelayGateway {
    pub fn new(config: GatewayConfig, hub: Arc<Hub>) -> Self {
        Self { config, hub }
    }

    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/rooms/{room_id}", get(room_handler))
            .with_state(self.hub.clone())
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind relay gateway on {addr}"))?;

        self.serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Relay gateway shutting down (SIGINT)");
        })
        .await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener
            .local_addr()
            .context("Relay listener has no local address")?;
        info!(%local, "Relay gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Relay gateway server error")
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// One connection: a writer task draining the outbox, and this task reading
/// frames in order until the client goes away.
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (conn, mut outbox) = hub.open();
    info!(conn_id = %conn, "Player connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if ws_tx.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match ClientEvent::from_json(text.as_str()) {
                Ok(event) => {
                    if let ClientEvent::JoinRoom(join) = &event {
                        info!(conn_id = %conn, name = %join.name, room = %join.room_id, role = %join.role, "Player joining room");
                    }
                    hub.dispatch(&conn, event);
                }
                Err(e) => warn!(conn_id = %conn, error = %e, "Dropping malformed frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(conn_id = %conn, error = %e, "WebSocket read error");
                break;
            }
        }
    }

    hub.close(&conn);
    let _ = writer.await;
    info!(conn_id = %conn, "Player disconnected");
}

async fn health_handler(State(hub): State<Arc<Hub>>) -> impl IntoResponse {
    let stats = hub.stats();
    Json(serde_json::json!({
        "status": "ok",
        "players": stats.tracked_players,
        "rooms": stats.active_rooms,
        "connections": hub.connection_count(),
    }))
}

async fn room_handler(
    Path(room_id): Path<String>,
    State(hub): State<Arc<Hub>>,
) -> Result<Json<RoomInfo>, StatusCode> {
    hub.room_info(&room_id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

//! Relay bridge – Tokio thread owning the WebSocket, delivering events.
//!
//! ## Threading model
//!
//! ```text
//! Owner thread               │  Bridge thread (Tokio)
//! ───────────────────────── │ ─────────────────────────
//! SyncClient::poll()         │ run_bridge()
//!   → events.try_recv()     │   stream.next()
//!   → store.apply(event)    │   → events.server(ServerEvent)
//!                            │
//!   SyncClient::send(...)    │
//!   → commands.send(cmd)    │   commands.recv()
//!                            │   → sink.send(frame)
//! ```
//!
//! The owner thread never touches async code. Outbound events are
//! fire-and-forget: anything queued while the socket is down is discarded
//! when the next session opens, because the relay would reject it before a
//! fresh join anyway.
//!
//! Lifecycle events (`Connected`, `Disconnected`, `Reconnecting`, `GaveUp`)
//! are always delivered. Relay frames are capped at `event_buffer` waiting
//! in the queue; one more ends the session, so the owner sees `Disconnected`
//! and re-joins into a fresh snapshot instead of patching a mirror with a
//! hole in it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::client::events::SyncEvent;
use crate::error::Result;
use crate::protocol::{ClientEvent, ServerEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Commands (owner thread → bridge thread)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum BridgeCommand {
    Send(ClientEvent),
    Close,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Relay WebSocket endpoint (e.g. "ws://localhost:3001/ws")
    pub url: String,
    /// Reconnect attempts after a failure before giving up
    pub reconnect_attempts: u32,
    /// Fixed wait between attempts, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Relay frames allowed to wait for `poll()` before the session is
    /// dropped and resynced
    pub event_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3001/ws".into(),
            reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
            event_buffer: 1024,
        }
    }
}

impl BridgeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Handle (given to the owner thread)
// ---------------------------------------------------------------------------

pub struct BridgeHandle {
    events: Receiver<SyncEvent>,
    pending: Arc<AtomicUsize>,
    commands: mpsc::UnboundedSender<BridgeCommand>,
    thread: thread::JoinHandle<()>,
}

impl BridgeHandle {
    /// Drain all pending events without blocking.
    pub fn poll(&self) -> Vec<SyncEvent> {
        let mut out = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(ev) => {
                    if matches!(ev, SyncEvent::Server(_)) {
                        self.pending.fetch_sub(1, Ordering::AcqRel);
                    }
                    out.push(ev);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    /// Queue an outbound event (fire-and-forget).
    pub fn send(&self, event: ClientEvent) {
        if self.commands.send(BridgeCommand::Send(event)).is_err() {
            debug!("[bridge] Bridge gone – dropping outbound event");
        }
    }

    /// Ask the bridge to close the socket and exit.
    pub fn close(&self) {
        let _ = self.commands.send(BridgeCommand::Close);
    }

    pub fn is_alive(&self) -> bool {
        !self.thread.is_finished()
    }
}

// ---------------------------------------------------------------------------
// Spawning the bridge thread
// ---------------------------------------------------------------------------

/// Spawn the bridge thread and return a [`BridgeHandle`] for the caller.
pub fn spawn(config: BridgeConfig) -> Result<BridgeHandle> {
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<SyncEvent>();
    let (command_tx, command_rx) = mpsc::unbounded_channel::<BridgeCommand>();
    let pending = Arc::new(AtomicUsize::new(0));
    let events = EventSink {
        tx: event_tx,
        pending: pending.clone(),
        capacity: config.event_buffer.max(1),
    };

    let thread = thread::Builder::new()
        .name("construct-sync-bridge".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("[bridge] Failed to create Tokio runtime: {}", e);
                    events.lifecycle(SyncEvent::Disconnected {
                        reason: format!("runtime unavailable: {}", e),
                    });
                    return;
                }
            };
            rt.block_on(run_bridge(config, events, command_rx));
        })?;

    Ok(BridgeHandle {
        events: event_rx,
        pending,
        commands: command_tx,
        thread,
    })
}

// ---------------------------------------------------------------------------
// Inbound queue
// ---------------------------------------------------------------------------

/// Bridge side of the event channel. `pending` counts relay frames the owner
/// has not polled yet; the handle decrements it.
struct EventSink {
    tx: Sender<SyncEvent>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

impl EventSink {
    fn lifecycle(&self, ev: SyncEvent) {
        if self.tx.send(ev).is_err() {
            debug!("[bridge] Owner gone – dropping event");
        }
    }

    /// Queue a relay frame. Returns `false` if the owner is `capacity`
    /// frames behind and the frame was not queued.
    fn server(&self, ev: ServerEvent) -> bool {
        if self.pending.load(Ordering::Acquire) >= self.capacity {
            return false;
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.lifecycle(SyncEvent::Server(ev));
        true
    }
}

// ---------------------------------------------------------------------------
// Async bridge implementation
// ---------------------------------------------------------------------------

enum SessionEnd {
    /// Owner asked to close, or dropped the handle.
    Closed,
    Lost(String),
}

async fn run_bridge(
    config: BridgeConfig,
    events: EventSink,
    mut commands: mpsc::UnboundedReceiver<BridgeCommand>,
) {
    let mut failures: u32 = 0;

    loop {
        info!("[bridge] Connecting to {}", config.url);

        match connect_async(config.url.as_str()).await {
            Ok((ws, _)) => {
                if !discard_stale(&mut commands) {
                    return;
                }
                info!("[bridge] Connected");
                failures = 0;
                events.lifecycle(SyncEvent::Connected);

                match run_session(ws, &events, &mut commands).await {
                    SessionEnd::Closed => {
                        info!("[bridge] Closed by client");
                        events.lifecycle(SyncEvent::Disconnected {
                            reason: "closed by client".into(),
                        });
                        return;
                    }
                    SessionEnd::Lost(reason) => {
                        warn!("[bridge] Connection lost: {}", reason);
                        events.lifecycle(SyncEvent::Disconnected { reason });
                    }
                }
            }
            Err(e) => {
                warn!("[bridge] Connect failed: {}", e);
            }
        }

        failures += 1;
        if failures > config.reconnect_attempts {
            error!("[bridge] Giving up after {} attempts", config.reconnect_attempts);
            events.lifecycle(SyncEvent::GaveUp {
                attempts: config.reconnect_attempts,
            });
            return;
        }

        events.lifecycle(SyncEvent::Reconnecting { attempt: failures });
        if !wait_offline(config.reconnect_delay(), &mut commands).await {
            return;
        }
    }
}

/// Drive one open socket until it closes or the owner closes it.
async fn run_session(
    ws: WsStream,
    events: &EventSink,
    commands: &mut mpsc::UnboundedReceiver<BridgeCommand>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            // Inbound: frame from the relay
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => match ServerEvent::from_json(text.as_str()) {
                    Ok(ev) => {
                        if !events.server(ev) {
                            warn!("[bridge] Event channel full – dropping session to resync");
                            let _ = sink.close().await;
                            return SessionEnd::Lost("inbound event queue full".into());
                        }
                    }
                    Err(e) => warn!("[bridge] Undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return SessionEnd::Lost("server closed connection".into());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
            },

            // Outbound: command from the owner thread
            cmd = commands.recv() => match cmd {
                Some(BridgeCommand::Send(ev)) => match ev.to_json() {
                    Ok(json) => {
                        if let Err(e) = sink.send(Message::text(json)).await {
                            return SessionEnd::Lost(e.to_string());
                        }
                    }
                    Err(e) => warn!("[bridge] Failed to encode {}: {}", ev.name(), e),
                },
                Some(BridgeCommand::Close) | None => {
                    let _ = sink.close().await;
                    return SessionEnd::Closed;
                }
            },
        }
    }
}

/// Drop events queued while no session was open. Returns `false` if the
/// owner asked to close meanwhile.
fn discard_stale(commands: &mut mpsc::UnboundedReceiver<BridgeCommand>) -> bool {
    loop {
        match commands.try_recv() {
            Ok(BridgeCommand::Send(ev)) => debug!("[bridge] Discarding stale {}", ev.name()),
            Ok(BridgeCommand::Close) => return false,
            Err(mpsc::error::TryRecvError::Empty) => return true,
            Err(mpsc::error::TryRecvError::Disconnected) => return false,
        }
    }
}

/// Sleep out the reconnect delay while still honouring `Close`.
async fn wait_offline(
    delay: Duration,
    commands: &mut mpsc::UnboundedReceiver<BridgeCommand>,
) -> bool {
    let deadline = tokio::time::sleep(delay);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return true,
            cmd = commands.recv() => match cmd {
                Some(BridgeCommand::Send(ev)) => {
                    debug!("[bridge] Offline – dropping {}", ev.name());
                }
                Some(BridgeCommand::Close) | None => return false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RoomInfo, Welcome};

    /// Accept one socket on an ephemeral port, send `frames`, then close.
    fn scripted_relay(frames: Vec<ServerEvent>) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        listener.set_nonblocking(true).unwrap();

        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                for ev in frames {
                    if ws.send(Message::text(ev.to_json().unwrap())).await.is_err() {
                        return;
                    }
                }
                let _ = ws.close(None).await;
                while let Some(Ok(_)) = ws.next().await {}
            });
        });

        format!("ws://{addr}/ws")
    }

    fn welcome() -> ServerEvent {
        ServerEvent::Connected(Welcome { id: "x".into() })
    }

    /// Wait for the bridge thread to exit without polling, then drain.
    fn events_after_exit(handle: &BridgeHandle) -> Vec<SyncEvent> {
        for _ in 0..500 {
            if !handle.is_alive() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!handle.is_alive(), "bridge thread still running");
        handle.poll()
    }

    fn no_retry(url: String) -> BridgeConfig {
        BridgeConfig {
            url,
            reconnect_attempts: 0,
            reconnect_delay_ms: 10,
            event_buffer: 2,
        }
    }

    #[test]
    fn default_config_matches_relay_defaults() {
        let c = BridgeConfig::default();
        assert_eq!(c.url, "ws://localhost:3001/ws");
        assert_eq!(c.reconnect_attempts, 5);
        assert_eq!(c.reconnect_delay(), Duration::from_millis(1000));
        assert_eq!(c.event_buffer, 1024);
    }

    #[test]
    fn unreachable_relay_gives_up() {
        let config = BridgeConfig {
            // Port 9 (discard) is closed on test hosts; connect fails fast.
            url: "ws://127.0.0.1:9/ws".into(),
            reconnect_attempts: 2,
            reconnect_delay_ms: 10,
            event_buffer: 16,
        };
        let handle = spawn(config).unwrap();

        let mut seen = Vec::new();
        for _ in 0..500 {
            seen.extend(handle.poll());
            if matches!(seen.last(), Some(SyncEvent::GaveUp { .. })) {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(
            seen,
            vec![
                SyncEvent::Reconnecting { attempt: 1 },
                SyncEvent::Reconnecting { attempt: 2 },
                SyncEvent::GaveUp { attempts: 2 },
            ]
        );
    }

    #[test]
    fn lifecycle_events_survive_an_unpolled_queue() {
        let handle = spawn(no_retry(scripted_relay(vec![welcome()]))).unwrap();
        let seen = events_after_exit(&handle);

        assert_eq!(seen.len(), 4, "{seen:?}");
        assert_eq!(seen[0], SyncEvent::Connected);
        assert_eq!(seen[1], SyncEvent::Server(welcome()));
        assert!(matches!(seen[2], SyncEvent::Disconnected { .. }));
        assert_eq!(seen[3], SyncEvent::GaveUp { attempts: 0 });
    }

    #[test]
    fn overflowing_relay_frames_end_the_session() {
        let mut frames = vec![welcome()];
        for n in 1..=4 {
            frames.push(ServerEvent::RoomInfo(RoomInfo {
                room_id: "class101".into(),
                player_count: n,
            }));
        }
        let handle = spawn(no_retry(scripted_relay(frames))).unwrap();
        let seen = events_after_exit(&handle);

        let relayed = seen
            .iter()
            .filter(|ev| matches!(ev, SyncEvent::Server(_)))
            .count();
        assert_eq!(relayed, 2);
        assert_eq!(seen.first(), Some(&SyncEvent::Connected));
        assert_eq!(
            &seen[seen.len() - 2..],
            &[
                SyncEvent::Disconnected {
                    reason: "inbound event queue full".into(),
                },
                SyncEvent::GaveUp { attempts: 0 },
            ]
        );
    }
}

//! Events delivered from the bridge thread to the owning thread.
//!
//! The bridge translates WebSocket frames and connection lifecycle changes
//! into [`SyncEvent`]s and queues them for [`crate::client::SyncClient::poll`].

use crate::protocol::ServerEvent;

/// A single event from the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------
    /// WebSocket open. The relay's `connected` greeting follows as a
    /// [`SyncEvent::Server`].
    Connected,
    /// Connection closed or lost. `reason` is human-readable.
    Disconnected { reason: String },
    /// Waiting before reconnect attempt number `attempt` (1-based).
    Reconnecting { attempt: u32 },
    /// All reconnect attempts used up; the bridge thread has exited.
    GaveUp { attempts: u32 },

    // ------------------------------------------------------------------
    // Relay traffic
    // ------------------------------------------------------------------
    Server(ServerEvent),
}

/// Transport state as seen by the client store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Reconnect budget exhausted. Only an explicit `connect()` leaves it.
    Failed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

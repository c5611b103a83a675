//! Construct Sync
//!
//! Room-based real-time state relay for a shared 3D classroom, plus the
//! client-side synchronization store that talks to it.
//!
//! ## Architecture
//!
//! ```text
//! RelayGateway  (gateway.rs)   ← axum WebSocket + status routes
//!   └── Hub     (gateway.rs)   ← one lock over relay + per-connection outboxes
//!         └── EventRelay  (relay.rs)    ← event → registry op → scoped fan-out
//!               └── RoomRegistry (registry.rs) ← rooms and player records
//!
//! SyncClient    (client/session.rs)
//!   ├── SyncStore (client/store.rs)   ← Self + RemoteMirror
//!   └── bridge    (client/bridge.rs)  ← Tokio thread owning the WebSocket
//! ```
//!
//! `protocol` and `types` carry no runtime and are always compiled. The relay
//! lives behind the `server` feature, the store and bridge behind `client`.

// Protocol types are always available.
pub mod error;
pub mod protocol;
pub mod types;

// Relay side requires the `server` feature.
#[cfg(feature = "server")]
pub mod gateway;
#[cfg(feature = "server")]
pub mod registry;
#[cfg(feature = "server")]
pub mod relay;

// Participant side requires the `client` feature.
#[cfg(feature = "client")]
pub mod client;

pub use error::{Result, SyncError};
#[cfg(feature = "server")]
pub use gateway::{GatewayConfig, Hub, RelayGateway};
#[cfg(feature = "server")]
pub use registry::RoomRegistry;
#[cfg(feature = "server")]
pub use relay::{Delivery, EventRelay};
pub use protocol::{ClientEvent, ServerEvent};
pub use types::{ConnId, LessonRef, PlayerRecord, RelayStats, Role, RoomId, Vec3};

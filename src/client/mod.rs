//! Client side: local participant state, remote mirror and the WebSocket
//! bridge to the relay.

pub mod bridge;
pub mod events;
pub mod mirror;
pub mod session;
pub mod store;

pub use bridge::{BridgeConfig, BridgeHandle};
pub use events::{ConnectionState, SyncEvent};
pub use mirror::{RemoteMirror, RemotePlayer};
pub use session::SyncClient;
pub use store::{LocalPlayer, Participant, SyncStore};

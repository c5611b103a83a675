//! `SyncClient` – store plus bridge, driven from the owner's frame loop.
//!
//! ```no_run
//! use construct_sync::client::{BridgeConfig, SyncClient};
//! use construct_sync::types::{Role, Vec3};
//!
//! let mut client = SyncClient::new(BridgeConfig::new("ws://localhost:3001/ws"), "Alice", Role::Student);
//! client.connect().unwrap();
//!
//! loop {
//!     for event in client.poll() {
//!         // react to SyncEvent::Server(..) in the presentation layer
//!         let _ = event;
//!     }
//!     if client.store().local().connection().is_connected()
//!         && client.store().local().room_id().is_none()
//!     {
//!         client.join_room("class101");
//!     }
//!     client.set_position(Vec3::new(0.0, 1.7, 4.0));
//!     # break;
//! }
//! ```

use log::info;

use crate::client::bridge::{self, BridgeConfig, BridgeHandle};
use crate::client::events::{ConnectionState, SyncEvent};
use crate::client::store::SyncStore;
use crate::error::Result;
use crate::protocol::ClientEvent;
use crate::types::{LessonRef, Role, RoomId, Vec3};

pub struct SyncClient {
    config: BridgeConfig,
    bridge: Option<BridgeHandle>,
    store: SyncStore,
}

impl SyncClient {
    pub fn new(config: BridgeConfig, name: impl Into<String>, role: Role) -> Self {
        Self {
            config,
            bridge: None,
            store: SyncStore::new(name, role),
        }
    }

    pub fn store(&self) -> &SyncStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Start the bridge. No-op while a bridge is already running.
    pub fn connect(&mut self) -> Result<()> {
        if self.bridge.as_ref().is_some_and(BridgeHandle::is_alive) {
            return Ok(());
        }
        self.store.set_connection_state(ConnectionState::Connecting);
        self.bridge = Some(bridge::spawn(self.config.clone())?);
        Ok(())
    }

    /// Close the socket and clear room state.
    pub fn disconnect(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.close();
        }
        self.store.set_connection_state(ConnectionState::Disconnected);
    }

    // -----------------------------------------------------------------------
    // poll() – call once per frame
    // -----------------------------------------------------------------------

    /// Drain the bridge, apply everything to the store and return what was
    /// applied so the caller can react (chat toasts, avatars).
    pub fn poll(&mut self) -> Vec<SyncEvent> {
        let events = match &self.bridge {
            Some(b) => b.poll(),
            None => return Vec::new(),
        };

        for event in &events {
            match event {
                SyncEvent::Connected => {
                    self.store.set_connection_state(ConnectionState::Connected);
                }
                SyncEvent::Reconnecting { .. } => {
                    self.store
                        .set_connection_state(ConnectionState::Reconnecting);
                }
                SyncEvent::Disconnected { .. } => {
                    self.store
                        .set_connection_state(ConnectionState::Disconnected);
                }
                SyncEvent::GaveUp { attempts } => {
                    info!("Relay unreachable after {} attempts", attempts);
                    self.store.set_connection_state(ConnectionState::Failed);
                    self.bridge = None;
                }
                SyncEvent::Server(ev) => {
                    if let Some(follow_up) = self.store.apply(ev.clone()) {
                        self.send(follow_up);
                    }
                }
            }
        }
        events
    }

    // -----------------------------------------------------------------------
    // Local input
    // -----------------------------------------------------------------------

    pub fn join_room(&mut self, room_id: impl Into<RoomId>) {
        for ev in self.store.join_room(room_id) {
            self.send(ev);
        }
    }

    /// Re-send the last join. Reconnecting never does this on its own.
    pub fn rejoin(&mut self) {
        for ev in self.store.rejoin() {
            self.send(ev);
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        let ev = self.store.set_position(position);
        self.send_opt(ev);
    }

    pub fn set_looking_at_zone(&mut self, zone_id: Option<String>) {
        let ev = self.store.set_looking_at_zone(zone_id);
        self.send_opt(ev);
    }

    pub fn load_lesson(&mut self, lesson: LessonRef) {
        let ev = self.store.load_lesson(lesson);
        self.send_opt(ev);
    }

    pub fn set_slide(&mut self, slide: u32) {
        let ev = self.store.set_slide(slide);
        self.send_opt(ev);
    }

    pub fn next_slide(&mut self) {
        let ev = self.store.next_slide();
        self.send_opt(ev);
    }

    pub fn previous_slide(&mut self) {
        let ev = self.store.previous_slide();
        self.send_opt(ev);
    }

    pub fn broadcast_lesson(&mut self) {
        let ev = self.store.broadcast_lesson();
        self.send_opt(ev);
    }

    pub fn broadcast_slide(&mut self) {
        let ev = self.store.broadcast_slide();
        self.send_opt(ev);
    }

    pub fn send_chat(&mut self, text: &str) {
        let ev = self.store.send_chat(text);
        self.send_opt(ev);
    }

    fn send_opt(&self, event: Option<ClientEvent>) {
        if let Some(ev) = event {
            self.send(ev);
        }
    }

    fn send(&self, event: ClientEvent) {
        if let Some(bridge) = &self.bridge {
            bridge.send(event);
        }
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.close();
        }
    }
}

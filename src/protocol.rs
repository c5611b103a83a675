//! Relay wire protocol.
//!
//! This module owns **every message that crosses the WebSocket** between the
//! relay and a participant's client.
//!
//! ## Framing
//!
//! Each WebSocket text frame carries exactly one event, adjacently tagged:
//!
//! ```json
//! {"event": "player-move", "data": {"position": {"x": 1.0, "y": 1.7, "z": 2.0}}}
//! ```
//!
//! | Direction       | Enum                         |
//! |-----------------|------------------------------|
//! | client → relay  | [`ClientEvent`]              |
//! | relay → client  | [`ServerEvent`]              |
//!
//! ## Design rules
//!
//! 1. Event names are kebab-case, payload fields camelCase.
//! 2. Slides are `u32`; a negative slide is a decode error, not a value.
//! 3. Older clients' field spellings (`playerName`, `currentSlide`,
//!    `message`) are accepted as aliases on decode.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::types::{ConnId, LessonRef, PlayerRecord, Role, RoomId, Vec3};

// ---------------------------------------------------------------------------
// Inbound payloads  (client → relay)
// ---------------------------------------------------------------------------

/// Join (or switch to) a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: RoomId,
    #[serde(default = "default_player_name", alias = "playerName")]
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "Vec3::spawn_point")]
    pub position: Vec3,
}

fn default_player_name() -> String {
    "Student".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerMove {
    pub position: Vec3,
}

/// `zoneId: null` (or omitted) clears the focus.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneFocus {
    #[serde(default, alias = "lookingAtZoneId")]
    pub zone_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonLoad {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "currentSlide")]
    pub slide: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlideChange {
    #[serde(alias = "currentSlide")]
    pub slide: u32,
}

/// Lesson directive. Same shape inbound (`teacher-broadcast-lesson`) and
/// outbound (`teacher-lesson-broadcast`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLesson {
    pub lesson_data: LessonRef,
}

/// Slide directive. Same shape in both directions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeacherSlide {
    pub slide: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSend {
    #[serde(alias = "message")]
    pub text: String,
}

// ---------------------------------------------------------------------------
// Outbound payloads  (relay → client)
// ---------------------------------------------------------------------------

/// First frame on every connection: tells the client its own id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Welcome {
    pub id: ConnId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub player_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerMoved {
    pub id: ConnId,
    pub position: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerZoneUpdate {
    pub id: ConnId,
    #[serde(alias = "lookingAtZoneId")]
    pub zone_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLessonUpdate {
    pub id: ConnId,
    pub lesson_id: String,
    #[serde(alias = "lessonTitle")]
    pub title: String,
    #[serde(alias = "currentSlide")]
    pub slide: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSlideUpdate {
    pub id: ConnId,
    #[serde(alias = "currentSlide")]
    pub slide: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: ConnId,
    pub name: String,
    #[serde(alias = "message")]
    pub text: String,
    /// Milliseconds since the Unix epoch, stamped by the relay.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerLeft {
    pub id: ConnId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Event enums
// ---------------------------------------------------------------------------

/// Every event a client may send to the relay.
///
/// Transport-level disconnect is not an event; the gateway reports it to the
/// relay directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom(JoinRoom),
    PlayerMove(PlayerMove),
    PlayerLookingAtZone(ZoneFocus),
    LessonLoad(LessonLoad),
    SlideChange(SlideChange),
    TeacherBroadcastLesson(TeacherLesson),
    TeacherBroadcastSlide(TeacherSlide),
    ChatMessage(ChatSend),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => names::JOIN_ROOM,
            ClientEvent::PlayerMove(_) => names::PLAYER_MOVE,
            ClientEvent::PlayerLookingAtZone(_) => names::PLAYER_LOOKING_AT_ZONE,
            ClientEvent::LessonLoad(_) => names::LESSON_LOAD,
            ClientEvent::SlideChange(_) => names::SLIDE_CHANGE,
            ClientEvent::TeacherBroadcastLesson(_) => names::TEACHER_BROADCAST_LESSON,
            ClientEvent::TeacherBroadcastSlide(_) => names::TEACHER_BROADCAST_SLIDE,
            ClientEvent::ChatMessage(_) => names::CHAT_MESSAGE,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(SyncError::Decode)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(SyncError::Encode)
    }
}

/// Every event the relay may send to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Connected(Welcome),
    RoomPlayers(Vec<PlayerRecord>),
    PlayerJoined(PlayerRecord),
    RoomInfo(RoomInfo),
    PlayerMoved(PlayerMoved),
    PlayerZoneUpdate(PlayerZoneUpdate),
    PlayerLessonUpdate(PlayerLessonUpdate),
    PlayerSlideUpdate(PlayerSlideUpdate),
    TeacherLessonBroadcast(TeacherLesson),
    TeacherSlideBroadcast(TeacherSlide),
    ChatMessage(ChatMessage),
    PlayerLeft(PlayerLeft),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected(_) => names::CONNECTED,
            ServerEvent::RoomPlayers(_) => names::ROOM_PLAYERS,
            ServerEvent::PlayerJoined(_) => names::PLAYER_JOINED,
            ServerEvent::RoomInfo(_) => names::ROOM_INFO,
            ServerEvent::PlayerMoved(_) => names::PLAYER_MOVED,
            ServerEvent::PlayerZoneUpdate(_) => names::PLAYER_ZONE_UPDATE,
            ServerEvent::PlayerLessonUpdate(_) => names::PLAYER_LESSON_UPDATE,
            ServerEvent::PlayerSlideUpdate(_) => names::PLAYER_SLIDE_UPDATE,
            ServerEvent::TeacherLessonBroadcast(_) => names::TEACHER_LESSON_BROADCAST,
            ServerEvent::TeacherSlideBroadcast(_) => names::TEACHER_SLIDE_BROADCAST,
            ServerEvent::ChatMessage(_) => names::CHAT_MESSAGE,
            ServerEvent::PlayerLeft(_) => names::PLAYER_LEFT,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(SyncError::Decode)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(SyncError::Encode)
    }
}

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Wire names of every event, as constants.
pub mod names {
    pub const JOIN_ROOM: &str = "join-room";
    pub const PLAYER_MOVE: &str = "player-move";
    pub const PLAYER_LOOKING_AT_ZONE: &str = "player-looking-at-zone";
    pub const LESSON_LOAD: &str = "lesson-load";
    pub const SLIDE_CHANGE: &str = "slide-change";
    pub const TEACHER_BROADCAST_LESSON: &str = "teacher-broadcast-lesson";
    pub const TEACHER_BROADCAST_SLIDE: &str = "teacher-broadcast-slide";
    pub const CHAT_MESSAGE: &str = "chat-message";

    pub const CONNECTED: &str = "connected";
    pub const ROOM_PLAYERS: &str = "room-players";
    pub const PLAYER_JOINED: &str = "player-joined";
    pub const ROOM_INFO: &str = "room-info";
    pub const PLAYER_MOVED: &str = "player-moved";
    pub const PLAYER_ZONE_UPDATE: &str = "player-zone-update";
    pub const PLAYER_LESSON_UPDATE: &str = "player-lesson-update";
    pub const PLAYER_SLIDE_UPDATE: &str = "player-slide-update";
    pub const TEACHER_LESSON_BROADCAST: &str = "teacher-lesson-broadcast";
    pub const TEACHER_SLIDE_BROADCAST: &str = "teacher-slide-broadcast";
    pub const PLAYER_LEFT: &str = "player-left";
}

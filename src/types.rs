//! Core types shared by the relay and the client store.

use serde::{Deserialize, Serialize};

/// Transport session identifier. Doubles as the player id on the wire.
pub type ConnId = String;

/// Room identifier (a class session name such as `"class101"`).
pub type RoomId = String;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Where a participant stands before the presentation layer moves them:
    /// eye height, a few metres back from the origin.
    pub fn spawn_point() -> Self {
        Self::new(0.0, 1.7, 5.0)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Self-declared participant role. The relay records it but never checks it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
}

impl Role {
    pub fn is_teacher(self) -> bool {
        matches!(self, Role::Teacher)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => f.write_str("student"),
            Role::Teacher => f.write_str("teacher"),
        }
    }
}

/// Synchronized per-connection state, as tracked by the relay and sent to
/// peers in `room-players` / `player-joined`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: ConnId,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    pub position: Vec3,
    pub room_id: RoomId,
    #[serde(default)]
    pub looking_at_zone_id: Option<String>,
    #[serde(default, alias = "currentLesson")]
    pub current_lesson_id: Option<String>,
    #[serde(default)]
    pub current_lesson_title: Option<String>,
    #[serde(default)]
    pub current_slide: u32,
}

impl PlayerRecord {
    /// A freshly joined player: no focus, no lesson, slide 0.
    pub fn joined(
        id: impl Into<ConnId>,
        name: impl Into<String>,
        role: Role,
        position: Vec3,
        room_id: impl Into<RoomId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            position,
            room_id: room_id.into(),
            looking_at_zone_id: None,
            current_lesson_id: None,
            current_lesson_title: None,
            current_slide: 0,
        }
    }
}

/// A lesson reference as exchanged between clients. The relay never looks
/// inside it; lesson content lives in the external content store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "currentSlide")]
    pub slide: u32,
}

impl LessonRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>, slide: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            slide,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Aggregate counts for liveness checks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    pub tracked_players: usize,
    pub active_rooms: usize,
}

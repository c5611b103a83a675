//! Room registry: room → members and connection → player record.
//!
//! Pure state container. It performs no I/O and knows nothing about
//! broadcast scopes; [`crate::relay::EventRelay`] is its only mutator.
//!
//! Every update is guarded by an existence check on the connection's record,
//! so events that arrive after a disconnect (or before a join) fall through
//! as no-ops instead of errors.

use std::collections::{BTreeSet, HashMap};

use crate::protocol::RoomInfo;
use crate::types::{ConnId, PlayerRecord, RelayStats, Role, RoomId, Vec3};

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// A connection that left a room, with the membership it left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    /// The record as it was just before removal.
    pub record: PlayerRecord,
    /// Members still in the room, in id order. Empty if the room was deleted.
    pub remaining: Vec<ConnId>,
    pub room_removed: bool,
}

/// Result of [`RoomRegistry::join`].
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// Records of everyone else already in the room.
    pub existing: Vec<PlayerRecord>,
    /// Member count including the joiner.
    pub member_count: usize,
    /// Set when the join moved the connection out of another room.
    pub departed: Option<Departure>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds all rooms and player records for one relay process.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, BTreeSet<ConnId>>,
    players: HashMap<ConnId, PlayerRecord>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Put `conn` into `room_id`, leaving whatever room it was in first.
    ///
    /// The record is always recreated, so lesson and focus state from a
    /// previous join do not carry over (even when re-joining the same room).
    pub fn join(
        &mut self,
        conn: &str,
        room_id: &str,
        name: &str,
        role: Role,
        position: Vec3,
    ) -> JoinOutcome {
        let departed = self.leave(conn);

        let members = self.rooms.entry(room_id.to_string()).or_default();
        let existing_ids: Vec<ConnId> = members.iter().cloned().collect();
        members.insert(conn.to_string());
        let member_count = members.len();

        let existing = existing_ids
            .iter()
            .filter_map(|id| self.players.get(id).cloned())
            .collect();

        self.players.insert(
            conn.to_string(),
            PlayerRecord::joined(conn, name, role, position, room_id),
        );

        JoinOutcome {
            existing,
            member_count,
            departed,
        }
    }

    /// Remove `conn` from its room and drop its record. Returns `None` if the
    /// connection had no record, which makes repeated calls no-ops.
    pub fn leave(&mut self, conn: &str) -> Option<Departure> {
        let record = self.players.remove(conn)?;

        let mut remaining = Vec::new();
        let mut room_removed = false;
        if let Some(members) = self.rooms.get_mut(&record.room_id) {
            members.remove(conn);
            if members.is_empty() {
                self.rooms.remove(&record.room_id);
                room_removed = true;
            } else {
                remaining = members.iter().cloned().collect();
            }
        }

        Some(Departure {
            record,
            remaining,
            room_removed,
        })
    }

    // -----------------------------------------------------------------------
    // Guarded updates
    // -----------------------------------------------------------------------

    pub fn update_position(&mut self, conn: &str, position: Vec3) -> Option<&PlayerRecord> {
        let record = self.players.get_mut(conn)?;
        record.position = position;
        Some(record)
    }

    pub fn update_zone_focus(
        &mut self,
        conn: &str,
        zone_id: Option<String>,
    ) -> Option<&PlayerRecord> {
        let record = self.players.get_mut(conn)?;
        record.looking_at_zone_id = zone_id;
        Some(record)
    }

    pub fn update_lesson(
        &mut self,
        conn: &str,
        lesson_id: &str,
        title: &str,
        slide: u32,
    ) -> Option<&PlayerRecord> {
        let record = self.players.get_mut(conn)?;
        record.current_lesson_id = Some(lesson_id.to_string());
        record.current_lesson_title = Some(title.to_string());
        record.current_slide = slide;
        Some(record)
    }

    pub fn update_slide(&mut self, conn: &str, slide: u32) -> Option<&PlayerRecord> {
        let record = self.players.get_mut(conn)?;
        record.current_slide = slide;
        Some(record)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn player(&self, conn: &str) -> Option<&PlayerRecord> {
        self.players.get(conn)
    }

    /// Members of `room_id` in id order; empty if the room does not exist.
    pub fn room_members(&self, room_id: &str) -> Vec<ConnId> {
        self.rooms
            .get(room_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_info(&self, room_id: &str) -> Option<RoomInfo> {
        self.rooms.get(room_id).map(|m| RoomInfo {
            room_id: room_id.to_string(),
            player_count: m.len(),
        })
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Everyone sharing `conn`'s room, optionally including `conn` itself.
    /// Empty if `conn` has no record.
    pub fn peers(&self, conn: &str, include_sender: bool) -> Vec<ConnId> {
        let Some(record) = self.players.get(conn) else {
            return Vec::new();
        };
        self.rooms
            .get(&record.room_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|id| include_sender || id.as_str() != conn)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            tracked_players: self.players.len(),
            active_rooms: self.rooms.len(),
        }
    }
}

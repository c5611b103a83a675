//! `RemoteMirror` – local copy of every other participant in the room.
//!
//! Written only by [`crate::client::store::SyncStore`] while applying relay
//! events; everything outside the crate gets read access. Field updates for
//! an id the mirror has never seen create a provisional entry instead of
//! being dropped, so a `player-moved` that overtakes its `player-joined`
//! still lands.

use std::collections::HashMap;

use crate::types::{ConnId, PlayerRecord, Role, Vec3};

// ---------------------------------------------------------------------------
// Remote player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    id: ConnId,
    name: String,
    role: Role,
    position: Vec3,
    looking_at_zone_id: Option<String>,
    lesson_id: Option<String>,
    lesson_title: Option<String>,
    slide: u32,
    /// True until a full record (`room-players` / `player-joined`) arrives.
    provisional: bool,
}

impl RemotePlayer {
    fn from_record(record: PlayerRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            role: record.role,
            position: record.position,
            looking_at_zone_id: record.looking_at_zone_id,
            lesson_id: record.current_lesson_id,
            lesson_title: record.current_lesson_title,
            slide: record.current_slide,
            provisional: false,
        }
    }

    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            role: Role::Student,
            position: Vec3::spawn_point(),
            looking_at_zone_id: None,
            lesson_id: None,
            lesson_title: None,
            slide: 0,
            provisional: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn looking_at_zone_id(&self) -> Option<&str> {
        self.looking_at_zone_id.as_deref()
    }

    pub fn lesson_id(&self) -> Option<&str> {
        self.lesson_id.as_deref()
    }

    pub fn lesson_title(&self) -> Option<&str> {
        self.lesson_title.as_deref()
    }

    pub fn slide(&self) -> u32 {
        self.slide
    }

    pub fn is_provisional(&self) -> bool {
        self.provisional
    }
}

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RemoteMirror {
    players: HashMap<ConnId, RemotePlayer>,
}

impl RemoteMirror {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Writes (store only)
    // ------------------------------------------------------------------

    /// Replace the whole mirror with a room snapshot.
    pub(crate) fn seed(&mut self, records: impl IntoIterator<Item = PlayerRecord>) {
        self.players.clear();
        for record in records {
            self.upsert(record);
        }
    }

    pub(crate) fn upsert(&mut self, record: PlayerRecord) {
        self.players
            .insert(record.id.clone(), RemotePlayer::from_record(record));
    }

    pub(crate) fn apply_move(&mut self, id: &str, position: Vec3) {
        self.entry(id).position = position;
    }

    pub(crate) fn apply_zone(&mut self, id: &str, zone_id: Option<String>) {
        self.entry(id).looking_at_zone_id = zone_id;
    }

    pub(crate) fn apply_lesson(&mut self, id: &str, lesson_id: String, title: String, slide: u32) {
        let player = self.entry(id);
        player.lesson_id = Some(lesson_id);
        player.lesson_title = Some(title);
        player.slide = slide;
    }

    pub(crate) fn apply_slide(&mut self, id: &str, slide: u32) {
        self.entry(id).slide = slide;
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<RemotePlayer> {
        self.players.remove(id)
    }

    pub(crate) fn clear(&mut self) {
        self.players.clear();
    }

    fn entry(&mut self, id: &str) -> &mut RemotePlayer {
        self.players
            .entry(id.to_string())
            .or_insert_with(|| RemotePlayer::placeholder(id))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&RemotePlayer> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Peers currently focused on `zone_id`.
    pub fn looking_at(&self, zone_id: &str) -> Vec<&RemotePlayer> {
        self.players
            .values()
            .filter(|p| p.looking_at_zone_id.as_deref() == Some(zone_id))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

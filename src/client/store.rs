//! `SyncStore` – client-side state for one participant.
//!
//! Two halves:
//!
//! - [`LocalPlayer`] ("Self") is mutated synchronously by local input. Each
//!   relay-relevant mutation hands back the [`ClientEvent`] to send; the
//!   caller queues it fire-and-forget. Nothing waits for an acknowledgement.
//! - [`RemoteMirror`] holds every other participant and is written only by
//!   [`SyncStore::apply`].
//!
//! Outbound events are produced only while connected and inside a room;
//! otherwise the local mutation still happens and `None` comes back.

use std::collections::VecDeque;

use log::{debug, info};

use crate::client::events::ConnectionState;
use crate::client::mirror::{RemoteMirror, RemotePlayer};
use crate::protocol::{
    ChatMessage, ChatSend, ClientEvent, JoinRoom, LessonLoad, PlayerMove, ServerEvent,
    SlideChange, TeacherLesson, TeacherSlide, ZoneFocus,
};
use crate::types::{ConnId, LessonRef, Role, RoomId, Vec3};

pub const DEFAULT_CHAT_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// Self
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LocalPlayer {
    id: Option<ConnId>,
    name: String,
    role: Role,
    position: Vec3,
    looking_at_zone_id: Option<String>,
    lesson_id: Option<String>,
    lesson_title: Option<String>,
    current_slide: u32,
    room_id: Option<RoomId>,
    room_player_count: usize,
    connection: ConnectionState,
}

impl LocalPlayer {
    fn new(name: String, role: Role) -> Self {
        Self {
            id: None,
            name,
            role,
            position: Vec3::spawn_point(),
            looking_at_zone_id: None,
            lesson_id: None,
            lesson_title: None,
            current_slide: 0,
            room_id: None,
            room_player_count: 0,
            connection: ConnectionState::Disconnected,
        }
    }

    /// Connection id assigned by the relay, once greeted.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
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

    pub fn current_slide(&self) -> u32 {
        self.current_slide
    }

    /// The loaded lesson, if any, at the current slide.
    pub fn lesson(&self) -> Option<LessonRef> {
        let id = self.lesson_id.as_ref()?;
        Some(LessonRef::new(
            id.clone(),
            self.lesson_title.clone().unwrap_or_default(),
            self.current_slide,
        ))
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Member count for our room, including Self. Seeded by `room-info` and
    /// kept current from `player-joined` / `player-left`.
    pub fn room_player_count(&self) -> usize {
        self.room_player_count
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn in_room(&self) -> bool {
        self.connection.is_connected() && self.room_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Participant view
// ---------------------------------------------------------------------------

/// Read-only view over Self or a mirrored peer.
#[derive(Debug, Clone, Copy)]
pub enum Participant<'a> {
    Local(&'a LocalPlayer),
    Remote(&'a RemotePlayer),
}

impl<'a> Participant<'a> {
    pub fn id(&self) -> Option<&'a str> {
        match *self {
            Participant::Local(p) => p.id(),
            Participant::Remote(p) => Some(p.id()),
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            Participant::Local(p) => p.name(),
            Participant::Remote(p) => p.name(),
        }
    }

    pub fn role(&self) -> Role {
        match *self {
            Participant::Local(p) => p.role(),
            Participant::Remote(p) => p.role(),
        }
    }

    pub fn position(&self) -> Vec3 {
        match *self {
            Participant::Local(p) => p.position(),
            Participant::Remote(p) => p.position(),
        }
    }

    pub fn looking_at_zone_id(&self) -> Option<&'a str> {
        match *self {
            Participant::Local(p) => p.looking_at_zone_id(),
            Participant::Remote(p) => p.looking_at_zone_id(),
        }
    }

    pub fn slide(&self) -> u32 {
        match *self {
            Participant::Local(p) => p.current_slide(),
            Participant::Remote(p) => p.slide(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Participant::Local(_))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SyncStore {
    local: LocalPlayer,
    remotes: RemoteMirror,
    chat: VecDeque<ChatMessage>,
    chat_capacity: usize,
    /// Room of the most recent `join_room`, kept across disconnects.
    last_room: Option<RoomId>,
}

impl SyncStore {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self::with_chat_capacity(name, role, DEFAULT_CHAT_CAPACITY)
    }

    pub fn with_chat_capacity(name: impl Into<String>, role: Role, capacity: usize) -> Self {
        Self {
            local: LocalPlayer::new(name.into(), role),
            remotes: RemoteMirror::new(),
            chat: VecDeque::with_capacity(capacity.min(DEFAULT_CHAT_CAPACITY)),
            chat_capacity: capacity.max(1),
            last_room: None,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn local(&self) -> &LocalPlayer {
        &self.local
    }

    pub fn remotes(&self) -> &RemoteMirror {
        &self.remotes
    }

    /// Self first, then every mirrored peer.
    pub fn participants(&self) -> impl Iterator<Item = Participant<'_>> {
        std::iter::once(Participant::Local(&self.local))
            .chain(self.remotes.iter().map(Participant::Remote))
    }

    pub fn chat_log(&self) -> impl Iterator<Item = &ChatMessage> {
        self.chat.iter()
    }

    pub fn last_room(&self) -> Option<&str> {
        self.last_room.as_deref()
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Record a transport state change. Leaving `Connected` drops the room
    /// membership, the assigned id and the whole mirror; nothing re-joins
    /// automatically.
    pub fn set_connection_state(&mut self, state: ConnectionState) {
        if self.local.connection == state {
            return;
        }
        debug!("Connection {} -> {}", self.local.connection, state);
        self.local.connection = state;
        if !state.is_connected() {
            self.local.id = None;
            self.local.room_id = None;
            self.local.room_player_count = 0;
            self.remotes.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Local input
    // -----------------------------------------------------------------------

    /// Enter `room_id`. Returns the join followed by events that restore our
    /// lesson and zone focus for the new room, since the relay starts every
    /// join from a blank record.
    pub fn join_room(&mut self, room_id: impl Into<RoomId>) -> Vec<ClientEvent> {
        let room_id = room_id.into();
        self.last_room = Some(room_id.clone());
        if !self.local.connection.is_connected() {
            debug!("Not connected; join of '{}' deferred", room_id);
            return Vec::new();
        }

        info!("Joining room '{}' as {}", room_id, self.local.name);
        self.local.room_id = Some(room_id.clone());
        self.local.room_player_count = 0;
        self.remotes.clear();

        let mut out = vec![ClientEvent::JoinRoom(JoinRoom {
            room_id,
            name: self.local.name.clone(),
            role: self.local.role,
            position: self.local.position,
        })];
        if let Some(lesson) = self.local.lesson() {
            out.push(ClientEvent::LessonLoad(LessonLoad {
                id: lesson.id,
                title: lesson.title,
                slide: lesson.slide,
            }));
        }
        if self.local.looking_at_zone_id.is_some() {
            out.push(ClientEvent::PlayerLookingAtZone(ZoneFocus {
                zone_id: self.local.looking_at_zone_id.clone(),
            }));
        }
        out
    }

    /// Repeat the last join, e.g. after a reconnect.
    pub fn rejoin(&mut self) -> Vec<ClientEvent> {
        match self.last_room.clone() {
            Some(room) => self.join_room(room),
            None => Vec::new(),
        }
    }

    pub fn set_position(&mut self, position: Vec3) -> Option<ClientEvent> {
        self.local.position = position;
        self.outbound(ClientEvent::PlayerMove(PlayerMove { position }))
    }

    /// Unchanged focus produces no event.
    pub fn set_looking_at_zone(&mut self, zone_id: Option<String>) -> Option<ClientEvent> {
        if self.local.looking_at_zone_id == zone_id {
            return None;
        }
        self.local.looking_at_zone_id = zone_id.clone();
        self.outbound(ClientEvent::PlayerLookingAtZone(ZoneFocus { zone_id }))
    }

    pub fn load_lesson(&mut self, lesson: LessonRef) -> Option<ClientEvent> {
        self.local.lesson_id = Some(lesson.id.clone());
        self.local.lesson_title = Some(lesson.title.clone());
        self.local.current_slide = lesson.slide;
        self.outbound(ClientEvent::LessonLoad(LessonLoad {
            id: lesson.id,
            title: lesson.title,
            slide: lesson.slide,
        }))
    }

    pub fn set_slide(&mut self, slide: u32) -> Option<ClientEvent> {
        if self.local.current_slide == slide {
            return None;
        }
        self.local.current_slide = slide;
        self.outbound(ClientEvent::SlideChange(SlideChange { slide }))
    }

    /// No-op without a loaded lesson. Slide count lives with the lesson
    /// content, so there is no upper bound here.
    pub fn next_slide(&mut self) -> Option<ClientEvent> {
        self.local.lesson_id.as_ref()?;
        self.set_slide(self.local.current_slide.saturating_add(1))
    }

    pub fn previous_slide(&mut self) -> Option<ClientEvent> {
        if self.local.current_slide == 0 {
            return None;
        }
        self.set_slide(self.local.current_slide - 1)
    }

    /// Push our lesson to the room. Teacher only, and only with a lesson
    /// loaded.
    pub fn broadcast_lesson(&self) -> Option<ClientEvent> {
        if !self.local.role.is_teacher() {
            debug!("broadcast_lesson ignored: not a teacher");
            return None;
        }
        let lesson = self.local.lesson()?;
        self.outbound(ClientEvent::TeacherBroadcastLesson(TeacherLesson {
            lesson_data: lesson,
        }))
    }

    pub fn broadcast_slide(&self) -> Option<ClientEvent> {
        if !self.local.role.is_teacher() {
            debug!("broadcast_slide ignored: not a teacher");
            return None;
        }
        self.outbound(ClientEvent::TeacherBroadcastSlide(TeacherSlide {
            slide: self.local.current_slide,
        }))
    }

    /// Blank messages are not sent. Our own copy comes back from the relay
    /// and is logged then, in room order.
    pub fn send_chat(&self, text: &str) -> Option<ClientEvent> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.outbound(ClientEvent::ChatMessage(ChatSend {
            text: text.to_string(),
        }))
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Apply one relay event. Returns a follow-up event when a teacher
    /// override changed our lesson or slide, so peers' copies of us catch up.
    pub fn apply(&mut self, event: ServerEvent) -> Option<ClientEvent> {
        match event {
            ServerEvent::Connected(welcome) => {
                debug!("Assigned id {}", welcome.id);
                self.local.id = Some(welcome.id);
            }

            ServerEvent::RoomPlayers(records) => {
                let own = self.local.id.clone();
                self.remotes
                    .seed(records.into_iter().filter(|r| Some(&r.id) != own.as_ref()));
            }

            ServerEvent::PlayerJoined(record) => {
                if !self.is_self(&record.id) {
                    debug!("{} joined", record.name);
                    let known = self
                        .remotes
                        .get(&record.id)
                        .is_some_and(|p| !p.is_provisional());
                    if !known && self.local.room_player_count > 0 {
                        self.local.room_player_count += 1;
                    }
                    self.remotes.upsert(record);
                }
            }

            ServerEvent::RoomInfo(info) => {
                if self.local.room_id.as_deref() == Some(info.room_id.as_str()) {
                    self.local.room_player_count = info.player_count;
                }
            }

            ServerEvent::PlayerMoved(ev) => {
                if !self.is_self(&ev.id) {
                    self.remotes.apply_move(&ev.id, ev.position);
                }
            }

            ServerEvent::PlayerZoneUpdate(ev) => {
                if !self.is_self(&ev.id) {
                    self.remotes.apply_zone(&ev.id, ev.zone_id);
                }
            }

            ServerEvent::PlayerLessonUpdate(ev) => {
                if !self.is_self(&ev.id) {
                    self.remotes
                        .apply_lesson(&ev.id, ev.lesson_id, ev.title, ev.slide);
                }
            }

            ServerEvent::PlayerSlideUpdate(ev) => {
                if !self.is_self(&ev.id) {
                    self.remotes.apply_slide(&ev.id, ev.slide);
                }
            }

            ServerEvent::TeacherLessonBroadcast(TeacherLesson { lesson_data }) => {
                if self.local.role.is_teacher() {
                    return None;
                }
                info!("Teacher loaded lesson '{}'", lesson_data.id);
                return self.load_lesson(lesson_data);
            }

            ServerEvent::TeacherSlideBroadcast(TeacherSlide { slide }) => {
                if self.local.role.is_teacher() {
                    return None;
                }
                debug!("Teacher moved to slide {}", slide);
                return self.set_slide(slide);
            }

            ServerEvent::ChatMessage(msg) => {
                if self.chat.len() == self.chat_capacity {
                    self.chat.pop_front();
                }
                self.chat.push_back(msg);
            }

            ServerEvent::PlayerLeft(ev) => {
                if self.remotes.remove(&ev.id).is_some() {
                    debug!("{} left", ev.name);
                    if self.local.room_player_count > 1 {
                        self.local.room_player_count -= 1;
                    }
                }
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn is_self(&self, id: &str) -> bool {
        self.local.id.as_deref() == Some(id)
    }

    fn outbound(&self, event: ClientEvent) -> Option<ClientEvent> {
        self.local.in_room().then_some(event)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        PlayerLeft, PlayerLessonUpdate, PlayerMoved, PlayerSlideUpdate, RoomInfo, Welcome,
    };
    use crate::types::PlayerRecord;

    fn in_class(name: &str, role: Role) -> SyncStore {
        let mut store = SyncStore::new(name, role);
        store.set_connection_state(ConnectionState::Connected);
        store.apply(ServerEvent::Connected(Welcome { id: "me".into() }));
        let out = store.join_room("class101");
        assert_eq!(out.len(), 1);
        store
    }

    fn record(id: &str, name: &str) -> PlayerRecord {
        PlayerRecord::joined(id, name, Role::Student, Vec3::spawn_point(), "class101")
    }

    // ---------------------------------------------------------------
    // Local input
    // ---------------------------------------------------------------

    #[test]
    fn no_events_before_joining() {
        let mut store = SyncStore::new("Alice", Role::Student);
        assert!(store.set_position(Vec3::new(1.0, 1.7, 1.0)).is_none());
        assert!(store.join_room("class101").is_empty());
        assert_eq!(store.local().position(), Vec3::new(1.0, 1.7, 1.0));
        assert_eq!(store.last_room(), Some("class101"));
    }

    #[test]
    fn join_carries_identity() {
        let mut store = SyncStore::new("Ms. T", Role::Teacher);
        store.set_connection_state(ConnectionState::Connected);
        let out = store.join_room("class101");
        assert_eq!(
            out,
            vec![ClientEvent::JoinRoom(JoinRoom {
                room_id: "class101".into(),
                name: "Ms. T".into(),
                role: Role::Teacher,
                position: Vec3::spawn_point(),
            })]
        );
    }

    #[test]
    fn join_resends_loaded_lesson_and_focus() {
        let mut store = in_class("Alice", Role::Student);
        store.load_lesson(LessonRef::new("ai_intro_001", "Intro", 2));
        store.set_looking_at_zone(Some("zone_ai".into()));

        let out = store.join_room("class202");
        let names: Vec<_> = out.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["join-room", "lesson-load", "player-looking-at-zone"]);
    }

    #[test]
    fn move_emits_player_move() {
        let mut store = in_class("Alice", Role::Student);
        let ev = store.set_position(Vec3::new(2.0, 1.7, -3.0));
        assert_eq!(
            ev,
            Some(ClientEvent::PlayerMove(PlayerMove {
                position: Vec3::new(2.0, 1.7, -3.0)
            }))
        );
    }

    #[test]
    fn unchanged_zone_is_silent() {
        let mut store = in_class("Alice", Role::Student);
        assert!(store.set_looking_at_zone(Some("z".into())).is_some());
        assert!(store.set_looking_at_zone(Some("z".into())).is_none());
        assert!(store.set_looking_at_zone(None).is_some());
    }

    #[test]
    fn slide_navigation_bounds() {
        let mut store = in_class("Alice", Role::Student);
        assert!(store.next_slide().is_none(), "no lesson loaded");
        assert!(store.previous_slide().is_none(), "already at 0");

        store.load_lesson(LessonRef::new("l1", "Lesson", 0));
        assert_eq!(
            store.next_slide(),
            Some(ClientEvent::SlideChange(SlideChange { slide: 1 }))
        );
        assert_eq!(
            store.previous_slide(),
            Some(ClientEvent::SlideChange(SlideChange { slide: 0 }))
        );
        assert!(store.previous_slide().is_none());
    }

    #[test]
    fn broadcasts_are_teacher_only() {
        let mut student = in_class("Bob", Role::Student);
        student.load_lesson(LessonRef::new("l1", "Lesson", 0));
        assert!(student.broadcast_lesson().is_none());
        assert!(student.broadcast_slide().is_none());

        let mut teacher = in_class("Ms. T", Role::Teacher);
        assert!(teacher.broadcast_lesson().is_none(), "no lesson loaded");
        teacher.load_lesson(LessonRef::new("l1", "Lesson", 3));
        assert_eq!(
            teacher.broadcast_lesson(),
            Some(ClientEvent::TeacherBroadcastLesson(TeacherLesson {
                lesson_data: LessonRef::new("l1", "Lesson", 3)
            }))
        );
        assert_eq!(
            teacher.broadcast_slide(),
            Some(ClientEvent::TeacherBroadcastSlide(TeacherSlide { slide: 3 }))
        );
    }

    #[test]
    fn blank_chat_is_not_sent() {
        let store = in_class("Alice", Role::Student);
        assert!(store.send_chat("   ").is_none());
        assert_eq!(
            store.send_chat(" hi "),
            Some(ClientEvent::ChatMessage(ChatSend { text: "hi".into() }))
        );
    }

    // ---------------------------------------------------------------
    // Inbound: mirror
    // ---------------------------------------------------------------

    #[test]
    fn room_players_seeds_without_self() {
        let mut store = in_class("Alice", Role::Student);
        store.apply(ServerEvent::RoomPlayers(vec![
            record("me", "Alice"),
            record("B", "Bob"),
        ]));
        assert_eq!(store.remotes().len(), 1);
        assert!(store.remotes().contains("B"));
        assert_eq!(store.participants().count(), 2);
    }

    #[test]
    fn updates_for_unknown_peer_create_entry() {
        let mut store = in_class("Alice", Role::Student);
        store.apply(ServerEvent::PlayerSlideUpdate(PlayerSlideUpdate {
            id: "B".into(),
            slide: 5,
        }));
        assert_eq!(store.remotes().get("B").map(|p| p.slide()), Some(5));
    }

    #[test]
    fn peer_lesson_and_move_land_in_mirror() {
        let mut store = in_class("Alice", Role::Student);
        store.apply(ServerEvent::PlayerJoined(record("B", "Bob")));
        store.apply(ServerEvent::PlayerMoved(PlayerMoved {
            id: "B".into(),
            position: Vec3::new(1.0, 1.7, 0.0),
        }));
        store.apply(ServerEvent::PlayerLessonUpdate(PlayerLessonUpdate {
            id: "B".into(),
            lesson_id: "l1".into(),
            title: "Lesson".into(),
            slide: 2,
        }));

        let bob = store.remotes().get("B").unwrap();
        assert_eq!(bob.position(), Vec3::new(1.0, 1.7, 0.0));
        assert_eq!(bob.lesson_id(), Some("l1"));
        assert_eq!(bob.slide(), 2);
    }

    #[test]
    fn player_left_removes_peer() {
        let mut store = in_class("Alice", Role::Student);
        store.apply(ServerEvent::PlayerJoined(record("B", "Bob")));
        store.apply(ServerEvent::PlayerLeft(PlayerLeft {
            id: "B".into(),
            name: "Bob".into(),
        }));
        assert!(store.remotes().is_empty());
    }

    #[test]
    fn room_info_only_for_own_room() {
        let mut store = in_class("Alice", Role::Student);
        store.apply(ServerEvent::RoomInfo(RoomInfo {
            room_id: "other".into(),
            player_count: 9,
        }));
        assert_eq!(store.local().room_player_count(), 0);
        store.apply(ServerEvent::RoomInfo(RoomInfo {
            room_id: "class101".into(),
            player_count: 2,
        }));
        assert_eq!(store.local().room_player_count(), 2);
    }

    #[test]
    fn room_count_follows_peers_joining_and_leaving() {
        let mut store = in_class("Alice", Role::Student);
        store.apply(ServerEvent::RoomPlayers(vec![record("B", "Bob")]));
        store.apply(ServerEvent::RoomInfo(RoomInfo {
            room_id: "class101".into(),
            player_count: 2,
        }));

        store.apply(ServerEvent::PlayerJoined(record("C", "Carol")));
        assert_eq!(store.local().room_player_count(), 3);

        // A refreshed record for a known peer is not a new member.
        store.apply(ServerEvent::PlayerJoined(record("C", "Carol")));
        assert_eq!(store.local().room_player_count(), 3);

        store.apply(ServerEvent::PlayerLeft(PlayerLeft {
            id: "B".into(),
            name: "Bob".into(),
        }));
        assert_eq!(store.local().room_player_count(), 2);

        store.apply(ServerEvent::PlayerLeft(PlayerLeft {
            id: "B".into(),
            name: "Bob".into(),
        }));
        assert_eq!(store.local().room_player_count(), 2);
    }

    // ---------------------------------------------------------------
    // Teacher override
    // ---------------------------------------------------------------

    #[test]
    fn student_follows_teacher_slide() {
        let mut store = in_class("Bob", Role::Student);
        store.load_lesson(LessonRef::new("l1", "Lesson", 4));
        assert_eq!(store.local().current_slide(), 4);

        let echo = store.apply(ServerEvent::TeacherSlideBroadcast(TeacherSlide { slide: 1 }));
        assert_eq!(store.local().current_slide(), 1);
        assert_eq!(echo, Some(ClientEvent::SlideChange(SlideChange { slide: 1 })));
    }

    #[test]
    fn student_follows_teacher_lesson() {
        let mut store = in_class("Bob", Role::Student);
        let echo = store.apply(ServerEvent::TeacherLessonBroadcast(TeacherLesson {
            lesson_data: LessonRef::new("ai_intro_001", "Intro", 0),
        }));
        assert_eq!(store.local().lesson_id(), Some("ai_intro_001"));
        assert!(matches!(echo, Some(ClientEvent::LessonLoad(_))));
    }

    #[test]
    fn teacher_ignores_broadcasts() {
        let mut store = in_class("Ms. T", Role::Teacher);
        store.load_lesson(LessonRef::new("l1", "Lesson", 4));
        let echo = store.apply(ServerEvent::TeacherSlideBroadcast(TeacherSlide { slide: 1 }));
        assert!(echo.is_none());
        assert_eq!(store.local().current_slide(), 4);
    }

    // ---------------------------------------------------------------
    // Chat / lifecycle
    // ---------------------------------------------------------------

    #[test]
    fn chat_log_is_bounded() {
        let mut store = SyncStore::with_chat_capacity("Alice", Role::Student, 2);
        for (i, text) in ["a", "b", "c"].into_iter().enumerate() {
            store.apply(ServerEvent::ChatMessage(ChatMessage {
                id: "B".into(),
                name: "Bob".into(),
                text: text.into(),
                timestamp: i as u64,
            }));
        }
        let texts: Vec<_> = store.chat_log().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["b", "c"]);
    }

    #[test]
    fn disconnect_clears_room_and_mirror() {
        let mut store = in_class("Alice", Role::Student);
        store.apply(ServerEvent::PlayerJoined(record("B", "Bob")));
        store.set_connection_state(ConnectionState::Reconnecting);

        assert!(store.local().room_id().is_none());
        assert!(store.local().id().is_none());
        assert!(store.remotes().is_empty());
        assert!(store.set_position(Vec3::zero()).is_none());

        store.set_connection_state(ConnectionState::Connected);
        let out = store.rejoin();
        assert_eq!(out.first().map(|e| e.name()), Some("join-room"));
    }
}

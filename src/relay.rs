//! EventRelay – applies inbound events to the registry and decides who hears
//! about them.
//!
//! ## Scope rules
//!
//! | Inbound                     | Registry op         | Outbound                       | Scope            |
//! |-----------------------------|---------------------|--------------------------------|------------------|
//! | `join-room`                 | `join`              | `room-players`, `room-info`    | sender only      |
//! |                             |                     | `player-joined`                | room-exclusive   |
//! | `player-move`               | `update_position`   | `player-moved`                 | room-exclusive   |
//! | `player-looking-at-zone`    | `update_zone_focus` | `player-zone-update`           | room-exclusive   |
//! | `lesson-load`               | `update_lesson`     | `player-lesson-update`         | room-exclusive   |
//! | `slide-change`              | `update_slide`      | `player-slide-update`          | room-exclusive   |
//! | `teacher-broadcast-lesson`  | –                   | `teacher-lesson-broadcast`     | room-exclusive   |
//! | `teacher-broadcast-slide`   | –                   | `teacher-slide-broadcast`      | room-exclusive   |
//! | `chat-message`              | –                   | `chat-message`                 | room-inclusive   |
//! | *(transport close)*         | `leave`             | `player-left`                  | room-exclusive   |
//!
//! The relay does no I/O. Callers (the gateway hub) hold it behind a lock and
//! hand the returned [`Delivery`] list to connection writers before
//! releasing that lock.

use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::protocol::{
    ChatMessage, ClientEvent, PlayerLeft, PlayerLessonUpdate, PlayerMoved, PlayerSlideUpdate,
    PlayerZoneUpdate, RoomInfo, ServerEvent,
};
use crate::registry::{Departure, RoomRegistry};
use crate::types::{ConnId, RelayStats};

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// One outbound event and the connections that must receive it.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub targets: Vec<ConnId>,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn to_one(conn: &str, event: ServerEvent) -> Self {
        Self {
            targets: vec![conn.to_string()],
            event,
        }
    }
}

// ---------------------------------------------------------------------------
// EventRelay
// ---------------------------------------------------------------------------

pub struct EventRelay {
    registry: RoomRegistry,
    clock: fn() -> u64,
}

impl Default for EventRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRelay {
    pub fn new() -> Self {
        Self::with_clock(unix_millis)
    }

    /// Use `clock` (milliseconds since the epoch) to stamp chat messages.
    pub fn with_clock(clock: fn() -> u64) -> Self {
        Self {
            registry: RoomRegistry::new(),
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Apply one inbound event from `conn` and return what to send to whom.
    pub fn handle(&mut self, conn: &str, event: ClientEvent) -> Vec<Delivery> {
        match event {
            ClientEvent::JoinRoom(join) => {
                let outcome = self.registry.join(
                    conn,
                    &join.room_id,
                    &join.name,
                    join.role,
                    join.position,
                );

                let mut out = Vec::with_capacity(4);
                // Re-joining the same room is a refresh; peers get the new
                // player-joined record only.
                if let Some(departure) = outcome
                    .departed
                    .filter(|d| d.record.room_id != join.room_id)
                {
                    debug!(
                        "{} moved from room '{}' to '{}'",
                        conn, departure.record.room_id, join.room_id
                    );
                    out.extend(departure_notice(departure));
                }

                out.push(Delivery::to_one(
                    conn,
                    ServerEvent::RoomPlayers(outcome.existing),
                ));
                if let Some(record) = self.registry.player(conn) {
                    out.push(Delivery {
                        targets: self.registry.peers(conn, false),
                        event: ServerEvent::PlayerJoined(record.clone()),
                    });
                }
                out.push(Delivery::to_one(
                    conn,
                    ServerEvent::RoomInfo(RoomInfo {
                        room_id: join.room_id,
                        player_count: outcome.member_count,
                    }),
                ));
                retain_addressed(out)
            }

            ClientEvent::PlayerMove(mv) => {
                if self.registry.update_position(conn, mv.position).is_none() {
                    return self.dropped(conn, "player-move");
                }
                self.room_exclusive(
                    conn,
                    ServerEvent::PlayerMoved(PlayerMoved {
                        id: conn.to_string(),
                        position: mv.position,
                    }),
                )
            }

            ClientEvent::PlayerLookingAtZone(focus) => {
                if self
                    .registry
                    .update_zone_focus(conn, focus.zone_id.clone())
                    .is_none()
                {
                    return self.dropped(conn, "player-looking-at-zone");
                }
                self.room_exclusive(
                    conn,
                    ServerEvent::PlayerZoneUpdate(PlayerZoneUpdate {
                        id: conn.to_string(),
                        zone_id: focus.zone_id,
                    }),
                )
            }

            ClientEvent::LessonLoad(lesson) => {
                if self
                    .registry
                    .update_lesson(conn, &lesson.id, &lesson.title, lesson.slide)
                    .is_none()
                {
                    return self.dropped(conn, "lesson-load");
                }
                self.room_exclusive(
                    conn,
                    ServerEvent::PlayerLessonUpdate(PlayerLessonUpdate {
                        id: conn.to_string(),
                        lesson_id: lesson.id,
                        title: lesson.title,
                        slide: lesson.slide,
                    }),
                )
            }

            ClientEvent::SlideChange(change) => {
                if self.registry.update_slide(conn, change.slide).is_none() {
                    return self.dropped(conn, "slide-change");
                }
                self.room_exclusive(
                    conn,
                    ServerEvent::PlayerSlideUpdate(PlayerSlideUpdate {
                        id: conn.to_string(),
                        slide: change.slide,
                    }),
                )
            }

            ClientEvent::TeacherBroadcastLesson(lesson) => {
                let Some(sender) = self.registry.player(conn) else {
                    return self.dropped(conn, "teacher-broadcast-lesson");
                };
                if !sender.role.is_teacher() {
                    // Role is self-declared; relayed regardless.
                    debug!("{} ({}) broadcast a lesson without the teacher role", conn, sender.name);
                }
                debug!(
                    "Teacher {} broadcasting lesson '{}' in room '{}'",
                    conn, lesson.lesson_data.id, sender.room_id
                );
                self.room_exclusive(conn, ServerEvent::TeacherLessonBroadcast(lesson))
            }

            ClientEvent::TeacherBroadcastSlide(slide) => {
                let Some(sender) = self.registry.player(conn) else {
                    return self.dropped(conn, "teacher-broadcast-slide");
                };
                if !sender.role.is_teacher() {
                    debug!("{} ({}) broadcast a slide without the teacher role", conn, sender.name);
                }
                debug!(
                    "Teacher {} changing slide to {} in room '{}'",
                    conn, slide.slide, sender.room_id
                );
                self.room_exclusive(conn, ServerEvent::TeacherSlideBroadcast(slide))
            }

            ClientEvent::ChatMessage(chat) => {
                let Some(sender) = self.registry.player(conn) else {
                    return self.dropped(conn, "chat-message");
                };
                let event = ServerEvent::ChatMessage(ChatMessage {
                    id: conn.to_string(),
                    name: sender.name.clone(),
                    text: chat.text,
                    timestamp: (self.clock)(),
                });
                retain_addressed(vec![Delivery {
                    targets: self.registry.peers(conn, true),
                    event,
                }])
            }
        }
    }

    /// The transport for `conn` closed. Idempotent.
    pub fn disconnect(&mut self, conn: &str) -> Vec<Delivery> {
        match self.registry.leave(conn) {
            Some(departure) => {
                if departure.room_removed {
                    debug!("Room '{}' is empty, removed", departure.record.room_id);
                }
                departure_notice(departure).into_iter().collect()
            }
            None => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> RelayStats {
        self.registry.stats()
    }

    pub fn room_info(&self, room_id: &str) -> Option<RoomInfo> {
        self.registry.room_info(room_id)
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn room_exclusive(&self, conn: &str, event: ServerEvent) -> Vec<Delivery> {
        retain_addressed(vec![Delivery {
            targets: self.registry.peers(conn, false),
            event,
        }])
    }

    fn dropped(&self, conn: &str, event: &str) -> Vec<Delivery> {
        debug!("Ignoring {} from {}: not in a room", event, conn);
        Vec::new()
    }
}

/// `player-left` for the members a departing connection left behind.
fn departure_notice(departure: Departure) -> Option<Delivery> {
    if departure.remaining.is_empty() {
        return None;
    }
    Some(Delivery {
        targets: departure.remaining,
        event: ServerEvent::PlayerLeft(PlayerLeft {
            id: departure.record.id,
            name: departure.record.name,
        }),
    })
}

fn retain_addressed(mut deliveries: Vec<Delivery>) -> Vec<Delivery> {
    deliveries.retain(|d| !d.targets.is_empty());
    deliveries
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

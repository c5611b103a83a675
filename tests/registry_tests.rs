//! RoomRegistry tests

#[cfg(test)]
mod tests {
    use construct_sync::registry::RoomRegistry;
    use construct_sync::types::{RelayStats, Role, Vec3};

    fn join(reg: &mut RoomRegistry, conn: &str, room: &str) {
        reg.join(conn, room, conn, Role::Student, Vec3::spawn_point());
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    #[test]
    fn first_join_creates_room() {
        let mut reg = RoomRegistry::new();
        let outcome = reg.join("A", "class101", "Alice", Role::Student, Vec3::spawn_point());

        assert!(outcome.existing.is_empty());
        assert_eq!(outcome.member_count, 1);
        assert!(outcome.departed.is_none());
        assert!(reg.has_room("class101"));
        assert_eq!(reg.room_members("class101"), vec!["A".to_string()]);
    }

    #[test]
    fn second_join_sees_first_record() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "class101");
        let outcome = reg.join("B", "class101", "Bob", Role::Student, Vec3::spawn_point());

        assert_eq!(outcome.member_count, 2);
        assert_eq!(outcome.existing.len(), 1);
        assert_eq!(outcome.existing[0].id, "A");
    }

    #[test]
    fn connection_is_in_at_most_one_room() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "r1");
        join(&mut reg, "B", "r1");
        join(&mut reg, "A", "r2");
        join(&mut reg, "A", "r3");

        let rooms_with_a = ["r1", "r2", "r3"]
            .iter()
            .filter(|r| reg.room_members(r).contains(&"A".to_string()))
            .count();
        assert_eq!(rooms_with_a, 1);
        assert_eq!(reg.player("A").unwrap().room_id, "r3");
        assert!(!reg.has_room("r2"), "r2 emptied when A moved on");
        assert_eq!(reg.stats().active_rooms, 2);
    }

    #[test]
    fn switching_rooms_reports_departure() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "r1");
        join(&mut reg, "B", "r1");

        let outcome = reg.join("A", "r2", "Alice", Role::Student, Vec3::spawn_point());
        let departed = outcome.departed.expect("A left r1");
        assert_eq!(departed.record.room_id, "r1");
        assert_eq!(departed.remaining, vec!["B".to_string()]);
        assert!(!departed.room_removed);
    }

    #[test]
    fn rejoin_resets_lesson_state() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "class101");
        reg.update_lesson("A", "ai_intro_001", "Intro", 3);
        reg.update_zone_focus("A", Some("zone_ai".into()));

        join(&mut reg, "A", "class101");
        let rec = reg.player("A").unwrap();
        assert!(rec.current_lesson_id.is_none());
        assert!(rec.looking_at_zone_id.is_none());
        assert_eq!(rec.current_slide, 0);
        assert_eq!(reg.room_members("class101").len(), 1);
    }

    // -----------------------------------------------------------------------
    // Leave
    // -----------------------------------------------------------------------

    #[test]
    fn last_leave_deletes_room() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "class101");
        let departure = reg.leave("A").unwrap();

        assert!(departure.room_removed);
        assert!(departure.remaining.is_empty());
        assert!(!reg.has_room("class101"));
        assert!(reg.room_info("class101").is_none());
    }

    #[test]
    fn rejoin_after_cleanup_starts_empty() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "class101");
        reg.leave("A");

        let outcome = reg.join("C", "class101", "Carol", Role::Student, Vec3::spawn_point());
        assert!(outcome.existing.is_empty());
        assert_eq!(outcome.member_count, 1);
    }

    #[test]
    fn leave_is_idempotent() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "class101");
        join(&mut reg, "B", "class101");

        assert!(reg.leave("B").is_some());
        assert!(reg.leave("B").is_none());
        assert!(reg.leave("never-joined").is_none());
        assert_eq!(reg.room_members("class101"), vec!["A".to_string()]);
    }

    // -----------------------------------------------------------------------
    // Guarded updates
    // -----------------------------------------------------------------------

    #[test]
    fn updates_without_record_are_noops() {
        let mut reg = RoomRegistry::new();
        assert!(reg.update_position("ghost", Vec3::zero()).is_none());
        assert!(reg.update_zone_focus("ghost", Some("z".into())).is_none());
        assert!(reg.update_lesson("ghost", "l", "t", 1).is_none());
        assert!(reg.update_slide("ghost", 1).is_none());
        assert_eq!(reg.stats(), RelayStats::default());
    }

    #[test]
    fn updates_touch_only_their_field() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "class101");

        reg.update_position("A", Vec3::new(1.0, 1.7, 2.0));
        reg.update_slide("A", 4);
        let rec = reg.update_zone_focus("A", Some("zone_ai".into())).unwrap();

        assert_eq!(rec.position, Vec3::new(1.0, 1.7, 2.0));
        assert_eq!(rec.current_slide, 4);
        assert_eq!(rec.looking_at_zone_id.as_deref(), Some("zone_ai"));
        assert!(rec.current_lesson_id.is_none());
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[test]
    fn peers_inclusive_and_exclusive() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "class101");
        join(&mut reg, "B", "class101");
        join(&mut reg, "C", "other");

        assert_eq!(reg.peers("A", false), vec!["B".to_string()]);
        assert_eq!(reg.peers("A", true), vec!["A".to_string(), "B".to_string()]);
        assert!(reg.peers("ghost", true).is_empty());
    }

    #[test]
    fn stats_count_players_and_rooms() {
        let mut reg = RoomRegistry::new();
        join(&mut reg, "A", "r1");
        join(&mut reg, "B", "r1");
        join(&mut reg, "C", "r2");

        let stats = reg.stats();
        assert_eq!(stats.tracked_players, 3);
        assert_eq!(stats.active_rooms, 2);
        assert_eq!(reg.room_info("r1").unwrap().player_count, 2);
    }
}

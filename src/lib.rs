pub mod aggregate;
pub mod config;
pub mod engine;
pub mod memory;
pub mod recommend;
pub mod refresh;
pub mod slot;
pub mod submission;
pub mod time;

#[cfg(test)]
mod tests {
    use crate::aggregate::{aggregate, Aggregation};
    use crate::config::{ConfigError, GridConfig};
    use crate::engine::{Engine, EngineError, RangeStore, StoreError};
    use crate::memory::{MemoryPosts, MemoryRoster, MemoryStore};
    use crate::recommend::{compose, AUTO_POST_TAG, RECOMMENDATION_TITLE};
    use crate::refresh::{AggregationFeed, RefreshTracker};
    use crate::slot::{build_slot_set, SlotKey, SlotSet};
    use crate::submission::TriggerState;
    use crate::time::{
        scan_overlaps, validate_candidate, MemberId, RangeError, RangeId, Scope, TeamId, TimeRange,
        Weekday,
    };

    fn engine_with_team(
        members: usize,
    ) -> (
        Engine<MemoryRoster, MemoryStore, MemoryPosts>,
        TeamId,
        Vec<MemberId>,
    ) {
        let mut roster = MemoryRoster::new();
        let team = roster.create_board(members.max(1));
        let ids: Vec<MemberId> = (0..members).map(|_| MemberId::new()).collect();
        for id in &ids {
            roster.join(team, *id).unwrap();
        }
        roster.activate(team).unwrap();

        let engine = Engine::new(
            GridConfig::default(),
            roster,
            MemoryStore::new(),
            MemoryPosts::new(),
        )
        .unwrap();
        (engine, team, ids)
    }

    #[test]
    fn accepts_disjoint_declarations() {
        let owner = MemberId::new();
        let existing = vec![
            TimeRange::new(owner, Scope::Personal, Weekday::Monday, 540, 600),
            TimeRange::new(owner, Scope::Personal, Weekday::Wednesday, 540, 600),
        ];

        let other_day = TimeRange::new(owner, Scope::Personal, Weekday::Tuesday, 540, 600);
        assert!(validate_candidate(&existing, &other_day).is_ok());

        let touching = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 600, 660);
        assert!(validate_candidate(&existing, &touching).is_ok());

        let before = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 480, 540);
        assert!(validate_candidate(&existing, &before).is_ok());
    }

    #[test]
    fn rejects_overlapping_declaration() {
        let owner = MemberId::new();
        let existing = vec![TimeRange::new(
            owner,
            Scope::Personal,
            Weekday::Monday,
            540,
            600,
        )];

        let one_shared_minute = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 599, 660);
        assert_eq!(
            validate_candidate(&existing, &one_shared_minute),
            Err(RangeError::Overlap {
                day: Weekday::Monday,
                with: existing[0].id,
            })
        );

        let contained = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 550, 560);
        assert!(validate_candidate(&existing, &contained).is_err());
    }

    #[test]
    fn rejects_reversed_declaration() {
        let owner = MemberId::new();
        let reversed = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 600, 540);
        assert_eq!(
            validate_candidate(&[], &reversed),
            Err(RangeError::InvalidRange {
                start: 600,
                end: 540,
            })
        );

        let empty = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 600, 600);
        assert!(validate_candidate(&[], &empty).is_err());

        let past_midnight = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 1400, 1500);
        assert!(validate_candidate(&[], &past_midnight).is_err());
    }

    #[test]
    fn scopes_do_not_interact() {
        let owner = MemberId::new();
        let team_a = TeamId::new();
        let team_b = TeamId::new();

        let personal = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 540, 600);
        let for_a = TimeRange::new(owner, Scope::Team(team_a), Weekday::Monday, 540, 600);
        let for_b = TimeRange::new(owner, Scope::Team(team_b), Weekday::Monday, 540, 600);

        assert!(!personal.overlaps(&for_a));
        assert!(validate_candidate(&[personal, for_a], &for_b).is_ok());
    }

    #[test]
    fn finds_full_team_overlap() {
        let (mut engine, team, ids) = engine_with_team(3);
        let scope = Scope::Team(team);

        engine
            .add_time_range(ids[0], scope, Weekday::Monday, 540, 600)
            .unwrap();
        engine
            .add_time_range(ids[1], scope, Weekday::Monday, 570, 630)
            .unwrap();
        engine
            .add_time_range(ids[2], scope, Weekday::Monday, 540, 660)
            .unwrap();

        let aggregation = engine.aggregation(team);
        assert_eq!(aggregation.member_count(), 3);
        assert_eq!(
            aggregation.optimal_slots().iter().copied().collect::<Vec<_>>(),
            vec![
                SlotKey::new(Weekday::Monday, 9, 30),
                SlotKey::new(Weekday::Monday, 9, 40),
                SlotKey::new(Weekday::Monday, 9, 50),
            ]
        );
        assert_eq!(aggregation.optimal_duration_minutes(engine.config()), 30);
    }

    #[test]
    fn no_overlap_when_one_member_declares_nothing() {
        let owner = MemberId::new();
        let config = GridConfig::default();
        let declared = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Monday,
                540,
                600,
            )],
            &config,
        );

        let aggregation = aggregate(&[declared, SlotSet::new()]);
        assert!(aggregation.optimal_slots().is_empty());
        assert_eq!(aggregation.optimal_duration_minutes(&config), 0);
        assert_eq!(aggregation.member_count(), 2);
    }

    #[test]
    fn counts_stay_within_member_count() {
        let owner_a = MemberId::new();
        let owner_b = MemberId::new();
        let owner_c = MemberId::new();
        let config = GridConfig::default();

        let sets = vec![
            build_slot_set(
                &[TimeRange::new(
                    owner_a,
                    Scope::Personal,
                    Weekday::Monday,
                    540,
                    600,
                )],
                &config,
            ),
            build_slot_set(
                &[TimeRange::new(
                    owner_b,
                    Scope::Personal,
                    Weekday::Monday,
                    570,
                    630,
                )],
                &config,
            ),
            build_slot_set(
                &[TimeRange::new(
                    owner_c,
                    Scope::Personal,
                    Weekday::Monday,
                    540,
                    660,
                )],
                &config,
            ),
        ];

        let aggregation = aggregate(&sets);
        for (key, count) in aggregation.slot_counts() {
            assert!(*count >= 1 && *count <= aggregation.member_count());
            assert_eq!(
                *count == aggregation.member_count(),
                aggregation.is_optimal(key)
            );
        }

        // 09:00 is covered by two of the three members.
        assert_eq!(aggregation.count(&SlotKey::new(Weekday::Monday, 9, 0)), 2);
        assert!(!aggregation.is_optimal(&SlotKey::new(Weekday::Monday, 9, 0)));
    }

    #[test]
    fn hour_coverage_fractions() {
        let owner_a = MemberId::new();
        let owner_b = MemberId::new();
        let config = GridConfig::default();

        // Both cover all of 10:00..11:00; only one covers 11:00..11:30.
        let sets = vec![
            build_slot_set(
                &[TimeRange::new(
                    owner_a,
                    Scope::Personal,
                    Weekday::Friday,
                    600,
                    690,
                )],
                &config,
            ),
            build_slot_set(
                &[TimeRange::new(
                    owner_b,
                    Scope::Personal,
                    Weekday::Friday,
                    600,
                    660,
                )],
                &config,
            ),
        ];

        let aggregation = aggregate(&sets);
        assert_eq!(aggregation.hour_coverage(Weekday::Friday, 10, &config), 1.0);
        assert_eq!(aggregation.hour_coverage(Weekday::Friday, 11, &config), 0.0);
        assert_eq!(aggregation.hour_coverage(Weekday::Friday, 12, &config), 0.0);
        assert_eq!(aggregation.optimal_in_hour(Weekday::Friday, 10), 6);
    }

    #[test]
    fn aligned_range_survives_into_blocks() {
        let owner = MemberId::new();
        let config = GridConfig::default();
        let slots = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Thursday,
                540,
                600,
            )],
            &config,
        );
        assert_eq!(slots.len(), 6);

        let blocks = compose(&slots, &config);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].day, Weekday::Thursday);
        assert_eq!(blocks[0].start_minute, 540);
        assert_eq!(blocks[0].end_minute, 600);
    }

    #[test]
    fn misaligned_start_keeps_its_phase() {
        let owner = MemberId::new();
        let config = GridConfig::default();

        let slots = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Monday,
                545,
                600,
            )],
            &config,
        );
        // 545..600 fits five phased slots; the 595..605 remainder is dropped.
        assert_eq!(slots.len(), 5);
        assert_eq!(
            slots.iter().next().copied(),
            Some(SlotKey::new(Weekday::Monday, 9, 5))
        );

        let short = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Monday,
                540,
                555,
            )],
            &config,
        );
        assert_eq!(short.len(), 1);

        let too_short = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Monday,
                540,
                545,
            )],
            &config,
        );
        assert!(too_short.is_empty());
    }

    #[test]
    fn slots_clip_to_window_and_days() {
        let owner = MemberId::new();
        let config = GridConfig::default();

        // 08:00..10:00 only yields the slots at or after 09:00.
        let early = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Monday,
                480,
                600,
            )],
            &config,
        );
        assert_eq!(early.len(), 6);
        assert!(early.iter().all(|key| key.hour >= 9));

        // 20:30..21:30 stops at the end of the window.
        let late = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Monday,
                1230,
                1290,
            )],
            &config,
        );
        assert_eq!(late.len(), 3);
        assert!(late.iter().all(|key| key.hour == 20));

        let monday_only = GridConfig::default().with_allowed_days(vec![Weekday::Monday]);
        let off_day = build_slot_set(
            &[TimeRange::new(
                owner,
                Scope::Personal,
                Weekday::Tuesday,
                540,
                600,
            )],
            &monday_only,
        );
        assert!(off_day.is_empty());
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let owner = MemberId::new();
        let config = GridConfig::default();
        let first = TimeRange::new(owner, Scope::Personal, Weekday::Monday, 540, 600);
        let second = TimeRange::new(owner, Scope::Personal, Weekday::Wednesday, 720, 780);

        assert_eq!(
            build_slot_set(&[first, second], &config),
            build_slot_set(&[second, first], &config)
        );
    }

    #[test]
    fn last_submission_triggers_recommendation() {
        let (mut engine, team, ids) = engine_with_team(3);
        let scope = Scope::Team(team);
        for id in &ids {
            engine
                .add_time_range(*id, scope, Weekday::Monday, 570, 600)
                .unwrap();
        }

        let first = engine.submit_availability(team, ids[0]).unwrap();
        assert!(!first.triggered);
        let second = engine.submit_availability(team, ids[1]).unwrap();
        assert!(!second.triggered);
        assert!(engine.posts().posts().is_empty());

        let last = engine.submit_availability(team, ids[2]).unwrap();
        assert!(last.triggered);
        assert!(last.post.is_some());
        assert_eq!(last.blocks.as_ref().map(Vec::len), Some(1));

        let posts = engine.posts().posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].team, team);
        assert_eq!(posts[0].title, RECOMMENDATION_TITLE);
        assert!(posts[0].title.starts_with(AUTO_POST_TAG));
        assert!(posts[0].body.contains("Monday 09:30-10:00"));
        assert_eq!(engine.store().trigger_state(team), TriggerState::Triggered);
    }

    #[test]
    fn empty_overlap_suppresses_post() {
        let (mut engine, team, ids) = engine_with_team(2);

        engine.submit_availability(team, ids[0]).unwrap();
        let outcome = engine.submit_availability(team, ids[1]).unwrap();

        // The trigger still fires; there is just nothing worth posting.
        assert!(outcome.triggered);
        assert_eq!(outcome.blocks, Some(Vec::new()));
        assert_eq!(outcome.post, None);
        assert!(engine.posts().posts().is_empty());
        assert_eq!(engine.store().trigger_state(team), TriggerState::Triggered);
    }

    #[test]
    fn trigger_fires_only_once() {
        let (mut engine, team, ids) = engine_with_team(2);
        let scope = Scope::Team(team);
        engine
            .add_time_range(ids[0], scope, Weekday::Tuesday, 600, 660)
            .unwrap();
        engine
            .add_time_range(ids[1], scope, Weekday::Tuesday, 600, 660)
            .unwrap();

        engine.submit_availability(team, ids[0]).unwrap();
        let fired = engine.submit_availability(team, ids[1]).unwrap();
        assert!(fired.triggered);

        let again = engine.submit_availability(team, ids[0]).unwrap();
        assert!(!again.triggered);
        assert_eq!(again.blocks, None);
        assert_eq!(engine.posts().posts().len(), 1);
    }

    #[test]
    fn outage_serves_last_aggregation() {
        let (mut engine, team, ids) = engine_with_team(2);
        let scope = Scope::Team(team);
        engine
            .add_time_range(ids[0], scope, Weekday::Monday, 540, 600)
            .unwrap();
        engine
            .add_time_range(ids[1], scope, Weekday::Monday, 540, 600)
            .unwrap();

        let live = engine.aggregation(team);
        assert_eq!(live.optimal_slots().len(), 6);

        engine.store_mut().set_offline(true);
        assert_eq!(engine.aggregation(team), live);

        // A team that never aggregated has nothing cached to fall back on.
        let orphan = MemberId::new();
        let fresh = engine.roster_mut().create_board(2);
        engine.roster_mut().join(fresh, orphan).unwrap();
        engine.roster_mut().activate(fresh).unwrap();
        assert_eq!(engine.aggregation(fresh), Aggregation::empty());

        engine.store_mut().set_offline(false);
        assert_eq!(engine.aggregation(team), live);
    }

    #[test]
    fn stale_refresh_is_discarded() {
        let (mut engine, team, ids) = engine_with_team(2);
        let scope = Scope::Team(team);
        engine
            .add_time_range(ids[0], scope, Weekday::Monday, 540, 600)
            .unwrap();
        engine
            .add_time_range(ids[1], scope, Weekday::Monday, 540, 600)
            .unwrap();

        let mut feed = AggregationFeed::new();
        let stale = feed.begin(team);
        let fresh = feed.begin(team);

        let result = engine.aggregation(team);
        assert!(!feed.apply(stale, Aggregation::empty()));
        assert_eq!(feed.aggregation(), None);

        assert!(feed.apply(fresh, result.clone()));
        assert_eq!(feed.aggregation(), Some(&result));

        // Switching teams clears the display until the new result lands.
        let elsewhere = TeamId::new();
        let moved = feed.begin(elsewhere);
        assert_eq!(feed.aggregation(), None);
        assert!(!feed.apply(fresh, result));
        assert!(feed.apply(moved, Aggregation::empty()));
        assert_eq!(feed.team(), Some(elsewhere));
    }

    #[test]
    fn newer_refresh_supersedes_older() {
        let mut tracker = RefreshTracker::new();
        let team_a = TeamId::new();
        let team_b = TeamId::new();

        let first = tracker.issue(team_a);
        assert!(tracker.is_latest(first));

        let second = tracker.issue(team_a);
        assert!(!tracker.is_latest(first));
        assert!(tracker.is_latest(second));

        // Generations are tracked per team.
        let other = tracker.issue(team_b);
        assert!(tracker.is_latest(second));
        assert!(tracker.is_latest(other));
    }

    #[test]
    fn leavers_drop_out_of_aggregation() {
        let (mut engine, team, ids) = engine_with_team(3);
        let scope = Scope::Team(team);
        for id in &ids {
            engine
                .add_time_range(*id, scope, Weekday::Wednesday, 570, 600)
                .unwrap();
        }

        engine.roster_mut().leave(team, ids[2]).unwrap();

        let aggregation = engine.aggregation(team);
        assert_eq!(aggregation.member_count(), 2);
        assert_eq!(aggregation.optimal_slots().len(), 3);

        // Their declarations stay stored, just unread.
        let kept = engine.store().fetch_ranges(ids[2], scope).unwrap();
        assert_eq!(kept.len(), 1);

        // Full submission is judged against the roster as it stands now.
        engine.submit_availability(team, ids[0]).unwrap();
        let outcome = engine.submit_availability(team, ids[1]).unwrap();
        assert!(outcome.triggered);
    }

    #[test]
    fn removed_range_frees_its_minutes() {
        let (mut engine, team, ids) = engine_with_team(1);
        let scope = Scope::Team(team);

        let first = engine
            .add_time_range(ids[0], scope, Weekday::Monday, 540, 600)
            .unwrap();
        engine.remove_time_range(ids[0], first).unwrap();

        let again = engine.add_time_range(ids[0], scope, Weekday::Monday, 540, 600);
        assert!(again.is_ok());
    }

    #[test]
    fn duplicate_range_is_an_overlap() {
        let (mut engine, team, ids) = engine_with_team(1);
        let scope = Scope::Team(team);

        engine
            .add_time_range(ids[0], scope, Weekday::Monday, 540, 600)
            .unwrap();
        assert!(matches!(
            engine.add_time_range(ids[0], scope, Weekday::Monday, 540, 600),
            Err(EngineError::Range(RangeError::Overlap { .. }))
        ));
    }

    #[test]
    fn only_the_owner_removes_a_range() {
        let (mut engine, team, ids) = engine_with_team(2);
        let scope = Scope::Team(team);

        let range = engine
            .add_time_range(ids[0], scope, Weekday::Monday, 540, 600)
            .unwrap();

        assert!(matches!(
            engine.remove_time_range(ids[1], range),
            Err(EngineError::Store(StoreError::NotFound(_)))
        ));
        assert!(matches!(
            engine.remove_time_range(ids[0], RangeId::new()),
            Err(EngineError::Store(StoreError::NotFound(_)))
        ));

        let kept = engine.store().fetch_ranges(ids[0], scope).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn declaring_is_not_submitting() {
        let (mut engine, team, ids) = engine_with_team(2);

        engine
            .add_time_range(ids[0], Scope::Team(team), Weekday::Tuesday, 600, 660)
            .unwrap();

        assert!(!engine.submissions().has_submitted(team, ids[0]));
        let records = engine.submissions().records(team);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member, ids[0]);
        assert!(!records[0].submitted);
    }

    #[test]
    fn unactivated_board_has_no_active_members() {
        let mut roster = MemoryRoster::new();
        let team = roster.create_board(2);
        let member = MemberId::new();
        roster.join(team, member).unwrap();

        let mut engine = Engine::new(
            GridConfig::default(),
            roster,
            MemoryStore::new(),
            MemoryPosts::new(),
        )
        .unwrap();

        assert_eq!(engine.aggregation(team).member_count(), 0);
        assert_eq!(
            engine.submit_availability(team, member),
            Err(EngineError::NotAMember { team, member })
        );
    }

    #[test]
    fn submit_recovers_after_outage() {
        let (mut engine, team, ids) = engine_with_team(1);

        engine.store_mut().set_offline(true);
        assert!(matches!(
            engine.add_time_range(ids[0], Scope::Team(team), Weekday::Monday, 540, 600),
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            engine.submit_availability(team, ids[0]),
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
        assert_eq!(engine.store().trigger_state(team), TriggerState::NotTriggered);

        engine.store_mut().set_offline(false);
        let outcome = engine.submit_availability(team, ids[0]).unwrap();
        assert!(outcome.triggered);
    }

    #[test]
    fn scan_detects_conflicts_anywhere_in_the_set() {
        let owner = MemberId::new();
        let clean = vec![
            TimeRange::new(owner, Scope::Personal, Weekday::Monday, 540, 600),
            TimeRange::new(owner, Scope::Personal, Weekday::Monday, 600, 660),
            TimeRange::new(owner, Scope::Personal, Weekday::Tuesday, 540, 600),
        ];
        assert!(scan_overlaps(&clean).is_ok());

        // The conflicting pair is not adjacent in declaration order.
        let tainted = vec![
            TimeRange::new(owner, Scope::Personal, Weekday::Monday, 540, 600),
            TimeRange::new(owner, Scope::Personal, Weekday::Monday, 300, 400),
            TimeRange::new(owner, Scope::Personal, Weekday::Monday, 550, 560),
        ];
        assert!(scan_overlaps(&tainted).is_err());
    }

    #[test]
    fn conflicting_stored_ranges_count_as_unavailable() {
        let mut roster = MemoryRoster::new();
        let team = roster.create_board(1);
        let member = MemberId::new();
        roster.join(team, member).unwrap();
        roster.activate(team).unwrap();

        // Write conflicting rows directly, bypassing validation.
        let mut store = MemoryStore::new();
        store
            .save_range(TimeRange::new(
                member,
                Scope::Team(team),
                Weekday::Monday,
                540,
                600,
            ))
            .unwrap();
        store
            .save_range(TimeRange::new(
                member,
                Scope::Team(team),
                Weekday::Monday,
                550,
                610,
            ))
            .unwrap();

        let mut engine =
            Engine::new(GridConfig::default(), roster, store, MemoryPosts::new()).unwrap();

        let aggregation = engine.aggregation(team);
        assert_eq!(aggregation.member_count(), 1);
        assert!(aggregation.slot_counts().is_empty());
        assert!(aggregation.optimal_slots().is_empty());
    }

    #[test]
    fn rejects_unusable_grid() {
        assert_eq!(
            GridConfig::default().with_interval_minutes(7).validate(),
            Err(ConfigError::UnevenInterval(7))
        );
        assert_eq!(
            GridConfig::default().with_window(21, 9).validate(),
            Err(ConfigError::EmptyWindow { start: 21, end: 9 })
        );
        assert_eq!(
            GridConfig::default().with_allowed_days(Vec::new()).validate(),
            Err(ConfigError::NoAllowedDays)
        );

        let refused = Engine::new(
            GridConfig::default().with_interval_minutes(0),
            MemoryRoster::new(),
            MemoryStore::new(),
            MemoryPosts::new(),
        );
        assert_eq!(refused.err(), Some(ConfigError::UnevenInterval(0)));
    }
}

//! Property-based tests using proptest
//!
//! Invariants that must hold for every seed and tunable combination:
//! - Termination: any retry shape finishes within the attempt cap
//! - Graph structure: depth, self-loop and parent-door rules
//! - Alignment: quarter-turn doors always close the seam
//! - Retry decay: doors at the failure limit are never requeued

use dungeon_foreman::align::*;
use dungeon_foreman::direction::*;
use dungeon_foreman::door::DoorId;
use dungeon_foreman::location::normalized_delta;
use dungeon_foreman::retry::*;
use dungeon_foreman::room::RoomId;
use dungeon_foreman::*;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

fn catalog() -> TemplateCatalog {
    TemplateCatalog::new("hall")
        .with_template(RoomTemplate::square("cross", "hall", 10.0, DirectionSet::all()))
        .with_template(RoomTemplate::square(
            "corridor",
            "hall",
            10.0,
            DirectionSet::NORTH | DirectionSet::SOUTH,
        ))
        .with_template(RoomTemplate::square(
            "tee",
            "hall",
            10.0,
            DirectionSet::EAST | DirectionSet::SOUTH | DirectionSet::WEST,
        ))
        .with_variant("hall", WeightedVariant::new("cross", 0.5))
        .with_variant("hall", WeightedVariant::new("corridor", 0.3))
        .with_variant("hall", WeightedVariant::new("tee", 0.2))
}

// ============================================================
// Termination
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_any_retry_shape_terminates_within_cap(
        seed in any::<u64>(),
        target in 1u32..30,
        max_try_count in 1u32..5,
        door_retry_probability in 0.0f32..=1.0,
        fail_penalty_factor in 0.0f32..1.0,
        max_door_fail_count in 1u32..6,
        door_retry_delay in 0.0f32..3.0,
        blocked in any::<bool>(),
    ) {
        let config = GenerationConfig {
            max_try_count,
            door_retry_probability,
            fail_penalty_factor,
            max_door_fail_count,
            door_retry_delay,
            rng_seed: seed,
            ..GenerationConfig::default()
        };
        let mut open = FootprintOracle::new();
        let mut closed = AlwaysBlocked;
        let oracle: &mut dyn GeometryOracle = if blocked { &mut closed } else { &mut open };

        let mut session = GenerationSession::new(config, catalog()).unwrap();
        let seed_room = session.place_seed("cross", Pose::identity(), oracle).unwrap();
        let report = grow_from(&mut session, seed_room, target, oracle).unwrap();

        prop_assert!(report.total_attempts <= report.max_total_attempts);
        prop_assert!(report.placed <= target);
        prop_assert_eq!(session.graph().len() as u32, report.placed + 1);
        if blocked {
            prop_assert_eq!(report.placed, 0);
        }
    }
}

// ============================================================
// Graph structure
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_generated_graph_keeps_its_invariants(
        seed in any::<u64>(),
        first in 1u32..25,
        per_depth in 1u32..8,
        legacy_policy in any::<bool>(),
    ) {
        let config = GenerationConfig {
            room_count_first_time: first,
            room_count_per_depth: per_depth,
            door_selection: if legacy_policy {
                DoorSelectionPolicy::MultipleDoors
            } else {
                DoorSelectionPolicy::DirectionBias
            },
            rng_seed: seed,
            ..GenerationConfig::default()
        };
        let mut oracle = FootprintOracle::new();
        let (mut session, _) = GeneratorBuilder::new(catalog())
            .config(config)
            .seed_template("cross")
            .generate(&mut oracle)
            .unwrap();
        expand_level(&mut session, &mut oracle).unwrap();

        let graph = session.graph();
        prop_assert!(graph.validate().is_ok());
        for room in graph.rooms() {
            for door in &room.doors {
                prop_assert_ne!(door.to_room(), Some(door.from_room()));
            }
            if let Some(parent_door) = room.parent_door {
                prop_assert!(!room.selected_doors().contains(&parent_door));
                let parent = graph.room(room.parent.unwrap().room).unwrap();
                prop_assert_eq!(room.depth, parent.depth + 1);
            } else {
                prop_assert_eq!(room.depth, 0);
            }
        }
    }
}

// ============================================================
// Alignment
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_quarter_turn_doors_always_close_the_seam(
        existing_quarter in 0u8..4,
        local_quarter in 0u8..4,
        pose_quarter in 0u8..4,
        ex in -50.0f32..50.0,
        ez in -50.0f32..50.0,
        lx in -8.0f32..8.0,
        lz in -8.0f32..8.0,
    ) {
        let existing = DoorFacing::new(WorldPos::new(ex, ez), existing_quarter as f32 * 90.0);
        let local_position = WorldPos::new(lx, lz);
        let local_yaw = local_quarter as f32 * 90.0;
        let pose = Pose::new(WorldPos::new(3.0, -7.0), pose_quarter as f32 * 90.0);

        let placement = DoorAligner::default()
            .compute_placement(&existing, pose, local_position, local_yaw)
            .unwrap();

        let door = placement.pose.transform_point(local_position);
        prop_assert!(door.approx_eq(existing.position, 1e-3), "{:?} vs {:?}", door, existing.position);
        let facing = placement.pose.transform_yaw(local_yaw);
        prop_assert!((normalized_delta(existing.yaw, facing).abs() - 180.0).abs() < 1e-3);
    }

    #[test]
    fn prop_off_axis_doors_are_refused(
        existing_quarter in 0u8..4,
        offset in 10.0f32..80.0,
    ) {
        let existing = existing_quarter as f32 * 90.0;
        let result = DoorAligner::default().rotation_for(existing, existing + offset);
        prop_assert!(result.is_err());
    }
}

// ============================================================
// Retry decay
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_door_at_failure_limit_is_never_requeued(
        seed in any::<u64>(),
        max_door_fail_count in 1u32..6,
        extra_failures in 0u32..4,
    ) {
        let config = GenerationConfig {
            door_retry_probability: 1.0,
            fail_penalty_factor: 0.0,
            max_door_fail_count,
            ..GenerationConfig::default()
        };
        let door = DoorId::new(RoomId(0), 0);
        let mut book = RetryBook::new();
        for i in 0..(max_door_fail_count + extra_failures) {
            book.record_failure(door, Duration::from_secs(i as u64));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for _ in 0..16 {
            prop_assert_eq!(book.decide(door, &config, &mut rng), RetryDecision::Abandon);
        }
    }
}

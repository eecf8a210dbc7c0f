//! Property tests for the core loop, the save schema and the autosave policy.

use elementum::components::core_loop::CoreLoop;
use elementum::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Tap,
    Remove(i64),
    Anti(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Tap),
        1 => (-5i64..60).prop_map(Op::Remove),
        1 => (-2i64..4).prop_map(Op::Anti),
    ]
}

fn core_config() -> impl Strategy<Value = CoreLoopConfig> {
    (1i64..400, 1i64..150, 0i64..500).prop_map(|(target_mass, mass_per_tap, starting_mass)| {
        CoreLoopConfig {
            target_mass,
            mass_per_tap,
            starting_mass,
            ..CoreLoopConfig::default()
        }
    })
}

proptest! {
    #[test]
    fn taps_never_lower_mass_and_milestones_fire_once(
        config in core_config(),
        taps in 0usize..300,
    ) {
        let mut core = CoreLoop::new(config);
        core.initialize();

        let mut events = Vec::new();
        let mut last_mass = core.current_mass();
        for _ in 0..taps {
            events.extend(core.tap());
            prop_assert!(core.current_mass() >= last_mass);
            last_mass = core.current_mass();
        }

        let milestones: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                GameEvent::MilestoneRequested { checkpoint_percent } => Some(*checkpoint_percent),
                _ => None,
            })
            .collect();
        prop_assert!([33u8, 66].starts_with(&milestones), "milestones: {:?}", milestones);

        let count = |wanted: &GameEvent| events.iter().filter(|event| *event == wanted).count();
        prop_assert!(count(&GameEvent::CollapseStarted) <= 1);
        prop_assert!(count(&GameEvent::WinReached) <= 1);
        prop_assert_eq!(count(&GameEvent::WinReached), count(&GameEvent::SaveRequested));
    }

    #[test]
    fn mass_never_goes_negative_and_no_op_changes_stay_silent(
        config in core_config(),
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let mut core = CoreLoop::new(config);
        core.initialize();

        for op in ops {
            let before = core.current_mass();
            let events = match op {
                Op::Tap => core.tap(),
                Op::Remove(amount) => core.remove_mass(amount, "prop"),
                Op::Anti(count) => core.set_active_anti_count(count),
            };
            prop_assert!(core.current_mass() >= 0);
            prop_assert!(core.active_anti_count() >= 0);

            for event in &events {
                if let GameEvent::MassChanged { mass, delta, .. } = event {
                    prop_assert_ne!(*delta, 0);
                    prop_assert_eq!(*mass, before + delta);
                }
            }
            if core.current_mass() == before {
                let reported = events.iter().any(|event| event.topic() == Topic::MassChanged);
                prop_assert!(!reported);
            }
        }
    }

    #[test]
    fn win_requires_target_mass_and_no_antis(
        config in core_config(),
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let target = config.target_mass;
        let mut core = CoreLoop::new(config);
        core.initialize();

        for op in ops {
            let events = match op {
                Op::Tap => core.tap(),
                Op::Remove(amount) => core.remove_mass(amount, "prop"),
                Op::Anti(count) => core.set_active_anti_count(count),
            };
            if events.contains(&GameEvent::WinReached) {
                prop_assert!(core.current_mass() >= target);
                prop_assert_eq!(core.active_anti_count(), 0);
                prop_assert_eq!(core.state(), GameState::Win);
            }
        }
    }

    #[test]
    fn migration_never_yields_negatives_or_blank_ids(
        schema_version in -3i64..4,
        last_known_mass in any::<i64>(),
        best_mass in any::<i64>(),
        total_wins in any::<i64>(),
        star_dust in any::<i64>(),
        last_element_id in "[ A-Za-z]{0,4}",
    ) {
        let record = SaveRecord {
            schema_version,
            last_known_mass,
            best_mass,
            total_wins,
            star_dust,
            last_element_id,
        };
        let migrated = record.clone().migrate();

        if record.is_latest() {
            prop_assert_eq!(&migrated, &record);
        } else {
            prop_assert!(migrated.is_latest());
            prop_assert!(migrated.last_known_mass >= 0);
            prop_assert!(migrated.best_mass >= 0);
            prop_assert!(migrated.total_wins >= 0);
            prop_assert!(migrated.star_dust >= 0);
            prop_assert!(!migrated.last_element_id.trim().is_empty());
        }
        prop_assert_eq!(migrated.clone().migrate(), migrated);
    }

    #[test]
    fn mass_accumulator_stays_below_the_threshold(
        threshold in 1u64..50,
        deltas in prop::collection::vec(-30i64..30, 0..100),
    ) {
        let hub = EventHub::new();
        let store = MemoryStore::new();
        let config = SaveConfig {
            mass_delta_per_auto_save: threshold,
            ..SaveConfig::default()
        };
        let persistence = PersistenceService::start(&hub, Some(config), Box::new(store.clone()));

        let mut mass = 0i64;
        let mut expected = 0u64;
        let mut expected_writes = store.write_count();
        for delta in deltas {
            mass += delta;
            hub.publish(GameEvent::MassChanged { mass, delta, reason: "prop".to_string() });

            expected += delta.unsigned_abs();
            if expected >= threshold {
                expected = 0;
                expected_writes += 1;
            }
            prop_assert_eq!(persistence.accumulated_mass_delta(), expected);
            prop_assert!(persistence.accumulated_mass_delta() < threshold);
        }
        prop_assert_eq!(store.write_count(), expected_writes);
    }
}

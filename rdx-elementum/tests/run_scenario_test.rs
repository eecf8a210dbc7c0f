//! End-to-end runs through the hub with every component attached.

mod common;

use common::{setup, setup_with, tap, EventRecorder};
use elementum::prelude::*;
use std::rc::Rc;

#[test]
fn test_full_run_to_win() {
    let h = setup();

    assert_eq!(h.recorder.states(), vec![GameState::Playing]);
    assert_eq!(
        h.recorder.events()[1],
        GameEvent::MassChanged {
            mass: 0,
            delta: 0,
            reason: "run-start".to_string(),
        }
    );

    tap(&h.hub, 33);
    assert_eq!(h.recorder.milestones(), vec![33]);

    tap(&h.hub, 33);
    assert_eq!(h.recorder.milestones(), vec![33, 66]);
    assert_eq!(h.core.state(), GameState::Playing);

    tap(&h.hub, 24);
    assert_eq!(h.core.current_mass(), 90);
    assert_eq!(h.core.state(), GameState::Collapse);
    assert_eq!(h.recorder.count(Topic::CollapseStarted), 1);

    tap(&h.hub, 10);
    assert_eq!(h.core.state(), GameState::Win);
    assert_eq!(h.recorder.count(Topic::WinReached), 1);
    assert_eq!(h.recorder.count(Topic::SaveRequested), 1);
    assert_eq!(
        h.recorder.states(),
        vec![GameState::Playing, GameState::Collapse, GameState::Win]
    );

    // Taps after the win change nothing.
    tap(&h.hub, 5);
    assert_eq!(h.core.current_mass(), 100);
    assert_eq!(h.recorder.count(Topic::WinReached), 1);
    assert_eq!(h.recorder.milestones(), vec![33, 66]);

    let record = h.persistence.record();
    assert_eq!(record.best_mass, 100);
    assert_eq!(record.last_known_mass, 100);
    assert_eq!(record.total_wins, 1);
    // initial-create, ten mass autosaves, win-state and signal-request.
    assert_eq!(h.store.write_count(), 13);
}

#[test]
fn test_win_event_order() {
    let h = setup_with(
        CoreLoopConfig {
            starting_mass: 99,
            ..CoreLoopConfig::default()
        },
        SaveConfig::default(),
        MemoryStore::new(),
    );
    h.recorder.clear();

    tap(&h.hub, 1);

    let topics: Vec<Topic> = h.recorder.events().iter().map(GameEvent::topic).collect();
    assert_eq!(
        topics,
        vec![
            Topic::GestureTap,
            Topic::MassChanged,
            Topic::MilestoneRequested,
            Topic::MilestoneRequested,
            Topic::StateChanged,
            Topic::CollapseStarted,
            Topic::StateChanged,
            Topic::WinReached,
            Topic::SaveRequested,
        ]
    );
}

#[test]
fn test_clearing_antis_wins_without_a_tap() {
    let h = setup();
    tap(&h.hub, 95);
    h.core.set_active_anti_count(2);
    tap(&h.hub, 5);
    assert_eq!(h.core.state(), GameState::Collapse);
    assert_eq!(h.recorder.count(Topic::WinReached), 0);

    h.core.set_active_anti_count(0);
    assert_eq!(h.core.state(), GameState::Win);
    assert_eq!(h.recorder.count(Topic::WinReached), 1);
    assert_eq!(h.persistence.record().total_wins, 1);
}

#[test]
fn test_ad_break_pauses_the_run_and_restores_time() {
    let h = setup();
    let scale = 0.75_f32;
    let clock = Rc::new(GlobalClock::with_time_scale(scale));
    let pause = PauseCoordinator::new(&h.hub, clock.clone());

    tap(&h.hub, 10);
    pause.notify_ad_opened();
    assert_eq!(h.core.state(), GameState::Paused);
    assert_eq!(clock.time_scale(), 0.0);
    assert!(clock.audio_paused());

    tap(&h.hub, 10);
    assert_eq!(h.core.current_mass(), 10, "taps are ignored during the ad");

    pause.notify_reward_granted();
    pause.notify_ad_closed();
    assert_eq!(h.core.state(), GameState::Playing);
    assert_eq!(clock.time_scale().to_bits(), scale.to_bits());
    assert!(!clock.audio_paused());

    assert_eq!(
        h.recorder.states(),
        vec![GameState::Playing, GameState::Paused, GameState::Playing]
    );
    assert_eq!(h.recorder.count(Topic::RewardGranted), 1);
}

#[test]
fn test_double_ad_open_on_the_hub_resumes_into_playing() {
    let h = setup();
    tap(&h.hub, 90);
    assert_eq!(h.core.state(), GameState::Collapse);

    h.hub.publish(GameEvent::AdOpened);
    h.hub.publish(GameEvent::AdOpened);
    h.hub.publish(GameEvent::AdClosed);

    assert_eq!(h.core.state(), GameState::Playing);
    assert_eq!(
        h.recorder.states(),
        vec![
            GameState::Playing,
            GameState::Collapse,
            GameState::Paused,
            GameState::Playing,
        ]
    );
}

#[test]
fn test_double_ad_open_through_the_coordinator_keeps_collapse() {
    let h = setup();
    let pause = PauseCoordinator::new(&h.hub, Rc::new(GlobalClock::new()));
    tap(&h.hub, 90);

    pause.notify_ad_opened();
    pause.notify_ad_opened();
    pause.notify_ad_closed();

    assert_eq!(h.core.state(), GameState::Collapse);
}

#[test]
fn test_swipes_and_holds_do_not_add_mass() {
    let h = setup();
    h.hub.publish(GameEvent::GestureSwipe {
        start: ScreenPoint::new(0.0, 0.0),
        end: ScreenPoint::new(50.0, 10.0),
        duration_secs: 0.2,
    });
    h.hub.publish(GameEvent::GestureHold {
        position: ScreenPoint::new(5.0, 5.0),
        duration_secs: 1.0,
    });
    assert_eq!(h.core.current_mass(), 0);
    assert_eq!(h.recorder.count(Topic::GestureSwipe), 1);
    assert_eq!(h.recorder.count(Topic::GestureHold), 1);
}

#[test]
fn test_inert_core_loop_leaves_persistence_working() {
    let hub = EventHub::new();
    let recorder = EventRecorder::attach(&hub);
    let store = MemoryStore::new();
    let persistence =
        PersistenceService::start(&hub, Some(SaveConfig::default()), Box::new(store.clone()));
    let mut core = CoreLoopController::new(&hub, None);
    core.activate();

    common::tap(&hub, 20);
    hub.publish(GameEvent::SaveRequested);

    assert_eq!(core.current_mass(), 0);
    assert_eq!(recorder.count(Topic::MassChanged), 0);
    assert_eq!(store.write_count(), 2);
    assert!(!persistence.is_inert());
}

#[test]
fn test_teardown_silences_every_component() {
    let h = setup();
    tap(&h.hub, 5);
    h.hub.teardown();

    tap(&h.hub, 5);
    h.hub.publish(GameEvent::SaveRequested);

    assert_eq!(h.core.current_mass(), 5);
    assert_eq!(h.store.write_count(), 1);

    // Operations called directly still work, they just reach nobody.
    h.core.set_active_anti_count(0);
    assert_eq!(h.core.state(), GameState::Playing);
}

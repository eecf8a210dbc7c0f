//! Shared helpers for the integration tests.

#![allow(dead_code)]

use elementum::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Records every event published on a hub, in dispatch order.
pub struct EventRecorder {
    events: Rc<RefCell<Vec<GameEvent>>>,
    _subscriptions: Vec<Subscription>,
}

impl EventRecorder {
    pub fn attach(hub: &EventHub) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let subscriptions = Topic::ALL
            .into_iter()
            .map(|topic| {
                let sink = events.clone();
                hub.on(topic, move |event| sink.borrow_mut().push(event.clone()))
            })
            .collect();
        Self {
            events,
            _subscriptions: subscriptions,
        }
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, topic: Topic) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.topic() == topic)
            .count()
    }

    pub fn milestones(&self) -> Vec<u8> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                GameEvent::MilestoneRequested { checkpoint_percent } => Some(*checkpoint_percent),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<GameState> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                GameEvent::StateChanged { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

/// A hub with a recorder, persistence on a memory store and an active core loop.
pub struct Harness {
    pub hub: EventHub,
    pub recorder: EventRecorder,
    pub store: MemoryStore,
    pub persistence: PersistenceService,
    pub core: CoreLoopController,
}

pub fn setup_with(core_loop: CoreLoopConfig, save: SaveConfig, store: MemoryStore) -> Harness {
    let hub = EventHub::new();
    let recorder = EventRecorder::attach(&hub);
    let persistence = PersistenceService::start(&hub, Some(save), Box::new(store.clone()));
    let mut core = CoreLoopController::new(&hub, Some(core_loop));
    core.activate();
    Harness {
        hub,
        recorder,
        store,
        persistence,
        core,
    }
}

pub fn setup() -> Harness {
    setup_with(CoreLoopConfig::default(), SaveConfig::default(), MemoryStore::new())
}

pub fn tap(hub: &EventHub, times: usize) {
    for _ in 0..times {
        hub.publish(GameEvent::GestureTap {
            position: ScreenPoint::default(),
        });
    }
}

//! Freezes game time and audio for the length of an ad break.

use crate::common::ObserverId;
use crate::events::GameEvent;
use crate::hub::EventHub;
use crate::time::TimeControl;
use slotmap::SlotMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info};

/// Ad lifecycle notifications delivered to direct observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdSignal {
    Opened,
    Closed,
    RewardGranted,
}

impl AdSignal {
    fn event(self) -> GameEvent {
        match self {
            AdSignal::Opened => GameEvent::AdOpened,
            AdSignal::Closed => GameEvent::AdClosed,
            AdSignal::RewardGranted => GameEvent::RewardGranted,
        }
    }
}

type Observer = Rc<dyn Fn(AdSignal)>;

/// Time and audio state captured when the ad opened.
#[derive(Debug, Clone, Copy)]
struct Frozen {
    time_scale: f32,
    audio_paused: bool,
}

/// Bridges the ad SDK to the rest of the game.
///
/// While an ad is showing the clock is held at scale `0.0` with audio muted.
/// Observers hear about every signal before the hub does.
pub struct PauseCoordinator {
    hub: EventHub,
    clock: Rc<dyn TimeControl>,
    frozen: Cell<Option<Frozen>>,
    observers: RefCell<SlotMap<ObserverId, Observer>>,
}

impl PauseCoordinator {
    pub fn new(hub: &EventHub, clock: Rc<dyn TimeControl>) -> Self {
        Self {
            hub: hub.clone(),
            clock,
            frozen: Cell::new(None),
            observers: RefCell::new(SlotMap::with_key()),
        }
    }

    pub fn notify_ad_opened(&self) {
        if self.is_paused() {
            debug!("Ad already open; ignoring repeated open.");
            return;
        }

        self.frozen.set(Some(Frozen {
            time_scale: self.clock.time_scale(),
            audio_paused: self.clock.audio_paused(),
        }));
        self.clock.set_time_scale(0.0);
        self.clock.set_audio_paused(true);
        info!("Ad opened; game time frozen.");

        self.broadcast(AdSignal::Opened);
    }

    pub fn notify_ad_closed(&self) {
        if !self.restore() {
            debug!("No ad open; ignoring close.");
            return;
        }
        info!("Ad closed; game time restored.");

        self.broadcast(AdSignal::Closed);
    }

    pub fn notify_reward_granted(&self) {
        debug!("Ad reward granted.");
        self.broadcast(AdSignal::RewardGranted);
    }

    pub fn is_paused(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Registers a direct listener for ad signals.
    pub fn observe(&self, observer: impl Fn(AdSignal) + 'static) -> ObserverId {
        self.observers.borrow_mut().insert(Rc::new(observer))
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let removed = self.observers.borrow_mut().remove(id);
        removed.is_some()
    }

    /// Restores the clock if an ad is still open. Also runs on drop.
    pub fn shutdown(&self) {
        if self.restore() {
            info!("PauseCoordinator shut down mid-ad; game time restored.");
        }
    }

    fn restore(&self) -> bool {
        let Some(frozen) = self.frozen.take() else {
            return false;
        };
        self.clock.set_time_scale(frozen.time_scale);
        self.clock.set_audio_paused(frozen.audio_paused);
        true
    }

    fn broadcast(&self, signal: AdSignal) {
        let observers: Vec<Observer> = self.observers.borrow().values().cloned().collect();
        for observer in observers {
            observer(signal);
        }
        self.hub.publish(signal.event());
    }
}

impl Drop for PauseCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

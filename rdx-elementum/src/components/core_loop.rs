//! The core-loop state machine: mass, milestones, collapse, win and ad pause.
//!
//! `CoreLoop` is the pure machine. Every transition returns the events it
//! produced instead of publishing them, so its state is never borrowed while
//! listeners run. `CoreLoopController` wires a `CoreLoop` to the hub.

use crate::common::GameState;
use crate::config::CoreLoopConfig;
use crate::events::{reason, GameEvent, Topic};
use crate::hub::{EventHub, Subscription, WeakEventHub};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

/// Checkpoint id published when the first milestone is crossed.
pub const FIRST_CHECKPOINT_PERCENT: u8 = 33;
/// Checkpoint id published when the second milestone is crossed.
pub const SECOND_CHECKPOINT_PERCENT: u8 = 66;

#[derive(Debug, Clone, Copy, PartialEq)]
enum MilestoneKind {
    /// Ask the UI for a reward choice. The id is a presentation hint.
    CardPick(u8),
    Collapse,
}

/// A one-shot trigger armed at `threshold` normalized progress.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Milestone {
    threshold: f64,
    kind: MilestoneKind,
}

fn arm_milestones(config: &CoreLoopConfig) -> Vec<Milestone> {
    vec![
        Milestone {
            threshold: config.first_milestone_threshold,
            kind: MilestoneKind::CardPick(FIRST_CHECKPOINT_PERCENT),
        },
        Milestone {
            threshold: config.second_milestone_threshold,
            kind: MilestoneKind::CardPick(SECOND_CHECKPOINT_PERCENT),
        },
        Milestone {
            threshold: config.collapse_threshold,
            kind: MilestoneKind::Collapse,
        },
    ]
}

/// Progress and state for one run.
#[derive(Debug, Clone)]
pub struct CoreLoop {
    config: CoreLoopConfig,
    state: GameState,
    state_before_pause: GameState,
    mass: i64,
    active_anti_count: i64,
    /// Milestones that have not fired yet, in threshold order.
    pending: Vec<Milestone>,
    initialized: bool,
}

impl CoreLoop {
    pub fn new(config: CoreLoopConfig) -> Self {
        let pending = arm_milestones(&config);
        Self {
            config,
            state: GameState::Playing,
            state_before_pause: GameState::Playing,
            mass: 0,
            active_anti_count: 0,
            pending,
            initialized: false,
        }
    }

    /// Starts the run. Only the first call has any effect.
    ///
    /// Clamps the starting mass into `[0, target]`, re-arms every milestone,
    /// enters `Playing` and reports the baseline state and mass.
    pub fn initialize(&mut self) -> Vec<GameEvent> {
        if self.initialized {
            return Vec::new();
        }

        self.mass = self.config.starting_mass.clamp(0, self.config.target_mass);
        self.pending = arm_milestones(&self.config);
        self.state = GameState::Playing;
        self.state_before_pause = GameState::Playing;
        self.initialized = true;

        vec![
            GameEvent::StateChanged { state: self.state },
            GameEvent::mass_changed(self.mass, 0, reason::RUN_START),
        ]
    }

    /// Adds one tap's worth of mass if play is active.
    pub fn tap(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        if !self.state.accepts_input() {
            return out;
        }
        self.add_mass(self.config.mass_per_tap, reason::TAP, &mut out);
        out
    }

    /// Removes up to `amount` mass, never going below zero.
    ///
    /// Nothing is reported when `amount` is not positive or the mass is
    /// already at the floor.
    pub fn remove_mass(&mut self, amount: i64, reason: &str) -> Vec<GameEvent> {
        if amount <= 0 {
            return Vec::new();
        }

        let previous = self.mass;
        self.mass = previous.saturating_sub(amount).max(0);
        let delta = self.mass - previous;
        if delta == 0 {
            return Vec::new();
        }
        vec![GameEvent::mass_changed(self.mass, delta, reason)]
    }

    /// Records how many hostile entities are alive and re-checks the win.
    pub fn set_active_anti_count(&mut self, count: i64) -> Vec<GameEvent> {
        self.active_anti_count = count.max(0);
        self.resolve_win()
    }

    /// Re-checks the win condition. Safe to call at any time.
    pub fn resolve_win(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        self.try_resolve_win(&mut out);
        out
    }

    pub fn ad_opened(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        if self.state.is_terminal() {
            return out;
        }
        // A second open without a close caches `Paused` itself; `ad_closed`
        // then resumes into `Playing`.
        self.state_before_pause = self.state;
        self.set_state(GameState::Paused, &mut out);
        out
    }

    pub fn ad_closed(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        if self.state != GameState::Paused {
            return out;
        }
        if self.state_before_pause == GameState::Paused {
            self.state_before_pause = GameState::Playing;
        }
        self.set_state(self.state_before_pause, &mut out);
        self.try_resolve_win(&mut out);
        out
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// The state `ad_closed` will resume into.
    pub fn state_before_pause(&self) -> GameState {
        self.state_before_pause
    }

    pub fn current_mass(&self) -> i64 {
        self.mass
    }

    pub fn active_anti_count(&self) -> i64 {
        self.active_anti_count
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &CoreLoopConfig {
        &self.config
    }

    /// Mass as a fraction of the target.
    pub fn progress(&self) -> f64 {
        if self.config.target_mass <= 0 {
            return 0.0;
        }
        self.mass as f64 / self.config.target_mass as f64
    }

    /// Milestones still waiting to fire.
    pub fn pending_milestones(&self) -> usize {
        self.pending.len()
    }

    fn add_mass(&mut self, amount: i64, reason: &str, out: &mut Vec<GameEvent>) {
        if amount <= 0 {
            return;
        }
        let previous = self.mass;
        self.mass = previous.saturating_add(amount);
        out.push(GameEvent::mass_changed(self.mass, self.mass - previous, reason));

        self.evaluate_milestones(out);
        self.try_resolve_win(out);
    }

    /// Fires every pending milestone the current progress has reached, in
    /// threshold order, removing each as it fires.
    fn evaluate_milestones(&mut self, out: &mut Vec<GameEvent>) {
        let progress = self.progress();
        let (reached, pending): (Vec<Milestone>, Vec<Milestone>) = self
            .pending
            .drain(..)
            .partition(|milestone| progress >= milestone.threshold);
        self.pending = pending;

        for milestone in reached {
            match milestone.kind {
                MilestoneKind::CardPick(checkpoint_percent) => {
                    debug!("Milestone {}% reached at mass {}.", checkpoint_percent, self.mass);
                    out.push(GameEvent::MilestoneRequested { checkpoint_percent });
                }
                MilestoneKind::Collapse => {
                    info!("Collapse threshold reached at mass {}.", self.mass);
                    self.set_state(GameState::Collapse, out);
                    out.push(GameEvent::CollapseStarted);
                }
            }
        }
    }

    fn try_resolve_win(&mut self, out: &mut Vec<GameEvent>) {
        if !self.state.accepts_input() {
            return;
        }
        if self.mass < self.config.target_mass || self.active_anti_count > 0 {
            return;
        }

        info!("Run won at mass {}.", self.mass);
        self.set_state(GameState::Win, out);
        out.push(GameEvent::WinReached);
        out.push(GameEvent::SaveRequested);
    }

    fn set_state(&mut self, state: GameState, out: &mut Vec<GameEvent>) {
        if self.state == state {
            return;
        }
        debug!("State {} -> {}.", self.state, state);
        self.state = state;
        out.push(GameEvent::StateChanged { state });
    }
}

/// Connects a `CoreLoop` to the hub.
///
/// Subscribes to gesture taps and ad open/close while active. A controller
/// built without a valid config is inert: every operation is a no-op.
///
/// Events are published after the whole transition has run. A listener that
/// queries the controller sees the final state, so a `Collapse` state change
/// from a tap that also wins already reads `Win`.
pub struct CoreLoopController {
    hub: EventHub,
    core: Option<Rc<RefCell<CoreLoop>>>,
    subscriptions: Vec<Subscription>,
}

impl CoreLoopController {
    pub fn new(hub: &EventHub, config: Option<CoreLoopConfig>) -> Self {
        let core = match config {
            None => {
                error!("CoreLoopController has no CoreLoopConfig; the core loop is inert.");
                None
            }
            Some(config) => match config.validate() {
                Ok(()) => Some(Rc::new(RefCell::new(CoreLoop::new(config)))),
                Err(e) => {
                    error!("CoreLoopController config rejected ({}); the core loop is inert.", e);
                    None
                }
            },
        };

        Self {
            hub: hub.clone(),
            core,
            subscriptions: Vec::new(),
        }
    }

    /// Subscribes to the hub and, the first time, starts the run.
    pub fn activate(&mut self) {
        let Some(core) = &self.core else {
            return;
        };

        if self.subscriptions.is_empty() {
            let weak_core = Rc::downgrade(core);
            let weak_hub = self.hub.downgrade();
            self.subscriptions = vec![
                self.route(Topic::GestureTap, &weak_core, &weak_hub, CoreLoop::tap),
                self.route(Topic::AdOpened, &weak_core, &weak_hub, CoreLoop::ad_opened),
                self.route(Topic::AdClosed, &weak_core, &weak_hub, CoreLoop::ad_closed),
            ];
        }

        self.drive(CoreLoop::initialize);
    }

    /// Releases the hub subscriptions. Progress is kept for reactivation.
    pub fn deactivate(&mut self) {
        self.subscriptions.clear();
    }

    pub fn is_active(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn is_inert(&self) -> bool {
        self.core.is_none()
    }

    pub fn on_gesture_tap(&self) {
        self.drive(CoreLoop::tap);
    }

    pub fn remove_mass(&self, amount: i64, reason: &str) {
        self.drive(|core| core.remove_mass(amount, reason));
    }

    pub fn set_active_anti_count(&self, count: i64) {
        self.drive(|core| core.set_active_anti_count(count));
    }

    pub fn resolve_win(&self) {
        self.drive(CoreLoop::resolve_win);
    }

    pub fn state(&self) -> GameState {
        self.read(CoreLoop::state).unwrap_or_default()
    }

    pub fn current_mass(&self) -> i64 {
        self.read(CoreLoop::current_mass).unwrap_or_default()
    }

    pub fn active_anti_count(&self) -> i64 {
        self.read(CoreLoop::active_anti_count).unwrap_or_default()
    }

    pub fn progress(&self) -> f64 {
        self.read(CoreLoop::progress).unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.read(CoreLoop::is_initialized).unwrap_or_default()
    }

    /// A copy of the machine, for inspection.
    pub fn snapshot(&self) -> Option<CoreLoop> {
        self.read(CoreLoop::clone)
    }

    fn read<T>(&self, f: impl FnOnce(&CoreLoop) -> T) -> Option<T> {
        self.core.as_ref().map(|core| f(&core.borrow()))
    }

    /// Runs a transition, then publishes what it produced.
    fn drive(&self, transition: impl FnOnce(&mut CoreLoop) -> Vec<GameEvent>) {
        let Some(core) = &self.core else {
            return;
        };
        let events = transition(&mut core.borrow_mut());
        for event in events {
            self.hub.publish(event);
        }
    }

    fn route(
        &self,
        topic: Topic,
        core: &Weak<RefCell<CoreLoop>>,
        hub: &WeakEventHub,
        transition: fn(&mut CoreLoop) -> Vec<GameEvent>,
    ) -> Subscription {
        let core = core.clone();
        let hub = hub.clone();
        self.hub.on(topic, move |_event| {
            let (Some(core), Some(hub)) = (core.upgrade(), hub.upgrade()) else {
                return;
            };
            let events = match core.try_borrow_mut() {
                Ok(mut machine) => transition(&mut machine),
                Err(_) => {
                    warn!("Core loop is mid-transition; dropping re-entrant '{}'.", topic);
                    return;
                }
            };
            for event in events {
                hub.publish(event);
            }
        })
    }
}

//! # Elementum
//!
//! The runtime core of a single-screen tap progression game.
//!
//! Elementum owns the pieces of a run that have nothing to do with rendering:
//! how mass grows, when milestones and the collapse phase fire, when the run is
//! won, how ad breaks freeze time, and how progress survives restarts.
//!
//! ## Core Concepts
//!
//! - **EventHub**: A synchronous, single-threaded signal hub. Every component
//!   talks to the others only by publishing and subscribing to `GameEvent`s.
//! - **CoreLoop**: The run's state machine (`Playing`, `Paused`, `Collapse`,
//!   `Win`). Taps add mass, crossing thresholds fires one-shot milestones, and
//!   reaching the target with no hostile entities left wins the run.
//! - **PauseCoordinator**: Freezes the global time scale and mutes audio while
//!   an ad is on screen, then restores both exactly.
//! - **PersistenceService**: Loads, migrates and autosaves a small versioned
//!   JSON record, and exchanges it with a cloud save slot.
//! - **Configuration-Driven**: Thresholds, tap power and save policy come from
//!   an `ElementumConfig`, usually loaded from a TOML file.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use elementum::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> anyhow::Result<()> {
//!     // 1. Load configuration (file optional, `ELEMENTUM_*` overrides apply).
//!     let config = ElementumConfig::load(None)?;
//!
//!     // 2. Create the hub and the shared clock.
//!     let hub = EventHub::new();
//!     let clock = Rc::new(GlobalClock::new());
//!
//!     // 3. Start the components. Persistence first, so it sees the run start.
//!     let persistence = PersistenceService::start(
//!         &hub,
//!         Some(config.save.clone()),
//!         Box::new(config.progress_store()),
//!     );
//!     let mut core = CoreLoopController::new(&hub, Some(config.core_loop.clone()));
//!     let pause = PauseCoordinator::new(&hub, clock.clone());
//!     core.activate();
//!
//!     // 4. Feed input.
//!     let _win = hub.on(Topic::WinReached, |_| println!("Run won!"));
//!     for _ in 0..100 {
//!         hub.publish(GameEvent::GestureTap { position: ScreenPoint::default() });
//!     }
//!     pause.notify_ad_opened();
//!     pause.notify_ad_closed();
//!
//!     // 5. Save on the way out and clear the hub.
//!     persistence.enter_background();
//!     hub.teardown();
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Elementum Core";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod hub;
pub mod save;
pub mod storage;
pub mod time;

/// A prelude module for easy importing of the most common Elementum types.
pub mod prelude {
    pub use crate::common::{GameState, ObserverId, ScreenPoint, SubscriptionId};
    pub use crate::components::core_loop::{CoreLoop, CoreLoopController};
    pub use crate::components::pause::{AdSignal, PauseCoordinator};
    pub use crate::components::persistence::PersistenceService;
    pub use crate::config::{CoreLoopConfig, ElementumConfig, SaveConfig, StorageConfig};
    pub use crate::error::{ConfigError, PersistenceError};
    pub use crate::events::{GameEvent, Topic};
    pub use crate::hub::{EventHub, Handler, Subscription, WeakEventHub};
    pub use crate::save::SaveRecord;
    pub use crate::storage::{FileStore, MemoryStore, ProgressStore};
    pub use crate::time::{GlobalClock, TimeControl};
}

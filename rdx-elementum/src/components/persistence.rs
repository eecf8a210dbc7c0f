//! Keeps the progress record in memory and on durable storage.
//!
//! The service loads (or creates) the record when it starts, follows mass and
//! state traffic on the hub, and writes the record back according to the
//! autosave policy in `SaveConfig`.

use crate::common::GameState;
use crate::config::SaveConfig;
use crate::error::PersistenceError;
use crate::events::{GameEvent, Topic};
use crate::hub::{EventHub, Subscription};
use crate::save::{SaveRecord, LATEST_SCHEMA_VERSION};
use crate::storage::ProgressStore;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

/// Reasons attached to every write, for the log.
pub mod save_reason {
    pub const INITIAL_CREATE: &str = "initial-create";
    pub const INVALID_JSON_RESET: &str = "invalid-json-reset";
    pub const AUTO_MASS_DELTA: &str = "auto-mass-delta";
    pub const WIN_STATE: &str = "win-state";
    pub const SIGNAL_REQUEST: &str = "signal-request";
    pub const APPLICATION_PAUSE: &str = "application-pause";
    pub const CLOUD_APPLY: &str = "cloud-apply";
}

struct Persistence {
    config: SaveConfig,
    store: Box<dyn ProgressStore>,
    record: SaveRecord,
    accumulated_mass_delta: u64,
    last_saved_at: Option<DateTime<Utc>>,
}

impl Persistence {
    fn load_or_create(&mut self) {
        let contents = match self.store.read() {
            Ok(contents) => contents,
            Err(e @ PersistenceError::Encoding(_)) => {
                warn!(
                    "Progress at {} is unreadable ({}); resetting to defaults.",
                    self.store.location(),
                    e
                );
                self.record = SaveRecord::default();
                self.save(save_reason::INVALID_JSON_RESET);
                return;
            }
            Err(e) => {
                error!(
                    "Failed to read progress from {}: {}. Continuing with defaults.",
                    self.store.location(),
                    e
                );
                return;
            }
        };

        let Some(json) = contents else {
            info!("No progress found at {}; creating it.", self.store.location());
            self.save(save_reason::INITIAL_CREATE);
            return;
        };

        match SaveRecord::from_json(&json) {
            Ok(loaded) => self.adopt(loaded),
            Err(e) => {
                warn!(
                    "Progress at {} is not valid JSON ({}); resetting to defaults.",
                    self.store.location(),
                    e
                );
                self.record = SaveRecord::default();
                self.save(save_reason::INVALID_JSON_RESET);
            }
        }
    }

    fn adopt(&mut self, loaded: SaveRecord) {
        if !loaded.is_latest() {
            info!(
                "Migrating progress from schema {} to {}.",
                loaded.schema_version, LATEST_SCHEMA_VERSION
            );
        }
        let mut record = loaded.migrate();
        record.repair_element_id();
        debug!("Loaded progress: {:?}", record);
        self.record = record;
    }

    /// Writes the record. Failures are logged and leave memory authoritative.
    fn save(&mut self, reason: &str) -> bool {
        self.record.schema_version = LATEST_SCHEMA_VERSION;

        let written = self
            .record
            .to_json(self.config.pretty_json)
            .and_then(|json| self.store.write(&json));
        match written {
            Ok(()) => {
                self.last_saved_at = Some(Utc::now());
                info!("Saved progress ({}) to {}.", reason, self.store.location());
                true
            }
            Err(e) => {
                error!(
                    "Failed to save progress ({}) to {}: {}",
                    reason,
                    self.store.location(),
                    e
                );
                false
            }
        }
    }

    fn on_mass_changed(&mut self, mass: i64, delta: i64) {
        self.record.observe_mass(mass);

        if !self.config.auto_save_on_mass_change {
            return;
        }
        self.accumulated_mass_delta = self
            .accumulated_mass_delta
            .saturating_add(delta.unsigned_abs());
        if self.accumulated_mass_delta < self.config.mass_delta_per_auto_save {
            return;
        }

        self.accumulated_mass_delta = 0;
        self.save(save_reason::AUTO_MASS_DELTA);
    }

    fn on_state_changed(&mut self, state: GameState) {
        if state != GameState::Win {
            return;
        }
        self.record.total_wins = self.record.total_wins.saturating_add(1);
        if self.config.save_on_win {
            self.save(save_reason::WIN_STATE);
        }
    }

    fn handle(&mut self, event: &GameEvent) {
        match event {
            GameEvent::MassChanged { mass, delta, .. } => self.on_mass_changed(*mass, *delta),
            GameEvent::StateChanged { state } => self.on_state_changed(*state),
            GameEvent::SaveRequested => {
                self.save(save_reason::SIGNAL_REQUEST);
            }
            _ => {}
        }
    }
}

/// The persistence service for one run.
///
/// Built without a `SaveConfig` the service is inert: it never touches
/// storage, exports an empty snapshot and rejects imports.
pub struct PersistenceService {
    hub: EventHub,
    inner: Option<Rc<RefCell<Persistence>>>,
    subscriptions: Vec<Subscription>,
}

impl PersistenceService {
    /// Loads or creates the record, then attaches to the hub.
    pub fn start(
        hub: &EventHub,
        config: Option<SaveConfig>,
        store: Box<dyn ProgressStore>,
    ) -> Self {
        let inner = match config {
            None => {
                error!("PersistenceService has no SaveConfig; progress will not be saved.");
                None
            }
            Some(config) => match config.validate() {
                Ok(()) => Some(Rc::new(RefCell::new(Persistence {
                    config,
                    store,
                    record: SaveRecord::default(),
                    accumulated_mass_delta: 0,
                    last_saved_at: None,
                }))),
                Err(e) => {
                    error!("PersistenceService config rejected ({}); progress will not be saved.", e);
                    None
                }
            },
        };

        if let Some(inner) = &inner {
            inner.borrow_mut().load_or_create();
        }

        let mut service = Self {
            hub: hub.clone(),
            inner,
            subscriptions: Vec::new(),
        };
        service.attach();
        service
    }

    /// Subscribes to mass, state and save-request traffic. Idempotent.
    pub fn attach(&mut self) {
        let Some(inner) = &self.inner else {
            return;
        };
        if !self.subscriptions.is_empty() {
            return;
        }

        let weak = Rc::downgrade(inner);
        self.subscriptions = [Topic::MassChanged, Topic::StateChanged, Topic::SaveRequested]
            .into_iter()
            .map(|topic| self.hub.on(topic, route(weak.clone())))
            .collect();
    }

    /// Releases the hub subscriptions. The record stays in memory.
    pub fn detach(&mut self) {
        self.subscriptions.clear();
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn is_inert(&self) -> bool {
        self.inner.is_none()
    }

    /// The host is going to the background.
    pub fn enter_background(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        let mut persistence = inner.borrow_mut();
        if persistence.config.save_on_background {
            persistence.save(save_reason::APPLICATION_PAUSE);
        }
    }

    /// Writes the record now. Returns whether the write succeeded.
    pub fn save_now(&self, reason: &str) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.borrow_mut().save(reason))
    }

    /// Serializes the in-memory record for cloud upload.
    pub fn export_snapshot(&self) -> String {
        let Some(inner) = &self.inner else {
            return String::new();
        };
        let persistence = inner.borrow();
        match persistence.record.to_json(persistence.config.pretty_json) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to export progress: {}", e);
                String::new()
            }
        }
    }

    /// Replaces the in-memory record with a cloud snapshot and persists it.
    ///
    /// Returns `false`, leaving the record untouched, if the snapshot is blank
    /// or not a valid record.
    pub fn import_snapshot(&self, snapshot: &str) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };
        let imported = match parse_snapshot(snapshot) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring cloud snapshot: {}", e);
                return false;
            }
        };

        let mut persistence = inner.borrow_mut();
        persistence.adopt(imported);
        persistence.save(save_reason::CLOUD_APPLY);
        true
    }

    /// A copy of the in-memory record.
    pub fn record(&self) -> SaveRecord {
        self.inner
            .as_ref()
            .map(|inner| inner.borrow().record.clone())
            .unwrap_or_default()
    }

    pub fn accumulated_mass_delta(&self) -> u64 {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.borrow().accumulated_mass_delta)
    }

    /// When the record was last written successfully.
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.as_ref().and_then(|inner| inner.borrow().last_saved_at)
    }

    /// Key the host's cloud SDK should store snapshots under.
    pub fn cloud_key(&self) -> Option<String> {
        self.inner
            .as_ref()
            .map(|inner| inner.borrow().config.cloud_key.clone())
    }

    /// Where the record is stored.
    pub fn location(&self) -> Option<String> {
        self.inner.as_ref().map(|inner| inner.borrow().store.location())
    }
}

fn parse_snapshot(snapshot: &str) -> Result<SaveRecord, PersistenceError> {
    if snapshot.trim().is_empty() {
        return Err(PersistenceError::EmptySnapshot);
    }
    SaveRecord::from_json(snapshot)
}

fn route(persistence: Weak<RefCell<Persistence>>) -> impl Fn(&GameEvent) + 'static {
    move |event| {
        let Some(persistence) = persistence.upgrade() else {
            return;
        };
        match persistence.try_borrow_mut() {
            Ok(mut persistence) => persistence.handle(event),
            Err(_) => warn!("Persistence busy; dropping re-entrant '{}'.", event.topic()),
        };
    }
}

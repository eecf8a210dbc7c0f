//! The versioned progress record and its migration path.

use crate::error::PersistenceError;
use serde::{Deserialize, Serialize};

/// Current on-disk schema revision.
pub const LATEST_SCHEMA_VERSION: i64 = 1;

/// Element id a fresh or repaired record starts from.
pub const DEFAULT_ELEMENT_ID: &str = "H";

/// Durable player progress.
///
/// Numeric fields are signed so that legacy records carrying negative values
/// still parse and can be clamped by [`SaveRecord::migrate`]. Missing fields
/// take their defaults and unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveRecord {
    pub schema_version: i64,
    pub last_known_mass: i64,
    /// Highest mass ever observed. Never decreases while the record lives.
    pub best_mass: i64,
    pub total_wins: i64,
    pub star_dust: i64,
    pub last_element_id: String,
}

impl Default for SaveRecord {
    fn default() -> Self {
        Self {
            schema_version: LATEST_SCHEMA_VERSION,
            last_known_mass: 0,
            best_mass: 0,
            total_wins: 0,
            star_dust: 0,
            last_element_id: DEFAULT_ELEMENT_ID.to_string(),
        }
    }
}

impl SaveRecord {
    /// Parses a record from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, PersistenceError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn is_latest(&self) -> bool {
        self.schema_version == LATEST_SCHEMA_VERSION
    }

    /// Upgrades the record to the latest schema.
    ///
    /// A record already at the latest version is returned untouched. Any other
    /// version is rebuilt at the latest version with every counter clamped to
    /// zero or above and a blank element id replaced by `"H"`.
    pub fn migrate(self) -> Self {
        if self.is_latest() {
            return self;
        }

        Self {
            schema_version: LATEST_SCHEMA_VERSION,
            last_known_mass: self.last_known_mass.max(0),
            best_mass: self.best_mass.max(0),
            total_wins: self.total_wins.max(0),
            star_dust: self.star_dust.max(0),
            last_element_id: element_id_or_default(self.last_element_id),
        }
    }

    /// Records a mass observation, raising `best_mass` if it was exceeded.
    pub fn observe_mass(&mut self, mass: i64) {
        self.last_known_mass = mass;
        if mass > self.best_mass {
            self.best_mass = mass;
        }
    }

    pub(crate) fn repair_element_id(&mut self) {
        if is_blank(&self.last_element_id) {
            self.last_element_id = DEFAULT_ELEMENT_ID.to_string();
        }
    }
}

fn element_id_or_default(id: String) -> String {
    if is_blank(&id) {
        DEFAULT_ELEMENT_ID.to_string()
    } else {
        id
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

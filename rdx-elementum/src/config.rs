//! Defines all configuration structures for the Elementum core.
//!
//! These structs are deserialized with `serde` through the `config` crate,
//! from an optional TOML file layered under `ELEMENTUM_*` environment
//! variables (`ELEMENTUM_CORE_LOOP__TARGET_MASS=250`). Every key is optional;
//! omitted keys take the defaults below. Values are treated as immutable for
//! the duration of a run.

use crate::error::ConfigError;
use crate::storage::FileStore;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ELEMENTUM";

/// Progress file name used when none (or a blank one) is configured.
pub const DEFAULT_FILE_NAME: &str = "player_progress.json";

/// The top-level configuration for an Elementum run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementumConfig {
    /// Mass, tap and threshold settings for the core loop.
    #[serde(default)]
    pub core_loop: CoreLoopConfig,

    /// Save file and autosave policy.
    #[serde(default)]
    pub save: SaveConfig,

    /// Where durable progress lives.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Tuning for the core-loop state machine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoreLoopConfig {
    /// Mass required to win.
    #[serde(default = "default_target_mass")]
    pub target_mass: i64,

    /// Mass at the start of a run, clamped into `[0, target_mass]`.
    #[serde(default)]
    pub starting_mass: i64,

    /// Mass gained per accepted tap.
    #[serde(default = "default_mass_per_tap")]
    pub mass_per_tap: i64,

    /// Normalized progress that triggers the first card pick.
    #[serde(default = "default_first_milestone_threshold")]
    pub first_milestone_threshold: f64,

    /// Normalized progress that triggers the second card pick.
    #[serde(default = "default_second_milestone_threshold")]
    pub second_milestone_threshold: f64,

    /// Normalized progress that enters `Collapse`.
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: f64,
}

/// Save file naming and autosave switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaveConfig {
    /// Name of the progress file inside `storage.data_dir`.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Pretty-print JSON on disk and in exported snapshots.
    #[serde(default)]
    pub pretty_json: bool,

    /// Save after enough absolute mass change has accumulated.
    #[serde(default = "default_true")]
    pub auto_save_on_mass_change: bool,

    /// Accumulated `|delta|` that triggers a mass autosave.
    #[serde(default = "default_mass_delta_per_auto_save")]
    pub mass_delta_per_auto_save: u64,

    /// Save when the run is won.
    #[serde(default = "default_true")]
    pub save_on_win: bool,

    /// Save when the host goes to the background.
    #[serde(default = "default_true")]
    pub save_on_background: bool,

    /// Key the cloud SDK stores exported snapshots under.
    #[serde(default = "default_cloud_key")]
    pub cloud_key: String,
}

/// Location of durable progress.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Application-private writable directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl ElementumConfig {
    /// Loads configuration from an optional TOML file plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source cannot be read or parsed and
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string, ignoring the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.core_loop.validate()?;
        self.save.validate()
    }

    /// The file-backed store described by `storage` and `save.file_name`.
    pub fn progress_store(&self) -> FileStore {
        FileStore::new(&self.storage.data_dir, self.save.effective_file_name())
    }
}

impl CoreLoopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_mass < 1 {
            return Err(invalid("core_loop.target_mass", "must be at least 1"));
        }
        if self.mass_per_tap < 1 {
            return Err(invalid("core_loop.mass_per_tap", "must be at least 1"));
        }

        let thresholds = [
            ("core_loop.first_milestone_threshold", self.first_milestone_threshold),
            ("core_loop.second_milestone_threshold", self.second_milestone_threshold),
            ("core_loop.collapse_threshold", self.collapse_threshold),
        ];
        for (field, value) in thresholds {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(field, format!("{value} is outside (0, 1]")));
            }
        }
        for pair in thresholds.windows(2) {
            let (lower_field, lower) = pair[0];
            let (field, value) = pair[1];
            if value <= lower {
                return Err(invalid(
                    field,
                    format!("{value} must be greater than {lower_field} ({lower})"),
                ));
            }
        }
        Ok(())
    }
}

impl SaveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mass_delta_per_auto_save < 1 {
            return Err(invalid("save.mass_delta_per_auto_save", "must be at least 1"));
        }
        Ok(())
    }

    /// The configured file name, or the default when it is blank.
    pub fn effective_file_name(&self) -> &str {
        if self.file_name.trim().is_empty() {
            DEFAULT_FILE_NAME
        } else {
            &self.file_name
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// --- Default value functions for serde ---

fn default_target_mass() -> i64 {
    100
}

fn default_mass_per_tap() -> i64 {
    1
}

fn default_first_milestone_threshold() -> f64 {
    0.33
}

fn default_second_milestone_threshold() -> f64 {
    0.66
}

fn default_collapse_threshold() -> f64 {
    0.9
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_mass_delta_per_auto_save() -> u64 {
    10
}

fn default_cloud_key() -> String {
    "player_progress".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for CoreLoopConfig {
    fn default() -> Self {
        Self {
            target_mass: default_target_mass(),
            starting_mass: 0,
            mass_per_tap: default_mass_per_tap(),
            first_milestone_threshold: default_first_milestone_threshold(),
            second_milestone_threshold: default_second_milestone_threshold(),
            collapse_threshold: default_collapse_threshold(),
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            pretty_json: false,
            auto_save_on_mass_change: true,
            mass_delta_per_auto_save: default_mass_delta_per_auto_save(),
            save_on_win: true,
            save_on_background: true,
            cloud_key: default_cloud_key(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ElementumConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.core_loop.target_mass, 100);
        assert_eq!(config.save.mass_delta_per_auto_save, 10);
        assert_eq!(config.save.effective_file_name(), "player_progress.json");
    }

    #[test]
    fn toml_overrides_only_what_it_names() {
        let config = ElementumConfig::from_toml_str(
            r#"
            [core_loop]
            target_mass = 250
            mass_per_tap = 5

            [save]
            pretty_json = true
            save_on_win = false

            [storage]
            data_dir = "/tmp/elementum"
            "#,
        )
        .unwrap();

        assert_eq!(config.core_loop.target_mass, 250);
        assert_eq!(config.core_loop.mass_per_tap, 5);
        assert_eq!(config.core_loop.collapse_threshold, 0.9);
        assert!(config.save.pretty_json);
        assert!(!config.save.save_on_win);
        assert!(config.save.save_on_background);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/elementum"));
    }

    #[test]
    fn thresholds_must_ascend() {
        let err = ElementumConfig::from_toml_str(
            r#"
            [core_loop]
            first_milestone_threshold = 0.7
            second_milestone_threshold = 0.5
            "#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "core_loop.second_milestone_threshold",
                ..
            }
        ));
    }

    #[test]
    fn thresholds_must_be_normalized() {
        let config = CoreLoopConfig {
            collapse_threshold: 1.5,
            ..CoreLoopConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_target_is_rejected() {
        let config = CoreLoopConfig {
            target_mass: 0,
            ..CoreLoopConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "core_loop.target_mass",
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_starting_mass_is_accepted() {
        for starting_mass in [-5, 0, 10_000] {
            let config = CoreLoopConfig {
                starting_mass,
                ..CoreLoopConfig::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn blank_file_name_falls_back() {
        let save = SaveConfig {
            file_name: "   ".to_string(),
            ..SaveConfig::default()
        };
        assert_eq!(save.effective_file_name(), DEFAULT_FILE_NAME);
    }
}

//! Error types for the Elementum core.
//!
//! Nothing in the core is fatal to the process. These errors surface at the
//! edges (config loading, storage I/O, snapshot parsing) and are logged and
//! absorbed by the component that owns them.

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The underlying `config` crate failed to read or deserialize a source.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A value was read successfully but violates a constraint.
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending key.
        field: &'static str,
        /// Human-readable description of the violated constraint.
        reason: String,
    },
}

/// Errors raised while reading, writing or parsing progress data.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Durable storage could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored text is not a valid progress record.
    #[error("malformed progress record: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored bytes are not text.
    #[error("progress record is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// An imported snapshot was empty or whitespace.
    #[error("snapshot is empty")]
    EmptySnapshot,
}

/// Returned when a string does not name a known hub topic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: `{0}`")]
pub struct UnknownTopic(pub String);

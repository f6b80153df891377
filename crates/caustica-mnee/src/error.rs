//! Error types for solver configuration.

use thiserror::Error;

/// Errors that can occur while loading or validating [`MneeSettings`](crate::MneeSettings).
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML for this schema.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

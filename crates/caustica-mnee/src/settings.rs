//! Integrator-level settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SettingsError};

/// Settings controlling when caustic connections are attempted.
///
/// Bounce limits mirror the integrator's path depth limits; a chain is only
/// walked when adding its interfaces keeps the path within every limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MneeSettings {
    /// Whether caustic connections are attempted at all.
    pub enabled: bool,
    /// Maximum total bounces of a path.
    pub max_bounce: u32,
    /// Maximum diffuse bounces of a path.
    pub max_diffuse_bounce: u32,
    /// Maximum transmission bounces of a path.
    pub max_transmission_bounce: u32,
}

impl Default for MneeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bounce: 12,
            max_diffuse_bounce: 4,
            max_transmission_bounce: 12,
        }
    }
}

impl MneeSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_bounce == 0 {
            return Err(SettingsError::InvalidSettings(
                "max_bounce must be at least 1".into(),
            ));
        }
        if self.max_diffuse_bounce == 0 {
            return Err(SettingsError::InvalidSettings(
                "max_diffuse_bounce must be at least 1".into(),
            ));
        }
        if self.max_transmission_bounce == 0 {
            return Err(SettingsError::InvalidSettings(
                "max_transmission_bounce must be at least 1".into(),
            ));
        }
        if self.max_diffuse_bounce > self.max_bounce
            || self.max_transmission_bounce > self.max_bounce
        {
            return Err(SettingsError::InvalidSettings(format!(
                "per-type bounce limits ({}, {}) exceed max_bounce {}",
                self.max_diffuse_bounce, self.max_transmission_bounce, self.max_bounce
            )));
        }
        Ok(())
    }

    /// Parse and validate settings from a TOML document.
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        if settings.enabled && settings.max_diffuse_bounce == 1 {
            log::warn!("max_diffuse_bounce = 1 rejects every caustic connection");
        }
        log::debug!("loaded mnee settings: {:?}", settings);
        Ok(settings)
    }

    /// Read, parse and validate a TOML settings file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("reading mnee settings from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

//! Pipeline configuration.
//!
//! YAML configuration with per-field defaults. A missing section or field
//! falls back to its default, so an empty document is a valid config.
//!
//! ```yaml
//! version: 1
//! events:
//!   capacity: 256
//! mapping:
//!   x_pos: { role: longitude }
//!   y_pos: { role: altitude, pattern: '(\d+) m', replace: '$1' }
//!   z_pos: { role: latitude }
//! spectrum:
//!   low_freq: 0.0
//!   high_freq: 1000.0
//!   bands: 30
//!   history_rows: 60
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::item_model::ItemModelScatterProxy;
use crate::mapping::{Role, RoleMapping, RoleSpec};
use crate::proxy::ScatterDataProxy;
use crate::source::DEFAULT_EVENT_CAPACITY;
use crate::spectrum::{SpectrumBuilder, SpectrumHistory};

/// Change event buffering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    /// Events buffered per subscriber before it lags.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

/// Source of one chart role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Table role name.
    pub role: String,

    /// Optional substitution pattern applied to cell text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Replacement template for `pattern`.
    #[serde(default)]
    pub replace: String,
}

impl RoleConfig {
    fn to_spec(&self) -> Result<RoleSpec> {
        let spec = RoleSpec::new(self.role.as_str());
        match &self.pattern {
            Some(pattern) => spec.with_pattern(pattern, self.replace.as_str()),
            None => Ok(spec),
        }
    }
}

/// Role mapping section. Omitted roles stay unmapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// X coordinate source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_pos: Option<RoleConfig>,
    /// Y coordinate source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_pos: Option<RoleConfig>,
    /// Z coordinate source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_pos: Option<RoleConfig>,
    /// Rotation source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RoleConfig>,
    /// Auxiliary value source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RoleConfig>,
}

impl MappingConfig {
    fn entries(&self) -> [(Role, Option<&RoleConfig>); 5] {
        [
            (Role::XPos, self.x_pos.as_ref()),
            (Role::YPos, self.y_pos.as_ref()),
            (Role::ZPos, self.z_pos.as_ref()),
            (Role::Rotation, self.rotation.as_ref()),
            (Role::Value, self.value.as_ref()),
        ]
    }
}

/// Spectrum row builder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumConfig {
    /// Lower bound of the first band in Hz.
    #[serde(default = "default_low_freq")]
    pub low_freq: f32,

    /// Upper bound of the last band in Hz.
    #[serde(default = "default_high_freq")]
    pub high_freq: f32,

    /// Number of frequency bands.
    #[serde(default = "default_bands")]
    pub bands: usize,

    /// Rows kept in the scrolling history.
    #[serde(default = "default_history_rows")]
    pub history_rows: usize,
}

fn default_low_freq() -> f32 {
    0.0
}
fn default_high_freq() -> f32 {
    1000.0
}
fn default_bands() -> usize {
    30
}
fn default_history_rows() -> usize {
    60
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            low_freq: default_low_freq(),
            high_freq: default_high_freq(),
            bands: default_bands(),
            history_rows: default_history_rows(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Event buffering.
    #[serde(default)]
    pub events: EventConfig,

    /// Default role mapping.
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Spectrum settings.
    #[serde(default)]
    pub spectrum: SpectrumConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            events: EventConfig::default(),
            mapping: MappingConfig::default(),
            spectrum: SpectrumConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| Error::ConfigNotFound(path.display().to_string()))?;

        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails, or
    /// [`Error::ConfigInvalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            Error::ConfigParse {
                line,
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Checks value ranges and role patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.events.capacity == 0 {
            return Err(Error::ConfigInvalid {
                key: "events.capacity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.spectrum.history_rows == 0 {
            return Err(Error::ConfigInvalid {
                key: "spectrum.history_rows".to_string(),
                message: "must be positive".to_string(),
            });
        }
        self.spectrum_builder()?;
        for (role, entry) in self.mapping.entries() {
            if let Some(entry) = entry {
                entry.to_spec().map_err(|e| Error::ConfigInvalid {
                    key: format!("mapping.{}.pattern", role.key()),
                    message: e.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// Builds the configured role mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a role pattern does not compile.
    pub fn role_mapping(&self) -> Result<RoleMapping> {
        let mut mapping = RoleMapping::new();
        for (role, entry) in self.mapping.entries() {
            if let Some(entry) = entry {
                mapping.set(role, Some(entry.to_spec()?));
            }
        }
        Ok(mapping)
    }

    /// Builds the configured spectrum builder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] for an empty range or zero bands.
    pub fn spectrum_builder(&self) -> Result<SpectrumBuilder> {
        SpectrumBuilder::new(self.spectrum.low_freq, self.spectrum.high_freq, self.spectrum.bands)
    }

    /// Builds an empty spectrum history with the configured size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] for an invalid spectrum section.
    pub fn spectrum_history(&self) -> Result<SpectrumHistory> {
        Ok(SpectrumHistory::new(self.spectrum_builder()?, self.spectrum.history_rows))
    }

    /// Builds an item-model proxy with the configured mapping and event
    /// buffering. Attach a source table to start resolving.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a role pattern does not compile.
    pub fn scatter_proxy(&self) -> Result<ItemModelScatterProxy> {
        let data = ScatterDataProxy::with_event_capacity(self.events.capacity);
        let mut proxy = ItemModelScatterProxy::with_proxy(data);
        proxy.set_mapping(self.role_mapping()?);
        Ok(proxy)
    }
}

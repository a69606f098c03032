//! Device options and their validation.
//!
//! Options are deserialised with per-field defaults so a partial
//! configuration file only overrides what it names. Files are JSON or
//! TOML, selected by extension. Invalid options are fatal at startup.

use plotkit_core::{ConfigError, Error, Result};
use plotkit_devicedb::PlotterModel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Recognised device options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceOptions {
    /// Dispatcher sampling period, milliseconds.
    pub timeslice_ms: u64,
    /// Microstepping mode 1..=5; the step resolution divisor is
    /// `2^(mode-1)`.
    pub microstepping_mode: u8,
    /// Servo position at pen-up, percent of travel.
    pub pen_up_position: i32,
    /// Pen-up transition speed, percent per second.
    pub pen_up_speed: i32,
    /// Additional delay after a pen-up, milliseconds. May be negative to
    /// shorten the wait.
    pub pen_up_delay: i64,
    /// Servo position at pen-down, percent of travel.
    pub pen_down_position: i32,
    /// Pen-down transition speed, percent per second.
    pub pen_down_speed: i32,
    /// Additional delay after a pen-down, milliseconds.
    pub pen_down_delay: i64,
    /// Acceleration magnitude, mm/s².
    pub acceleration: f64,
    /// Ceiling tangential velocity, mm/s.
    pub max_velocity: f64,
    /// Dimensionless corner derating constant.
    pub corner_factor: f64,
    /// Device model id, resolved against the device database.
    pub model: String,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            timeslice_ms: 100,
            microstepping_mode: 1,
            pen_up_position: 60,
            pen_up_speed: 150,
            pen_up_delay: 0,
            pen_down_position: 40,
            pen_down_speed: 150,
            pen_down_delay: 0,
            acceleration: 16.0,
            max_velocity: 4.0,
            corner_factor: 0.001,
            model: "MiniKit2".to_string(),
        }
    }
}

impl DeviceOptions {
    /// Validate every option against its documented range.
    pub fn validate(&self) -> Result<()> {
        let positions = [
            ("pen_up_position", self.pen_up_position),
            ("pen_down_position", self.pen_down_position),
        ];
        for (option, value) in positions {
            if !(0..=100).contains(&value) {
                return Err(ConfigError::PositionOutOfRange { option, value }.into());
            }
        }

        let speeds = [
            ("pen_up_speed", self.pen_up_speed),
            ("pen_down_speed", self.pen_down_speed),
        ];
        for (option, value) in speeds {
            if value < 0 {
                return Err(ConfigError::NegativeSpeed { option, value }.into());
            }
        }

        if !(1..=5).contains(&self.microstepping_mode) {
            return Err(ConfigError::InvalidMicrostepping {
                mode: self.microstepping_mode,
            }
            .into());
        }

        if self.timeslice_ms == 0 {
            return Err(ConfigError::InvalidTimeslice {
                timeslice_ms: self.timeslice_ms,
            }
            .into());
        }

        let limits = [
            ("acceleration", self.acceleration),
            ("max_velocity", self.max_velocity),
            ("corner_factor", self.corner_factor),
        ];
        for (option, value) in limits {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveLimit { option, value }.into());
            }
        }

        self.resolve_model()?;
        Ok(())
    }

    /// Resolve the configured model id against the device database.
    pub fn resolve_model(&self) -> Result<&'static PlotterModel> {
        PlotterModel::find(&self.model).map_err(|_| {
            Error::from(ConfigError::UnknownModel {
                id: self.model.clone(),
            })
        })
    }

    /// Dispatcher sampling period in seconds.
    pub fn timeslice(&self) -> f64 {
        self.timeslice_ms as f64 / 1000.0
    }

    /// Load options from a JSON or TOML file, selected by extension.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileError {
            reason: format!("{}: {}", path.display(), e),
        })?;

        let options: DeviceOptions = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::FileError {
                reason: format!("invalid JSON in {}: {}", path.display(), e),
            })?,
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::FileError {
                reason: format!("invalid TOML in {}: {}", path.display(), e),
            })?,
            other => {
                return Err(ConfigError::FileError {
                    reason: format!("unsupported config extension {:?}", other),
                }
                .into())
            }
        };

        options.validate()?;
        Ok(options)
    }

    /// Save options to a JSON or TOML file, selected by extension.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::to_string_pretty(self).map_err(|e| ConfigError::FileError {
                    reason: e.to_string(),
                })?
            }
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::FileError {
                reason: e.to_string(),
            })?,
            other => {
                return Err(ConfigError::FileError {
                    reason: format!("unsupported config extension {:?}", other),
                }
                .into())
            }
        };

        std::fs::write(path, content).map_err(|e| ConfigError::FileError {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(())
    }
}

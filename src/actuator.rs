//! PWM actuator files and speed writes
//!
//! A hwmon PWM channel is driven through two sibling files: the duty file
//! (`pwm1`) and its mode-select file (`pwm1_enable`).

use crate::curve::FanSpeed;
use crate::errors::{FanControlError, Result};
use log::debug;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to the duty file to reach its mode-select file
pub const MODE_PATH_SUFFIX: &str = "_enable";

/// The duty file and mode-select file of one PWM channel.
///
/// Fixed once resolved; nothing hands out mutable access to either path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorPaths {
    control: PathBuf,
    mode: PathBuf,
}

impl ActuatorPaths {
    /// Derive the pair from the duty file path without touching the filesystem
    pub fn new(control: impl Into<PathBuf>) -> Self {
        let control = control.into();
        let mut mode = OsString::from(control.as_os_str());
        mode.push(MODE_PATH_SUFFIX);
        Self {
            control,
            mode: PathBuf::from(mode),
        }
    }

    /// Derive the pair and check that the files the loop depends on exist.
    ///
    /// The mode file is only required when mode management is enabled.
    pub fn resolve(control: impl Into<PathBuf>, require_mode: bool) -> Result<Self> {
        let paths = Self::new(control);
        if !paths.control.exists() {
            return Err(FanControlError::PathNotFound {
                path: paths.control,
            });
        }
        if require_mode && !paths.mode.exists() {
            return Err(FanControlError::PathNotFound { path: paths.mode });
        }
        Ok(paths)
    }

    pub fn control(&self) -> &Path {
        &self.control
    }

    pub fn mode(&self) -> &Path {
        &self.mode
    }
}

/// Clamp `raw_speed` into 0..=255 and write it to the duty file.
///
/// Returns the value actually written. Failures come back as
/// [`FanControlError::ActuatorWrite`] for the caller to log and retry later.
pub fn apply_speed(paths: &ActuatorPaths, raw_speed: i64) -> Result<FanSpeed> {
    let speed = FanSpeed::clamped(raw_speed);
    fs::write(paths.control(), speed.value().to_string()).map_err(|source| {
        FanControlError::ActuatorWrite {
            path: paths.control().to_path_buf(),
            source,
        }
    })?;

    debug!("Wrote PWM {} to {}", speed.value(), paths.control().display());
    Ok(speed)
}

/// Read back the current duty value
pub fn read_speed(paths: &ActuatorPaths) -> Result<FanSpeed> {
    let content = fs::read_to_string(paths.control())?;
    let raw: i64 = content.trim().parse().map_err(|_| {
        FanControlError::Config(format!(
            "Failed to parse PWM value '{}' from {}",
            content.trim(),
            paths.control().display()
        ))
    })?;
    Ok(FanSpeed::clamped(raw))
}

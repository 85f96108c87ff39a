//! PWM mode-select handling
//!
//! hwmon exposes the channel mode as an integer in `pwmN_enable`: `1` hands
//! the duty file to userspace, `2` returns control to the firmware.

use crate::actuator::ActuatorPaths;
use crate::errors::{FanControlError, Result};
use log::{debug, info};
use std::fmt;
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmMode {
    Manual,
    Automatic,
}

impl PwmMode {
    /// Integer written to the mode-select file
    pub fn sysfs_value(self) -> u8 {
        match self {
            PwmMode::Manual => 1,
            PwmMode::Automatic => 2,
        }
    }

    pub fn from_sysfs_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(PwmMode::Manual),
            2 => Some(PwmMode::Automatic),
            _ => None,
        }
    }
}

impl fmt::Display for PwmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PwmMode::Manual => write!(f, "manual"),
            PwmMode::Automatic => write!(f, "automatic"),
        }
    }
}

/// What [`set_mode`] had to do to reach the requested mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// The file already held the requested mode; nothing was written
    AlreadySet,
    /// The requested mode was written
    Switched,
}

/// Read the raw mode value.
///
/// Drivers may report values other than 1 and 2 (e.g. `0` for full speed),
/// so the integer is returned as-is.
pub fn read_mode_value(paths: &ActuatorPaths) -> Result<i64> {
    let path = paths.mode();
    if !path.exists() {
        return Err(FanControlError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    content
        .trim()
        .parse()
        .map_err(|_| FanControlError::InvalidMode {
            path: path.to_path_buf(),
            value: content.trim().to_string(),
        })
}

/// Current mode, or `None` when the driver reports something other than manual/automatic
pub fn current_mode(paths: &ActuatorPaths) -> Result<Option<PwmMode>> {
    read_mode_value(paths).map(PwmMode::from_sysfs_value)
}

/// Bring the channel into `desired` mode.
///
/// The mode file is only written when its current value differs, so calling
/// this repeatedly with the same mode issues at most one write.
pub fn set_mode(paths: &ActuatorPaths, desired: PwmMode) -> Result<ModeChange> {
    let current = read_mode_value(paths)?;
    if current == i64::from(desired.sysfs_value()) {
        debug!("PWM mode already {} at {}", desired, paths.mode().display());
        return Ok(ModeChange::AlreadySet);
    }

    fs::write(paths.mode(), desired.sysfs_value().to_string()).map_err(|source| {
        FanControlError::ActuatorWrite {
            path: paths.mode().to_path_buf(),
            source,
        }
    })?;

    info!("PWM mode set to {} (was {})", desired, current);
    Ok(ModeChange::Switched)
}

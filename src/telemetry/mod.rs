//! Temperature sources for the control loop
//!
//! The loop only ever sees [`TemperatureProvider`]; each source logs its own
//! failures and hands back [`TemperatureReading::UNAVAILABLE`] instead of
//! an error, so a flaky sensor can never take the loop down.

pub mod hwmon;
pub mod nvml;

#[cfg(test)]
pub mod mock;

pub use hwmon::HwmonTemperature;
pub use nvml::NvmlTemperature;

use crate::curve::TemperatureReading;

/// A device temperature source owned by the control loop
pub trait TemperatureProvider: Send {
    /// Human readable description used in log lines
    fn name(&self) -> &str;

    /// Current temperature, or the sentinel when it cannot be read
    fn read_temperature(&mut self) -> TemperatureReading;

    /// Give back the underlying handle. Must be safe to call more than once.
    fn release(&mut self);
}

//! Temperature readings, PWM speeds and the temperature-to-speed curve

use crate::errors::{FanControlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A PWM duty value written to the actuator, always within 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FanSpeed(u8);

impl FanSpeed {
    /// Full actuation
    pub const MAX: FanSpeed = FanSpeed(255);
    /// Speed applied when temperature is unknown and on shutdown (30%)
    pub const SAFE_BASELINE: FanSpeed = FanSpeed(77);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Clamp an arbitrary value into the PWM range instead of rejecting it.
    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(0, 255) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Duty as a whole percentage, truncated
    pub fn percent(self) -> u8 {
        (u16::from(self.0) * 100 / 255) as u8
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/255 ({}%)", self.0, self.percent())
    }
}

/// A temperature in whole degrees Celsius.
///
/// Zero is reserved as the "unavailable" sentinel and never counts as a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TemperatureReading(u32);

impl TemperatureReading {
    pub const UNAVAILABLE: TemperatureReading = TemperatureReading(0);

    pub const fn celsius(degrees: u32) -> Self {
        Self(degrees)
    }

    /// The reading in degrees, or `None` for the sentinel
    pub fn degrees(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0)
        }
    }
}

/// Linear fan curve clamped at both ends.
///
/// Between the two temperature bounds the speed rises linearly using floor
/// division, so the outputs are exact integers rather than rounded ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanCurve {
    pub min_temp: i32,
    pub max_temp: i32,
    pub min_speed: u8,
    pub max_speed: u8,
}

impl Default for FanCurve {
    fn default() -> Self {
        Self {
            min_temp: 25,
            max_temp: 60,
            min_speed: FanSpeed::SAFE_BASELINE.value(),
            max_speed: FanSpeed::MAX.value(),
        }
    }
}

impl FanCurve {
    /// Reject curves that would divide by zero or slope downwards
    pub fn validate(&self) -> Result<()> {
        if self.min_temp >= self.max_temp {
            return Err(FanControlError::Config(format!(
                "curve min_temp ({}) must be below max_temp ({})",
                self.min_temp, self.max_temp
            )));
        }
        if self.min_speed > self.max_speed {
            return Err(FanControlError::Config(format!(
                "curve min_speed ({}) must not exceed max_speed ({})",
                self.min_speed, self.max_speed
            )));
        }
        Ok(())
    }

    /// Target speed for a temperature in degrees Celsius
    pub fn speed_for(&self, temp: i32) -> FanSpeed {
        if temp <= self.min_temp {
            return FanSpeed::new(self.min_speed);
        }
        if temp >= self.max_temp {
            return FanSpeed::new(self.max_speed);
        }

        let span_speed = i64::from(self.max_speed) - i64::from(self.min_speed);
        let span_temp = i64::from(self.max_temp) - i64::from(self.min_temp);
        let offset = (i64::from(temp) - i64::from(self.min_temp)) * span_speed / span_temp;
        FanSpeed::clamped(offset + i64::from(self.min_speed))
    }
}

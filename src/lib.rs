//! GPU Fan Control
//!
//! Keeps a hwmon PWM fan matched to GPU temperature and always hands the fan
//! back to firmware control when it stops.

pub mod actuator;
pub mod args;
pub mod config;
pub mod control_loop;
pub mod curve;
pub mod diagnostics;
pub mod errors;
pub mod logging;
pub mod pwm_mode;
pub mod shutdown;
pub mod telemetry;

// Re-export commonly used types
pub use actuator::ActuatorPaths;
pub use control_loop::{ControlLoop, CycleOutcome, LoopPhase};
pub use curve::{FanCurve, FanSpeed, TemperatureReading};
pub use errors::{FanControlError, Result};
pub use pwm_mode::PwmMode;
pub use shutdown::{Restoration, ShutdownGuard, ShutdownSignal};
pub use telemetry::TemperatureProvider;

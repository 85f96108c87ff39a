//! The poll, compute, apply loop
//!
//! ```text
//! Starting ──ok──> Running ──signal/fault──> ShuttingDown ──> Stopped
//!     └──────────────error──────────────────────┘
//! ```
//!
//! Each cycle reads the temperature, maps it through the curve and writes
//! the duty file only when something changed. While the temperature is
//! unavailable the safe baseline is written once, not every cycle.

use crate::actuator::{self, ActuatorPaths};
use crate::config::Settings;
use crate::curve::{FanCurve, FanSpeed};
use crate::errors::Result;
use crate::pwm_mode::{self, PwmMode};
use crate::shutdown::{Restoration, ShutdownGuard};
use crate::telemetry::TemperatureProvider;
use log::{error, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// What the loop last wrote and saw. `None` means nothing yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlLoopState {
    pub last_temp: Option<u32>,
    pub last_speed: Option<FanSpeed>,
}

/// What a single cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new speed was written for a valid reading
    Applied { temp: u32, speed: FanSpeed },
    /// Reading and target matched the last write
    Unchanged,
    /// Temperature unavailable; the safe baseline was written
    FailSafe,
    /// Temperature still unavailable; the baseline is already in place
    FailSafeHeld,
    /// The duty file could not be written; the next cycle retries
    WriteFailed,
}

pub struct ControlLoop<P: TemperatureProvider> {
    guard: ShutdownGuard<P>,
    curve: FanCurve,
    interval: Duration,
    state: ControlLoopState,
    phase: LoopPhase,
}

impl<P: TemperatureProvider> ControlLoop<P> {
    /// Take control of the fan.
    ///
    /// On error the fan has already been handed back to firmware control
    /// and the telemetry handle released.
    pub fn start(paths: ActuatorPaths, provider: P, settings: &Settings) -> Result<Self> {
        let mut control = Self {
            guard: ShutdownGuard::arm(paths, provider, settings.manage_mode),
            curve: settings.curve,
            interval: settings.interval,
            state: ControlLoopState::default(),
            phase: LoopPhase::Starting,
        };

        match actuator::read_speed(control.guard.paths()) {
            Ok(speed) => info!(
                "Taking over {} at {}",
                control.guard.paths().control().display(),
                speed
            ),
            Err(e) => warn!("Could not read the current fan speed: {}", e),
        }

        if control.guard.manage_mode() {
            if let Err(e) = pwm_mode::set_mode(control.guard.paths(), PwmMode::Manual) {
                error!("Could not switch PWM to manual mode: {}", e);
                control.shutdown();
                return Err(e);
            }
        } else {
            let mode = match pwm_mode::current_mode(control.guard.paths()) {
                Ok(Some(mode)) => mode.to_string(),
                Ok(None) => "an unrecognised".to_string(),
                Err(_) => "its current".to_string(),
            };
            warn!(
                "Mode management disabled, driving {} in {} mode",
                control.guard.paths().control().display(),
                mode
            );
        }

        Ok(control)
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn state(&self) -> ControlLoopState {
        self.state
    }

    /// Run one poll-compute-apply cycle
    pub fn step(&mut self) -> CycleOutcome {
        let reading = self.guard.provider_mut().read_temperature();

        let Some(temp) = reading.degrees() else {
            return self.fail_safe();
        };

        let speed = self.curve.speed_for(i32::try_from(temp).unwrap_or(i32::MAX));
        if self.state.last_temp == Some(temp) && self.state.last_speed == Some(speed) {
            return CycleOutcome::Unchanged;
        }

        match actuator::apply_speed(self.guard.paths(), speed.value().into()) {
            Ok(written) => {
                info!("Temperature: {}°C, fan speed: {}", temp, written);
                self.state.last_temp = Some(temp);
                self.state.last_speed = Some(written);
                CycleOutcome::Applied {
                    temp,
                    speed: written,
                }
            }
            Err(e) => {
                error!("{}, retrying next cycle", e);
                CycleOutcome::WriteFailed
            }
        }
    }

    fn fail_safe(&mut self) -> CycleOutcome {
        if self.state.last_speed == Some(FanSpeed::SAFE_BASELINE) {
            return CycleOutcome::FailSafeHeld;
        }

        warn!(
            "Temperature of {} unavailable, using safe fan speed {}",
            self.guard.provider().name(),
            FanSpeed::SAFE_BASELINE
        );
        match actuator::apply_speed(self.guard.paths(), FanSpeed::SAFE_BASELINE.value().into()) {
            Ok(written) => {
                self.state.last_speed = Some(written);
                CycleOutcome::FailSafe
            }
            Err(e) => {
                error!("{}, retrying next cycle", e);
                CycleOutcome::WriteFailed
            }
        }
    }

    /// Cycle until `shutdown` resolves, then restore the fan.
    ///
    /// The sleep between cycles is the only await point; a pending shutdown
    /// request is honoured before the next sleep starts.
    pub async fn run<F>(&mut self, shutdown: F) -> Restoration
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.phase = LoopPhase::Running;
        info!(
            "Monitoring {} every {:?}, PWM path: {}",
            self.guard.provider().name(),
            self.interval,
            self.guard.paths().control().display()
        );

        loop {
            self.step();

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = sleep(self.interval) => {}
            }
        }

        self.shutdown()
    }

    /// Leave Running and restore the fan. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> Restoration {
        if self.guard.is_restored() {
            self.phase = LoopPhase::Stopped;
            return Restoration::AlreadyRestored;
        }
        self.phase = LoopPhase::ShuttingDown;
        let restoration = self.guard.restore();
        self.phase = LoopPhase::Stopped;
        restoration
    }
}

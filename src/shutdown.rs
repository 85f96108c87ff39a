//! Restoring the fan on exit
//!
//! Once the loop has taken the PWM channel, [`ShutdownGuard`] owns everything
//! needed to hand it back: the actuator paths and the telemetry handle. Its
//! restoration runs exactly once, either explicitly on a clean stop or from
//! `Drop` when the loop unwinds from a fault.

use crate::actuator::{self, ActuatorPaths};
use crate::curve::FanSpeed;
use crate::errors::Result;
use crate::pwm_mode::{self, PwmMode};
use crate::telemetry::TemperatureProvider;
use log::{debug, error, info};

/// Result of a restoration request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restoration {
    /// The sequence ran now; `failures` steps could not be completed
    Completed { failures: usize },
    /// The sequence had already run; nothing was touched
    AlreadyRestored,
}

/// Owns the actuator and telemetry handle between startup and exit.
pub struct ShutdownGuard<P: TemperatureProvider> {
    paths: ActuatorPaths,
    provider: P,
    manage_mode: bool,
    restored: bool,
}

impl<P: TemperatureProvider> ShutdownGuard<P> {
    /// Take ownership of the actuator and handle. From here on, dropping the
    /// guard restores the fan.
    pub fn arm(paths: ActuatorPaths, provider: P, manage_mode: bool) -> Self {
        debug!("Shutdown guard armed for {}", paths.control().display());
        Self {
            paths,
            provider,
            manage_mode,
            restored: false,
        }
    }

    pub fn paths(&self) -> &ActuatorPaths {
        &self.paths
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn manage_mode(&self) -> bool {
        self.manage_mode
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Write the safe baseline, return the channel to automatic mode and
    /// release the telemetry handle.
    ///
    /// Every step runs even if an earlier one fails. Later calls are no-ops.
    pub fn restore(&mut self) -> Restoration {
        if self.restored {
            debug!("Fan already restored, ignoring repeated shutdown");
            return Restoration::AlreadyRestored;
        }
        // Marked up front so a panic part-way through is not retried from Drop
        self.restored = true;

        info!("Restoring {} to firmware control", self.paths.control().display());
        let mut failures = 0;

        if let Err(e) = self.apply_baseline() {
            error!("Failed to apply safe fan speed: {}", e);
            failures += 1;
        }

        if self.manage_mode {
            if let Err(e) = pwm_mode::set_mode(&self.paths, PwmMode::Automatic) {
                error!("Failed to restore automatic PWM mode: {}", e);
                failures += 1;
            }
        }

        self.provider.release();

        Restoration::Completed { failures }
    }

    fn apply_baseline(&self) -> Result<()> {
        let speed = actuator::apply_speed(&self.paths, FanSpeed::SAFE_BASELINE.value().into())?;
        info!("Fan speed set to {}", speed);
        Ok(())
    }
}

impl<P: TemperatureProvider> Drop for ShutdownGuard<P> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Process termination requests that move the loop into shutdown.
///
/// Handlers are installed eagerly, so from construction onwards an interrupt
/// is queued for the loop instead of killing the process.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Must be called from within the tokio runtime
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next termination request and return its name
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

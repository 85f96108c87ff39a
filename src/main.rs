//! Main entry point for the GPU fan controller

use anyhow::Context;
use clap::Parser;
use futures_util::FutureExt;
use gpu_fan_control::{
    args::Args,
    config::{Settings, TemperatureSource},
    diagnostics, logging,
    telemetry::{HwmonTemperature, NvmlTemperature, TemperatureProvider},
    ActuatorPaths, ControlLoop, Restoration, ShutdownSignal,
};
use log::{error, info, warn};
use nvml_wrapper::Nvml;
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too and are not failures
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    if let Err(e) = logging::setup(args.verbose, args.quiet) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "gpu-fan-control v{} (git {}) built {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("unknown"),
        option_env!("BUILD_TIME").unwrap_or("unknown")
    );

    if args.info {
        diagnostics::print_gpu_info();
        return ExitCode::SUCCESS;
    }

    ExitCode::from(exit_status(run(&args).await))
}

/// Exit status for a finished run. Startup and configuration errors fail.
fn exit_status(result: anyhow::Result<u8>) -> u8 {
    match result {
        Ok(status) => status,
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

/// Exit status for a control loop that either returned or panicked
fn loop_status(outcome: std::thread::Result<Restoration>) -> u8 {
    match outcome {
        Ok(Restoration::Completed { failures: 0 }) | Ok(Restoration::AlreadyRestored) => {
            info!("Stopped");
            EXIT_OK
        }
        Ok(Restoration::Completed { failures }) => {
            warn!("Stopped with {} restoration step(s) failed", failures);
            EXIT_OK
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Control loop faulted: {}", reason);
            EXIT_FAILURE
        }
    }
}

/// Resolve settings, open the telemetry source and drive the fan
async fn run(args: &Args) -> anyhow::Result<u8> {
    let settings = Settings::from_args(args).context("Invalid configuration")?;

    let paths = ActuatorPaths::resolve(&settings.control_path, settings.manage_mode)
        .map_err(|e| {
            if e.is_path_error() {
                error!("Check the PWM path, channels are listed by `ls /sys/class/hwmon/*/pwm*`");
            }
            e
        })
        .context("PWM control files are not usable")?;

    match &settings.source {
        TemperatureSource::Nvml { device_index } => {
            let nvml = Nvml::init().context("Failed to initialise NVML")?;
            let provider = NvmlTemperature::acquire(&nvml, *device_index)
                .with_context(|| format!("Failed to open GPU {}", device_index))?;

            let status = drive(paths, provider, &settings).await;
            if let Err(e) = nvml.shutdown() {
                warn!("NVML shutdown failed: {}", e);
            }
            status
        }
        TemperatureSource::Hwmon { input_path } => {
            let provider =
                HwmonTemperature::open(input_path).context("Temperature input is not usable")?;
            drive(paths, provider, &settings).await
        }
    }
}

/// Run the control loop until a termination signal or a fault
async fn drive<P: TemperatureProvider>(
    paths: ActuatorPaths,
    provider: P,
    settings: &Settings,
) -> anyhow::Result<u8> {
    let mut signal = ShutdownSignal::install().context("Failed to install signal handlers")?;

    let mut control = ControlLoop::start(paths, provider, settings)
        .context("Failed to put the fan under manual control")?;

    let outcome = AssertUnwindSafe(control.run(async move {
        let name = signal.recv().await;
        info!("Received {}, stopping", name);
    }))
    .catch_unwind()
    .await;

    // After a panic the guard has not run yet; dropping the loop restores the fan
    drop(control);

    Ok(loop_status(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["gpu-fan-control"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_clean_stop_exits_zero() {
        assert_eq!(loop_status(Ok(Restoration::Completed { failures: 0 })), 0);
        assert_eq!(loop_status(Ok(Restoration::AlreadyRestored)), 0);
        assert_eq!(loop_status(Ok(Restoration::Completed { failures: 2 })), 0);
        assert_eq!(exit_status(Ok(EXIT_OK)), 0);
    }

    #[test]
    fn test_panic_exits_one() {
        assert_eq!(loop_status(Err(Box::new("sensor driver fault"))), 1);
        assert_eq!(loop_status(Err(Box::new(String::from("owned message")))), 1);
        assert_eq!(loop_status(Err(Box::new(42_u32))), 1);
        assert_eq!(exit_status(Ok(loop_status(Err(Box::new("fault"))))), 1);
    }

    #[tokio::test]
    async fn test_missing_pwm_file_exits_one() {
        let dir = TempDir::new().unwrap();
        let pwm = dir.path().join("pwm1");
        let pwm = pwm.to_str().unwrap();

        assert_eq!(exit_status(run(&args(&[pwm])).await), 1);
    }

    #[tokio::test]
    async fn test_missing_mode_file_exits_one() {
        let dir = TempDir::new().unwrap();
        let pwm = dir.path().join("pwm1");
        fs::write(&pwm, "120").unwrap();

        assert_eq!(exit_status(run(&args(&[pwm.to_str().unwrap()])).await), 1);
        assert_eq!(fs::read_to_string(&pwm).unwrap(), "120");
    }

    #[tokio::test]
    async fn test_bad_config_exits_one() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("fan.json");
        fs::write(&config, r#"{ "interval_secs": 1e20 }"#).unwrap();

        let argv = args(&["/tmp/pwm1", "--config", config.to_str().unwrap()]);
        assert_eq!(exit_status(run(&argv).await), 1);

        let missing = dir.path().join("absent.json");
        let argv = args(&["/tmp/pwm1", "--config", missing.to_str().unwrap()]);
        assert_eq!(exit_status(run(&argv).await), 1);
    }

    #[tokio::test]
    async fn test_missing_temperature_input_exits_one() {
        let dir = TempDir::new().unwrap();
        let pwm = dir.path().join("pwm1");
        fs::write(&pwm, "120").unwrap();
        fs::write(dir.path().join("pwm1_enable"), "2").unwrap();
        let input = dir.path().join("temp1_input");

        let argv = args(&[pwm.to_str().unwrap(), "--temp-input", input.to_str().unwrap()]);
        assert_eq!(exit_status(run(&argv).await), 1);
        assert_eq!(fs::read_to_string(dir.path().join("pwm1_enable")).unwrap(), "2");
    }
}

//! Configuration file loading and resolution of runtime settings
//!
//! Settings come from an optional JSON file, with command line flags taking
//! precedence. The resolved [`Settings`] never change while the loop runs.

use crate::args::Args;
use crate::curve::FanCurve;
use crate::errors::{FanControlError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INTERVAL_SECS: f64 = 2.0;
pub const MIN_INTERVAL_SECS: f64 = 0.1;

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub interval_secs: Option<f64>,
    pub manage_mode: Option<bool>,
    pub device_index: Option<u32>,
    pub temp_input: Option<PathBuf>,
    pub curve: Option<FanCurve>,
}

impl ConfigFile {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            FanControlError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ConfigFile = serde_json::from_str(&json)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Where temperature readings come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemperatureSource {
    Nvml { device_index: u32 },
    Hwmon { input_path: PathBuf },
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub control_path: PathBuf,
    pub interval: Duration,
    pub manage_mode: bool,
    pub source: TemperatureSource,
    pub curve: FanCurve,
}

impl Settings {
    /// Load the configuration file named on the command line, if any, and resolve
    pub fn from_args(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ConfigFile::load_from_file(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(args, file)
    }

    /// Merge command line flags over file values
    pub fn resolve(args: &Args, file: ConfigFile) -> Result<Self> {
        let control_path = args.pwm_path.clone().ok_or_else(|| {
            FanControlError::Config("a PWM control file path is required".to_string())
        })?;

        let interval = clamp_interval(
            args.interval
                .or(file.interval_secs)
                .unwrap_or(DEFAULT_INTERVAL_SECS),
        )?;

        let manage_mode = !args.no_mode_management && file.manage_mode.unwrap_or(true);

        let source = match args.temp_input.clone().or(file.temp_input) {
            Some(input_path) => TemperatureSource::Hwmon { input_path },
            None => TemperatureSource::Nvml {
                device_index: args.device.or(file.device_index).unwrap_or(0),
            },
        };

        let curve = file.curve.unwrap_or_default();
        curve.validate()?;

        Ok(Self {
            control_path,
            interval,
            manage_mode,
            source,
            curve,
        })
    }
}

/// Turn the requested poll interval into a duration no shorter than 0.1s
pub fn clamp_interval(secs: f64) -> Result<Duration> {
    if !secs.is_finite() {
        return Err(FanControlError::Config(format!(
            "interval must be a finite number of seconds, got {}",
            secs
        )));
    }
    if secs < MIN_INTERVAL_SECS {
        warn!(
            "Interval {}s is too short and would load the system, using {}s",
            secs, MIN_INTERVAL_SECS
        );
        return Ok(Duration::from_secs_f64(MIN_INTERVAL_SECS));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| {
        FanControlError::Config(format!("interval of {}s is out of range: {}", secs, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::NamedTempFile;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["gpu-fan-control", "/tmp/pwm1"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&args(&[]), ConfigFile::default()).unwrap();

        assert_eq!(settings.control_path, PathBuf::from("/tmp/pwm1"));
        assert_eq!(settings.interval, Duration::from_secs(2));
        assert!(settings.manage_mode);
        assert_eq!(settings.source, TemperatureSource::Nvml { device_index: 0 });
        assert_eq!(settings.curve, FanCurve::default());
    }

    #[test]
    fn test_interval_floor() {
        assert_eq!(clamp_interval(0.01).unwrap(), Duration::from_millis(100));
        assert_eq!(clamp_interval(-3.0).unwrap(), Duration::from_millis(100));
        assert_eq!(clamp_interval(0.1).unwrap(), Duration::from_millis(100));
        assert_eq!(clamp_interval(5.0).unwrap(), Duration::from_secs(5));
        assert!(clamp_interval(f64::NAN).is_err());
        assert!(clamp_interval(f64::INFINITY).is_err());
    }

    #[test]
    fn test_huge_interval_is_rejected() {
        assert!(matches!(clamp_interval(1e20), Err(FanControlError::Config(_))));
        assert!(clamp_interval(f64::MAX).is_err());
        assert_eq!(clamp_interval(86400.0).unwrap(), Duration::from_secs(86400));

        let result = Settings::resolve(&args(&["--interval", "1e20"]), ConfigFile::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigFile {
            interval_secs: Some(10.0),
            manage_mode: Some(true),
            device_index: Some(3),
            ..ConfigFile::default()
        };
        let settings = Settings::resolve(
            &args(&["--interval", "1.5", "--no-mode-management", "--device", "1"]),
            file,
        )
        .unwrap();

        assert_eq!(settings.interval, Duration::from_millis(1500));
        assert!(!settings.manage_mode);
        assert_eq!(settings.source, TemperatureSource::Nvml { device_index: 1 });
    }

    #[test]
    fn test_hwmon_source_wins_over_nvml() {
        let file = ConfigFile {
            temp_input: Some(PathBuf::from("/sys/class/hwmon/hwmon2/temp1_input")),
            ..ConfigFile::default()
        };
        let settings = Settings::resolve(&args(&["--device", "2"]), file).unwrap();
        assert_eq!(
            settings.source,
            TemperatureSource::Hwmon {
                input_path: PathBuf::from("/sys/class/hwmon/hwmon2/temp1_input")
            }
        );
    }

    #[test]
    fn test_load_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{ "interval_secs": 0.5, "manage_mode": false,
                 "curve": { "min_temp": 30, "max_temp": 70 } }"#,
        )
        .unwrap();

        let config = ConfigFile::load_from_file(file.path()).unwrap();
        assert_eq!(config.interval_secs, Some(0.5));
        assert_eq!(config.manage_mode, Some(false));
        let curve = config.curve.unwrap();
        assert_eq!((curve.min_temp, curve.max_temp), (30, 70));
        assert_eq!((curve.min_speed, curve.max_speed), (77, 255));
    }

    #[test]
    fn test_rejects_bad_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{ "interval": 2 }"#).unwrap();
        assert!(matches!(
            ConfigFile::load_from_file(file.path()),
            Err(FanControlError::Serialization(_))
        ));

        let bad_curve = ConfigFile {
            curve: Some(FanCurve {
                min_temp: 70,
                max_temp: 30,
                ..FanCurve::default()
            }),
            ..ConfigFile::default()
        };
        assert!(Settings::resolve(&args(&[]), bad_curve).is_err());
    }

    #[test]
    fn test_missing_pwm_path() {
        let info_only = Args::try_parse_from(["gpu-fan-control", "--info"]).unwrap();
        assert!(matches!(
            Settings::resolve(&info_only, ConfigFile::default()),
            Err(FanControlError::Config(_))
        ));
    }
}

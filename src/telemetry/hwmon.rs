//! Temperature from a hwmon `temp*_input` file
//!
//! Useful for GPUs whose driver exposes temperature through sysfs (amdgpu,
//! nouveau) rather than NVML.

use super::TemperatureProvider;
use crate::curve::TemperatureReading;
use crate::errors::{FanControlError, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct HwmonTemperature {
    input_path: PathBuf,
    name: String,
}

impl HwmonTemperature {
    /// Open a `tempN_input` file, picking up its `tempN_label` when present
    pub fn open(input_path: impl Into<PathBuf>) -> Result<Self> {
        let input_path = input_path.into();
        if !input_path.exists() {
            return Err(FanControlError::PathNotFound { path: input_path });
        }

        let name = match label_for(&input_path) {
            Some(label) => format!("{} ({})", input_path.display(), label),
            None => input_path.display().to_string(),
        };
        info!("Reading temperature from {}", name);

        Ok(Self { input_path, name })
    }
}

/// Read the sibling `tempN_label` file of a `tempN_input` file
fn label_for(input_path: &Path) -> Option<String> {
    let file_name = input_path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix("_input")?;
    let label_path = input_path.with_file_name(format!("{}_label", stem));
    fs::read_to_string(label_path)
        .ok()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
}

/// Convert hwmon millidegrees to whole degrees, rounding down.
///
/// Non-positive values cannot be told apart from the sentinel and are rejected.
fn parse_millidegrees(content: &str) -> Option<u32> {
    let millidegrees: i64 = content.trim().parse().ok()?;
    let degrees = millidegrees.div_euclid(1000);
    if degrees <= 0 {
        return None;
    }
    u32::try_from(degrees).ok()
}

impl TemperatureProvider for HwmonTemperature {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_temperature(&mut self) -> TemperatureReading {
        let content = match fs::read_to_string(&self.input_path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", self.input_path.display(), e);
                return TemperatureReading::UNAVAILABLE;
            }
        };

        match parse_millidegrees(&content) {
            Some(degrees) => TemperatureReading::celsius(degrees),
            None => {
                warn!(
                    "Unusable temperature '{}' in {}",
                    content.trim(),
                    self.input_path.display()
                );
                TemperatureReading::UNAVAILABLE
            }
        }
    }

    // Plain sysfs file, nothing to hand back
    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_millidegrees("45000\n"), Some(45));
        assert_eq!(parse_millidegrees("45999"), Some(45));
        assert_eq!(parse_millidegrees("999"), None);
        assert_eq!(parse_millidegrees("-5000"), None);
        assert_eq!(parse_millidegrees("hot"), None);
    }

    #[test]
    fn test_reads_and_labels() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("temp1_input");
        fs::write(&input, "52000\n").unwrap();
        fs::write(dir.path().join("temp1_label"), "edge\n").unwrap();

        let mut sensor = HwmonTemperature::open(&input).unwrap();
        assert!(sensor.name().ends_with("(edge)"));
        assert_eq!(sensor.read_temperature(), TemperatureReading::celsius(52));

        fs::remove_file(&input).unwrap();
        assert_eq!(sensor.read_temperature(), TemperatureReading::UNAVAILABLE);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = HwmonTemperature::open(dir.path().join("temp9_input")).unwrap_err();
        assert!(err.is_path_error());
    }
}

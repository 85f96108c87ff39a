//! `--info`: report every NVIDIA GPU NVML can see

use crate::errors::Result;
use log::{error, info, warn};
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;

const MIB: f64 = 1024.0 * 1024.0;

/// Snapshot of one device, taken in a single pass
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReport {
    pub index: u32,
    pub name: String,
    pub temperature: u32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub memory_free: u64,
    /// Milliwatts; `None` when the board does not report power draw
    pub power_milliwatts: Option<u32>,
    /// `None` on passively cooled boards
    pub fan_percent: Option<u32>,
}

impl DeviceReport {
    /// Log lines describing the device
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("GPU {}: {}", self.index, self.name),
            format!("Temperature: {}°C", self.temperature),
            format!(
                "Memory: {:.0}MB used / {:.0}MB total ({:.0}MB free)",
                self.memory_used as f64 / MIB,
                self.memory_total as f64 / MIB,
                self.memory_free as f64 / MIB
            ),
        ];
        if let Some(power) = self.power_milliwatts {
            lines.push(format!("Power: {:.1}W", f64::from(power) / 1000.0));
        }
        if let Some(fan) = self.fan_percent {
            lines.push(format!("Fan speed: {}%", fan));
        }
        lines
    }
}

/// Query all devices from an initialised NVML instance
pub fn collect_reports(nvml: &Nvml) -> Result<Vec<DeviceReport>> {
    let count = nvml.device_count()?;
    let mut reports = Vec::with_capacity(count as usize);

    for index in 0..count {
        let device = nvml.device_by_index(index)?;
        let memory = device.memory_info()?;

        reports.push(DeviceReport {
            index,
            name: device.name()?,
            temperature: device.temperature(TemperatureSensor::Gpu)?,
            memory_used: memory.used,
            memory_total: memory.total,
            memory_free: memory.free,
            power_milliwatts: device.power_usage().ok(),
            fan_percent: device.fan_speed(0).ok(),
        });
    }

    Ok(reports)
}

/// Log a report for every GPU. Errors are logged, never returned.
pub fn print_gpu_info() {
    let nvml = match Nvml::init() {
        Ok(nvml) => nvml,
        Err(e) => {
            error!("Failed to query GPU information: {}", e);
            return;
        }
    };

    match collect_reports(&nvml) {
        Ok(reports) => {
            info!("Found {} GPU device(s):", reports.len());
            for report in &reports {
                for line in report.lines() {
                    info!("{}", line);
                }
            }
        }
        Err(e) => error!("Failed to query GPU information: {}", e),
    }

    if let Err(e) = nvml.shutdown() {
        warn!("NVML shutdown failed: {}", e);
    }
}

//! NVIDIA GPU temperature via NVML

use super::TemperatureProvider;
use crate::curve::TemperatureReading;
use crate::errors::Result;
use log::{info, warn};
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::{Device, Nvml};

/// Core temperature of one NVIDIA GPU.
///
/// The device handle is looked up once in [`NvmlTemperature::acquire`] and
/// reused for every read. [`TemperatureProvider::release`] drops it; reads
/// after release report the sentinel. The library itself is owned by the
/// caller, which shuts it down once the provider is gone.
pub struct NvmlTemperature<'nvml> {
    device: Option<Device<'nvml>>,
    name: String,
}

impl<'nvml> NvmlTemperature<'nvml> {
    /// Open the handle for the device at `index`
    pub fn acquire(nvml: &'nvml Nvml, index: u32) -> Result<Self> {
        let device = nvml.device_by_index(index)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let name = format!("GPU {} ({})", index, device_name);
        info!("Acquired telemetry handle for {}", name);

        Ok(Self {
            device: Some(device),
            name,
        })
    }
}

impl TemperatureProvider for NvmlTemperature<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_temperature(&mut self) -> TemperatureReading {
        let Some(device) = self.device.as_ref() else {
            warn!("Temperature requested after the handle for {} was released", self.name);
            return TemperatureReading::UNAVAILABLE;
        };

        match device.temperature(TemperatureSensor::Gpu) {
            Ok(0) => {
                warn!("{} reported 0°C, treating the reading as unavailable", self.name);
                TemperatureReading::UNAVAILABLE
            }
            Ok(degrees) => TemperatureReading::celsius(degrees),
            Err(e) => {
                warn!("Failed to read temperature of {}: {}", self.name, e);
                TemperatureReading::UNAVAILABLE
            }
        }
    }

    fn release(&mut self) {
        if self.device.take().is_some() {
            info!("Released telemetry handle for {}", self.name);
        }
    }
}

//! Scripted temperature source for tests

use super::TemperatureProvider;
use crate::curve::TemperatureReading;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Replays a fixed list of readings, then reports the sentinel forever.
///
/// A `0` in the script stands for an unavailable reading.
pub struct ScriptedTemperature {
    readings: VecDeque<TemperatureReading>,
    releases: Arc<AtomicUsize>,
}

impl ScriptedTemperature {
    pub fn new(script: &[u32]) -> Self {
        Self {
            readings: script
                .iter()
                .copied()
                .map(TemperatureReading::celsius)
                .collect(),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `release` calls, readable after the provider is moved
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

impl TemperatureProvider for ScriptedTemperature {
    fn name(&self) -> &str {
        "scripted"
    }

    fn read_temperature(&mut self) -> TemperatureReading {
        self.readings
            .pop_front()
            .unwrap_or(TemperatureReading::UNAVAILABLE)
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

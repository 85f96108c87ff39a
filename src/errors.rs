//! Error types for the GPU fan controller

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the GPU fan controller
pub type Result<T> = std::result::Result<T, FanControlError>;

/// Main error type for the GPU fan controller
#[derive(Error, Debug)]
pub enum FanControlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] nvml_wrapper::error::NvmlError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("Unrecognised PWM mode '{value}' in {}", path.display())]
    InvalidMode { path: PathBuf, value: String },

    #[error("Failed to write {}: {source}", path.display())]
    ActuatorWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FanControlError {
    /// Whether the error is a missing actuator file rather than an I/O fault
    pub fn is_path_error(&self) -> bool {
        matches!(self, FanControlError::PathNotFound { .. })
    }
}

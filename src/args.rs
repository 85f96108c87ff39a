//! Command line argument parsing for the GPU fan controller

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// GPU fan controller
///
/// Drives a hwmon PWM fan from GPU temperature and returns the fan to
/// firmware control on exit.
#[derive(Parser, Debug)]
#[command(name = "gpu-fan-control")]
#[command(about = "Match a PWM fan to GPU temperature")]
#[command(version)]
pub struct Args {
    /// PWM duty file to drive, e.g. /sys/class/hwmon/hwmon4/pwm1
    #[arg(required_unless_present = "info")]
    pub pwm_path: Option<PathBuf>,

    /// Seconds between temperature checks (default 2.0, minimum 0.1)
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// Print details of every detected GPU and exit
    #[arg(long)]
    pub info: bool,

    /// JSON configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// NVML index of the GPU to monitor
    #[arg(long, value_name = "INDEX")]
    pub device: Option<u32>,

    /// Read temperature from a hwmon temp*_input file instead of NVML
    #[arg(long, value_name = "PATH")]
    pub temp_input: Option<PathBuf>,

    /// Drive the duty file without switching pwm*_enable to manual and back
    #[arg(long)]
    pub no_mode_management: bool,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

//! Logging setup for the GPU fan controller

use fern::Dispatch;
use log::LevelFilter;

/// Map the `-v`/`-q` flags onto a level filter.
///
/// The daemon reports every speed change at INFO, so INFO is the baseline.
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Setup logging with the specified verbosity level
pub fn setup(verbosity: u8, quiet: bool) -> Result<(), fern::InitError> {
    Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level_for(verbosity, quiet))
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_for(0, false), LevelFilter::Info);
        assert_eq!(level_for(1, false), LevelFilter::Debug);
        assert_eq!(level_for(5, false), LevelFilter::Trace);
        assert_eq!(level_for(2, true), LevelFilter::Warn);
    }
}

//! Tracing subscriber setup shared by the VMU binaries.

use crate::config::LogLevel;
use tracing::Level;
use tracing_subscriber::EnvFilter;

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` directives are honoured; `level` (or DEBUG when `verbose`)
/// is added on top. `json` switches to JSON lines.
pub fn init_tracing(level: LogLevel, verbose: bool, json: bool) {
    let level = if verbose { Level::DEBUG } else { level.into() };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }
}

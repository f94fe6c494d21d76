//! Subscriber setup for hosts that do not install their own.
//!
//! The library itself only emits `tracing` events, tagged with `module`,
//! `device`, `label` and `path` fields. [`init_from_config`] routes them to
//! stderr in the configured format. `RUST_LOG` takes precedence over the
//! configured level.
//!
//! # Example
//! ```no_run
//! use mmdevice::{config::MmConfig, logging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MmConfig::load()?;
//! logging::init_from_config(&config)?;
//! tracing::info!("host started");
//! # Ok(())
//! # }
//! ```

use crate::config::MmConfig;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, coloured when `ansi` is set
    #[default]
    Pretty,
    /// One line per event, no colour
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (pretty, compact, json)")),
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, Copy)]
pub struct LogSettings {
    /// Maximum level when `RUST_LOG` is unset
    pub level: LevelFilter,
    /// Line format
    pub format: LogFormat,
    /// Colour output (pretty format only)
    pub ansi: bool,
    /// Tag events with source file and line
    pub source_location: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Pretty,
            ansi: true,
            source_location: false,
        }
    }
}

impl LogSettings {
    /// Settings taken from `log_level` and `log_format`.
    pub fn from_config(config: &MmConfig) -> Result<Self, String> {
        let level = config
            .log_level
            .parse::<LevelFilter>()
            .map_err(|_| format!("unknown log level '{}'", config.log_level))?;
        Ok(Self {
            level,
            format: config.log_format.parse()?,
            ..Self::default()
        })
    }
}

/// Install a stderr subscriber configured from `config`.
pub fn init_from_config(config: &MmConfig) -> Result<(), String> {
    init(LogSettings::from_config(config)?)
}

/// Install a stderr subscriber.
///
/// Does nothing if a global subscriber is already set.
pub fn init(settings: LogSettings) -> Result<(), String> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }
    let filter = EnvFilter::builder()
        .with_default_directive(settings.level.into())
        .from_env_lossy();
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(settings.source_location)
        .with_line_number(settings.source_location);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match settings.format {
        LogFormat::Pretty => layer.pretty().with_ansi(settings.ansi).with_filter(filter).boxed(),
        LogFormat::Compact => layer.compact().with_ansi(false).with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
    };
    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Ok(()),
        // Lost a race with another initializer.
        Err(_) if tracing::dispatcher::has_been_set() => Ok(()),
        Err(err) => Err(format!("cannot install tracing subscriber: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn settings_follow_config() {
        let config = MmConfig {
            log_level: "debug".to_string(),
            log_format: "json".to_string(),
            ..MmConfig::default()
        };
        let settings = LogSettings::from_config(&config).unwrap();
        assert_eq!(settings.level, LevelFilter::DEBUG);
        assert_eq!(settings.format, LogFormat::Json);

        let bad = MmConfig {
            log_level: "verbose".to_string(),
            ..MmConfig::default()
        };
        assert!(LogSettings::from_config(&bad).is_err());
    }

    #[test]
    fn init_twice_is_ok() {
        let settings = LogSettings {
            level: LevelFilter::ERROR,
            format: LogFormat::Compact,
            ..LogSettings::default()
        };
        assert!(init(settings).is_ok());
        assert!(init(settings).is_ok());
    }
}

//! Configuration using Figment
//!
//! Settings are loaded from:
//! 1. `mmdevice.toml` (or an explicit file)
//! 2. Environment variables prefixed with `MMDEVICE_`
//!
//! Every field has a default, so a missing file yields a usable configuration
//! with the platform naming convention and no search paths.
//!
//! # Example
//! ```no_run
//! use mmdevice::config::MmConfig;
//! use mmdevice::PluginManager;
//!
//! let config = MmConfig::load()?;
//! let manager = PluginManager::from_config(&config)?;
//! # Ok::<(), mmdevice::MmError>(())
//! ```

use crate::error::MmResult;
use crate::plugin_manager::{LIBRARY_PREFIX, LIBRARY_SUFFIX};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "mmdevice.toml";

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmConfig {
    /// Directories searched for device module libraries, in priority order
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    /// Library file name prefix
    #[serde(default = "default_prefix")]
    pub library_prefix: String,
    /// Library file name suffix
    #[serde(default = "default_suffix")]
    pub library_suffix: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

// Default value functions
fn default_prefix() -> String {
    LIBRARY_PREFIX.to_string()
}

fn default_suffix() -> String {
    LIBRARY_SUFFIX.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for MmConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            library_prefix: default_prefix(),
            library_suffix: default_suffix(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl MmConfig {
    /// Load from `mmdevice.toml` and the environment.
    ///
    /// Environment variables override the file, e.g. `MMDEVICE_LOG_LEVEL=debug`
    /// or `MMDEVICE_SEARCH_PATHS='["/opt/mm"]'`.
    pub fn load() -> MmResult<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> MmResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("MMDEVICE_"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.log_format,
                valid_formats.join(", ")
            ));
        }

        if self.library_prefix.is_empty() {
            return Err("library_prefix must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MmConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, MmConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
search_paths = ["/opt/micro-manager", "~/mm"]
library_prefix = "mmgr_dal_"
library_suffix = ".dll"
log_level = "debug"
"#,
        )
        .unwrap();

        let config = MmConfig::load_from(&path).unwrap();
        assert_eq!(
            config.search_paths,
            vec![PathBuf::from("/opt/micro-manager"), PathBuf::from("~/mm")]
        );
        assert_eq!(config.library_prefix, "mmgr_dal_");
        assert_eq!(config.library_suffix, ".dll");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, "pretty");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();

        std::env::set_var("MMDEVICE_LOG_LEVEL", "warn");
        let config = MmConfig::load_from(&path);
        std::env::remove_var("MMDEVICE_LOG_LEVEL");

        assert_eq!(config.unwrap().log_level, "warn");
    }

    #[test]
    fn test_invalid_log_level() {
        let config = MmConfig {
            log_level: "loud".to_string(),
            ..MmConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let config = MmConfig {
            log_format: "xml".to_string(),
            ..MmConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let config = MmConfig {
            library_prefix: String::new(),
            ..MmConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

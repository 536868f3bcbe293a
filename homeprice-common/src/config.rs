//! Configuration loading and data directory resolution
//!
//! Data directory resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`HOMEPRICE_DATA_DIR`)
//! 3. TOML config file (`HOMEPRICE_CONFIG`, default `homeprice.toml`)
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "HOMEPRICE_DATA_DIR";

/// Environment variable naming the TOML config file
pub const CONFIG_FILE_ENV: &str = "HOMEPRICE_CONFIG";

/// Default data directory when nothing else is configured
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Service configuration from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding the parameter store, reference dictionaries
    /// and model weights
    pub data_dir: Option<String>,
    /// Bind address for the HTTP server (default 127.0.0.1:5900)
    pub bind_address: Option<String>,
    /// Model weights file name inside `data_dir` (default `model_abr.json`)
    pub model_file: Option<String>,
}

impl TomlConfig {
    /// Load the TOML config from `path`, or defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Write the config atomically (temp file then rename)
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Path of the TOML config file: `HOMEPRICE_CONFIG` or `./homeprice.toml`
pub fn config_file_path() -> PathBuf {
    std::env::var(CONFIG_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("homeprice.toml"))
}

/// Resolve the data directory following the priority order above
pub fn resolve_data_dir(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.data_dir {
        return PathBuf::from(path);
    }

    // Priority 4: Compiled default
    warn!(
        "No data directory configured ({} / {}), using {}",
        DATA_DIR_ENV, CONFIG_FILE_ENV, DEFAULT_DATA_DIR
    );
    PathBuf::from(DEFAULT_DATA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_wins_over_toml() {
        let config = TomlConfig {
            data_dir: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let dir = resolve_data_dir(Some("/from/cli"), &config);
        assert_eq!(dir, PathBuf::from("/from/cli"));
    }

    #[test]
    fn toml_used_when_no_cli_arg() {
        let config = TomlConfig {
            data_dir: Some("/from/toml".to_string()),
            ..Default::default()
        };
        // Note: assumes HOMEPRICE_DATA_DIR is not set in the test environment
        if std::env::var(DATA_DIR_ENV).is_err() {
            let dir = resolve_data_dir(None, &config);
            assert_eq!(dir, PathBuf::from("/from/toml"));
        }
    }

    #[test]
    fn roundtrip_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("homeprice.toml");
        let config = TomlConfig {
            data_dir: Some("/srv/homeprice".to_string()),
            bind_address: Some("0.0.0.0:5900".to_string()),
            model_file: None,
        };
        config.write(&path).unwrap();

        let loaded = TomlConfig::load(&path).unwrap();
        assert_eq!(loaded.data_dir.as_deref(), Some("/srv/homeprice"));
        assert_eq!(loaded.bind_address.as_deref(), Some("0.0.0.0:5900"));
        assert!(loaded.model_file.is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let loaded = TomlConfig::load(Path::new("/nonexistent/homeprice.toml")).unwrap();
        assert!(loaded.data_dir.is_none());
    }
}

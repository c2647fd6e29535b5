//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! database and logging sections. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file, failing if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.database.pool_size == 0 {
            warnings.push("database.pool_size is 0; at least one connection is required".into());
        }

        if self.database.path.as_os_str().is_empty() {
            warnings.push("database.path is empty".into());
        }

        if self.database.busy_timeout_ms == 0 {
            warnings.push(
                "database.busy_timeout_ms is 0; concurrent writers will fail immediately".into(),
            );
        }

        if let Some(ref filter) = self.logging.filter {
            if filter.trim().is_empty() {
                warnings.push("logging.filter is set but empty".into());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("querykit.db"),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn default_pool_size() -> u32 {
    4
}

fn default_busy_timeout() -> u64 {
    5_000
}

/// Logging settings.
///
/// `filter` uses `tracing_subscriber::EnvFilter` syntax. `RUST_LOG` wins
/// over it when both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.database.path, PathBuf::from("querykit.db"));
        assert_eq!(cfg.database.pool_size, 4);
        assert_eq!(cfg.database.busy_timeout_ms, 5_000);
        assert!(cfg.logging.filter.is_none());
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn zero_pool_size_warns() {
        let mut cfg = Config::default();
        cfg.database.pool_size = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("pool_size")));
    }

    #[test]
    fn empty_filter_warns() {
        let mut cfg = Config::default();
        cfg.logging.filter = Some("  ".into());
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("logging.filter")));
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"database": {"path": "/tmp/people.db", "pool_size": 8}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/people.db"));
        assert_eq!(cfg.database.pool_size, 8);
        assert_eq!(cfg.database.busy_timeout_ms, 5_000);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.database.pool_size, 4);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.database.pool_size, 4);
    }

    #[test]
    fn load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(Some(&dir.path().join("absent.json")));
        assert_eq!(cfg.database.pool_size, 4);
    }

    #[test]
    fn load_or_default_bad_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.database.pool_size, 4);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("querykit.json");
        std::fs::write(&path, r#"{"logging": {"filter": "querykit_db=trace"}}"#).unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.logging.filter.as_deref(), Some("querykit_db=trace"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}

//! Configuration for SiteWatch
//!
//! Settings are read from `~/.sitewatch/config.json` when it exists, then
//! overridden by `SITEWATCH_*` environment variables (a `.env` file in the
//! working directory is honored). A missing config file means defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WatchError};

/// Default re-check interval, measured from the end of one run to the start
/// of the next.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;
/// Shortest interval accepted; anything lower is raised to this.
pub const MIN_INTERVAL_SECS: u64 = 10;
/// Default per-request timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
/// Default number of resources fetched concurrently within one run.
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Upper bound for the per-run worker pool.
pub const MAX_CONCURRENCY: usize = 32;
/// User-Agent sent with every fetch.
pub const DEFAULT_USER_AGENT: &str = concat!("sitewatch/", env!("CARGO_PKG_VERSION"));

const WATCH_LIST_FILE: &str = "websites.json";
const SNAPSHOT_DIR: &str = "snapshots";
const PID_FILE: &str = "sitewatch.pid";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the watch list, snapshots and PID file.
    pub data_dir: PathBuf,
    /// Seconds between the end of one run and the start of the next.
    pub interval_secs: u64,
    /// Per-fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Resources fetched concurrently within one run (1 = sequential).
    pub concurrency: usize,
    /// Allow the same URL to appear more than once in the watch list.
    pub allow_duplicates: bool,
    /// User-Agent header for fetches.
    pub user_agent: String,
    /// Raise desktop notifications on change (macOS only, stdout elsewhere).
    pub desktop_notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Self::dir(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            allow_duplicates: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            desktop_notifications: true,
        }
    }
}

impl Config {
    /// Base directory (`~/.sitewatch`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sitewatch")
    }

    /// Default config file path (`~/.sitewatch/config.json`).
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default path, `.env`, and the process environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::load_from(&Self::path())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            WatchError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&content).map_err(|e| {
            WatchError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `SITEWATCH_*` overrides. `lookup` resolves a variable name to
    /// its value, if set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("SITEWATCH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup("SITEWATCH_INTERVAL_SECS") {
            self.interval_secs = parse_env("SITEWATCH_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("SITEWATCH_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_env("SITEWATCH_FETCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("SITEWATCH_CONCURRENCY") {
            self.concurrency = parse_env("SITEWATCH_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("SITEWATCH_ALLOW_DUPLICATES") {
            self.allow_duplicates = parse_env("SITEWATCH_ALLOW_DUPLICATES", &v)?;
        }
        Ok(())
    }

    /// Clamp values into their supported ranges.
    pub fn normalize(&mut self) {
        self.interval_secs = self.interval_secs.max(MIN_INTERVAL_SECS);
        self.concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
    }

    /// Reject values that cannot be clamped into something sensible.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(WatchError::Config(
                "fetch_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(WatchError::Config("user_agent must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn watch_list_path(&self) -> PathBuf {
        self.data_dir.join(WATCH_LIST_FILE)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_DIR)
    }

    pub fn pid_path(&self) -> PathBuf {
        self.data_dir.join(PID_FILE)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| WatchError::Config(format!("Invalid value for {}: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.concurrency, 4);
        assert!(!config.allow_duplicates);
        assert!(config.user_agent.starts_with("sitewatch/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_under_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/sw"),
            ..Config::default()
        };
        assert_eq!(config.watch_list_path(), PathBuf::from("/tmp/sw/websites.json"));
        assert_eq!(config.snapshot_dir(), PathBuf::from("/tmp/sw/snapshots"));
        assert_eq!(config.pid_path(), PathBuf::from("/tmp/sw/sitewatch.pid"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"interval_secs": 60, "allow_duplicates": true}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.interval_secs, 60);
        assert!(config.allow_duplicates);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SITEWATCH_DATA_DIR", "/var/lib/sitewatch"),
            ("SITEWATCH_INTERVAL_SECS", "120"),
            ("SITEWATCH_CONCURRENCY", "8"),
            ("SITEWATCH_ALLOW_DUPLICATES", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/sitewatch"));
        assert_eq!(config.interval_secs, 120);
        assert_eq!(config.concurrency, 8);
        assert!(config.allow_duplicates);
    }

    #[test]
    fn test_env_override_invalid() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "SITEWATCH_INTERVAL_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SITEWATCH_INTERVAL_SECS"));
    }

    #[test]
    fn test_normalize_clamps() {
        let mut config = Config {
            interval_secs: 1,
            concurrency: 0,
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.interval_secs, MIN_INTERVAL_SECS);
        assert_eq!(config.concurrency, 1);

        config.concurrency = 1000;
        config.normalize();
        assert_eq!(config.concurrency, MAX_CONCURRENCY);
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = Config {
            fetch_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}

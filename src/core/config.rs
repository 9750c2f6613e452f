//! Configuration management with layered hierarchy

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::fetch::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_RECORDS, DEFAULT_PAGE_SIZE};
use crate::core::hierarchy::DEFAULT_TTL_HOURS;
use crate::core::odata::DEFAULT_TIMEOUT_SECS;
use crate::core::session::Session;

/// Local (working-directory) config file name
pub const LOCAL_CONFIG_FILE: &str = ".nimbus-reports.yaml";

/// Errors that can occur while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No Nimbus base URL configured (set base_url or NIMBUS_BASE_URL)")]
    MissingBaseUrl,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Nimbus Reports configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tenant URL (the OData root is derived from it)
    pub base_url: Option<String>,

    /// Nimbus user ID sent in the UserID header
    pub user_id: Option<i32>,

    /// Session token from a prior authentication
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,

    /// HTTP timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Records per page
    pub page_size: Option<usize>,

    /// Hard cap on records per lookup table
    pub max_records: Option<usize>,

    /// Schedule ids per OR-predicate request
    pub schedule_batch_size: Option<usize>,

    /// Hours before a loaded hierarchy is refreshed
    pub hierarchy_ttl_hours: Option<i64>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        let mut config = Self::load_files(global.as_deref(), Some(&local))?;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Merge the given files (later wins). Missing files are skipped.
    pub fn load_files(global: Option<&Path>, local: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. Built-in defaults (already in Default impl)
        let mut config = Config::default();

        // 2. Global user config, then 3. local config
        for path in [global, local].into_iter().flatten() {
            if path.exists() {
                config.merge(Self::from_yaml_file(path)?);
            }
        }

        Ok(config)
    }

    /// Read a single YAML config file
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        serde_yml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 4. Environment variables, via a lookup function
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("NIMBUS_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(raw) = lookup("NIMBUS_USER_ID") {
            self.user_id = Some(parse_value("NIMBUS_USER_ID", &raw)?);
        }
        if let Some(token) = lookup("NIMBUS_AUTH_TOKEN") {
            self.auth_token = Some(token);
        }
        if let Some(raw) = lookup("NIMBUS_TIMEOUT_SECS") {
            self.timeout_secs = Some(parse_value("NIMBUS_TIMEOUT_SECS", &raw)?);
        }
        Ok(())
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "nimbus-reports")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.user_id.is_some() {
            self.user_id = other.user_id;
        }
        if other.auth_token.is_some() {
            self.auth_token = other.auth_token;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
        if other.max_records.is_some() {
            self.max_records = other.max_records;
        }
        if other.schedule_batch_size.is_some() {
            self.schedule_batch_size = other.schedule_batch_size;
        }
        if other.hierarchy_ttl_hours.is_some() {
            self.hierarchy_ttl_hours = other.hierarchy_ttl_hours;
        }
    }

    /// Build the session for the configured connection
    pub fn session(&self) -> Result<Session, ConfigError> {
        let base_url = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;

        let mut session = Session::new(base_url);
        session.user_id = self.user_id;
        session.auth_token = self.auth_token.clone();
        Ok(session)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    pub fn max_records(&self) -> usize {
        self.max_records.unwrap_or(DEFAULT_MAX_RECORDS)
    }

    pub fn schedule_batch_size(&self) -> usize {
        self.schedule_batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1)
    }

    pub fn hierarchy_ttl_hours(&self) -> i64 {
        self.hierarchy_ttl_hours.unwrap_or(DEFAULT_TTL_HOURS)
    }

    /// Hierarchy TTL as a duration. Negative or out-of-range hours are rejected.
    pub fn hierarchy_ttl(&self) -> Result<Duration, ConfigError> {
        let hours = self.hierarchy_ttl_hours();
        Duration::try_hours(hours)
            .filter(|_| hours >= 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "hierarchy_ttl_hours".to_string(),
                value: hours.to_string(),
            })
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

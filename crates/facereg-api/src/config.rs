//! Client configuration.
//!
//! Built-in defaults are embedded at compile time from
//! `contrib/facereg.toml`. A user TOML file is merged over them key by key,
//! then `FACEREG_*` environment variables override individual values.

use facereg_core::UploadLimits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../../../contrib/facereg.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("bad config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiSettings,
    pub endpoints: Endpoints,
    pub defaults: Defaults,
    pub upload: UploadLimits,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Service root, e.g. `http://localhost:8080/api`. Endpoint paths are
    /// appended to it verbatim.
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Path suffixes for each service operation.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    pub health: String,
    pub register: String,
    pub register_base64: String,
    pub recognize: String,
    pub recognize_base64: String,
    /// Prefix; the face id is appended as a path segment.
    pub delete_face: String,
    /// Prefix; the person id is appended as a path segment.
    pub delete_person: String,
    pub list: String,
    /// Prefix; the person id is appended as a path segment.
    pub query_by_person: String,
    pub reset: String,
    pub debug_detect: String,
}

/// Default request parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct Defaults {
    /// Similarity threshold for recognition, in [0, 1].
    pub threshold: f32,
    pub top_k: u32,
    pub list_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiSettings {
    pub search_debounce_ms: u64,
    pub health_interval_secs: u64,
    pub toast_secs: u64,
}

impl UiSettings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    pub fn toast_lifetime(&self) -> Duration {
        Duration::from_secs(self.toast_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded contrib/facereg.toml is valid")
    }
}

impl Config {
    /// Load defaults, the user file, and environment overrides.
    ///
    /// `path` forces a specific file, which must then exist. Otherwise the
    /// file is looked up via `FACEREG_CONFIG` and the XDG config dir and
    /// silently skipped when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG).map_err(|source| {
            ConfigError::Parse {
                path: PathBuf::from("<embedded>"),
                source,
            }
        })?;

        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(file) = file {
            let text = std::fs::read_to_string(&file).map_err(|source| ConfigError::Read {
                path: file.clone(),
                source,
            })?;
            let user: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: file.clone(),
                source,
            })?;
            merge_tables(&mut merged, user);
            tracing::debug!(path = %file.display(), "loaded config file");
        }

        let mut config: Config =
            toml::Value::Table(merged)
                .try_into()
                .map_err(|source| ConfigError::Parse {
                    path: PathBuf::from("<merged>"),
                    source,
                })?;

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `FACEREG_*` overrides. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("FACEREG_API_BASE_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        self.api.timeout_secs = parsed_or(&lookup, "FACEREG_TIMEOUT_SECS", self.api.timeout_secs);
        self.defaults.threshold = parsed_or(&lookup, "FACEREG_THRESHOLD", self.defaults.threshold);
        self.defaults.top_k = parsed_or(&lookup, "FACEREG_TOP_K", self.defaults.top_k);
        self.defaults.list_limit =
            parsed_or(&lookup, "FACEREG_LIST_LIMIT", self.defaults.list_limit);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url is empty".into()));
        }
        if !(0.0..=1.0).contains(&self.defaults.threshold) {
            return Err(ConfigError::Invalid(format!(
                "defaults.threshold must be within [0, 1], got {}",
                self.defaults.threshold
            )));
        }
        if self.defaults.top_k == 0 {
            return Err(ConfigError::Invalid("defaults.top_k must be at least 1".into()));
        }
        for (key, value) in [
            ("api.timeout_secs", self.api.timeout_secs),
            ("ui.health_interval_secs", self.ui.health_interval_secs),
            ("ui.toast_secs", self.ui.toast_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be at least 1")));
            }
        }
        if self.upload.accepted_types.is_empty() {
            return Err(ConfigError::Invalid("upload.accepted_types is empty".into()));
        }
        Ok(())
    }

    /// Full URL for an endpoint path.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api.base_url.trim_end_matches('/'), endpoint)
    }
}

/// `$FACEREG_CONFIG`, else `$XDG_CONFIG_HOME/facereg/config.toml`, else
/// `$HOME/.config/facereg/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("FACEREG_CONFIG") {
        return Some(PathBuf::from(p));
    }
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;
    Some(config_dir.join("facereg").join("config.toml"))
}

/// Recursively overlay `over` onto `base`. Tables merge; everything else
/// replaces.
fn merge_tables(base: &mut toml::Table, over: toml::Table) {
    for (key, value) in over {
        if let toml::Value::Table(o) = value {
            if let Some(toml::Value::Table(b)) = base.get_mut(&key) {
                merge_tables(b, o);
                continue;
            }
            base.insert(key, toml::Value::Table(o));
        } else {
            base.insert(key, value);
        }
    }
}

fn parsed_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    current: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(current)
}

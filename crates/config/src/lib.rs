//! Configuration loading and validation.
//!
//! Sources are layered with [`figment`], later sources winning:
//!
//! 1. built-in defaults,
//! 2. `scribe.toml` in the platform configuration directory (if present),
//! 3. an explicitly requested file (TOML, YAML or JSON, by extension),
//! 4. `SCRIBE_`-prefixed environment variables, with `__` separating nested
//!    keys (`SCRIBE_AUTOSAVE__DEBOUNCE_MS=1500`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SCRIBE_";
const FILE_NAME: &str = "scribe.toml";
const CACHE_FILE_NAME: &str = "cache.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Name used in logs.
    pub name: String,
    /// Base URL of the note API; `/note` and `/summarise` are appended.
    pub base_url: String,
    pub timeout_ms: u64,
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            name: "cloud".to_string(),
            base_url: "http://localhost:3000/api".to_string(),
            timeout_ms: 10_000,
        }
    }
}
impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save is sent.
    pub debounce_ms: u64,
}
impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 1_000 }
    }
}
impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite file; defaults to `cache.sqlite` in the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub autosave: AutosaveConfig,
    pub cache: CacheConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from every source, then validate it.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = Self::project_dirs().map(|dirs| dirs.config_dir().join(FILE_NAME));
        Self::load_from(user.as_deref(), explicit)
    }

    /// Same as [`load`](Self::load), with the user-level file given
    /// explicitly instead of looked up in the platform directories.
    pub fn load_from(user: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(user, explicit)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn figment(user: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        // A missing user-level file is fine; figment treats it as empty.
        if let Some(user) = user {
            figment = figment.merge(Toml::file(user));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn validate(&self) -> Result<()> {
        let url = self.remote.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            exn::bail!(ErrorKind::Invalid {
                field: "remote.base_url",
                reason: format!("expected an http(s) URL, got `{url}`"),
            });
        }
        if self.remote.timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "remote.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.autosave.debounce_ms == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "autosave.debounce_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Where the document cache lives.
    pub fn cache_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.cache.path {
            return Ok(path.clone());
        }
        let dirs = Self::project_dirs().ok_or_raise(|| ErrorKind::NoDataDirectory)?;
        Ok(dirs.data_dir().join(CACHE_FILE_NAME))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "scribe")
    }
}

//! Runtime configuration for the opalview client.
//!
//! Read from `opalview.toml` in the user config directory. Every field has a
//! default, so a missing file or a partial file both load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "opalview.toml";
/// File holding the persisted credential slot, next to the config file.
pub const CREDENTIALS_FILE_NAME: &str = "login.json";

/// Integration id registered for delegated logins.
pub const DEFAULT_INTEGRATION: &str = "observe-tool-abdaf0";
pub const DEFAULT_CLIENT_NAME: &str = "Simple Observe Client";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Top-level configuration (persisted as `opalview.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OpalviewConfig {
    #[serde(default)]
    pub tenant: TenantSettings,
    #[serde(default)]
    pub login: LoginSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub query: QuerySettings,
}

/// Seed values for the credential record when nothing is persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TenantSettings {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_integration")]
    pub integration: String,
    /// Prefix of the client nonce shown on the approval page.
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            integration: default_integration(),
            client_name: default_client_name(),
        }
    }
}

impl LoginSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Send all requests here instead of `https://{tenant}.{site}`.
    #[serde(default)]
    pub endpoint_override: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            endpoint_override: None,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuerySettings {
    #[serde(default = "default_row_limit")]
    pub row_limit: u32,
    /// Default time window, e.g. `20m`.
    #[serde(default)]
    pub interval: Option<String>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            row_limit: default_row_limit(),
            interval: None,
        }
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_integration() -> String {
    DEFAULT_INTEGRATION.to_string()
}
fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_row_limit() -> u32 {
    1000
}

// ── Loading ─────────────────────────────────────────────────────────────

/// Config directory (`~/.config/opalview` on Linux).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dirs) = directories::ProjectDirs::from("", "", "opalview") {
        return Ok(dirs.config_dir().to_path_buf());
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| ConfigError::NoConfigDir)?;
    Ok(PathBuf::from(home).join(".config").join("opalview"))
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn credentials_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CREDENTIALS_FILE_NAME))
}

impl OpalviewConfig {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        apply_compat_fallbacks(&mut config);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Normalize values that would otherwise misbehave at runtime.
/// Returns true when any field was updated.
pub fn apply_compat_fallbacks(config: &mut OpalviewConfig) -> bool {
    let mut changed = false;

    if config.login.poll_interval_ms == 0 {
        config.login.poll_interval_ms = default_poll_interval_ms();
        changed = true;
    }
    if config.login.integration.trim().is_empty() {
        config.login.integration = default_integration();
        changed = true;
    }
    if config.query.row_limit == 0 {
        config.query.row_limit = default_row_limit();
        changed = true;
    }

    match config.http.endpoint_override.as_deref().map(str::trim) {
        Some("") => {
            config.http.endpoint_override = None;
            changed = true;
        }
        Some(url) if url.ends_with('/') => {
            config.http.endpoint_override = Some(url.trim_end_matches('/').to_string());
            changed = true;
        }
        _ => {}
    }

    changed
}

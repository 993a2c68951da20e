//! TOML-based configuration for stayopen.
//!
//! Supports a config file (stayopen.toml) with environment variable expansion
//! in the worker path.
//!
//! Example configuration:
//! ```toml
//! [worker]
//! path = "${EXIFTOOL_HOME}/exiftool"
//! args = ["-charset", "filename=utf8"]
//! request_timeout_secs = 30   # 0 waits forever
//! shutdown_timeout_secs = 5
//!
//! [protocol]
//! ready_token = "{ready}"
//! initial_buffer_bytes = 64000
//! max_frame_bytes = 1024000
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::worker::protocol::DEFAULT_READY_TOKEN;
use crate::worker::SessionOptions;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "STAYOPEN_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Worker process configuration.
    pub worker: WorkerSettings,

    /// Response framing configuration.
    pub protocol: ProtocolSettings,
}

/// Worker process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to the worker binary (supports ${ENV_VAR} expansion).
    pub path: String,

    /// Arguments placed before `-stay_open True -@ -`.
    pub args: Vec<String>,

    /// Per-query timeout in seconds; 0 disables it.
    pub request_timeout_secs: u64,

    /// How long shutdown waits before killing the worker.
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            path: "exiftool".to_string(),
            args: Vec::new(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Response framing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Token the worker prints after each executed command.
    pub ready_token: String,

    /// Pre-allocated response buffer.
    pub initial_buffer_bytes: usize,

    /// Largest response accepted.
    pub max_frame_bytes: usize,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            ready_token: DEFAULT_READY_TOKEN.to_string(),
            initial_buffer_bytes: 64 * 1000,
            max_frame_bytes: 1024 * 1000,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `STAYOPEN_CONFIG`
    /// 2. `./stayopen.toml`
    /// 3. `~/.config/stayopen/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("stayopen.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("stayopen").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings that cannot frame responses.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.worker.path.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "worker.path must not be empty".to_string(),
            ));
        }
        if self.protocol.ready_token.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "protocol.ready_token must not be empty".to_string(),
            ));
        }
        if self.protocol.max_frame_bytes < self.protocol.initial_buffer_bytes {
            return Err(SettingsError::InvalidConfig(format!(
                "protocol.max_frame_bytes ({}) is smaller than protocol.initial_buffer_bytes ({})",
                self.protocol.max_frame_bytes, self.protocol.initial_buffer_bytes
            )));
        }
        Ok(())
    }

    /// Get the worker binary path with environment variables expanded.
    pub fn worker_path(&self) -> Result<PathBuf, SettingsError> {
        expand_env_vars(&self.worker.path).map(PathBuf::from)
    }

    /// Per-query timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.worker.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Build session options for spawning the worker.
    pub fn session_options(&self) -> Result<SessionOptions, SettingsError> {
        self.validate()?;

        let mut options = SessionOptions::new(self.worker_path()?)
            .with_args(self.worker.args.iter().cloned())
            .with_max_frame(self.protocol.max_frame_bytes)
            .with_shutdown_timeout(Duration::from_secs(self.worker.shutdown_timeout_secs));
        options.ready_token = self.protocol.ready_token.clone();
        options.initial_buffer = self.protocol.initial_buffer_bytes;
        Ok(options)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}').ok_or_else(|| {
                SettingsError::InvalidConfig(format!("unterminated variable in {s:?}"))
            })?;
            (&braced[..end], end + 2)
        } else {
            let end = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        if name.is_empty() && consumed == 0 {
            result.push('$');
        } else {
            let value =
                env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()))?;
            result.push_str(&value);
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    Ok(result)
}

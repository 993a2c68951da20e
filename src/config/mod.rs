//! Configuration module for stayopen.
//!
//! Handles the config file, environment variables, and worker settings.

mod settings;

pub use settings::{
    expand_env_vars, ProtocolSettings, Settings, SettingsError, WorkerSettings, CONFIG_ENV,
};

//! Configuration module for hqlc.
//!
//! Handles the config file, environment variables and settings.

mod settings;

pub use settings::{expand_env_vars, MappingSettings, QuerySettings, Settings, SettingsError};

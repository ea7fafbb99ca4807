//! TOML-based configuration for hqlc.
//!
//! Supports a config file (hqlc.toml) with environment variable expansion
//! in paths.
//!
//! Example configuration:
//! ```toml
//! [query]
//! dialect = "postgres"
//! strict_jpa_compliance = false
//! use_theta_style_inner_joins = false
//!
//! [mapping]
//! file = "${APP_HOME}/mapping.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::template::TEMPLATE;
use crate::sql::Dialect;

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
    /// Query compilation settings.
    pub query: QuerySettings,

    /// Domain mapping settings.
    pub mapping: MappingSettings,
}

/// Query compilation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Target SQL dialect.
    pub dialect: Dialect,

    /// Reject HQL extensions that JPQL does not allow.
    pub strict_jpa_compliance: bool,

    /// Render inner joins as cross joins plus where conditions.
    pub use_theta_style_inner_joins: bool,

    /// Alias placeholder used while qualifying mapping fragments.
    pub template_placeholder: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            strict_jpa_compliance: false,
            use_theta_style_inner_joins: false,
            template_placeholder: TEMPLATE.to_string(),
        }
    }
}

/// Domain mapping settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Mapping file (supports ${ENV_VAR} expansion).
    pub file: Option<String>,
}

impl MappingSettings {
    /// Get the mapping file path with environment variables expanded.
    pub fn resolved_file(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.file
            .as_deref()
            .map(|file| expand_env_vars(file).map(PathBuf::from))
            .transpose()
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
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `HQLC_CONFIG`
    /// 2. `./hqlc.toml`
    /// 3. `~/.config/hqlc/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("HQLC_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("hqlc.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("hqlc").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let placeholder = &self.query.template_placeholder;
        if placeholder.is_empty() || placeholder.contains(char::is_whitespace) {
            return Err(SettingsError::InvalidConfig(format!(
                "template_placeholder must be a non-empty word, got '{placeholder}'"
            )));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let mut var_name = String::new();
        if chars.next_if_eq(&'{').is_some() {
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_braces() {
        env::set_var("HQLC_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${HQLC_TEST_VAR}").unwrap(), "hello");
        assert_eq!(
            expand_env_vars("prefix_${HQLC_TEST_VAR}_suffix").unwrap(),
            "prefix_hello_suffix"
        );
        env::remove_var("HQLC_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        env::set_var("HQLC_TEST_VAR2", "world");
        assert_eq!(expand_env_vars("$HQLC_TEST_VAR2").unwrap(), "world");
        assert_eq!(expand_env_vars("$HQLC_TEST_VAR2!").unwrap(), "world!");
        assert_eq!(expand_env_vars("cost: $").unwrap(), "cost: $");
        env::remove_var("HQLC_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("${NONEXISTENT_VAR_12345}");
        assert!(matches!(result, Err(SettingsError::MissingEnvVar(name)) if name == "NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[query]
dialect = "postgres"
strict_jpa_compliance = true

[mapping]
file = "./mapping.toml"
"#;

        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.query.dialect, Dialect::Postgres);
        assert!(settings.query.strict_jpa_compliance);
        assert!(!settings.query.use_theta_style_inner_joins);
        assert_eq!(settings.query.template_placeholder, TEMPLATE);
        assert_eq!(
            settings.mapping.resolved_file().unwrap(),
            Some(PathBuf::from("./mapping.toml"))
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.query.dialect, Dialect::Ansi);
        assert!(!settings.query.strict_jpa_compliance);
        assert!(settings.mapping.file.is_none());
    }

    #[test]
    fn test_blank_placeholder_rejected() {
        let toml = r#"
[query]
template_placeholder = ""
"#;
        assert!(matches!(
            Settings::from_toml(toml),
            Err(SettingsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let toml = r#"
[query]
dialect = "db2"
"#;
        assert!(matches!(Settings::from_toml(toml), Err(SettingsError::ParseError(_))));
    }
}

//! CLI configuration.
//!
//! ```toml
//! [query]
//! default_fields = ["title^2", "body"]
//! default_fuzziness = 2
//! max_size = 100
//! ```

use anyhow::{Context, Result};
use scour_query::QueryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding `query.default_fields` (comma separated)
pub const DEFAULT_FIELDS_ENV: &str = "SCOUR_DEFAULT_FIELDS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Query parsing and expansion settings
    pub query: QueryConfig,
}

impl CliConfig {
    /// Load the config file (if any), then apply environment overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file_or_default(config_file)?;
        config.apply_default_fields_override(std::env::var(DEFAULT_FIELDS_ENV).ok());
        Ok(config)
    }

    fn from_file_or_default(config_file: Option<&Path>) -> Result<Self> {
        match config_file {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Replace the default fields with a comma-separated list; blank is ignored
    pub fn apply_default_fields_override(&mut self, value: Option<String>) {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            return;
        };

        self.query.default_fields = value
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Display the current configuration as TOML
    pub fn display_as_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config as TOML")
    }

    /// Display the current configuration as JSON
    pub fn display_as_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config as JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_argument_uses_defaults() {
        let config = CliConfig::from_file_or_default(None).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.query.default_fuzziness, 1);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[query]\ndefault_fields = [\"title^2\", \"body\"]\ndefault_fuzziness = 3\nmax_size = 100"
        )
        .unwrap();

        let config = CliConfig::from_file_or_default(Some(file.path())).unwrap();
        assert_eq!(config.query.default_fields, vec!["title^2", "body"]);
        assert_eq!(config.query.default_fuzziness, 3);
        assert_eq!(config.query.max_size, Some(100));
        assert_eq!(config.query.default_size, None);
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::from_file_or_default(Some(&dir.path().join("missing.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[query\ndefault_fields = 1").unwrap();

        let err = CliConfig::from_file_or_default(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_fields_override() {
        let mut config = CliConfig::default();
        config.apply_default_fields_override(Some("title^3, body,,".to_string()));
        assert_eq!(config.query.default_fields, vec!["title^3", "body"]);

        config.apply_default_fields_override(Some("  ".to_string()));
        assert_eq!(config.query.default_fields, vec!["title^3", "body"]);

        config.apply_default_fields_override(None);
        assert_eq!(config.query.default_fields, vec!["title^3", "body"]);
    }

    #[test]
    fn test_display_as_toml_round_trips() {
        let mut config = CliConfig::default();
        config.query.default_fields = vec!["title".to_string()];

        let toml_str = config.display_as_toml().unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}

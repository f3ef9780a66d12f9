//! Configuration settings for shop-notify.
//!
//! Settings are loaded from `~/.shop-notify/config.yaml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::NotifyError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Script execution settings.
    pub engine: EngineConfig,
    /// Outgoing email settings.
    pub email: EmailConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    /// Color output setting.
    #[serde(default = "default_color")]
    pub color: ColorSetting,
}

/// Color output setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorSetting {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// Script execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Propagate script failures instead of isolating them.
    pub fail_loud: bool,
    /// Languages templates may be rendered in; empty allows any.
    pub languages: Vec<String>,
    /// Language tried after the preferred ones.
    #[serde(default = "default_language")]
    pub default_language: String,
}

/// Outgoing email settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmailConfig {
    /// Sender address used when a script sets none.
    pub default_from: Option<String>,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Settings the engine consults while running scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Propagate script failures and make templates strict.
    pub fail_loud: bool,
    /// Languages templates may be rendered in; empty allows any.
    pub languages: Vec<String>,
    /// Language tried after the preferred ones.
    pub default_language: String,
    /// Sender address used when a script sets none.
    pub default_from_email: Option<String>,
}

// Default value functions for serde
const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

const fn default_color() -> ColorSetting {
    ColorSetting::Auto
}

fn default_language() -> String {
    "en".to_string()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
            color: default_color(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fail_loud: false,
            languages: Vec::new(),
            default_language: default_language(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Config::default().engine_settings()
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, NotifyError> {
        let paths = Paths::new()?;
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &Path) -> Result<Self, NotifyError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            NotifyError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            NotifyError::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &Path) -> Result<(), NotifyError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| NotifyError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            NotifyError::Config(format!("Failed to write config file {}: {e}", path.display()))
        })
    }

    /// The runtime settings handed to the engine.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            fail_loud: self.engine.fail_loud,
            languages: self
                .engine
                .languages
                .iter()
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
            default_language: self.engine.default_language.trim().to_lowercase(),
            default_from_email: self
                .email
                .default_from
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.general.default_output, OutputFormat::Pretty);
        assert_eq!(config.general.color, ColorSetting::Auto);
        assert!(!config.engine.fail_loud);
        assert_eq!(config.engine.default_language, "en");
        assert_eq!(config.logging.filter, "warn");
        assert!(config.email.default_from.is_none());
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let config = Config::load_from_path(&config_path).unwrap();

        // Should return defaults when file doesn't exist
        assert_eq!(config.general.default_output, OutputFormat::Pretty);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut config = Config::default();
        config.engine.fail_loud = true;
        config.email.default_from = Some("shop@example.com".to_string());

        config.save_to_path(&config_path).unwrap();
        let loaded = Config::load_from_path(&config_path).unwrap();

        assert!(loaded.engine.fail_loud);
        assert_eq!(loaded.email.default_from.as_deref(), Some("shop@example.com"));
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let partial_yaml = r"
engine:
  languages: [FI, en]
";
        std::fs::write(&config_path, partial_yaml).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.engine.languages, ["FI", "en"]);
        assert_eq!(config.engine.default_language, "en");
        assert_eq!(config.general.default_output, OutputFormat::Pretty);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "engine: [not, a, map]").unwrap();

        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn test_engine_settings_normalize() {
        let mut config = Config::default();
        config.engine.languages = vec![" FI ".to_string(), String::new()];
        config.email.default_from = Some("  ".to_string());

        let settings = config.engine_settings();
        assert_eq!(settings.languages, ["fi"]);
        assert_eq!(settings.default_language, "en");
        assert!(settings.default_from_email.is_none());
        assert_eq!(EngineSettings::default(), Config::default().engine_settings());
    }
}

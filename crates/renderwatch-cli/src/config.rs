//! CLI configuration.
//!
//! The classifier phrase sets are tunable data, not hard-coded law: any
//! set can be overridden from the config file while the others keep the
//! canonical defaults.

use anyhow::Result;
use renderwatch_core::{ClassifierRules, MonitorConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Delay between Completed and the terminal notification, in ms.
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,
    /// Elapsed-time sampler period, in ms.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Classifier phrase-set overrides.
    #[serde(default)]
    pub rules: ClassifierRules,
}

fn default_grace_delay_ms() -> u64 {
    500
}

fn default_sample_interval_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grace_delay_ms: default_grace_delay_ms(),
            sample_interval_ms: default_sample_interval_ms(),
            rules: ClassifierRules::default(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.rules.validate()?;
        Ok(config)
    }

    /// Load config from the default location (renderwatch.toml in the
    /// working directory) or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("renderwatch.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }
        Ok(Config::default())
    }

    /// Monitor configuration derived from this config.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            rules: self.rules.clone(),
            grace_delay: Duration::from_millis(self.grace_delay_ms),
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            ..MonitorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderwatch_types::Classification;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.grace_delay_ms, 500);
        assert_eq!(config.sample_interval_ms, 1000);
        assert_eq!(
            config.rules.classify("video generation completed successfully"),
            Classification::Completion
        );
    }

    #[test]
    fn test_partial_file_overrides_merge_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
grace_delay_ms = 250

[rules]
completion_phrases = ["render done"]
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.grace_delay_ms, 250);
        assert_eq!(config.sample_interval_ms, 1000);
        assert_eq!(
            config.rules.classify("render done"),
            Classification::Completion
        );
        // Untouched sets keep their defaults.
        assert_eq!(
            config.rules.classify("Traceback (most recent call last):"),
            Classification::Error
        );
    }

    #[test]
    fn test_invalid_rules_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[rules]
error_patterns = []
"#
        )
        .unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}

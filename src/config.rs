//! Engine configuration
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::retention::{FrameAction, FrameRuleConfig, RuleSet};

fn default_rows() -> usize {
    24
}

fn default_columns() -> usize {
    80
}

fn default_max_lines() -> usize {
    10_000
}

fn default_max_frames() -> usize {
    100
}

fn default_maintenance_delay_ms() -> u64 {
    250
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Maximum rows kept outside the viewport
    #[serde(default = "default_max_lines")]
    pub scrollback_max_lines: usize,
    /// Maximum number of frames
    #[serde(default = "default_max_frames")]
    pub scrollback_max_frames: usize,
    /// Debounce delay before caps are enforced
    #[serde(default = "default_maintenance_delay_ms")]
    pub maintenance_delay_ms: u64,
    /// Reply to ENQ
    #[serde(default)]
    pub answerback: String,
    #[serde(default)]
    pub frames: FramesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            columns: default_columns(),
            scrollback_max_lines: default_max_lines(),
            scrollback_max_frames: default_max_frames(),
            maintenance_delay_ms: default_maintenance_delay_ms(),
            answerback: String::new(),
            frames: FramesConfig::default(),
        }
    }
}

/// Frame rules section (`[frames]`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FramesConfig {
    #[serde(default)]
    pub default: FrameAction,
    #[serde(default)]
    pub rules: Vec<FrameRuleConfig>,
}

impl EngineConfig {
    pub fn with_size(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            ..Self::default()
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.columns == 0 {
            return Err(ConfigError::InvalidSize {
                rows: self.rows,
                columns: self.columns,
            });
        }
        self.rule_set().map(|_| ())
    }

    /// Compile the frame rules
    pub fn rule_set(&self) -> Result<RuleSet, ConfigError> {
        RuleSet::compile(&self.frames.rules, self.frames.default)
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("size must be non-zero, got {rows}x{columns}")]
    InvalidSize { rows: usize, columns: usize },
    #[error("unknown frame action {0:?}")]
    InvalidFrameAction(String),
    #[error("invalid rule regex {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("a frame rule needs exactly one of `command` or `regex`")]
    AmbiguousRule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!((config.rows, config.columns), (24, 80));
        assert_eq!(config.scrollback_max_lines, 10_000);
        assert_eq!(config.scrollback_max_frames, 100);
        assert_eq!(config.frames.default, FrameAction::Always);
    }

    #[test]
    fn test_config_empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_config_from_toml() {
        let config = EngineConfig::from_toml(
            r#"
            rows = 40
            columns = 120
            scrollback_max_lines = 500
            answerback = "termframe"

            [frames]
            default = "if-lines-exceed:20"

            [[frames.rules]]
            command = "ls"
            action = "never"

            [[frames.rules]]
            regex = "^cargo "
            action = "always"
            "#,
        )
        .unwrap();
        assert_eq!((config.rows, config.columns), (40, 120));
        assert_eq!(config.scrollback_max_lines, 500);
        assert_eq!(config.scrollback_max_frames, 100);
        assert_eq!(config.answerback, "termframe");
        assert_eq!(config.frames.default, FrameAction::IfLinesExceed(20));
        let rules = config.rule_set().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.decide("ls"), FrameAction::Never);
        assert_eq!(rules.decide("cargo build"), FrameAction::Always);
        assert_eq!(rules.decide("make"), FrameAction::IfLinesExceed(20));
    }

    #[test]
    fn test_config_rejects_zero_size() {
        assert!(matches!(
            EngineConfig::from_toml("rows = 0"),
            Err(ConfigError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_config_rejects_bad_action() {
        let err = EngineConfig::from_toml("[frames]\ndefault = \"sometimes\"");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_serialization() {
        let mut config = EngineConfig::default();
        config
            .frames
            .rules
            .push(FrameRuleConfig::command("git", FrameAction::IfLinesExceed(3)));
        let text = toml::to_string_pretty(&config).unwrap();
        let restored = EngineConfig::from_toml(&text).unwrap();
        assert_eq!(config, restored);
    }
}

//! Per-command frame rules
//!
//! A rule pairs a matcher with the action to take when a command starts.
//! Rules are checked in order; the first match wins and the configured
//! default applies when nothing matches.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// What to do with a command's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FrameAction {
    /// Frame the output immediately
    #[default]
    Always,
    /// Leave the output inline
    Never,
    /// Decide at command end: frame only if the output spans more lines
    IfLinesExceed(usize),
}

impl FromStr for FrameAction {
    type Err = ConfigError;

    /// Accepts `always`, `never` and `if-lines-exceed:N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "always" => Ok(FrameAction::Always),
            "never" => Ok(FrameAction::Never),
            other => other
                .strip_prefix("if-lines-exceed:")
                .and_then(|n| n.trim().parse().ok())
                .map(FrameAction::IfLinesExceed)
                .ok_or_else(|| ConfigError::InvalidFrameAction(s.to_string())),
        }
    }
}

impl TryFrom<String> for FrameAction {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FrameAction> for String {
    fn from(action: FrameAction) -> Self {
        action.to_string()
    }
}

impl fmt::Display for FrameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameAction::Always => write!(f, "always"),
            FrameAction::Never => write!(f, "never"),
            FrameAction::IfLinesExceed(n) => write!(f, "if-lines-exceed:{}", n),
        }
    }
}

/// A rule as written in the configuration file. Exactly one of `command`
/// and `regex` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    pub action: FrameAction,
}

impl FrameRuleConfig {
    pub fn command(name: &str, action: FrameAction) -> Self {
        Self {
            command: Some(name.to_string()),
            regex: None,
            action,
        }
    }

    pub fn regex(pattern: &str, action: FrameAction) -> Self {
        Self {
            command: None,
            regex: Some(pattern.to_string()),
            action,
        }
    }
}

/// How a rule selects commands
#[derive(Debug, Clone)]
pub enum CommandMatcher {
    /// Program name: first word of the command line, without its path
    Command(String),
    /// Searched anywhere in the command line
    Regex(Regex),
}

impl CommandMatcher {
    pub fn matches(&self, command_line: &str) -> bool {
        match self {
            CommandMatcher::Command(name) => program_name(command_line) == name,
            CommandMatcher::Regex(re) => re.is_match(command_line),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameRule {
    pub matcher: CommandMatcher,
    pub action: FrameAction,
}

impl FrameRule {
    pub fn compile(config: &FrameRuleConfig) -> Result<Self, ConfigError> {
        let matcher = match (&config.command, &config.regex) {
            (Some(name), None) if !name.trim().is_empty() => {
                CommandMatcher::Command(name.trim().to_string())
            }
            (None, Some(pattern)) => CommandMatcher::Regex(Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }
            })?),
            _ => return Err(ConfigError::AmbiguousRule),
        };
        Ok(Self {
            matcher,
            action: config.action,
        })
    }
}

/// Ordered rules plus the fallback action
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FrameRule>,
    default: FrameAction,
}

impl RuleSet {
    pub fn new(rules: Vec<FrameRule>, default: FrameAction) -> Self {
        Self { rules, default }
    }

    pub fn compile(configs: &[FrameRuleConfig], default: FrameAction) -> Result<Self, ConfigError> {
        let rules = configs
            .iter()
            .map(FrameRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules, default))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn decide(&self, command_line: &str) -> FrameAction {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(command_line))
            .map(|rule| rule.action)
            .unwrap_or(self.default)
    }
}

/// First word of a command line with any directory prefix removed
pub fn program_name(command_line: &str) -> &str {
    let word = command_line.split_whitespace().next().unwrap_or("");
    word.rsplit('/').next().unwrap_or(word)
}

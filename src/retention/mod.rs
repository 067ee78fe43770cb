//! Frame retention: per-command rules, cap enforcement and the debounced
//! maintenance schedule

mod policy;
mod rules;
mod schedule;

pub use policy::{OpenDecision, RetentionPolicy};
pub use rules::{program_name, CommandMatcher, FrameAction, FrameRule, FrameRuleConfig, RuleSet};
pub use schedule::Debounce;

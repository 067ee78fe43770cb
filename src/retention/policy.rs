//! Retention decisions and cap enforcement

use tracing::debug;

use crate::scrollback::{FrameArena, FrameId, ScrollbackStore};

use super::rules::{FrameAction, RuleSet};

/// What to do at BRACKET_START
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDecision {
    /// Open a running frame now
    Frame,
    /// Record the start and decide at BRACKET_END
    Defer { threshold: usize },
    /// Leave the output inline
    Inline,
}

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    rules: RuleSet,
    max_lines: usize,
    max_frames: usize,
}

impl RetentionPolicy {
    pub fn new(rules: RuleSet, max_lines: usize, max_frames: usize) -> Self {
        Self {
            rules,
            max_lines,
            max_frames,
        }
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn decide_open(&self, command_line: &str) -> OpenDecision {
        match self.rules.decide(command_line) {
            FrameAction::Always => OpenDecision::Frame,
            FrameAction::Never => OpenDecision::Inline,
            FrameAction::IfLinesExceed(threshold) => OpenDecision::Defer { threshold },
        }
    }

    /// A deferred command gets a frame only if its output is strictly
    /// longer than the threshold
    pub fn should_materialize(threshold: usize, lines: u64) -> bool {
        lines > threshold as u64
    }

    /// Enforce the frame cap, then the line cap, then drop frames none of
    /// whose rows remain. A frame that never had rows is dropped only once
    /// trimming has reached past its position. `viewport_start` is the absolute position of the
    /// top viewport row. Returns the destroyed frames.
    pub fn enforce(
        &self,
        history: &mut ScrollbackStore,
        frames: &mut FrameArena,
        viewport_start: u64,
    ) -> Vec<FrameId> {
        let mut destroyed = Vec::new();

        let excess = frames.len().saturating_sub(self.max_frames);
        if excess > 0 {
            let victims: Vec<FrameId> = frames
                .by_position()
                .into_iter()
                .filter(|id| frames.get(*id).map_or(false, |f| !f.is_running()))
                .take(excess)
                .collect();
            for id in victims {
                let rows = history.remove_owner(id);
                frames.remove(id);
                debug!(frame = %id, rows, "frame evicted by frame cap");
                destroyed.push(id);
            }
        }

        if history.len() > self.max_lines {
            let trimmed = history.trim_oldest(history.len() - self.max_lines);
            debug!(trimmed, "history trimmed to line cap");
        }

        let orphans: Vec<FrameId> = frames
            .iter()
            .filter(|f| match f.end {
                Some(end) if end > f.start => {
                    end <= viewport_start && history.rows_owned_by(f.id) == 0
                }
                // A frame without rows goes once trimming has passed it
                Some(_) => history.trimmed_to() > f.start,
                None => false,
            })
            .map(|f| f.id)
            .collect();
        for id in orphans {
            frames.remove(id);
            debug!(frame = %id, "frame dropped after its rows were trimmed");
            destroyed.push(id);
        }

        destroyed
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(RuleSet::default(), 10_000, 100)
    }
}

//! Frames: the output of one shell command
//!
//! A frame covers a half-open range of absolute row positions. Absolute
//! positions count every row the primary buffer has ever had at its top,
//! so they never shift when history is trimmed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable frame handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    /// Command still producing output
    Running,
    /// Exited with code 0
    Success,
    /// Non-zero exit, or interrupted by another command
    Failure,
}

impl Posture {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Posture::Success,
            _ => Posture::Failure,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Posture::Running => "running",
            Posture::Success => "success",
            Posture::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: FrameId,
    pub command: String,
    pub exit_code: Option<i32>,
    pub posture: Posture,
    /// First absolute row
    pub start: u64,
    /// One past the last absolute row; `None` while running
    pub end: Option<u64>,
}

impl Frame {
    pub fn is_running(&self) -> bool {
        self.posture == Posture::Running
    }

    /// A running frame owns every row from its start onwards
    pub fn contains(&self, abs: u64) -> bool {
        abs >= self.start && self.end.map_or(true, |end| abs < end)
    }
}

/// All live frames, keyed by id (creation order)
#[derive(Debug, Clone, Default)]
pub struct FrameArena {
    frames: BTreeMap<FrameId, Frame>,
    next_id: u64,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> FrameId {
        self.next_id += 1;
        FrameId(self.next_id)
    }

    /// Open a running frame at `start`
    pub fn open(&mut self, command: String, start: u64) -> FrameId {
        let id = self.allocate();
        self.frames.insert(
            id,
            Frame {
                id,
                command,
                exit_code: None,
                posture: Posture::Running,
                start,
                end: None,
            },
        );
        id
    }

    /// Insert an already finished frame covering `[start, end)`
    pub fn insert_finished(
        &mut self,
        command: String,
        start: u64,
        end: u64,
        exit_code: Option<i32>,
    ) -> FrameId {
        let id = self.allocate();
        self.frames.insert(
            id,
            Frame {
                id,
                command,
                exit_code,
                posture: Posture::from_exit_code(exit_code),
                start,
                end: Some(end.max(start)),
            },
        );
        id
    }

    /// Close a running frame. Returns false if it was not running.
    pub fn finish(&mut self, id: FrameId, end: u64, exit_code: Option<i32>) -> bool {
        match self.frames.get_mut(&id) {
            Some(frame) if frame.is_running() => {
                frame.end = Some(end.max(frame.start));
                frame.exit_code = exit_code;
                frame.posture = Posture::from_exit_code(exit_code);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(&id)
    }

    pub fn remove(&mut self, id: FrameId) -> Option<Frame> {
        self.frames.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    pub fn running(&self) -> Option<FrameId> {
        self.frames.values().find(|f| f.is_running()).map(|f| f.id)
    }

    /// The frame owning absolute row `abs`, if any
    pub fn owner_of(&self, abs: u64) -> Option<FrameId> {
        self.frames.values().find(|f| f.contains(abs)).map(|f| f.id)
    }

    /// Ids ordered by position, oldest first
    pub fn by_position(&self) -> Vec<FrameId> {
        let mut frames: Vec<&Frame> = self.frames.values().collect();
        frames.sort_by_key(|f| (f.start, f.id));
        frames.into_iter().map(|f| f.id).collect()
    }

    /// Shorten finished frames so none reaches past `start`. The row a
    /// command left unterminated goes to whatever follows it.
    pub fn clip_ends(&mut self, start: u64) {
        for frame in self.frames.values_mut() {
            if let Some(end) = frame.end {
                if end > start {
                    frame.end = Some(start.max(frame.start));
                }
            }
        }
    }
}

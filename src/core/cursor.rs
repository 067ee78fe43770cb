//! Cursor state
//!
//! Position plus the deferred-wrap flag. Movement clamping that depends on
//! the scroll region and origin mode lives in the screen.

use super::cell::Pen;
use super::charset::CharsetState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Row position (0-indexed)
    pub row: usize,
    /// Column position (0-indexed)
    pub col: usize,
    /// Cursor is parked past the last column; the next printable character
    /// wraps first (when autowrap is on)
    pub pending_wrap: bool,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp into a `rows x cols` area
    pub fn clamp(&mut self, rows: usize, cols: usize) {
        self.row = self.row.min(rows.saturating_sub(1));
        self.col = self.col.min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }
}

/// State captured by DECSC / CSI s and restored by DECRC / CSI u
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SavedCursor {
    pub cursor: Cursor,
    pub pen: Pen,
    pub origin: bool,
    pub autowrap: bool,
    pub charsets: CharsetState,
}

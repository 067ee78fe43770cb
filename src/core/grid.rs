//! Cell matrix
//!
//! One screen buffer: `rows` rows of exactly `cols` cells. Scrolling hands
//! the rows that leave the top back to the caller so they can be moved
//! into history instead of being copied.

use super::cell::{Cell, Color};
use super::row::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Row>,
    cols: usize,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| Row::new(cols)).collect(),
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut Row> {
        self.rows.get_mut(row)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cell(col))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Scroll `[top, bottom]` up by `count`. The rows that leave the region
    /// are returned in top-to-bottom order.
    pub fn scroll_up(&mut self, top: usize, bottom: usize, count: usize, bg: Color) -> Vec<Row> {
        if top > bottom || bottom >= self.rows.len() {
            return Vec::new();
        }
        let count = count.min(bottom - top + 1);
        let removed: Vec<Row> = self.rows.drain(top..top + count).collect();
        let insert_at = bottom + 1 - count;
        let cols = self.cols;
        self.rows
            .splice(insert_at..insert_at, (0..count).map(|_| Row::blank(cols, bg)));
        self.mark_dirty(top, bottom);
        removed
    }

    /// Scroll `[top, bottom]` down by `count`, discarding rows that fall off
    /// the bottom of the region
    pub fn scroll_down(&mut self, top: usize, bottom: usize, count: usize, bg: Color) {
        if top > bottom || bottom >= self.rows.len() {
            return;
        }
        let count = count.min(bottom - top + 1);
        self.rows.drain(bottom + 1 - count..=bottom);
        let cols = self.cols;
        self.rows
            .splice(top..top, (0..count).map(|_| Row::blank(cols, bg)));
        self.mark_dirty(top, bottom);
    }

    /// Remove the first `count` rows, appending blanks at the bottom
    pub fn take_top(&mut self, count: usize) -> Vec<Row> {
        let bottom = self.rows.len().saturating_sub(1);
        if self.rows.is_empty() || count == 0 {
            return Vec::new();
        }
        self.scroll_up(0, bottom, count, Color::Default)
    }

    /// Truncate or pad every row to `cols`; drop or add rows at the bottom
    pub fn resize(&mut self, rows: usize, cols: usize) {
        for row in &mut self.rows {
            row.resize(cols);
        }
        self.rows.resize_with(rows, || Row::new(cols));
        self.cols = cols;
    }

    pub fn clear(&mut self, bg: Color) {
        for row in &mut self.rows {
            row.clear(bg);
        }
    }

    pub fn mark_dirty(&mut self, top: usize, bottom: usize) {
        for row in self.rows.iter_mut().take(bottom + 1).skip(top) {
            row.mark_dirty();
        }
    }

    /// Inclusive range of rows changed since the last `clear_dirty`
    pub fn dirty_range(&self) -> Option<(usize, usize)> {
        let first = self.rows.iter().position(Row::is_dirty)?;
        let last = self.rows.iter().rposition(Row::is_dirty)?;
        Some((first, last))
    }

    pub fn clear_dirty(&mut self) {
        for row in &mut self.rows {
            row.clear_dirty();
        }
    }

    /// Text of every row, joined with newlines
    pub fn text(&self) -> String {
        self.rows.iter().map(Row::text).collect::<Vec<_>>().join("\n")
    }
}

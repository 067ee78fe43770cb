//! Terminal row
//!
//! A row always holds exactly as many cells as the grid has columns. All
//! editing goes through methods that keep wide-character pairs intact: a
//! lead cell is always followed by its continuation, and touching either
//! half clears the other.

use super::cell::{Cell, CellFlags, Color, Pen};

/// A row of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Cell>,
    /// Changed since the last screen-change notification
    dirty: bool,
}

impl Row {
    pub fn new(cols: usize) -> Self {
        Self::blank(cols, Color::Default)
    }

    /// A row of blank cells with the given background
    pub fn blank(cols: usize, bg: Color) -> Self {
        Self {
            cells: vec![Cell::blank(bg); cols],
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Non-zero hyperlink ids used on this row
    pub fn hyperlink_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.cells.iter().map(|c| c.hyperlink).filter(|&id| id != 0)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Truncate or pad to `cols`. Never reflows.
    pub fn resize(&mut self, cols: usize) {
        if cols == self.cells.len() {
            return;
        }
        self.cells.resize(cols, Cell::default());
        self.repair_wide();
        self.dirty = true;
    }

    /// Write a cell of the given display width at `col`.
    ///
    /// A width-2 cell also claims `col + 1` as its continuation. Returns
    /// false (and writes nothing) when a wide cell does not fit.
    pub fn write(&mut self, col: usize, ch: char, width: usize, pen: &Pen) -> bool {
        let len = self.cells.len();
        if col >= len || (width == 2 && col + 1 >= len) {
            return false;
        }
        self.detach(col);
        let mut cell = Cell::with_pen(ch, pen);
        if width == 2 {
            self.detach(col + 1);
            cell.flags |= CellFlags::WIDE;
            let mut continuation = Cell::with_pen(' ', pen);
            continuation.flags |= CellFlags::WIDE_CONTINUATION;
            self.cells[col + 1] = continuation;
        }
        self.cells[col] = cell;
        self.dirty = true;
        true
    }

    /// Break up any wide pair that `col` belongs to, blanking the partner
    fn detach(&mut self, col: usize) {
        let cell = self.cells[col];
        if cell.is_wide_continuation() && col > 0 {
            let bg = self.cells[col - 1].bg;
            self.cells[col - 1] = Cell::blank(bg);
        }
        if cell.is_wide() && col + 1 < self.cells.len() {
            let bg = self.cells[col + 1].bg;
            self.cells[col + 1] = Cell::blank(bg);
        }
    }

    /// Erase cells in `[start, end)` to blanks with the given background
    pub fn erase(&mut self, start: usize, end: usize, bg: Color) {
        let end = end.min(self.cells.len());
        if start >= end {
            return;
        }
        self.detach(start);
        self.detach(end - 1);
        for cell in &mut self.cells[start..end] {
            *cell = Cell::blank(bg);
        }
        self.dirty = true;
    }

    pub fn clear(&mut self, bg: Color) {
        let len = self.cells.len();
        self.erase(0, len, bg);
    }

    /// Insert blank cells at `col`, shifting the rest right (ICH)
    pub fn insert_blank(&mut self, col: usize, count: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len || count == 0 {
            return;
        }
        let count = count.min(len - col);
        self.detach(col);
        self.cells[col..].rotate_right(count);
        for cell in &mut self.cells[col..col + count] {
            *cell = Cell::blank(bg);
        }
        self.repair_wide();
        self.dirty = true;
    }

    /// Delete cells at `col`, shifting the rest left (DCH)
    pub fn delete(&mut self, col: usize, count: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len || count == 0 {
            return;
        }
        let count = count.min(len - col);
        self.detach(col);
        self.detach(col + count - 1);
        self.cells[col..].rotate_left(count);
        for cell in &mut self.cells[len - count..] {
            *cell = Cell::blank(bg);
        }
        self.repair_wide();
        self.dirty = true;
    }

    /// Fill every cell with `ch` (DECALN)
    pub fn fill(&mut self, ch: char) {
        for cell in &mut self.cells {
            *cell = Cell::default();
            cell.ch = ch;
        }
        self.dirty = true;
    }

    /// Blank out halves of wide pairs that lost their partner after a shift
    /// or resize
    fn repair_wide(&mut self) {
        let len = self.cells.len();
        for i in 0..len {
            let cell = self.cells[i];
            let orphan_continuation =
                cell.is_wide_continuation() && (i == 0 || !self.cells[i - 1].is_wide());
            let orphan_lead =
                cell.is_wide() && (i + 1 >= len || !self.cells[i + 1].is_wide_continuation());
            if orphan_continuation || orphan_lead {
                self.cells[i] = Cell::blank(cell.bg);
            }
        }
    }

    /// Text content with continuation cells skipped and trailing blanks trimmed
    pub fn text(&self) -> String {
        let text: String = self
            .cells
            .iter()
            .filter(|c| !c.is_wide_continuation())
            .map(|c| c.ch)
            .collect();
        text.trim_end().to_string()
    }
}

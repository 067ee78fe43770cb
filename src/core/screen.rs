//! Terminal screen
//!
//! The live viewport of one session: primary and alternate cell matrices,
//! cursor, modes, scroll region, tab stops, saved cursor and character
//! sets. It is mutated only by the emulator.
//!
//! The screen does not know about history. Rows that scroll off the top of
//! the primary buffer are parked in an eviction list which the owner drains
//! with [`Screen::take_evicted`] and moves into the scrollback store.

use std::collections::HashSet;

use super::cell::{char_width, Cell, CellFlags, Pen};
use super::charset::{Charset, CharsetState};
use super::cursor::{Cursor, SavedCursor};
use super::grid::Grid;
use super::hyperlink::Hyperlinks;
use super::modes::Modes;
use super::row::Row;

/// Default tab stop interval
const TAB_WIDTH: usize = 8;

/// Which part of the display or line an erase targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    /// Cursor to end
    Below,
    /// Start to cursor (inclusive)
    Above,
    /// Everything
    All,
}

impl EraseMode {
    pub fn from_param(param: u16) -> Option<Self> {
        match param {
            0 => Some(EraseMode::Below),
            1 => Some(EraseMode::Above),
            2 => Some(EraseMode::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Screen {
    primary: Grid,
    alternate: Grid,
    alternate_active: bool,
    cursor: Cursor,
    modes: Modes,
    pen: Pen,
    charsets: CharsetState,
    saved_primary: SavedCursor,
    saved_alternate: SavedCursor,
    /// Scroll region, inclusive, 0-indexed
    scroll_top: usize,
    scroll_bottom: usize,
    tabs: Vec<bool>,
    /// Last printed character, for REP
    last_char: Option<char>,
    /// URIs registered by OSC 8
    hyperlinks: Hyperlinks,
    /// Rows scrolled off the top of the primary buffer, oldest first
    evicted: Vec<Row>,
}

impl Screen {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            primary: Grid::new(rows, cols),
            alternate: Grid::new(rows, cols),
            alternate_active: false,
            cursor: Cursor::new(),
            modes: Modes::new(),
            pen: Pen::default(),
            charsets: CharsetState::new(),
            saved_primary: SavedCursor::default(),
            saved_alternate: SavedCursor::default(),
            scroll_top: 0,
            scroll_bottom: rows.saturating_sub(1),
            tabs: default_tabs(cols),
            last_char: None,
            hyperlinks: Hyperlinks::new(),
            evicted: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.primary.rows()
    }

    pub fn cols(&self) -> usize {
        self.primary.cols()
    }

    /// The buffer currently displayed
    pub fn grid(&self) -> &Grid {
        if self.alternate_active {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn grid_mut(&mut self) -> &mut Grid {
        if self.alternate_active {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    fn current_row_mut(&mut self) -> Option<&mut Row> {
        let row = self.cursor.row;
        self.grid_mut().row_mut(row)
    }

    pub fn primary(&self) -> &Grid {
        &self.primary
    }

    pub fn is_alternate(&self) -> bool {
        self.alternate_active
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn modes_mut(&mut self) -> &mut Modes {
        &mut self.modes
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub fn pen_mut(&mut self) -> &mut Pen {
        &mut self.pen
    }

    pub fn charsets_mut(&mut self) -> &mut CharsetState {
        &mut self.charsets
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    fn full_scroll_region(&self) -> bool {
        self.scroll_top == 0 && self.scroll_bottom + 1 == self.rows()
    }

    /// Drain the rows that scrolled off the primary buffer since the last call
    pub fn take_evicted(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.evicted)
    }

    pub fn has_evicted(&self) -> bool {
        !self.evicted.is_empty()
    }

    pub fn dirty_range(&self) -> Option<(usize, usize)> {
        self.grid().dirty_range()
    }

    pub fn clear_dirty(&mut self) {
        self.grid_mut().clear_dirty();
    }

    /// Write a printable character at the cursor
    pub fn print(&mut self, c: char) {
        let c = self.charsets.translate(c);
        let width = char_width(c);
        if width == 0 {
            return;
        }
        let cols = self.cols();

        if self.cursor.pending_wrap && self.modes.autowrap {
            self.carriage_return();
            self.linefeed();
        }
        self.cursor.pending_wrap = false;

        if width == 2 && self.cursor.col + 1 >= cols {
            if !self.modes.autowrap || cols < 2 {
                return;
            }
            self.carriage_return();
            self.linefeed();
        }

        let col = self.cursor.col;
        let pen = self.pen;
        let insert = self.modes.insert;
        if let Some(row) = self.current_row_mut() {
            if insert {
                row.insert_blank(col, width, pen.bg);
            }
            row.write(col, c, width, &pen);
        }
        self.last_char = Some(c);

        let next = col + width;
        if next >= cols {
            self.cursor.col = cols - 1;
            self.cursor.pending_wrap = self.modes.autowrap;
        } else {
            self.cursor.col = next;
        }
    }

    pub fn print_str(&mut self, text: &str) {
        for c in text.chars() {
            self.print(c);
        }
    }

    /// REP: repeat the last printed character
    pub fn repeat_last(&mut self, count: usize) {
        if let Some(c) = self.last_char {
            for _ in 0..count.min(self.cols() * self.rows()) {
                self.print(c);
            }
        }
    }

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// Move down one row, scrolling the region at its bottom margin
    pub fn linefeed(&mut self) {
        if self.cursor.row == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows() {
            self.cursor.row += 1;
        }
        self.cursor.pending_wrap = false;
    }

    /// Move up one row, scrolling the region down at its top margin
    pub fn reverse_index(&mut self) {
        if self.cursor.row == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
        self.cursor.pending_wrap = false;
    }

    pub fn backspace(&mut self) {
        if self.cursor.pending_wrap {
            self.cursor.pending_wrap = false;
        } else {
            self.cursor.col = self.cursor.col.saturating_sub(1);
        }
    }

    pub fn tab(&mut self, count: usize) {
        let last = self.cols().saturating_sub(1);
        for _ in 0..count {
            let next = (self.cursor.col + 1..self.cols()).find(|&c| self.tabs[c]);
            self.cursor.col = next.unwrap_or(last);
        }
        self.cursor.pending_wrap = false;
    }

    pub fn back_tab(&mut self, count: usize) {
        for _ in 0..count {
            let prev = (0..self.cursor.col).rev().find(|&c| self.tabs[c]);
            self.cursor.col = prev.unwrap_or(0);
        }
        self.cursor.pending_wrap = false;
    }

    pub fn set_tab_stop(&mut self) {
        let col = self.cursor.col;
        if let Some(tab) = self.tabs.get_mut(col) {
            *tab = true;
        }
    }

    /// TBC: 0 clears the stop at the cursor, 3 clears all
    pub fn clear_tab_stop(&mut self, mode: u16) {
        match mode {
            0 => {
                let col = self.cursor.col;
                if let Some(tab) = self.tabs.get_mut(col) {
                    *tab = false;
                }
            }
            3 => self.tabs.iter_mut().for_each(|t| *t = false),
            _ => {}
        }
    }

    pub fn move_up(&mut self, count: usize) {
        let min = if self.cursor.row >= self.scroll_top {
            self.scroll_top
        } else {
            0
        };
        self.cursor.row = self.cursor.row.saturating_sub(count).max(min);
        self.cursor.pending_wrap = false;
    }

    pub fn move_down(&mut self, count: usize) {
        let max = if self.cursor.row <= self.scroll_bottom {
            self.scroll_bottom
        } else {
            self.rows() - 1
        };
        self.cursor.row = (self.cursor.row + count).min(max);
        self.cursor.pending_wrap = false;
    }

    pub fn move_left(&mut self, count: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(count);
        self.cursor.pending_wrap = false;
    }

    pub fn move_right(&mut self, count: usize) {
        self.cursor.col = (self.cursor.col + count).min(self.cols() - 1);
        self.cursor.pending_wrap = false;
    }

    /// Absolute positioning (CUP). Row is relative to the scroll region in
    /// origin mode.
    pub fn set_cursor(&mut self, row: usize, col: usize) {
        self.set_row(row);
        self.set_col(col);
    }

    pub fn set_row(&mut self, row: usize) {
        self.cursor.row = if self.modes.origin {
            (self.scroll_top + row).min(self.scroll_bottom)
        } else {
            row.min(self.rows() - 1)
        };
        self.cursor.pending_wrap = false;
    }

    pub fn set_col(&mut self, col: usize) {
        self.cursor.col = col.min(self.cols() - 1);
        self.cursor.pending_wrap = false;
    }

    /// Cursor position for CPR, 1-based and origin-relative
    pub fn report_position(&self) -> (usize, usize) {
        let row = if self.modes.origin {
            self.cursor.row.saturating_sub(self.scroll_top)
        } else {
            self.cursor.row
        };
        (row + 1, self.cursor.col + 1)
    }

    /// DECSTBM with 0-indexed inclusive bounds. Invalid regions are ignored.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let bottom = bottom.min(self.rows() - 1);
        if top >= bottom {
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.set_cursor(0, 0);
    }

    /// SU: scroll the region up
    pub fn scroll_up(&mut self, count: usize) {
        let (top, bottom, bg) = (self.scroll_top, self.scroll_bottom, self.pen.bg);
        let removed = self.grid_mut().scroll_up(top, bottom, count, bg);
        if !self.alternate_active && top == 0 {
            self.evicted.extend(removed);
        }
    }

    /// SD: scroll the region down
    pub fn scroll_down(&mut self, count: usize) {
        let (top, bottom, bg) = (self.scroll_top, self.scroll_bottom, self.pen.bg);
        self.grid_mut().scroll_down(top, bottom, count, bg);
    }

    /// IL: only acts when the cursor is inside the scroll region
    pub fn insert_lines(&mut self, count: usize) {
        let row = self.cursor.row;
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        let (bottom, bg) = (self.scroll_bottom, self.pen.bg);
        self.grid_mut().scroll_down(row, bottom, count, bg);
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// DL: removed lines are discarded, never moved to history
    pub fn delete_lines(&mut self, count: usize) {
        let row = self.cursor.row;
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        let (bottom, bg) = (self.scroll_bottom, self.pen.bg);
        self.grid_mut().scroll_up(row, bottom, count, bg);
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    pub fn insert_chars(&mut self, count: usize) {
        let (col, bg) = (self.cursor.col, self.pen.bg);
        if let Some(row) = self.current_row_mut() {
            row.insert_blank(col, count, bg);
        }
        self.cursor.pending_wrap = false;
    }

    pub fn delete_chars(&mut self, count: usize) {
        let (col, bg) = (self.cursor.col, self.pen.bg);
        if let Some(row) = self.current_row_mut() {
            row.delete(col, count, bg);
        }
        self.cursor.pending_wrap = false;
    }

    /// ECH
    pub fn erase_chars(&mut self, count: usize) {
        let (col, bg) = (self.cursor.col, self.pen.bg);
        if let Some(row) = self.current_row_mut() {
            row.erase(col, col + count, bg);
        }
        self.cursor.pending_wrap = false;
    }

    /// EL
    pub fn erase_line(&mut self, mode: EraseMode) {
        let (col, cols, bg) = (self.cursor.col, self.cols(), self.pen.bg);
        if let Some(row) = self.current_row_mut() {
            match mode {
                EraseMode::Below => row.erase(col, cols, bg),
                EraseMode::Above => row.erase(0, col + 1, bg),
                EraseMode::All => row.clear(bg),
            }
        }
    }

    /// ED 0-2. Erasing the whole display clears it in place; nothing is
    /// pushed to history.
    pub fn erase_display(&mut self, mode: EraseMode) {
        let (cursor_row, rows, bg) = (self.cursor.row, self.rows(), self.pen.bg);
        let range = match mode {
            EraseMode::Below => {
                self.erase_line(EraseMode::Below);
                cursor_row + 1..rows
            }
            EraseMode::Above => {
                self.erase_line(EraseMode::Above);
                0..cursor_row
            }
            EraseMode::All => 0..rows,
        };
        let grid = self.grid_mut();
        for r in range {
            if let Some(row) = grid.row_mut(r) {
                row.clear(bg);
            }
        }
    }

    /// DECALN: fill the screen with 'E'
    pub fn alignment_test(&mut self) {
        let rows = self.rows();
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;
        let grid = self.grid_mut();
        for r in 0..rows {
            if let Some(row) = grid.row_mut(r) {
                row.fill('E');
            }
        }
        self.cursor = Cursor::new();
    }

    fn saved_mut(&mut self) -> &mut SavedCursor {
        if self.alternate_active {
            &mut self.saved_alternate
        } else {
            &mut self.saved_primary
        }
    }

    /// DECSC
    pub fn save_cursor(&mut self) {
        let saved = SavedCursor {
            cursor: self.cursor,
            pen: self.pen,
            origin: self.modes.origin,
            autowrap: self.modes.autowrap,
            charsets: self.charsets,
        };
        *self.saved_mut() = saved;
    }

    /// DECRC
    pub fn restore_cursor(&mut self) {
        let saved = *self.saved_mut();
        self.cursor = saved.cursor;
        self.cursor.clamp(self.rows(), self.cols());
        self.pen = saved.pen;
        self.modes.origin = saved.origin;
        self.modes.autowrap = saved.autowrap;
        self.charsets = saved.charsets;
    }

    /// Switch buffers for DECSET 47 / 1047 / 1049
    fn set_alternate(&mut self, on: bool, clear: bool) {
        if on == self.alternate_active {
            return;
        }
        self.alternate_active = on;
        self.modes.alternate_screen = on;
        let bg = self.pen.bg;
        if clear {
            self.alternate.clear(bg);
        }
        let rows = self.rows();
        self.grid_mut().mark_dirty(0, rows - 1);
    }

    /// Handle a DEC private mode. Returns false if the mode is unknown.
    pub fn set_dec_mode(&mut self, mode: u16, on: bool) -> bool {
        match mode {
            6 => {
                self.modes.origin = on;
                self.set_cursor(0, 0);
            }
            47 => self.set_alternate(on, false),
            1047 => {
                if on {
                    self.set_alternate(true, false);
                } else {
                    self.set_alternate(false, true);
                }
            }
            1048 => {
                if on {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if on {
                    self.save_cursor();
                    self.set_alternate(true, true);
                } else {
                    self.set_alternate(false, false);
                    self.restore_cursor();
                }
            }
            _ => {
                if !self.modes.set_dec_mode(mode, on) {
                    return false;
                }
                if mode == 7 && !on {
                    self.cursor.pending_wrap = false;
                }
            }
        }
        true
    }

    /// Designate a charset into G0-G3 (`ESC (`, `ESC )`, `ESC *`, `ESC +`)
    pub fn designate_charset(&mut self, slot: usize, charset: Charset) {
        self.charsets.designate(slot, charset);
    }

    /// Start (Some) or end (None) an OSC 8 hyperlink
    pub fn set_hyperlink(&mut self, uri: Option<&str>) {
        self.pen.hyperlink = match uri {
            Some(uri) if !uri.is_empty() => self.hyperlinks.intern(uri),
            _ => 0,
        };
    }

    pub fn hyperlink(&self, id: u32) -> Option<&str> {
        self.hyperlinks.get(id)
    }

    pub fn hyperlink_count(&self) -> usize {
        self.hyperlinks.len()
    }

    /// Add every hyperlink id the screen still refers to
    pub fn collect_hyperlinks(&self, live: &mut HashSet<u32>) {
        let rows = self
            .primary
            .iter()
            .chain(self.alternate.iter())
            .chain(self.evicted.iter());
        for row in rows {
            live.extend(row.hyperlink_ids());
        }
        let pens = [self.pen, self.saved_primary.pen, self.saved_alternate.pen];
        live.extend(pens.iter().map(|pen| pen.hyperlink).filter(|&id| id != 0));
    }

    /// Drop registered URIs whose ids are not in `live`
    pub fn retain_hyperlinks(&mut self, live: &HashSet<u32>) -> usize {
        self.hyperlinks.retain(live)
    }

    /// Move the rows above the cursor out of the primary viewport so that
    /// the cursor row becomes the top row. Returns the number of rows moved.
    pub fn evict_above_cursor(&mut self) -> usize {
        if self.alternate_active || !self.full_scroll_region() || self.cursor.row == 0 {
            return 0;
        }
        let count = self.cursor.row;
        let removed = self.primary.take_top(count);
        self.evicted.extend(removed);
        self.cursor.row = 0;
        self.saved_primary.cursor.row = self.saved_primary.cursor.row.saturating_sub(count);
        count
    }

    /// Truncate/pad to the new size without reflow. Callers validate that
    /// both dimensions are non-zero.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.primary.resize(rows, cols);
        self.alternate.resize(rows, cols);
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;
        let old_cols = self.tabs.len();
        self.tabs.resize(cols, false);
        for (col, tab) in self.tabs.iter_mut().enumerate().skip(old_cols) {
            *tab = col % TAB_WIDTH == 0;
        }
        self.cursor.clamp(rows, cols);
        self.saved_primary.cursor.clamp(rows, cols);
        self.saved_alternate.cursor.clamp(rows, cols);
        self.grid_mut().mark_dirty(0, rows - 1);
    }

    /// DECSTR
    pub fn soft_reset(&mut self) {
        self.modes.insert = false;
        self.modes.origin = false;
        self.modes.autowrap = true;
        self.modes.cursor_visible = true;
        self.modes.cursor_keys_application = false;
        self.modes.keypad_application = false;
        self.pen.reset();
        self.charsets = CharsetState::new();
        self.scroll_top = 0;
        self.scroll_bottom = self.rows() - 1;
        self.saved_primary = SavedCursor::default();
        self.saved_alternate = SavedCursor::default();
        self.cursor.pending_wrap = false;
    }

    /// RIS. History is owned elsewhere and is left alone; rows still
    /// waiting to be drained and the hyperlink registry are kept so that
    /// retained rows keep resolving.
    pub fn reset(&mut self) {
        let evicted = std::mem::take(&mut self.evicted);
        let hyperlinks = std::mem::take(&mut self.hyperlinks);
        *self = Screen::new(self.rows(), self.cols());
        self.evicted = evicted;
        self.hyperlinks = hyperlinks;
    }

    /// Cell with the cursor flag applied, for renderer views
    pub fn display_cell(&self, row: usize, col: usize) -> Option<Cell> {
        let mut cell = *self.grid().cell(row, col)?;
        if self.modes.cursor_visible && self.cursor.row == row && self.cursor.col == col {
            cell.flags |= CellFlags::CURSOR;
        }
        Some(cell)
    }

    pub fn row_text(&self, row: usize) -> String {
        self.grid().row(row).map(Row::text).unwrap_or_default()
    }

    pub fn text(&self) -> String {
        self.grid().text()
    }
}

fn default_tabs(cols: usize) -> Vec<bool> {
    (0..cols).map(|c| c % TAB_WIDTH == 0 && c != 0).collect()
}

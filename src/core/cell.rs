//! Terminal cell
//!
//! A single grid position: one code point plus colors and a style bitmask.
//! The second column of a double-width character is a continuation cell
//! that carries no code point of its own.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

bitflags! {
    /// Style and structure bits of a cell
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u16 {
        const BOLD = 1 << 0;
        const FAINT = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const INVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
        /// The visible cursor sits on this cell (set only in renderer views)
        const CURSOR = 1 << 8;
        /// Lead cell of a double-width character
        const WIDE = 1 << 9;
        /// Second column of a double-width character
        const WIDE_CONTINUATION = 1 << 10;
    }
}

impl CellFlags {
    /// Bits that come from SGR rather than from the grid structure
    pub const STYLE: CellFlags = CellFlags::BOLD
        .union(CellFlags::FAINT)
        .union(CellFlags::ITALIC)
        .union(CellFlags::UNDERLINE)
        .union(CellFlags::BLINK)
        .union(CellFlags::INVERSE)
        .union(CellFlags::HIDDEN)
        .union(CellFlags::STRIKETHROUGH);
}

/// Color representation supporting indexed and RGB colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    #[default]
    Default,
    /// 256-color palette index
    Indexed(u8),
    /// 24-bit RGB color
    Rgb(u8, u8, u8),
}

/// Current graphic rendition, applied to every cell written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    /// Only `CellFlags::STYLE` bits are meaningful here
    pub flags: CellFlags,
    /// Active OSC 8 hyperlink (0 = none)
    pub hyperlink: u32,
}

impl Pen {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub flags: CellFlags,
    /// Hyperlink ID (0 = no hyperlink)
    pub hyperlink: u32,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Color::Default)
    }
}

impl Cell {
    /// An empty cell carrying only a background color (erase semantics)
    pub fn blank(bg: Color) -> Self {
        Self {
            ch: ' ',
            fg: Color::Default,
            bg,
            flags: CellFlags::empty(),
            hyperlink: 0,
        }
    }

    /// A cell holding `ch` drawn with `pen`
    pub fn with_pen(ch: char, pen: &Pen) -> Self {
        Self {
            ch,
            fg: pen.fg,
            bg: pen.bg,
            flags: pen.flags & CellFlags::STYLE,
            hyperlink: pen.hyperlink,
        }
    }

    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE)
    }

    pub fn is_wide_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    pub fn is_blank(&self) -> bool {
        self.ch == ' ' && !self.is_wide_continuation()
    }
}

/// Display width of a code point: 0, 1 or 2 columns
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0).min(2)
}

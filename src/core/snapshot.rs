//! Deterministic snapshot generation
//!
//! Snapshots capture the viewport and retention state in a serializable
//! form for golden tests and the headless runner. Given the same byte
//! stream, the engine must produce identical snapshots.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellFlags, Color};
use super::modes::Modes;
use super::screen::Screen;

/// A complete snapshot of the engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub rows: usize,
    pub cols: usize,
    /// Visible text, one entry per row, trailing blanks trimmed
    pub lines: Vec<String>,
    /// Visible cells (row-major)
    pub grid: Vec<Vec<CellSnapshot>>,
    pub cursor: CursorSnapshot,
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    pub modes: Modes,
    pub title: String,
    pub alternate_screen: bool,
    /// Rows retained outside the viewport
    pub history_lines: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<FrameSnapshot>,
}

/// Snapshot of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub ch: char,
    #[serde(default, skip_serializing_if = "is_default_color")]
    pub fg: ColorSnapshot,
    #[serde(default, skip_serializing_if = "is_default_color")]
    pub bg: ColorSnapshot,
    #[serde(default, skip_serializing_if = "StyleSnapshot::is_plain")]
    pub style: StyleSnapshot,
    /// 0 for continuation, 1 normal, 2 wide
    pub width: u8,
}

/// Snapshot of a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColorSnapshot {
    #[default]
    Default,
    Indexed { index: u8 },
    Rgb { r: u8, g: u8, b: u8 },
}

fn is_default_color(color: &ColorSnapshot) -> bool {
    *color == ColorSnapshot::Default
}

/// Snapshot of style attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSnapshot {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub faint: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub blink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverse: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
}

impl StyleSnapshot {
    fn is_plain(&self) -> bool {
        *self == StyleSnapshot::default()
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub row: usize,
    pub col: usize,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pending_wrap: bool,
}

/// Retention state of one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub id: u64,
    pub command: String,
    pub exit_code: Option<i32>,
    pub posture: String,
    pub rows: usize,
}

impl From<Color> for ColorSnapshot {
    fn from(color: Color) -> Self {
        match color {
            Color::Default => ColorSnapshot::Default,
            Color::Indexed(index) => ColorSnapshot::Indexed { index },
            Color::Rgb(r, g, b) => ColorSnapshot::Rgb { r, g, b },
        }
    }
}

impl From<CellFlags> for StyleSnapshot {
    fn from(flags: CellFlags) -> Self {
        StyleSnapshot {
            bold: flags.contains(CellFlags::BOLD),
            faint: flags.contains(CellFlags::FAINT),
            italic: flags.contains(CellFlags::ITALIC),
            underline: flags.contains(CellFlags::UNDERLINE),
            blink: flags.contains(CellFlags::BLINK),
            inverse: flags.contains(CellFlags::INVERSE),
            hidden: flags.contains(CellFlags::HIDDEN),
            strikethrough: flags.contains(CellFlags::STRIKETHROUGH),
        }
    }
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        let width = if cell.is_wide_continuation() {
            0
        } else if cell.is_wide() {
            2
        } else {
            1
        };
        CellSnapshot {
            ch: cell.ch,
            fg: cell.fg.into(),
            bg: cell.bg.into(),
            style: cell.flags.into(),
            width,
        }
    }
}

impl Snapshot {
    /// Capture the visible screen. Retention details are supplied by the
    /// owner of the history.
    pub fn capture(
        screen: &Screen,
        title: &str,
        history_lines: usize,
        frames: Vec<FrameSnapshot>,
    ) -> Self {
        let grid = screen.grid();
        let (scroll_top, scroll_bottom) = screen.scroll_region();
        let cursor = screen.cursor();
        Snapshot {
            rows: screen.rows(),
            cols: screen.cols(),
            lines: grid.iter().map(|row| row.text()).collect(),
            grid: grid
                .iter()
                .map(|row| row.cells().iter().map(CellSnapshot::from).collect())
                .collect(),
            cursor: CursorSnapshot {
                row: cursor.row,
                col: cursor.col,
                visible: screen.modes().cursor_visible,
                pending_wrap: cursor.pending_wrap,
            },
            scroll_top,
            scroll_bottom,
            modes: *screen.modes(),
            title: title.to_string(),
            alternate_screen: screen.is_alternate(),
            history_lines,
            frames,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Plain text of the viewport with trailing empty rows removed
    pub fn to_text(&self) -> String {
        let last = self
            .lines
            .iter()
            .rposition(|l| !l.is_empty())
            .map(|i| i + 1)
            .unwrap_or(0);
        let mut text = self.lines[..last].join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_capture() {
        let mut screen = Screen::new(3, 10);
        screen.print_str("Hi");
        let snapshot = Snapshot::capture(&screen, "t", 0, Vec::new());
        assert_eq!(snapshot.cols, 10);
        assert_eq!(snapshot.rows, 3);
        assert_eq!(snapshot.grid[0][0].ch, 'H');
        assert_eq!(snapshot.lines[0], "Hi");
        assert_eq!((snapshot.cursor.row, snapshot.cursor.col), (0, 2));
        assert_eq!(snapshot.to_text(), "Hi\n");
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let mut screen = Screen::new(2, 5);
        screen.pen_mut().flags = CellFlags::BOLD;
        screen.pen_mut().fg = Color::Rgb(255, 128, 0);
        screen.print('中');
        let snapshot = Snapshot::capture(&screen, "", 3, Vec::new());
        let json = snapshot.to_json().unwrap();
        let restored = Snapshot::from_json(&json).unwrap();
        assert_eq!(snapshot, restored);
        assert_eq!(restored.grid[0][0].width, 2);
        assert_eq!(restored.grid[0][1].width, 0);
        assert!(restored.grid[0][0].style.bold);
    }

    #[test]
    fn test_color_snapshot() {
        assert_eq!(ColorSnapshot::from(Color::Default), ColorSnapshot::Default);
        assert_eq!(
            ColorSnapshot::from(Color::Indexed(5)),
            ColorSnapshot::Indexed { index: 5 }
        );
    }
}

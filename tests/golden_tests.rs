//! Golden tests for the emulator
//!
//! Each test feeds a byte sequence and compares the resulting snapshot with
//! the expected screen state. Every input is also replayed in small chunks
//! to check that chunk boundaries never change the outcome.

use termframe::core::{ColorSnapshot, Snapshot};
use termframe::{EngineConfig, Emulator};

fn run_golden(input: &[u8], rows: usize, cols: usize) -> Snapshot {
    let mut emu = Emulator::with_cookie(EngineConfig::with_size(rows, cols), "abc123").unwrap();
    emu.feed(input);
    let snapshot = emu.snapshot();

    for chunk_size in [1, 3, 7] {
        let mut chunked =
            Emulator::with_cookie(EngineConfig::with_size(rows, cols), "abc123").unwrap();
        for chunk in input.chunks(chunk_size) {
            chunked.feed(chunk);
        }
        assert_eq!(
            chunked.snapshot(),
            snapshot,
            "chunk size {} changed the result",
            chunk_size
        );
    }
    snapshot
}

// ============================================================================
// Printing
// ============================================================================

#[test]
fn test_simple_text() {
    let snapshot = run_golden(b"Hello, World!", 24, 80);
    assert_eq!((snapshot.cursor.row, snapshot.cursor.col), (0, 13));
    assert_eq!(snapshot.lines[0], "Hello, World!");
}

#[test]
fn test_multiline_text() {
    let snapshot = run_golden(b"Line 1\r\nLine 2\r\nLine 3", 24, 80);
    assert_eq!(&snapshot.lines[..3], &["Line 1", "Line 2", "Line 3"]);
}

#[test]
fn test_bare_linefeed_keeps_column() {
    let snapshot = run_golden(b"ab\ncd", 3, 10);
    assert_eq!(snapshot.lines[1], "  cd");
}

#[test]
fn test_line_wrapping() {
    let snapshot = run_golden("A".repeat(85).as_bytes(), 24, 80);
    assert_eq!(snapshot.lines[0].len(), 80);
    assert_eq!(snapshot.lines[1].len(), 5);
}

#[test]
fn test_utf8_and_wide_text() {
    let snapshot = run_golden("héllo 世界".as_bytes(), 3, 20);
    assert_eq!(snapshot.lines[0], "héllo 世界");
    assert_eq!(snapshot.grid[0][6].width, 2);
    assert_eq!(snapshot.grid[0][7].width, 0);
    assert_eq!(snapshot.cursor.col, 10);
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let snapshot = run_golden(b"a\xffb", 2, 10);
    assert_eq!(snapshot.lines[0], "a\u{fffd}b");
}

// ============================================================================
// Colors and attributes
// ============================================================================

#[test]
fn test_basic_colors() {
    let snapshot = run_golden(b"\x1b[31mRed\x1b[0m \x1b[1;32mGreen\x1b[0m", 2, 20);
    assert_eq!(snapshot.lines[0], "Red Green");
    assert_eq!(snapshot.grid[0][0].fg, ColorSnapshot::Indexed { index: 1 });
    assert_eq!(snapshot.grid[0][3].fg, ColorSnapshot::Default);
    assert!(snapshot.grid[0][4].style.bold);
}

#[test]
fn test_256_and_truecolor() {
    let snapshot = run_golden(
        b"\x1b[38;5;196mA\x1b[0m\x1b[38;2;0;255;0mB\x1b[48:2::1:2:3mC",
        2,
        20,
    );
    assert_eq!(snapshot.grid[0][0].fg, ColorSnapshot::Indexed { index: 196 });
    assert_eq!(
        snapshot.grid[0][1].fg,
        ColorSnapshot::Rgb { r: 0, g: 255, b: 0 }
    );
    assert_eq!(snapshot.grid[0][2].bg, ColorSnapshot::Rgb { r: 1, g: 2, b: 3 });
}

// ============================================================================
// Cursor movement and editing
// ============================================================================

#[test]
fn test_cursor_movement() {
    let snapshot = run_golden(
        b"Hello\x1b[3CWorld\x1b[2DXX\x1b[H\x1b[2J\x1b[5;10HPositioned",
        24,
        80,
    );
    assert_eq!(snapshot.lines[0], "");
    assert_eq!(snapshot.lines[4], "         Positioned");
    assert_eq!((snapshot.cursor.row, snapshot.cursor.col), (4, 19));
}

#[test]
fn test_erase_to_end_of_line() {
    let snapshot = run_golden(b"AAAAAAAAAA\x1b[5G\x1b[K", 2, 20);
    assert_eq!(snapshot.lines[0], "AAAA");
}

#[test]
fn test_insert_and_delete_chars() {
    let snapshot = run_golden(b"ABCDE\x1b[3G\x1b[2@XX\r\nABCDE\x1b[2G\x1b[2P", 3, 20);
    assert_eq!(snapshot.lines[0], "ABXXCDE");
    assert_eq!(snapshot.lines[1], "ADE");
}

#[test]
fn test_insert_and_delete_lines() {
    let snapshot = run_golden(b"Line1\r\nLine2\r\nLine3\x1b[2;1H\x1b[L", 4, 20);
    assert_eq!(&snapshot.lines[..4], &["Line1", "", "Line2", "Line3"]);

    let snapshot = run_golden(b"Line1\r\nLine2\r\nLine3\x1b[2;1H\x1b[M", 4, 20);
    assert_eq!(&snapshot.lines[..3], &["Line1", "Line3", ""]);
    assert_eq!(snapshot.history_lines, 0);
}

#[test]
fn test_save_restore_cursor() {
    let snapshot = run_golden(b"\x1b[5;10HMARK\x1b7\x1b[1;1HOTHER\x1b8RESTORED", 24, 80);
    assert!(snapshot.lines[4].ends_with("MARKRESTORED"));
    assert_eq!(snapshot.lines[0], "OTHER");
}

#[test]
fn test_tabs() {
    let snapshot = run_golden(b"a\tb\tc\x1b[3g\r\td", 2, 20);
    // No stops left, so the tab goes to the last column
    assert_eq!(snapshot.lines[0], "a       b       c  d");
}

// ============================================================================
// Scrolling and buffers
// ============================================================================

#[test]
fn test_scroll_region() {
    let snapshot = run_golden(
        b"top\x1b[2;4r\x1b[4;1H1\r\n2\r\n3\r\n4\x1b[r",
        5,
        10,
    );
    assert_eq!(&snapshot.lines[..4], &["top", "2", "3", "4"]);
    assert_eq!(snapshot.history_lines, 0);
}

#[test]
fn test_scrolling_feeds_history() {
    let snapshot = run_golden(b"1\r\n2\r\n3\r\n4\r\n5", 3, 10);
    assert_eq!(&snapshot.lines, &["3", "4", "5"]);
    assert_eq!(snapshot.history_lines, 2);
}

#[test]
fn test_alternate_screen() {
    let snapshot = run_golden(b"MainScreen\x1b[?1049hAltScreen", 3, 20);
    assert!(snapshot.alternate_screen);
    assert_eq!(snapshot.lines[0], "AltScreen");

    let snapshot = run_golden(b"MainScreen\x1b[?1049hAltScreen\x1b[?1049l", 3, 20);
    assert!(!snapshot.alternate_screen);
    assert_eq!(snapshot.lines[0], "MainScreen");
    assert_eq!(snapshot.cursor.col, 10);
}

#[test]
fn test_title_and_hyperlink() {
    let snapshot = run_golden(
        b"\x1b]0;my title\x07\x1b]8;;https://example.com\x1b\\link\x1b]8;;\x1b\\",
        2,
        20,
    );
    assert_eq!(snapshot.title, "my title");
    assert_eq!(snapshot.lines[0], "link");
}

#[test]
fn test_shell_integration_frame() {
    let snapshot = run_golden(
        b"$ \x1b]abc123;2;bash; 3  echo hi\x07hi\r\n\x1b]abc123;3;0\x07$ ",
        4,
        20,
    );
    assert_eq!(snapshot.frames.len(), 1);
    assert_eq!(snapshot.frames[0].command, "echo hi");
    assert_eq!(snapshot.frames[0].rows, 1);
    assert_eq!(&snapshot.lines[..3], &["$ hi", "$", ""]);
}

#[test]
fn test_snapshot_json_is_stable() {
    let snapshot = run_golden(b"\x1b[7mX\x1b[0m", 1, 4);
    let json = snapshot.to_json().unwrap();
    assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
    assert!(json.contains("\"inverse\": true"));
}

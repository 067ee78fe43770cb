//! End-to-end tests for the emulator: byte streams in, screen state,
//! history, frames and events out.

use std::cell::RefCell;
use std::rc::Rc;

use termframe::appmode::AppModeEvent;
use termframe::core::CellFlags;
use termframe::emulator::FrameEvent;
use termframe::{EngineConfig, Emulator, Posture};

fn emulator(rows: usize, cols: usize) -> Emulator {
    Emulator::with_cookie(EngineConfig::with_size(rows, cols), "abc123").unwrap()
}

fn collect<T: Clone + 'static>(
    channel: &termframe::emulator::Channel<T>,
) -> Rc<RefCell<Vec<T>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    channel
        .subscribe(move |v: &T| sink.borrow_mut().push(v.clone()))
        .forget();
    seen
}

// ============================================================================
// Shell integration scenarios
// ============================================================================

#[test]
fn test_foreign_cookie_is_ignored() {
    let mut emu = emulator(5, 20);
    let events = collect(emu.events().app_mode());
    emu.feed(b"\x1b]zzz999;2;ls -la\x07hello");
    assert!(events.borrow().is_empty());
    assert_eq!(emu.frames().count(), 0);
    assert_eq!(emu.screen().row_text(0), "hello");
}

#[test]
fn test_bracketed_command_creates_frame() {
    let mut emu = emulator(24, 80);
    let app_events = collect(emu.events().app_mode());
    let frame_events = collect(emu.events().frame());

    emu.feed(b"\x1b]abc123;2;ls -la\x07");
    for i in 0..5 {
        emu.feed(format!("file{}\r\n", i).as_bytes());
    }
    emu.feed(b"\x1b]abc123;3;0\x07");

    let frames: Vec<_> = emu.frames().cloned().collect();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.command, "ls -la");
    assert_eq!(frame.exit_code, Some(0));
    assert_eq!(frame.posture, Posture::Success);
    assert_eq!(emu.frame_rows(frame.id), 5);
    assert_eq!(
        emu.frame_text(frame.id).unwrap(),
        "file0\nfile1\nfile2\nfile3\nfile4"
    );

    assert_eq!(
        *app_events.borrow(),
        vec![
            AppModeEvent::BracketStart {
                shell: None,
                command: "ls -la".into()
            },
            AppModeEvent::BracketEnd { exit_code: 0 },
        ]
    );
    assert_eq!(frame_events.borrow().len(), 2);
    assert!(matches!(
        frame_events.borrow()[1],
        FrameEvent::Finished {
            exit_code: Some(0),
            posture: Posture::Success,
            ..
        }
    ));
}

#[test]
fn test_sequence_split_across_feeds() {
    let mut emu = emulator(10, 40);
    let stream = b"\x1b]abc123;2;bash; 17  make\x07building\r\n\x1b]abc123;3;2\x1b\\";
    for byte in stream.iter() {
        emu.feed(std::slice::from_ref(byte));
    }
    let frame = emu.frames().next().cloned().unwrap();
    assert_eq!(frame.command, "make");
    assert_eq!(frame.exit_code, Some(2));
    assert_eq!(frame.posture, Posture::Failure);
    assert_eq!(emu.frame_text(frame.id).unwrap(), "building");
}

#[test]
fn test_frame_open_moves_prompt_history() {
    let mut emu = emulator(5, 20);
    emu.feed(b"earlier\r\n$ ls\r\n");
    emu.feed(b"\x1b]abc123;2;ls\x07");
    // Rows above the cursor went to plain history
    assert_eq!(emu.history_len(), 2);
    assert_eq!(emu.history_text(), "earlier\n$ ls");
    assert_eq!(emu.screen().cursor().row, 0);
}

#[test]
fn test_unparsable_exit_code_uses_default() {
    let mut emu = emulator(5, 20);
    emu.feed(b"\x1b]abc123;2;true\x07\x1b]abc123;3;???\x07");
    let frame = emu.frames().next().unwrap();
    assert_eq!(frame.exit_code, Some(termframe::appmode::DEFAULT_EXIT_CODE));
}

#[test]
fn test_new_command_interrupts_running_frame() {
    let mut emu = emulator(10, 20);
    emu.feed(b"\x1b]abc123;2;sleep 100\x07z\r\n");
    emu.feed(b"\x1b]abc123;2;echo hi\x07hi\r\n\x1b]abc123;3;0\x07");
    let frames: Vec<_> = emu.frames().cloned().collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].command, "sleep 100");
    assert_eq!(frames[0].posture, Posture::Failure);
    assert_eq!(frames[0].exit_code, None);
    assert_eq!(frames[1].posture, Posture::Success);
}

#[test]
fn test_request_frame_writes_reply() {
    let mut emu = emulator(5, 20);
    let writes = collect(emu.events().pty_write());
    emu.feed(b"\x1b]abc123;4;no-such-frame\x07");
    assert_eq!(*writes.borrow(), vec![b"#error\n".to_vec()]);
    assert_eq!(emu.screen().row_text(0), "");
}

// ============================================================================
// Retention scenarios
// ============================================================================

#[test]
fn test_scrollback_cap_keeps_most_recent_lines() {
    let mut config = EngineConfig::with_size(24, 80);
    config.scrollback_max_lines = 50;
    let mut emu = Emulator::with_cookie(config, "abc123").unwrap();
    for i in 0..200 {
        emu.feed(format!("line {}\r\n", i).as_bytes());
    }
    emu.run_maintenance();

    assert_eq!(emu.history_len(), 50);
    let expected: Vec<String> = (127..177).map(|i| format!("line {}", i)).collect();
    assert_eq!(emu.history_text(), expected.join("\n"));
    assert_eq!(emu.screen().row_text(0), "line 177");
}

#[test]
fn test_history_bounded_without_maintenance() {
    let mut config = EngineConfig::with_size(5, 20);
    config.scrollback_max_lines = 10;
    let mut emu = Emulator::with_cookie(config, "abc123").unwrap();
    for i in 0..1000 {
        emu.feed(format!("{}\r\n", i).as_bytes());
    }
    assert!(emu.history_len() <= 20);
}

#[test]
fn test_unterminated_output_row_goes_to_next_frame() {
    let mut emu = emulator(5, 30);
    emu.feed(b"\x1b]abc123;2;printf abc\x07abc\x1b]abc123;3;0\x07$ ");
    emu.feed(b"\x1b]abc123;2;echo x\x07x\r\n\x1b]abc123;3;0\x07");

    let frames: Vec<_> = emu.frames().cloned().collect();
    assert_eq!(frames.len(), 2);
    assert!(frames[0].end.unwrap() <= frames[1].start);
    assert_eq!(emu.frame_rows(frames[0].id), 0);
    assert_eq!(emu.frame_text(frames[1].id).unwrap(), "abc$ x");

    // The shared row stays with the later frame once it is in history
    emu.feed(b"\r\n\r\n\r\n\r\n\r\n");
    assert!(emu.history_len() > 0);
    assert_eq!(emu.frame_rows(frames[1].id), 1);
    assert_eq!(emu.frame_text(frames[1].id).unwrap(), "abc$ x");
}

#[test]
fn test_erase_saved_lines_drops_frames_on_next_pass() {
    let mut emu = emulator(3, 20);
    emu.feed(b"\x1b]abc123;2;seq 5\x07");
    emu.feed(b"1\r\n2\r\n3\r\n4\r\n5\r\n\x1b]abc123;3;0\x07");
    emu.feed(b"\x1b]abc123;2;clear\x07\x1b[3J");
    emu.run_maintenance();
    let commands: Vec<String> = emu.frames().map(|f| f.command.clone()).collect();
    assert_eq!(commands, vec!["clear"]);
}

// ============================================================================
// Screen model
// ============================================================================

#[test]
fn test_wide_character_pair() {
    let mut emu = emulator(3, 10);
    emu.feed("ab中".as_bytes());
    let grid = emu.screen().grid();
    assert!(grid.cell(0, 2).unwrap().is_wide());
    assert!(grid.cell(0, 3).unwrap().is_wide_continuation());
    assert_eq!(emu.screen().cursor().col, 4);

    emu.feed(b"\x1b[1;3Hx");
    let grid = emu.screen().grid();
    assert_eq!(grid.cell(0, 2).unwrap().ch, 'x');
    assert!(!grid.cell(0, 3).unwrap().is_wide_continuation());
}

#[test]
fn test_wide_character_wraps_at_margin() {
    let mut emu = emulator(3, 5);
    emu.feed("abcd中".as_bytes());
    assert_eq!(emu.screen().row_text(0), "abcd");
    assert_eq!(emu.screen().row_text(1), "中");
}

#[test]
fn test_resize_truncates_and_clamps() {
    let mut emu = emulator(5, 10);
    emu.feed(b"0123456789\x1b[5;10H");
    emu.resize(3, 4).unwrap();
    assert_eq!(emu.screen().row_text(0), "0123");
    assert_eq!((emu.screen().cursor().row, emu.screen().cursor().col), (2, 3));
    assert!(emu.resize(3, 0).is_err());
    assert_eq!((emu.rows(), emu.cols()), (3, 4));
}

#[test]
fn test_hyperlink_registry_stays_bounded() {
    let mut config = EngineConfig::with_size(4, 30);
    config.scrollback_max_lines = 10;
    let mut emu = Emulator::with_cookie(config, "abc123").unwrap();
    for i in 0..500 {
        emu.feed(format!("\x1b]8;;https://example.com/{i}\x07link\x1b]8;;\x07\r\n").as_bytes());
    }
    emu.run_maintenance();
    assert_eq!(emu.history_len(), 10);
    assert!(emu.screen().hyperlink_count() <= 10 + emu.rows());
    let id = emu.screen().grid().cell(2, 0).unwrap().hyperlink;
    assert_eq!(emu.screen().hyperlink(id), Some("https://example.com/499"));
}

#[test]
fn test_alternate_screen_does_not_feed_history() {
    let mut emu = emulator(3, 10);
    emu.feed(b"keep\x1b[?1049h");
    for _ in 0..10 {
        emu.feed(b"x\r\n");
    }
    assert_eq!(emu.history_len(), 0);
    emu.feed(b"\x1b[?1049l");
    assert_eq!(emu.screen().row_text(0), "keep");
}

#[test]
fn test_snapshot_reports_frames() {
    let mut emu = emulator(5, 20);
    emu.feed(b"\x1b]abc123;2;pwd\x07/home\r\n\x1b]abc123;3;0\x07\x1b]2;shell\x07");
    let snapshot = emu.snapshot();
    assert_eq!(snapshot.title, "shell");
    assert_eq!(snapshot.frames.len(), 1);
    assert_eq!(snapshot.frames[0].command, "pwd");
    assert_eq!(snapshot.frames[0].posture, "success");
    assert_eq!(snapshot.frames[0].rows, 1);
    assert!(snapshot.to_json().unwrap().contains("\"pwd\""));
}

#[test]
fn test_view_cursor_flag() {
    let mut emu = emulator(2, 4);
    emu.feed(b"a");
    let cells: Vec<_> = emu.view().row(0).collect();
    assert_eq!(cells.len(), 4);
    assert!(cells[1].flags.contains(CellFlags::CURSOR));
}

// ============================================================================
// Batching and re-entrancy
// ============================================================================

#[test]
fn test_reentrant_input_is_queued() {
    let mut emu = emulator(3, 20);
    let log = Rc::new(RefCell::new(Vec::<String>::new()));
    let input = emu.input_handle();

    let l = log.clone();
    let _title = emu.events().title_changed().subscribe(move |title| {
        l.borrow_mut().push(format!("title:{}", title));
        input.write(b"B");
    });
    let l = log.clone();
    let _change = emu
        .events()
        .screen_changed()
        .subscribe(move |c| l.borrow_mut().push(format!("change:{}-{}", c.start_row, c.end_row)));
    let l = log.clone();
    let _render = emu
        .events()
        .render()
        .subscribe(move |r| l.borrow_mut().push(format!("render:{}", r.seq)));
    let sizes = collect(emu.events().write_buffer_size());

    emu.feed(b"\x1b]2;t\x07A");

    assert_eq!(emu.screen().row_text(0), "AB");
    assert_eq!(
        *log.borrow(),
        vec!["title:t", "change:0-2", "render:1", "change:0-0", "render:2"]
    );
    assert_eq!(*sizes.borrow(), vec![1, 0]);
}

#[test]
fn test_disposed_subscription_stops_events() {
    let mut emu = emulator(3, 20);
    let count = Rc::new(RefCell::new(0));
    let c = count.clone();
    let sub = emu.events().render().subscribe(move |_| *c.borrow_mut() += 1);
    emu.feed(b"x");
    sub.dispose();
    emu.feed(b"y");
    assert_eq!(*count.borrow(), 1);
}

//! Token dispatch
//!
//! `Terminal` owns everything a token can change: the screen, history,
//! frames and the application-mode session. Effects that leave the engine
//! (pty replies, title changes, protocol and frame events) are queued as
//! notices and flushed by the emulator once the batch is done.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::appmode::{AppModeEvent, ApplicationModeSession};
use crate::core::{CellFlags, Charset, Color, EraseMode, FrameSnapshot, Row, Screen, Snapshot};
use crate::parser::{CsiToken, Params, Token};
use crate::retention::{OpenDecision, RetentionPolicy};
use crate::scrollback::{Frame, FrameArena, FrameId, Owner, ScrollbackStore};

use super::events::FrameEvent;

/// DA1: VT220 with ANSI color
const PRIMARY_DEVICE_ATTRIBUTES: &[u8] = b"\x1b[?62;22c";
/// DA2: VT220, firmware 10
const SECONDARY_DEVICE_ATTRIBUTES: &[u8] = b"\x1b[>1;10;0c";
/// DSR 5: terminal OK
const STATUS_OK: &[u8] = b"\x1b[0n";

/// Side effect waiting for the end of the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notice {
    PtyWrite(Vec<u8>),
    Title(String),
    AppMode(AppModeEvent),
    Frame(FrameEvent),
}

/// A command whose frame decision waits for BRACKET_END
#[derive(Debug, Clone)]
struct PendingFrame {
    command: String,
    start: u64,
    threshold: usize,
}

#[derive(Debug)]
pub(crate) struct Terminal {
    pub(crate) screen: Screen,
    pub(crate) history: ScrollbackStore,
    pub(crate) frames: FrameArena,
    pub(crate) policy: RetentionPolicy,
    pub(crate) session: ApplicationModeSession,
    pub(crate) title: String,
    pub(crate) answerback: String,
    /// Absolute position of viewport row 0
    viewport_start: u64,
    pending: Option<PendingFrame>,
    outbox: Vec<Notice>,
}

impl Terminal {
    pub(crate) fn new(
        rows: usize,
        cols: usize,
        policy: RetentionPolicy,
        session: ApplicationModeSession,
        answerback: String,
    ) -> Self {
        Self {
            screen: Screen::new(rows, cols),
            history: ScrollbackStore::new(),
            frames: FrameArena::new(),
            policy,
            session,
            title: String::new(),
            answerback,
            viewport_start: 0,
            pending: None,
            outbox: Vec::new(),
        }
    }

    pub(crate) fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.outbox.push(notice);
    }

    pub(crate) fn viewport_start(&self) -> u64 {
        self.viewport_start
    }

    /// Apply one token
    pub(crate) fn dispatch(&mut self, token: Token) {
        match token {
            Token::Print(text) => self.screen.print_str(&text),
            Token::Execute(byte) => self.execute_c0(byte),
            Token::Esc {
                intermediates,
                final_byte,
            } => self.execute_esc(&intermediates, final_byte),
            Token::Csi(csi) => self.execute_csi(&csi),
            Token::Osc { params } => self.execute_osc(&params),
            Token::OscStart { params } => {
                if let Some(event) = self.session.start(&params) {
                    self.app_event(event);
                }
            }
            Token::OscPut(chunk) => {
                if let Some(event) = self.session.put(&chunk) {
                    self.app_event(event);
                }
            }
            Token::OscEnd => self.finish_app_sequence(),
            Token::OscAbort => {
                if let Some(event) = self.session.abort() {
                    self.app_event(event);
                }
            }
            Token::Dcs { final_byte, .. } => {
                debug!(final_byte = %(final_byte as char), "DCS sequence ignored");
            }
        }
        if self.screen.has_evicted() {
            self.drain_evicted();
        }
    }

    /// Move rows that left the primary viewport into history, tagging each
    /// with the frame whose range covers it
    fn drain_evicted(&mut self) {
        for row in self.screen.take_evicted() {
            let abs = self.viewport_start;
            let owner = self.frames.owner_of(abs).map_or(Owner::Plain, Owner::Frame);
            self.history.push(abs, row, owner);
            self.viewport_start += 1;
        }
        // Hard ceiling so memory stays bounded between maintenance passes
        let max_lines = self.policy.max_lines();
        if self.history.len() > max_lines.saturating_mul(2).max(1) {
            self.history.trim_oldest(self.history.len() - max_lines);
        }
    }

    fn cursor_abs(&self) -> u64 {
        self.viewport_start + self.screen.cursor().row as u64
    }

    /// One past the last row of command output. The cursor row counts only
    /// if something was written on it.
    fn output_end(&self) -> u64 {
        let cursor = self.screen.cursor();
        let row = self.cursor_abs();
        if cursor.col == 0 && !cursor.pending_wrap {
            row
        } else {
            row + 1
        }
    }

    /// Execute a C0 control character
    fn execute_c0(&mut self, byte: u8) {
        match byte {
            0x05 => {
                // ENQ - Answerback
                if !self.answerback.is_empty() {
                    let reply = self.answerback.as_bytes().to_vec();
                    self.outbox.push(Notice::PtyWrite(reply));
                }
            }
            0x07 => debug!("bell"),
            0x08 => self.screen.backspace(),
            0x09 => self.screen.tab(1),
            0x0A..=0x0C => {
                // LF, VT, FF
                if self.screen.modes().linefeed_newline {
                    self.screen.carriage_return();
                }
                self.screen.linefeed();
            }
            0x0D => self.screen.carriage_return(),
            0x0E => self.screen.charsets_mut().shift_out(),
            0x0F => self.screen.charsets_mut().shift_in(),
            _ => {}
        }
    }

    fn execute_esc(&mut self, intermediates: &[u8], final_byte: u8) {
        match (intermediates, final_byte) {
            ([], b'7') => self.screen.save_cursor(),
            ([], b'8') => self.screen.restore_cursor(),
            // IND
            ([], b'D') => self.screen.linefeed(),
            // NEL
            ([], b'E') => {
                self.screen.carriage_return();
                self.screen.linefeed();
            }
            // RI
            ([], b'M') => self.screen.reverse_index(),
            // HTS
            ([], b'H') => self.screen.set_tab_stop(),
            ([], b'c') => self.full_reset(),
            ([], b'=') => self.screen.modes_mut().keypad_application = true,
            ([], b'>') => self.screen.modes_mut().keypad_application = false,
            ([], b'N') => self.screen.charsets_mut().single_shift(2),
            ([], b'O') => self.screen.charsets_mut().single_shift(3),
            // ST closing a string we already handled
            ([], b'\\') => {}
            ([b'#'], b'8') => self.screen.alignment_test(),
            ([designator @ (b'(' | b')' | b'*' | b'+')], _) => {
                let slot = match *designator {
                    b'(' => 0,
                    b')' => 1,
                    b'*' => 2,
                    _ => 3,
                };
                match Charset::from_designator(final_byte) {
                    Some(charset) => self.screen.designate_charset(slot, charset),
                    None => debug!(slot, final_byte, "unsupported charset"),
                }
            }
            _ => debug!(?intermediates, final_byte = %(final_byte as char), "unhandled ESC"),
        }
    }

    /// RIS
    fn full_reset(&mut self) {
        self.screen.reset();
        self.pending = None;
        if !self.title.is_empty() {
            self.title.clear();
            self.outbox.push(Notice::Title(String::new()));
        }
    }

    fn execute_csi(&mut self, csi: &CsiToken) {
        match csi.marker {
            0 => {}
            b'?' => {
                self.execute_csi_private(csi);
                return;
            }
            b'>' if csi.final_byte == b'c' && csi.params.raw(0) == 0 => {
                // DA2 - Secondary Device Attributes
                self.outbox
                    .push(Notice::PtyWrite(SECONDARY_DEVICE_ATTRIBUTES.to_vec()));
                return;
            }
            marker => {
                debug!(marker = %(marker as char), final_byte = %(csi.final_byte as char), "unhandled CSI");
                return;
            }
        }

        if !csi.intermediates.is_empty() {
            match (csi.intermediates.as_slice(), csi.final_byte) {
                // DECSTR - Soft Terminal Reset
                (b"!", b'p') => self.screen.soft_reset(),
                _ => debug!(
                    intermediates = ?csi.intermediates,
                    final_byte = %(csi.final_byte as char),
                    "unhandled CSI"
                ),
            }
            return;
        }

        let count = csi.param(0, 1) as usize;
        match csi.final_byte {
            // Cursor movement
            b'A' => self.screen.move_up(count),
            // CUD, VPR
            b'B' | b'e' => self.screen.move_down(count),
            // CUF, HPR
            b'C' | b'a' => self.screen.move_right(count),
            b'D' => self.screen.move_left(count),
            b'E' => {
                // CNL - Cursor Next Line
                self.screen.move_down(count);
                self.screen.carriage_return();
            }
            b'F' => {
                // CPL - Cursor Previous Line
                self.screen.move_up(count);
                self.screen.carriage_return();
            }
            // CHA, HPA
            b'G' | b'`' => self.screen.set_col(count - 1),
            b'H' | b'f' => {
                // CUP, HVP
                let row = csi.param(0, 1) as usize - 1;
                let col = csi.param(1, 1) as usize - 1;
                self.screen.set_cursor(row, col);
            }
            // VPA
            b'd' => self.screen.set_row(count - 1),
            // CHT, CBT
            b'I' => self.screen.tab(count),
            b'Z' => self.screen.back_tab(count),

            // Erase operations
            b'J' => match csi.params.raw(0) {
                3 => {
                    // ED 3 - Erase Saved Lines
                    let removed = self.history.len();
                    self.history.clear();
                    debug!(removed, "scrollback erased");
                }
                mode => {
                    if let Some(mode) = EraseMode::from_param(mode) {
                        self.screen.erase_display(mode);
                    }
                }
            },
            b'K' => {
                if let Some(mode) = EraseMode::from_param(csi.params.raw(0)) {
                    self.screen.erase_line(mode);
                }
            }
            b'X' => self.screen.erase_chars(count),

            // Insert/Delete
            b'L' => self.screen.insert_lines(count),
            b'M' => self.screen.delete_lines(count),
            b'@' => self.screen.insert_chars(count),
            b'P' => self.screen.delete_chars(count),

            // Scroll
            b'S' => self.screen.scroll_up(count),
            b'T' => self.screen.scroll_down(count),

            b'r' => {
                // DECSTBM - Set Top and Bottom Margins
                let top = csi.param(0, 1) as usize - 1;
                let bottom = csi
                    .params
                    .get(1)
                    .map_or(self.screen.rows(), |b| b as usize)
                    .saturating_sub(1);
                self.screen.set_scroll_region(top, bottom);
            }

            b'm' => self.select_graphic_rendition(&csi.params),

            // TBC - Tab Clear
            b'g' => self.screen.clear_tab_stop(csi.params.raw(0)),

            // REP - Repeat preceding character
            b'b' => self.screen.repeat_last(count),

            // SCP / RCP
            b's' if csi.params.is_empty() => self.screen.save_cursor(),
            b'u' if csi.params.is_empty() => self.screen.restore_cursor(),

            b'h' | b'l' => {
                // SM / RM
                let on = csi.final_byte == b'h';
                for mode in csi.params.iter() {
                    if !self.screen.modes_mut().set_ansi_mode(mode, on) {
                        debug!(mode, on, "unsupported ANSI mode");
                    }
                }
            }

            b'n' => match csi.params.raw(0) {
                // DSR - Device Status Report
                5 => self.outbox.push(Notice::PtyWrite(STATUS_OK.to_vec())),
                6 => {
                    let (row, col) = self.screen.report_position();
                    let reply = format!("\x1b[{};{}R", row, col).into_bytes();
                    self.outbox.push(Notice::PtyWrite(reply));
                }
                other => debug!(request = other, "unsupported DSR"),
            },

            // DA1 - Primary Device Attributes
            b'c' if csi.params.raw(0) == 0 => self
                .outbox
                .push(Notice::PtyWrite(PRIMARY_DEVICE_ATTRIBUTES.to_vec())),

            _ => {
                debug!(
                    params = ?csi.params,
                    final_byte = %(csi.final_byte as char),
                    "unhandled CSI"
                );
            }
        }
    }

    /// Execute a private CSI sequence (starts with ?)
    fn execute_csi_private(&mut self, csi: &CsiToken) {
        match csi.final_byte {
            b'h' | b'l' => {
                let on = csi.final_byte == b'h';
                for mode in csi.params.iter() {
                    if !self.screen.set_dec_mode(mode, on) {
                        debug!(mode, on, "unsupported DEC private mode");
                    }
                }
            }
            _ => {
                debug!(
                    params = ?csi.params,
                    final_byte = %(csi.final_byte as char),
                    "unhandled private CSI"
                );
            }
        }
    }

    /// SGR - Select Graphic Rendition
    fn select_graphic_rendition(&mut self, params: &Params) {
        if params.is_empty() {
            self.reset_pen();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let pen = self.screen.pen_mut();
            match params.raw(i) {
                0 => self.reset_pen(),
                1 => pen.flags |= CellFlags::BOLD,
                2 => pen.flags |= CellFlags::FAINT,
                3 => pen.flags |= CellFlags::ITALIC,
                4 => {
                    // 4:0 turns underline off, other styles map to plain underline
                    if params.subparams(i).first() == Some(&0) {
                        pen.flags.remove(CellFlags::UNDERLINE);
                    } else {
                        pen.flags |= CellFlags::UNDERLINE;
                    }
                }
                5 | 6 => pen.flags |= CellFlags::BLINK,
                7 => pen.flags |= CellFlags::INVERSE,
                8 => pen.flags |= CellFlags::HIDDEN,
                9 => pen.flags |= CellFlags::STRIKETHROUGH,
                21 => pen.flags |= CellFlags::UNDERLINE,
                22 => pen.flags.remove(CellFlags::BOLD | CellFlags::FAINT),
                23 => pen.flags.remove(CellFlags::ITALIC),
                24 => pen.flags.remove(CellFlags::UNDERLINE),
                25 => pen.flags.remove(CellFlags::BLINK),
                27 => pen.flags.remove(CellFlags::INVERSE),
                28 => pen.flags.remove(CellFlags::HIDDEN),
                29 => pen.flags.remove(CellFlags::STRIKETHROUGH),
                p @ 30..=37 => pen.fg = Color::Indexed((p - 30) as u8),
                38 => {
                    if let Some(color) = extended_color(params, &mut i) {
                        self.screen.pen_mut().fg = color;
                    }
                }
                39 => pen.fg = Color::Default,
                p @ 40..=47 => pen.bg = Color::Indexed((p - 40) as u8),
                48 => {
                    if let Some(color) = extended_color(params, &mut i) {
                        self.screen.pen_mut().bg = color;
                    }
                }
                49 => pen.bg = Color::Default,
                p @ 90..=97 => pen.fg = Color::Indexed((p - 90 + 8) as u8),
                p @ 100..=107 => pen.bg = Color::Indexed((p - 100 + 8) as u8),
                p => debug!(param = p, "unsupported SGR"),
            }
            i += 1;
        }
    }

    /// SGR 0 keeps any open hyperlink
    fn reset_pen(&mut self) {
        let pen = self.screen.pen_mut();
        let hyperlink = pen.hyperlink;
        pen.reset();
        pen.hyperlink = hyperlink;
    }

    fn execute_osc(&mut self, params: &[Vec<u8>]) {
        let Some(command) = params.first() else {
            return;
        };
        match command.as_slice() {
            b"0" | b"2" => {
                // Window title; the title itself may contain ';'
                let title = String::from_utf8_lossy(&params[1..].join(&b';')).into_owned();
                if title != self.title {
                    self.title = title.clone();
                    self.outbox.push(Notice::Title(title));
                }
            }
            b"1" => debug!("icon name ignored"),
            b"8" => {
                // OSC 8 ; params ; uri
                let uri = params
                    .get(2..)
                    .map(|rest| String::from_utf8_lossy(&rest.join(&b';')).into_owned())
                    .unwrap_or_default();
                self.screen.set_hyperlink(Some(uri.as_str()).filter(|u| !u.is_empty()));
            }
            cookie if cookie == self.session.cookie().as_bytes() => {
                // A cookie starting with a digit arrives as a complete OSC
                let header = params.get(..2).unwrap_or(params);
                if let Some(event) = self.session.start(header) {
                    self.app_event(event);
                }
                if let Some(rest) = params.get(2..) {
                    if let Some(event) = self.session.put(&rest.join(&b';')) {
                        self.app_event(event);
                    }
                }
                self.finish_app_sequence();
            }
            other => debug!(command = %String::from_utf8_lossy(other), "unhandled OSC"),
        }
    }

    fn finish_app_sequence(&mut self) {
        for event in self.session.end() {
            self.app_event(event);
        }
        if let Some(reply) = self.session.take_reply() {
            self.outbox.push(Notice::PtyWrite(reply));
        }
    }

    fn app_event(&mut self, event: AppModeEvent) {
        self.outbox.push(Notice::AppMode(event.clone()));
        match event {
            AppModeEvent::BracketStart { command, .. } => self.bracket_start(command),
            AppModeEvent::BracketEnd { exit_code } => self.bracket_end(exit_code),
            _ => {}
        }
    }

    fn bracket_start(&mut self, command: String) {
        if let Some(id) = self.frames.running() {
            // The previous command never reported its exit
            let end = self.output_end();
            self.finish_frame(id, end, None);
        }
        self.pending = None;
        self.frames.clip_ends(self.cursor_abs());
        match self.policy.decide_open(&command) {
            OpenDecision::Frame => {
                if self.screen.evict_above_cursor() > 0 {
                    self.drain_evicted();
                }
                let id = self.frames.open(command.clone(), self.cursor_abs());
                info!(frame = %id, %command, "frame opened");
                self.outbox
                    .push(Notice::Frame(FrameEvent::Opened { id, command }));
            }
            OpenDecision::Defer { threshold } => {
                self.pending = Some(PendingFrame {
                    command,
                    start: self.cursor_abs(),
                    threshold,
                });
            }
            OpenDecision::Inline => debug!(%command, "command output left inline"),
        }
    }

    fn bracket_end(&mut self, exit_code: i32) {
        let end = self.output_end();
        if let Some(id) = self.frames.running() {
            self.finish_frame(id, end, Some(exit_code));
        } else if let Some(pending) = self.pending.take() {
            let lines = end.saturating_sub(pending.start);
            if RetentionPolicy::should_materialize(pending.threshold, lines) {
                let id = self.frames.insert_finished(
                    pending.command.clone(),
                    pending.start,
                    end,
                    Some(exit_code),
                );
                let moved = self.history.reassign(pending.start..end, id);
                info!(frame = %id, command = %pending.command, lines, moved, "frame created after the fact");
                self.outbox.push(Notice::Frame(FrameEvent::Opened {
                    id,
                    command: pending.command,
                }));
                self.push_finished(id);
            } else {
                debug!(lines, threshold = pending.threshold, "output below frame threshold");
            }
        } else {
            debug!(exit_code, "command end without a tracked command");
        }
    }

    fn finish_frame(&mut self, id: FrameId, end: u64, exit_code: Option<i32>) {
        if self.frames.finish(id, end, exit_code) {
            info!(frame = %id, ?exit_code, "frame finished");
            self.push_finished(id);
        }
    }

    fn push_finished(&mut self, id: FrameId) {
        if let Some(frame) = self.frames.get(id) {
            let event = FrameEvent::Finished {
                id,
                exit_code: frame.exit_code,
                posture: frame.posture,
            };
            self.outbox.push(Notice::Frame(event));
        }
    }

    /// Enforce the caps and report destroyed frames
    pub(crate) fn enforce_retention(&mut self) {
        let destroyed = self
            .policy
            .enforce(&mut self.history, &mut self.frames, self.viewport_start);
        for id in destroyed {
            self.outbox
                .push(Notice::Frame(FrameEvent::Destroyed { id }));
        }
        self.sweep_hyperlinks();
    }

    /// Forget OSC 8 URIs no longer used by any retained or visible cell
    fn sweep_hyperlinks(&mut self) {
        if self.screen.hyperlink_count() == 0 {
            return;
        }
        let mut live = HashSet::new();
        self.screen.collect_hyperlinks(&mut live);
        for (_, _, row) in self.history.iter() {
            live.extend(row.hyperlink_ids());
        }
        let dropped = self.screen.retain_hyperlinks(&live);
        if dropped > 0 {
            debug!(dropped, "unreferenced hyperlinks dropped");
        }
    }

    /// Close a frame on behalf of its owner, dropping its retained rows
    pub(crate) fn close_frame(&mut self, id: FrameId) -> bool {
        if self.frames.remove(id).is_none() {
            return false;
        }
        let rows = self.history.remove_owner(id);
        info!(frame = %id, rows, "frame closed");
        self.outbox
            .push(Notice::Frame(FrameEvent::Destroyed { id }));
        true
    }

    pub(crate) fn resize(&mut self, rows: usize, cols: usize) {
        self.screen.resize(rows, cols);
        self.history.resize(cols);
    }

    /// Viewport rows of the primary buffer inside `[start, end)`
    fn viewport_rows(&self, start: u64, end: u64) -> impl Iterator<Item = &Row> {
        let first = start.max(self.viewport_start);
        let grid = self.screen.primary();
        (first..end).filter_map(move |abs| grid.row((abs - self.viewport_start) as usize))
    }

    fn frame_end(&self, frame: &Frame) -> u64 {
        frame.end.unwrap_or_else(|| self.output_end())
    }

    /// Retained plus on-screen rows of a frame
    pub(crate) fn frame_row_count(&self, id: FrameId) -> usize {
        let Some(frame) = self.frames.get(id) else {
            return 0;
        };
        let end = self.frame_end(frame);
        self.history.rows_owned_by(id) + self.viewport_rows(frame.start, end).count()
    }

    pub(crate) fn frame_text(&self, id: FrameId) -> Option<String> {
        let frame = self.frames.get(id)?;
        let end = self.frame_end(frame);
        let lines: Vec<String> = self
            .history
            .frame_rows(id)
            .chain(self.viewport_rows(frame.start, end))
            .map(Row::text)
            .collect();
        Some(lines.join("\n"))
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let frames = self
            .frames
            .iter()
            .map(|frame| FrameSnapshot {
                id: frame.id.0,
                command: frame.command.clone(),
                exit_code: frame.exit_code,
                posture: frame.posture.as_str().to_string(),
                rows: self.frame_row_count(frame.id),
            })
            .collect();
        Snapshot::capture(&self.screen, &self.title, self.history.len(), frames)
    }
}

/// `38;5;n`, `38;2;r;g;b` and their colon forms. Advances `i` past any
/// semicolon-separated arguments it consumes.
fn extended_color(params: &Params, i: &mut usize) -> Option<Color> {
    let sub = params.subparams(*i);
    if !sub.is_empty() {
        return match sub[0] {
            5 => sub.get(1).map(|&n| Color::Indexed(clamp_u8(n))),
            // 38:2:r:g:b or 38:2:colorspace:r:g:b
            2 if sub.len() >= 4 => {
                let rgb = &sub[sub.len() - 3..];
                Some(Color::Rgb(clamp_u8(rgb[0]), clamp_u8(rgb[1]), clamp_u8(rgb[2])))
            }
            _ => None,
        };
    }
    match params.raw(*i + 1) {
        5 if *i + 2 < params.len() => {
            let index = params.raw(*i + 2);
            *i += 2;
            Some(Color::Indexed(clamp_u8(index)))
        }
        2 if *i + 4 < params.len() => {
            let color = Color::Rgb(
                clamp_u8(params.raw(*i + 2)),
                clamp_u8(params.raw(*i + 3)),
                clamp_u8(params.raw(*i + 4)),
            );
            *i += 4;
            Some(color)
        }
        _ => None,
    }
}

fn clamp_u8(value: u16) -> u8 {
    value.min(255) as u8
}

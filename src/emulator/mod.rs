//! Emulator
//!
//! Ties the tokenizer to the screen model and the retention machinery.
//! Each call to [`Emulator::feed`] is one batch: every token is applied
//! synchronously, then the queued side effects are emitted in order,
//! followed by at most one screen-change and one render notification.
//!
//! Handlers that want to feed more bytes while a batch is being emitted
//! use an [`InputHandle`]; those bytes are queued and processed in order
//! once the current batch is finished.

mod dispatch;
mod events;

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::appmode::{
    generate_cookie, ApplicationModeSession, FileStorage, FrameLookup, Progress, INTERRUPT,
};
use crate::config::EngineConfig;
use crate::core::{Cell, Screen, Snapshot};
use crate::error::{Error, Result};
use crate::parser::Tokenizer;
use crate::retention::{Debounce, RetentionPolicy};
use crate::scrollback::{Frame, FrameId};

use dispatch::{Notice, Terminal};
pub use events::{Channel, Events, FrameEvent, RenderRequest, ScreenChange, Subscription};

/// Queue of bytes waiting to be processed
#[derive(Debug, Clone, Default)]
pub struct InputHandle {
    queue: Rc<RefCell<VecDeque<Vec<u8>>>>,
}

impl InputHandle {
    /// Queue bytes for processing after the current batch
    pub fn write(&self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.queue.borrow_mut().push_back(bytes.to_vec());
        }
    }

    pub fn pending_bytes(&self) -> usize {
        self.queue.borrow().iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    fn pop(&self) -> Option<Vec<u8>> {
        self.queue.borrow_mut().pop_front()
    }
}

/// One terminal session
pub struct Emulator {
    tokenizer: Tokenizer,
    terminal: Terminal,
    events: Events,
    input: InputHandle,
    maintenance: Debounce,
    config: EngineConfig,
    render_seq: u64,
    reported_buffer_size: usize,
}

impl Emulator {
    /// Create an emulator with a freshly generated session cookie
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_cookie(config, generate_cookie())
    }

    /// Create an emulator with a known cookie. A cookie whose first byte is
    /// a digit still works, but loses payload streaming.
    pub fn with_cookie(config: EngineConfig, cookie: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let policy = RetentionPolicy::new(
            config.rule_set()?,
            config.scrollback_max_lines,
            config.scrollback_max_frames,
        );
        let terminal = Terminal::new(
            config.rows,
            config.columns,
            policy,
            ApplicationModeSession::new(cookie.into()),
            config.answerback.clone(),
        );
        Ok(Self {
            tokenizer: Tokenizer::new(),
            terminal,
            events: Events::default(),
            input: InputHandle::default(),
            maintenance: Debounce::new(Duration::from_millis(config.maintenance_delay_ms)),
            config,
            render_seq: 0,
            reported_buffer_size: 0,
        })
    }

    pub fn cookie(&self) -> &str {
        self.terminal.session.cookie()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Handle for queueing input from inside event handlers
    pub fn input_handle(&self) -> InputHandle {
        self.input.clone()
    }

    pub fn set_frame_lookup(&mut self, lookup: Box<dyn FrameLookup>) {
        self.terminal.session.set_frame_lookup(lookup);
    }

    pub fn set_file_storage(&mut self, storage: Box<dyn FileStorage>) {
        self.terminal.session.set_file_storage(storage);
    }

    pub fn set_progress(&mut self, progress: Box<dyn Progress>) {
        self.terminal.session.set_progress(progress);
    }

    /// Process bytes from the pty, then anything queued through an
    /// `InputHandle`, in submission order
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.input.is_empty() {
            self.process_batch(bytes);
        } else {
            self.input.write(bytes);
        }
        while let Some(chunk) = self.input.pop() {
            self.report_buffer_size();
            self.process_batch(&chunk);
        }
        self.report_buffer_size();
    }

    fn process_batch(&mut self, bytes: &[u8]) {
        let mut tokens = 0usize;
        for token in self.tokenizer.feed(bytes) {
            self.terminal.dispatch(token);
            tokens += 1;
        }
        if tokens > 0 {
            self.maintenance.schedule(Instant::now());
        }
        self.flush(tokens > 0);
        self.report_buffer_size();
    }

    /// Emit queued notices, then the coalesced change and render requests
    fn flush(&mut self, render: bool) {
        self.flush_notices();
        let changed = self.terminal.screen.dirty_range();
        if let Some((start_row, end_row)) = changed {
            self.terminal.screen.clear_dirty();
            self.events
                .screen_changed
                .emit(&ScreenChange { start_row, end_row });
        }
        if render || changed.is_some() {
            self.render_seq += 1;
            self.events.render.emit(&RenderRequest {
                seq: self.render_seq,
            });
        }
    }

    fn flush_notices(&mut self) {
        for notice in self.terminal.take_notices() {
            match notice {
                Notice::PtyWrite(bytes) => self.events.pty_write.emit(&bytes),
                Notice::Title(title) => self.events.title_changed.emit(&title),
                Notice::AppMode(event) => self.events.app_mode.emit(&event),
                Notice::Frame(event) => self.events.frame.emit(&event),
            }
        }
    }

    fn report_buffer_size(&mut self) {
        let size = self.input.pending_bytes();
        if size != self.reported_buffer_size {
            self.reported_buffer_size = size;
            self.events.write_buffer_size.emit(&size);
        }
    }

    /// When the host should call [`Emulator::tick`] next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.maintenance.deadline()
    }

    /// Run the maintenance pass if its debounce deadline has passed
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.maintenance.poll(now) {
            self.run_maintenance();
            true
        } else {
            false
        }
    }

    /// Enforce the scrollback and frame caps now
    pub fn run_maintenance(&mut self) {
        self.maintenance.cancel();
        self.terminal.enforce_retention();
        self.flush_notices();
    }

    /// Truncate/pad to the new size. Zero dimensions are rejected and the
    /// previous size is kept.
    pub fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        if rows == 0 || cols == 0 {
            warn!(rows, cols, "resize rejected");
            return Err(Error::InvalidDimensions { rows, cols });
        }
        if rows == self.rows() && cols == self.cols() {
            return Ok(());
        }
        debug!(rows, cols, "resize");
        self.terminal.resize(rows, cols);
        self.config.rows = rows;
        self.config.columns = cols;
        self.flush(true);
        Ok(())
    }

    /// Re-read caps, rules, answerback and size from a new configuration
    pub fn update_config(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        self.terminal.policy = RetentionPolicy::new(
            config.rule_set()?,
            config.scrollback_max_lines,
            config.scrollback_max_frames,
        );
        self.terminal.answerback = config.answerback.clone();
        self.maintenance
            .set_delay(Duration::from_millis(config.maintenance_delay_ms));
        let (rows, cols) = (config.rows, config.columns);
        self.config = config;
        self.resize(rows, cols)?;
        self.maintenance.schedule(Instant::now());
        Ok(())
    }

    /// Abort an in-flight SHOW_FILE transfer
    pub fn cancel_file_transfer(&mut self) -> bool {
        match self.terminal.session.cancel_transfer() {
            Some(event) => {
                self.terminal.push_notice(Notice::AppMode(event));
                self.flush_notices();
                true
            }
            None => false,
        }
    }

    /// Screen user input headed for the pty and return what should be
    /// forwarded. An interrupt during a file transfer cancels the transfer
    /// and is removed; the other bytes pass through.
    pub fn filter_input<'a>(&mut self, bytes: &'a [u8]) -> Cow<'a, [u8]> {
        if !self.terminal.session.is_transferring() || !bytes.contains(&INTERRUPT) {
            return Cow::Borrowed(bytes);
        }
        self.cancel_file_transfer();
        Cow::Owned(bytes.iter().copied().filter(|&b| b != INTERRUPT).collect())
    }

    /// Close a frame and drop its retained rows
    pub fn close_frame(&mut self, id: FrameId) -> bool {
        let closed = self.terminal.close_frame(id);
        self.flush_notices();
        closed
    }

    pub fn rows(&self) -> usize {
        self.terminal.screen.rows()
    }

    pub fn cols(&self) -> usize {
        self.terminal.screen.cols()
    }

    pub fn title(&self) -> &str {
        &self.terminal.title
    }

    pub fn screen(&self) -> &Screen {
        &self.terminal.screen
    }

    /// Read-only view for renderers
    pub fn view(&self) -> ScreenView<'_> {
        ScreenView {
            screen: &self.terminal.screen,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.terminal.snapshot()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.terminal.frames.iter()
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.terminal.frames.get(id)
    }

    /// Rows of a frame, whether retained or still on screen
    pub fn frame_rows(&self, id: FrameId) -> usize {
        self.terminal.frame_row_count(id)
    }

    pub fn frame_text(&self, id: FrameId) -> Option<String> {
        self.terminal.frame_text(id)
    }

    /// Rows retained outside the viewport
    pub fn history_len(&self) -> usize {
        self.terminal.history.len()
    }

    pub fn history_text(&self) -> String {
        self.terminal.history.text()
    }

    /// Absolute position of the top viewport row
    pub fn viewport_start(&self) -> u64 {
        self.terminal.viewport_start()
    }
}

/// Read-only cell view of the visible buffer. The cell under a visible
/// cursor carries `CellFlags::CURSOR`.
#[derive(Debug, Clone, Copy)]
pub struct ScreenView<'a> {
    screen: &'a Screen,
}

impl<'a> ScreenView<'a> {
    pub fn rows(&self) -> usize {
        self.screen.rows()
    }

    pub fn cols(&self) -> usize {
        self.screen.cols()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.screen.display_cell(row, col)
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = Cell> + 'a {
        let screen = self.screen;
        (0..screen.cols()).filter_map(move |col| screen.display_cell(row, col))
    }

    pub fn row_text(&self, row: usize) -> String {
        self.screen.row_text(row)
    }

    pub fn hyperlink(&self, id: u32) -> Option<&'a str> {
        self.screen.hyperlink(id)
    }

    /// Cursor row and column, if visible
    pub fn cursor(&self) -> Option<(usize, usize)> {
        let cursor = self.screen.cursor();
        self.screen
            .modes()
            .cursor_visible
            .then_some((cursor.row, cursor.col))
    }
}

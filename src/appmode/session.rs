//! Application-mode session state machine
//!
//! Driven by the streamed OSC tokens: `start` on `OscStart`, `put` for each
//! `OscPut`, `end` on `OscEnd` and `abort` on `OscAbort`. Buffered modes
//! collect their payload and act at `end`; SHOW_FILE forwards each chunk
//! to the storage collaborator as it arrives.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use super::payload::{parse_command_line, parse_exit_code};
use super::{AppMode, AppModeEvent, FileStorage, FrameLookup, Progress};

pub const COOKIE_LEN: usize = 16;

/// Written back for REQUEST_FRAME when the identifier is unknown
pub const FRAME_NOT_FOUND: &[u8] = b"#error\n";

/// Buffered payloads beyond this are dropped
const MAX_PAYLOAD: usize = 64 * 1024;

/// SHOW_FILE metadata beyond this is cut and the rest treated as data
const MAX_METADATA: usize = 4096;

#[derive(Debug, Default)]
struct Transfer {
    /// Metadata has been delimited and `FileStorage::begin` called
    started: bool,
    bytes: u64,
}

pub struct ApplicationModeSession {
    cookie: String,
    mode: AppMode,
    /// Rejected or cancelled: swallow everything up to the terminator
    discarding: bool,
    buffer: Vec<u8>,
    transfer: Transfer,
    reply: Option<Vec<u8>>,
    lookup: Option<Box<dyn FrameLookup>>,
    storage: Option<Box<dyn FileStorage>>,
    progress: Option<Box<dyn Progress>>,
}

impl std::fmt::Debug for ApplicationModeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationModeSession")
            .field("mode", &self.mode)
            .field("discarding", &self.discarding)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

/// A fresh session cookie. The first character is a letter so that the
/// introducer is always read as a private OSC.
pub fn generate_cookie() -> String {
    let mut rng = rand::thread_rng();
    let first = rng.gen_range(b'a'..=b'z') as char;
    let rest: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(COOKIE_LEN - 1)
        .map(char::from)
        .collect();
    format!("{}{}", first, rest)
}

impl ApplicationModeSession {
    pub fn new(cookie: String) -> Self {
        Self {
            cookie,
            mode: AppMode::None,
            discarding: false,
            buffer: Vec::new(),
            transfer: Transfer::default(),
            reply: None,
            lookup: None,
            storage: None,
            progress: None,
        }
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    /// A sequence is open, either accepted or being discarded
    pub fn is_active(&self) -> bool {
        self.mode != AppMode::None || self.discarding
    }

    pub fn is_transferring(&self) -> bool {
        self.mode == AppMode::ShowFile && !self.discarding
    }

    pub fn set_frame_lookup(&mut self, lookup: Box<dyn FrameLookup>) {
        self.lookup = Some(lookup);
    }

    pub fn set_file_storage(&mut self, storage: Box<dyn FileStorage>) {
        self.storage = Some(storage);
    }

    pub fn set_progress(&mut self, progress: Box<dyn Progress>) {
        self.progress = Some(progress);
    }

    /// Bytes to write back to the pty after the last `end`
    pub fn take_reply(&mut self) -> Option<Vec<u8>> {
        self.reply.take()
    }

    fn reset(&mut self) {
        self.mode = AppMode::None;
        self.discarding = false;
        self.buffer.clear();
        self.transfer = Transfer::default();
    }

    /// Validate the cookie and mode code of a private OSC
    pub fn start(&mut self, params: &[Vec<u8>]) -> Option<AppModeEvent> {
        self.reset();
        let cookie_ok = params
            .first()
            .map_or(false, |c| c.as_slice() == self.cookie.as_bytes());
        if !cookie_ok {
            warn!("private OSC with a foreign cookie discarded");
            self.discarding = true;
            return None;
        }
        match params.get(1).and_then(|code| AppMode::from_code(code)) {
            Some(mode) => {
                debug!(?mode, "application mode entered");
                self.mode = mode;
            }
            None => {
                debug!(code = ?params.get(1), "unknown application mode discarded");
                self.discarding = true;
            }
        }
        None
    }

    pub fn put(&mut self, chunk: &[u8]) -> Option<AppModeEvent> {
        if self.discarding {
            return None;
        }
        match self.mode {
            AppMode::None => None,
            AppMode::ShowFile => self.stream(chunk),
            _ => {
                let room = MAX_PAYLOAD.saturating_sub(self.buffer.len());
                if chunk.len() > room {
                    debug!(dropped = chunk.len() - room, "application mode payload truncated");
                }
                self.buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
                None
            }
        }
    }

    /// SHOW_FILE data: `metadata;bytes...`
    fn stream(&mut self, chunk: &[u8]) -> Option<AppModeEvent> {
        let mut event = None;
        let mut data = chunk;
        if !self.transfer.started {
            match data.iter().position(|&b| b == b';') {
                Some(index) => {
                    self.buffer.extend_from_slice(&data[..index]);
                    data = &data[index + 1..];
                    event = Some(self.begin_transfer());
                }
                None if self.buffer.len() + data.len() > MAX_METADATA => {
                    let take = MAX_METADATA.saturating_sub(self.buffer.len());
                    self.buffer.extend_from_slice(&data[..take]);
                    data = &data[take..];
                    event = Some(self.begin_transfer());
                }
                None => {
                    self.buffer.extend_from_slice(data);
                    return None;
                }
            }
        }
        if !data.is_empty() {
            self.transfer.bytes += data.len() as u64;
            if let Some(storage) = self.storage.as_mut() {
                storage.write(data);
            }
            if let Some(progress) = self.progress.as_mut() {
                progress.transferred(self.transfer.bytes);
            }
        }
        event
    }

    fn begin_transfer(&mut self) -> AppModeEvent {
        let metadata = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.transfer.started = true;
        match self.storage.as_mut() {
            Some(storage) => storage.begin(&metadata),
            None => debug!("file transfer without storage, data dropped"),
        }
        info!(%metadata, "file transfer started");
        AppModeEvent::TransferStarted { metadata }
    }

    /// Terminator of the private OSC
    pub fn end(&mut self) -> Vec<AppModeEvent> {
        if self.discarding {
            self.reset();
            return Vec::new();
        }
        let payload = String::from_utf8_lossy(&self.buffer).into_owned();
        let events = match self.mode {
            AppMode::None => Vec::new(),
            AppMode::BracketStart => {
                let (shell, command) = parse_command_line(&payload);
                vec![AppModeEvent::BracketStart { shell, command }]
            }
            AppMode::BracketEnd => vec![AppModeEvent::BracketEnd {
                exit_code: parse_exit_code(&payload),
            }],
            AppMode::RequestFrame => {
                let id = payload.trim().to_string();
                let found = self.lookup.as_ref().and_then(|l| l.lookup(&id));
                let event = AppModeEvent::FrameRequested {
                    id,
                    found: found.is_some(),
                };
                self.reply = Some(found.unwrap_or_else(|| FRAME_NOT_FOUND.to_vec()));
                vec![event]
            }
            AppMode::ShowFile => {
                let mut events = Vec::new();
                if !self.transfer.started {
                    events.push(self.begin_transfer());
                }
                if let Some(storage) = self.storage.as_mut() {
                    storage.finish();
                }
                info!(bytes = self.transfer.bytes, "file transfer finished");
                events.push(AppModeEvent::TransferFinished {
                    bytes: self.transfer.bytes,
                });
                events
            }
        };
        self.reset();
        events
    }

    /// The OSC was cancelled by CAN/SUB
    pub fn abort(&mut self) -> Option<AppModeEvent> {
        let event = if self.is_transferring() {
            Some(self.abort_transfer())
        } else {
            None
        };
        self.reset();
        event
    }

    /// Cancel an in-flight SHOW_FILE; the rest of the sequence is swallowed
    pub fn cancel_transfer(&mut self) -> Option<AppModeEvent> {
        if !self.is_transferring() {
            return None;
        }
        let event = self.abort_transfer();
        self.mode = AppMode::None;
        self.discarding = true;
        Some(event)
    }

    fn abort_transfer(&mut self) -> AppModeEvent {
        if self.transfer.started {
            if let Some(storage) = self.storage.as_mut() {
                storage.abort();
            }
        }
        info!(bytes = self.transfer.bytes, "file transfer aborted");
        AppModeEvent::TransferAborted {
            bytes: self.transfer.bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        data: Vec<u8>,
        progress: Vec<u64>,
    }

    struct Storage(Rc<RefCell<Log>>);

    impl FileStorage for Storage {
        fn begin(&mut self, metadata: &str) {
            self.0.borrow_mut().calls.push(format!("begin:{}", metadata));
        }
        fn write(&mut self, chunk: &[u8]) {
            self.0.borrow_mut().data.extend_from_slice(chunk);
        }
        fn finish(&mut self) {
            self.0.borrow_mut().calls.push("finish".into());
        }
        fn abort(&mut self) {
            self.0.borrow_mut().calls.push("abort".into());
        }
    }

    struct Meter(Rc<RefCell<Log>>);

    impl Progress for Meter {
        fn transferred(&mut self, bytes: u64) {
            self.0.borrow_mut().progress.push(bytes);
        }
    }

    fn params(cookie: &str, mode: &str) -> Vec<Vec<u8>> {
        vec![cookie.as_bytes().to_vec(), mode.as_bytes().to_vec()]
    }

    fn session_with_log() -> (ApplicationModeSession, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut session = ApplicationModeSession::new("abc123".into());
        session.set_file_storage(Box::new(Storage(log.clone())));
        session.set_progress(Box::new(Meter(log.clone())));
        (session, log)
    }

    #[test]
    fn test_generate_cookie() {
        let cookie = generate_cookie();
        assert_eq!(cookie.len(), COOKIE_LEN);
        assert!(cookie.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(cookie.chars().next().unwrap().is_ascii_lowercase());
    }

    #[test]
    fn test_session_bracket_start() {
        let mut session = ApplicationModeSession::new("abc123".into());
        session.start(&params("abc123", "2"));
        assert_eq!(session.mode(), AppMode::BracketStart);
        session.put(b"ls ");
        session.put(b"-la");
        assert_eq!(
            session.end(),
            vec![AppModeEvent::BracketStart {
                shell: None,
                command: "ls -la".into()
            }]
        );
        assert!(!session.is_active());
    }

    #[test]
    fn test_session_rejects_foreign_cookie() {
        let mut session = ApplicationModeSession::new("abc123".into());
        session.start(&params("zzz999", "2"));
        assert!(session.is_active());
        session.put(b"rm -rf /");
        assert!(session.end().is_empty());
        assert!(!session.is_active());
    }

    #[test]
    fn test_session_unknown_mode_discarded() {
        let mut session = ApplicationModeSession::new("abc123".into());
        session.start(&params("abc123", "9"));
        session.put(b"x");
        assert!(session.end().is_empty());
    }

    #[test]
    fn test_session_bracket_end_default_exit_code() {
        let mut session = ApplicationModeSession::new("abc123".into());
        session.start(&params("abc123", "3"));
        session.put(b"not a number");
        assert_eq!(
            session.end(),
            vec![AppModeEvent::BracketEnd {
                exit_code: crate::appmode::DEFAULT_EXIT_CODE
            }]
        );
    }

    #[test]
    fn test_session_request_frame_not_found() {
        let mut session = ApplicationModeSession::new("abc123".into());
        session.start(&params("abc123", "4"));
        session.put(b"42");
        let events = session.end();
        assert_eq!(
            events,
            vec![AppModeEvent::FrameRequested {
                id: "42".into(),
                found: false
            }]
        );
        assert_eq!(session.take_reply(), Some(FRAME_NOT_FOUND.to_vec()));
        assert_eq!(session.take_reply(), None);
    }

    #[test]
    fn test_session_request_frame_found() {
        struct Frames;
        impl FrameLookup for Frames {
            fn lookup(&self, id: &str) -> Option<Vec<u8>> {
                (id == "7").then(|| b"frame seven\n".to_vec())
            }
        }
        let mut session = ApplicationModeSession::new("abc123".into());
        session.set_frame_lookup(Box::new(Frames));
        session.start(&params("abc123", "4"));
        session.put(b"7");
        session.end();
        assert_eq!(session.take_reply(), Some(b"frame seven\n".to_vec()));
    }

    #[test]
    fn test_session_show_file_streams() {
        let (mut session, log) = session_with_log();
        session.start(&params("abc123", "5"));
        assert_eq!(
            session.put(b"name=a.txt;hel"),
            Some(AppModeEvent::TransferStarted {
                metadata: "name=a.txt".into()
            })
        );
        assert_eq!(log.borrow().data, b"hel");
        assert_eq!(session.put(b"lo"), None);
        assert_eq!(
            session.end(),
            vec![AppModeEvent::TransferFinished { bytes: 5 }]
        );
        let log = log.borrow();
        assert_eq!(log.data, b"hello");
        assert_eq!(log.calls, vec!["begin:name=a.txt", "finish"]);
        assert_eq!(log.progress, vec![3, 5]);
    }

    #[test]
    fn test_session_cancel_transfer_swallows_rest() {
        let (mut session, log) = session_with_log();
        session.start(&params("abc123", "5"));
        session.put(b"meta;abc");
        assert_eq!(
            session.cancel_transfer(),
            Some(AppModeEvent::TransferAborted { bytes: 3 })
        );
        session.put(b"more");
        assert!(session.end().is_empty());
        let log = log.borrow();
        assert_eq!(log.data, b"abc");
        assert_eq!(log.calls, vec!["begin:meta", "abort"]);
    }

    #[test]
    fn test_session_abort_by_cancel_byte() {
        let (mut session, log) = session_with_log();
        session.start(&params("abc123", "5"));
        session.put(b"m;x");
        assert_eq!(
            session.abort(),
            Some(AppModeEvent::TransferAborted { bytes: 1 })
        );
        assert!(!session.is_active());
        assert_eq!(log.borrow().calls, vec!["begin:m", "abort"]);
    }
}

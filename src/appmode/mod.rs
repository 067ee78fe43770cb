//! Shell-integration sub-protocol
//!
//! Carried inside private OSC sequences of the form
//! `ESC ] cookie ; mode ; payload ST`. The cookie is generated once per
//! session and handed to the shell integration out of band; sequences with
//! any other cookie are discarded whole.
//!
//! | code | mode          | payload                          |
//! |------|---------------|----------------------------------|
//! | 2    | BRACKET_START | `[shell;]command line`           |
//! | 3    | BRACKET_END   | decimal exit code                |
//! | 4    | REQUEST_FRAME | frame identifier                 |
//! | 5    | SHOW_FILE     | `metadata;` followed by raw data |

mod payload;
mod session;

pub use payload::{parse_command_line, parse_exit_code, strip_history_number, DEFAULT_EXIT_CODE};
pub use session::{generate_cookie, ApplicationModeSession, COOKIE_LEN, FRAME_NOT_FOUND};

/// Active sub-mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    #[default]
    None,
    BracketStart,
    BracketEnd,
    RequestFrame,
    ShowFile,
}

impl AppMode {
    pub fn from_code(code: &[u8]) -> Option<Self> {
        match code {
            b"2" => Some(AppMode::BracketStart),
            b"3" => Some(AppMode::BracketEnd),
            b"4" => Some(AppMode::RequestFrame),
            b"5" => Some(AppMode::ShowFile),
            _ => None,
        }
    }
}

/// Protocol-level notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppModeEvent {
    BracketStart {
        shell: Option<String>,
        command: String,
    },
    BracketEnd {
        exit_code: i32,
    },
    FrameRequested {
        id: String,
        found: bool,
    },
    TransferStarted {
        metadata: String,
    },
    TransferFinished {
        bytes: u64,
    },
    TransferAborted {
        bytes: u64,
    },
}

/// Resolves REQUEST_FRAME identifiers to the bytes to replay
pub trait FrameLookup {
    fn lookup(&self, id: &str) -> Option<Vec<u8>>;
}

/// Receives SHOW_FILE data
pub trait FileStorage {
    fn begin(&mut self, metadata: &str);
    fn write(&mut self, chunk: &[u8]);
    fn finish(&mut self);
    fn abort(&mut self);
}

/// Bytes transferred so far in the current SHOW_FILE
pub trait Progress {
    fn transferred(&mut self, bytes: u64);
}

/// ETX, sent by the user's interrupt key
pub const INTERRUPT: u8 = 0x03;

//! Termframe terminal emulation engine
//!
//! An incremental VT/xterm parser and screen model for one terminal session,
//! with shell-integration frames and bounded scrollback:
//!
//! - `parser`: byte stream to structural tokens
//! - `core`: cells, rows, the primary/alternate screen, snapshots
//! - `scrollback`: retained history rows and the frame arena
//! - `appmode`: the cookie-secured shell-integration sub-protocol
//! - `retention`: per-command frame rules and cap enforcement
//! - `emulator`: token dispatch, batching and event channels
//!
//! The engine does no I/O. Hosts feed it pty bytes, subscribe to its event
//! channels and call [`Emulator::tick`] when [`Emulator::next_deadline`]
//! passes.

pub mod appmode;
pub mod config;
pub mod core;
pub mod emulator;
pub mod error;
pub mod parser;
pub mod retention;
pub mod scrollback;

pub use config::{ConfigError, EngineConfig};
pub use core::Snapshot;
pub use emulator::{Emulator, InputHandle, ScreenView};
pub use error::{Error, Result};
pub use scrollback::{FrameId, Posture};

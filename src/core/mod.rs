//! Screen model
//!
//! Platform-independent terminal state: cells, rows, the primary and
//! alternate cell matrices, cursor, modes and character sets. Everything
//! here is deterministic: the same sequence of operations always produces
//! the same state.

mod cell;
mod charset;
mod cursor;
mod grid;
mod hyperlink;
mod modes;
mod row;
mod screen;
mod snapshot;

pub use cell::{char_width, Cell, CellFlags, Color, Pen};
pub use charset::{Charset, CharsetState};
pub use cursor::{Cursor, SavedCursor};
pub use grid::Grid;
pub use hyperlink::Hyperlinks;
pub use modes::Modes;
pub use row::Row;
pub use screen::{EraseMode, Screen};
pub use snapshot::{CellSnapshot, ColorSnapshot, CursorSnapshot, FrameSnapshot, Snapshot, StyleSnapshot};

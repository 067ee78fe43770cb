//! Scrollback history and frames

mod frame;
mod store;

pub use frame::{Frame, FrameArena, FrameId, Posture};
pub use store::{Owner, ScrollbackStore};

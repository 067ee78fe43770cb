//! Typed event channels
//!
//! Each channel keeps its own listener list. `subscribe` returns a
//! `Subscription` that removes the listener when disposed or dropped.
//! Emission iterates over a snapshot of the listeners, so a handler may
//! subscribe or unsubscribe without disturbing the current emission.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::appmode::AppModeEvent;
use crate::scrollback::{FrameId, Posture};

type Listener<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Slots<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

pub struct Channel<T> {
    slots: Rc<RefCell<Slots<T>>>,
}

impl<T: 'static> Channel<T> {
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&T) + 'static,
    {
        let id = {
            let mut slots = self.slots.borrow_mut();
            slots.next_id += 1;
            let id = slots.next_id;
            let listener: Listener<T> = Rc::new(RefCell::new(listener));
            slots.listeners.push((id, listener));
            id
        };
        let weak = Rc::downgrade(&self.slots);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    slots.borrow_mut().listeners.retain(|(i, _)| *i != id);
                }
            })),
        }
    }

    pub fn emit(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .slots
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            // A listener already running further up the stack is skipped
            if let Ok(mut f) = listener.try_borrow_mut() {
                (&mut *f)(value);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.slots.borrow().listeners.len()
    }
}

impl<T: 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("listeners", &self.slots.borrow().listeners.len())
            .finish()
    }
}

/// Handle to one listener registration
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn dispose(mut self) {
        self.detach_now();
    }

    /// Keep the listener for as long as the channel lives
    pub fn forget(mut self) {
        self.detach = None;
    }

    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Inclusive range of viewport rows changed by one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenChange {
    pub start_row: usize,
    pub end_row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    /// Increases by one per request
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Opened {
        id: FrameId,
        command: String,
    },
    Finished {
        id: FrameId,
        exit_code: Option<i32>,
        posture: Posture,
    },
    Destroyed {
        id: FrameId,
    },
}

/// All channels of one emulator
#[derive(Debug, Default)]
pub struct Events {
    pub(super) screen_changed: Channel<ScreenChange>,
    pub(super) render: Channel<RenderRequest>,
    pub(super) pty_write: Channel<Vec<u8>>,
    pub(super) title_changed: Channel<String>,
    pub(super) write_buffer_size: Channel<usize>,
    pub(super) app_mode: Channel<AppModeEvent>,
    pub(super) frame: Channel<FrameEvent>,
}

impl Events {
    pub fn screen_changed(&self) -> &Channel<ScreenChange> {
        &self.screen_changed
    }

    pub fn render(&self) -> &Channel<RenderRequest> {
        &self.render
    }

    /// Bytes the engine wants written to the pty
    pub fn pty_write(&self) -> &Channel<Vec<u8>> {
        &self.pty_write
    }

    pub fn title_changed(&self) -> &Channel<String> {
        &self.title_changed
    }

    /// Bytes queued for processing, for flow control
    pub fn write_buffer_size(&self) -> &Channel<usize> {
        &self.write_buffer_size
    }

    pub fn app_mode(&self) -> &Channel<AppModeEvent> {
        &self.app_mode
    }

    pub fn frame(&self) -> &Channel<FrameEvent> {
        &self.frame
    }
}

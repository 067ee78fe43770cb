//! Trailing-edge debounce
//!
//! The engine has no timers of its own. The host asks for the next deadline
//! and calls back with the current time; this type only does the
//! bookkeeping.

use std::time::{Duration, Instant};

/// Sustained scheduling can postpone a run by at most this many delays
const MAX_WAIT_FACTOR: u32 = 4;

#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
    /// When the current burst was first scheduled
    first: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            first: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Push the deadline to `now + delay`, capped so that a continuous
    /// stream of calls still runs the task eventually
    pub fn schedule(&mut self, now: Instant) {
        let first = *self.first.get_or_insert(now);
        let latest = first + self.delay * MAX_WAIT_FACTOR;
        self.deadline = Some((now + self.delay).min(latest));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.first = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the deadline has passed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn test_debounce_trailing_edge() {
        let start = Instant::now();
        let mut debounce = Debounce::new(DELAY);
        debounce.schedule(start);
        debounce.schedule(start + Duration::from_millis(50));
        assert!(!debounce.poll(start + Duration::from_millis(120)));
        assert!(debounce.poll(start + Duration::from_millis(150)));
        assert!(!debounce.poll(start + Duration::from_millis(400)));
    }

    #[test]
    fn test_debounce_cancel() {
        let start = Instant::now();
        let mut debounce = Debounce::new(DELAY);
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.is_scheduled());
        assert!(!debounce.poll(start + DELAY * 10));
    }

    #[test]
    fn test_debounce_max_wait() {
        let start = Instant::now();
        let mut debounce = Debounce::new(DELAY);
        let mut now = start;
        for _ in 0..20 {
            debounce.schedule(now);
            now += Duration::from_millis(50);
        }
        assert_eq!(debounce.deadline(), Some(start + DELAY * MAX_WAIT_FACTOR));
    }
}

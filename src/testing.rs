//! Deterministic doubles for driving the trainer without threads
//!
//! Shared by unit tests and the integration suite.

use crate::clock::Clock;
use crate::keyboard::{KeyCode, KeyEvent, KeyEventType};
use crate::timer::{Alarm, TimerToken};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Creates a key press `ms` milliseconds after `base`
pub fn press_at(key: KeyCode, base: Instant, ms: u64) -> KeyEvent {
    KeyEvent::new(key, KeyEventType::Press, base + Duration::from_millis(ms))
}

/// Creates a key release `ms` milliseconds after `base`
pub fn release_at(key: KeyCode, base: Instant, ms: u64) -> KeyEvent {
    KeyEvent::new(key, KeyEventType::Release, base + Duration::from_millis(ms))
}

#[derive(Debug, Default)]
struct AlarmLog {
    generation: u64,
    pending: Option<(TimerToken, Duration)>,
    armed: usize,
    cancels: usize,
}

/// [`Alarm`] that never fires on its own.
///
/// Clones share state, so a test can keep a handle after moving the alarm
/// into an evaluator and later call [`ManualAlarm::fire`] to expire it.
#[derive(Debug, Clone, Default)]
pub struct ManualAlarm {
    log: Rc<RefCell<AlarmLog>>,
}

impl ManualAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the armed, not yet fired or cancelled alarm
    pub fn pending(&self) -> Option<TimerToken> {
        self.log.borrow().pending.map(|(token, _)| token)
    }

    pub fn pending_duration(&self) -> Option<Duration> {
        self.log.borrow().pending.map(|(_, after)| after)
    }

    /// Expire the pending alarm, returning the token its owner should receive
    pub fn fire(&self) -> Option<TimerToken> {
        self.log.borrow_mut().pending.take().map(|(token, _)| token)
    }

    pub fn arm_count(&self) -> usize {
        self.log.borrow().armed
    }

    pub fn cancel_count(&self) -> usize {
        self.log.borrow().cancels
    }
}

impl Alarm for ManualAlarm {
    fn arm(&mut self, after: Duration) -> TimerToken {
        let mut log = self.log.borrow_mut();
        log.generation += 1;
        log.armed += 1;
        let token = TimerToken::new(log.generation);
        log.pending = Some((token, after));
        token
    }

    fn cancel(&mut self) {
        let mut log = self.log.borrow_mut();
        log.cancels += 1;
        log.pending = None;
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// The instant at which this clock reads zero
    pub fn base(&self) -> Instant {
        self.base
    }

    /// Instant `ms` milliseconds after the base
    pub fn at(&self, ms: u64) -> Instant {
        self.base + Duration::from_millis(ms)
    }

    pub fn set_ms(&self, ms: u64) {
        self.offset.set(Duration::from_millis(ms));
    }

    pub fn advance_ms(&self, ms: u64) {
        self.offset.set(self.offset.get() + Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

//! Cancellable one-shot deadline timer
//!
//! A [`DeadlineTimer`] owns a single alarm slot. Arming it again replaces the
//! previous alarm, and [`DeadlineTimer::cancel`] may be called any number of
//! times, including after the alarm fired. Cancellation can still lose a race
//! against an alarm that is already firing, so consumers compare the
//! delivered [`TimerToken`] against the one they armed and ignore stale ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Opaque identifier of one armed alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(&self) -> u64 {
        self.0
    }
}

struct ArmedAlarm {
    token: TimerToken,
    cancelled: Arc<AtomicBool>,
    cancel_tx: mpsc::Sender<()>,
}

impl ArmedAlarm {
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Wakes the waiting thread; it may already be gone
        let _ = self.cancel_tx.send(());
    }
}

/// Thread-backed single-slot alarm
pub struct DeadlineTimer {
    slot: Option<ArmedAlarm>,
    generation: u64,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self {
            slot: None,
            generation: 0,
        }
    }

    /// Schedule `callback` to run once after `after` unless cancelled first.
    ///
    /// Any alarm still pending in this slot is cancelled.
    pub fn arm<F>(&mut self, after: Duration, callback: F) -> TimerToken
    where
        F: FnOnce(TimerToken) + Send + 'static,
    {
        self.cancel();

        self.generation += 1;
        let token = TimerToken(self.generation);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

        let flag = Arc::clone(&cancelled);
        let spawned = thread::Builder::new()
            .name("deadline-timer".to_string())
            .spawn(move || match cancel_rx.recv_timeout(after) {
                Err(RecvTimeoutError::Timeout) if !flag.load(Ordering::SeqCst) => callback(token),
                _ => {}
            });

        if let Err(e) = spawned {
            log::error!("failed to spawn deadline thread: {}", e);
        }

        self.slot = Some(ArmedAlarm {
            token,
            cancelled,
            cancel_tx,
        });
        token
    }

    /// Cancel the pending alarm, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(alarm) = self.slot.take() {
            log::trace!("cancelling deadline {:?}", alarm.token);
            alarm.cancel();
        }
    }

    /// Token of the alarm currently occupying the slot
    pub fn armed_token(&self) -> Option<TimerToken> {
        self.slot.as_ref().map(|alarm| alarm.token)
    }
}

impl Default for DeadlineTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// An alarm that reports expiry back through the owner's event queue.
///
/// The round evaluator and the session controller only ever see this trait,
/// which keeps their logic independent of threads.
pub trait Alarm {
    /// Arm (or re-arm) the alarm; expiry is delivered later with the returned token
    fn arm(&mut self, after: Duration) -> TimerToken;

    /// Disarm the alarm. Must be idempotent.
    fn cancel(&mut self);
}

/// [`Alarm`] that posts an event onto an `mpsc` channel when it fires
pub struct ChannelAlarm<E: Send + 'static> {
    timer: DeadlineTimer,
    tx: mpsc::Sender<E>,
    wrap: fn(TimerToken) -> E,
}

impl<E: Send + 'static> ChannelAlarm<E> {
    pub fn new(tx: mpsc::Sender<E>, wrap: fn(TimerToken) -> E) -> Self {
        Self {
            timer: DeadlineTimer::new(),
            tx,
            wrap,
        }
    }
}

impl<E: Send + 'static> Alarm for ChannelAlarm<E> {
    fn arm(&mut self, after: Duration) -> TimerToken {
        if let Some(pending) = self.timer.armed_token() {
            log::trace!("re-arming over {:?}", pending);
        }
        let tx = self.tx.clone();
        let wrap = self.wrap;
        self.timer.arm(after, move |token| {
            let _ = tx.send(wrap(token));
        })
    }

    fn cancel(&mut self) {
        self.timer.cancel();
    }
}

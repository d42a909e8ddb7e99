//! Keyboard event types and listener

use super::KeyCode;
use crate::clock::{Clock, SystemClock};
use crate::event::TrainerEvent;
use device_query::{DeviceQuery, DeviceState};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// Type of keyboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
    /// Key was pressed down
    Press,
    /// Key was released
    Release,
}

/// A keyboard event with timing information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code
    pub key: KeyCode,
    /// Type of event (press/release)
    pub event_type: KeyEventType,
    /// When the event occurred
    pub timestamp: Instant,
}

impl KeyEvent {
    pub fn new(key: KeyCode, event_type: KeyEventType, timestamp: Instant) -> Self {
        Self {
            key,
            event_type,
            timestamp,
        }
    }

    pub fn press(key: KeyCode, timestamp: Instant) -> Self {
        Self::new(key, KeyEventType::Press, timestamp)
    }

    pub fn release(key: KeyCode, timestamp: Instant) -> Self {
        Self::new(key, KeyEventType::Release, timestamp)
    }

    pub fn is_press(&self) -> bool {
        self.event_type == KeyEventType::Press
    }
}

/// Sampling period of the background listener thread
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Edges between two samples of the held-key set, all stamped `now`.
///
/// Presses come before releases. Two keys changing in one sample have an
/// unknown real order, and a press of the counter key seen before the release
/// of the held key resolves as an overlap rather than a zero-latency switch.
pub fn sample_edges<K: Copy + PartialEq + Into<KeyCode>>(
    last: &[K],
    current: &[K],
    now: Instant,
) -> Vec<KeyEvent> {
    let presses = current
        .iter()
        .filter(|key| !last.contains(key))
        .map(|key| KeyEvent::press((*key).into(), now));
    let releases = last
        .iter()
        .filter(|key| !current.contains(key))
        .map(|key| KeyEvent::release((*key).into(), now));
    presses.chain(releases).collect()
}

/// Keyboard listener that polls global key state and emits edges
///
/// Terminals do not report key releases reliably, so the trainer reads the
/// physical key state through `device_query` instead.
pub struct KeyboardListener<C: Clock = SystemClock> {
    device_state: DeviceState,
    last_keys: Vec<device_query::Keycode>,
    clock: C,
    event_tx: mpsc::Sender<TrainerEvent>,
}

impl KeyboardListener<SystemClock> {
    /// Create a new keyboard listener stamped by the system clock
    pub fn new(event_tx: mpsc::Sender<TrainerEvent>) -> Self {
        Self::with_clock(event_tx, SystemClock)
    }

    /// Poll on a dedicated thread every `interval` until the handle is
    /// stopped or the receiving side of the channel goes away.
    pub fn spawn(
        event_tx: mpsc::Sender<TrainerEvent>,
        interval: Duration,
    ) -> io::Result<ListenerHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let join = thread::Builder::new()
            .name("key-listener".to_string())
            .spawn(move || {
                let mut listener = KeyboardListener::new(event_tx);
                while flag.load(Ordering::Relaxed) {
                    if listener.poll().is_err() {
                        log::debug!("event channel closed, stopping key listener");
                        break;
                    }
                    thread::sleep(interval);
                }
            })?;

        Ok(ListenerHandle {
            running,
            join: Some(join),
        })
    }
}

impl<C: Clock> KeyboardListener<C> {
    pub fn with_clock(event_tx: mpsc::Sender<TrainerEvent>, clock: C) -> Self {
        Self {
            device_state: DeviceState::new(),
            last_keys: Vec::new(),
            clock,
            event_tx,
        }
    }

    /// Sample the keyboard once and send any edges.
    ///
    /// Returns the number of events sent, or an error once nobody is
    /// listening on the channel.
    pub fn poll(&mut self) -> Result<usize, mpsc::SendError<TrainerEvent>> {
        let current_keys = self.device_state.get_keys();
        if current_keys == self.last_keys {
            return Ok(0);
        }

        let events = sample_edges(&self.last_keys, &current_keys, self.clock.now());
        self.last_keys = current_keys;

        let count = events.len();
        for event in events {
            self.event_tx.send(TrainerEvent::Key(event))?;
        }
        Ok(count)
    }
}

/// Stops the listener thread when dropped
pub struct ListenerHandle {
    running: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("key listener thread panicked");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

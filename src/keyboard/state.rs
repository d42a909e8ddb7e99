//! Keyboard state tracking and edge normalization

use super::{KeyCode, KeyEvent, KeyEventType};
use std::time::Instant;

/// Tracks which keys are down and filters the raw input stream.
///
/// The round evaluator expects strictly alternating edges per key. Auto-repeat
/// presses, releases for keys never seen going down, and events stamped
/// earlier than the previous accepted one are dropped here.
pub struct KeyboardState {
    pressed_keys: Vec<KeyCode>,
    last_timestamp: Option<Instant>,
    total_events: u64,
    dropped_events: u64,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self {
            pressed_keys: Vec::new(),
            last_timestamp: None,
            total_events: 0,
            dropped_events: 0,
        }
    }

    /// Record an event; returns false if it violates the edge contract
    pub fn accept(&mut self, event: &KeyEvent) -> bool {
        if self.last_timestamp.is_some_and(|last| event.timestamp < last) {
            self.dropped_events += 1;
            log::debug!("dropping out-of-order {:?} of {}", event.event_type, event.key);
            return false;
        }

        let was_pressed = self.is_pressed(event.key);
        match event.event_type {
            KeyEventType::Press => {
                if was_pressed {
                    self.dropped_events += 1;
                    return false;
                }
                self.pressed_keys.push(event.key);
            }
            KeyEventType::Release => {
                if !was_pressed {
                    self.dropped_events += 1;
                    return false;
                }
                self.pressed_keys.retain(|k| *k != event.key);
            }
        }

        self.last_timestamp = Some(event.timestamp);
        self.total_events += 1;
        true
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Get all currently pressed keys, in press order
    pub fn pressed_keys(&self) -> &[KeyCode] {
        &self.pressed_keys
    }

    /// Accepted event count
    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    /// Events rejected by the edge contract
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    /// Reset all tracking
    pub fn reset(&mut self) {
        self.pressed_keys.clear();
        self.last_timestamp = None;
        self.total_events = 0;
        self.dropped_events = 0;
    }
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self::new()
    }
}

//! Trainable key pair and pass threshold

use crate::keyboard::KeyCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest accepted pass threshold
pub const MIN_THRESHOLD_MS: u32 = 10;
/// Highest accepted pass threshold
pub const MAX_THRESHOLD_MS: u32 = 200;
/// Threshold used when the entered text is not a number
pub const DEFAULT_THRESHOLD_MS: u32 = 100;

/// Keys offered for binding, in display order
pub const TRAINABLE_KEYS: [KeyCode; 9] = [
    KeyCode::A,
    KeyCode::D,
    KeyCode::W,
    KeyCode::S,
    KeyCode::C,
    KeyCode::Q,
    KeyCode::E,
    KeyCode::LEFT_SHIFT,
    KeyCode::LEFT_CTRL,
];

/// The two opposing keys being trained and the pass threshold.
///
/// `primary_key != secondary_key` always holds: setters refuse a key that is
/// already bound on the other side, and the option lists never offer it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    primary_key: KeyCode,
    secondary_key: KeyCode,
    threshold_ms: u32,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            primary_key: KeyCode::A,
            secondary_key: KeyCode::D,
            threshold_ms: DEFAULT_THRESHOLD_MS,
        }
    }
}

impl KeyBindings {
    /// Build a binding set; `None` if both keys are the same
    pub fn new(primary_key: KeyCode, secondary_key: KeyCode, threshold_ms: u32) -> Option<Self> {
        if primary_key == secondary_key {
            return None;
        }
        Some(Self {
            primary_key,
            secondary_key,
            threshold_ms: clamp_threshold(threshold_ms as i64),
        })
    }

    pub fn primary_key(&self) -> KeyCode {
        self.primary_key
    }

    pub fn secondary_key(&self) -> KeyCode {
        self.secondary_key
    }

    pub fn threshold_ms(&self) -> u32 {
        self.threshold_ms
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms as u64)
    }

    /// Whether `key` is one of the two trained keys
    pub fn is_bound(&self, key: KeyCode) -> bool {
        key == self.primary_key || key == self.secondary_key
    }

    /// The counter key for `key`, if `key` is bound
    pub fn opposite(&self, key: KeyCode) -> Option<KeyCode> {
        if key == self.primary_key {
            Some(self.secondary_key)
        } else if key == self.secondary_key {
            Some(self.primary_key)
        } else {
            None
        }
    }

    /// Rebind the primary key. Returns false and keeps the old key if `key`
    /// is the current secondary key.
    pub fn set_primary_key(&mut self, key: KeyCode) -> bool {
        if key == self.secondary_key {
            return false;
        }
        self.primary_key = key;
        true
    }

    /// Rebind the secondary key. Returns false and keeps the old key if `key`
    /// is the current primary key.
    pub fn set_secondary_key(&mut self, key: KeyCode) -> bool {
        if key == self.primary_key {
            return false;
        }
        self.secondary_key = key;
        true
    }

    /// Candidates for the primary key (everything but the secondary key)
    pub fn primary_options(&self) -> Vec<KeyCode> {
        options_excluding(self.secondary_key)
    }

    /// Candidates for the secondary key (everything but the primary key)
    pub fn secondary_options(&self) -> Vec<KeyCode> {
        options_excluding(self.primary_key)
    }

    /// Step the primary key to the next or previous candidate
    pub fn cycle_primary(&mut self, forward: bool) {
        let next = step_option(&self.primary_options(), self.primary_key, forward);
        self.set_primary_key(next);
    }

    /// Step the secondary key to the next or previous candidate
    pub fn cycle_secondary(&mut self, forward: bool) {
        let next = step_option(&self.secondary_options(), self.secondary_key, forward);
        self.set_secondary_key(next);
    }

    /// Set the threshold from free-form text.
    ///
    /// Empty or non-numeric text falls back to [`DEFAULT_THRESHOLD_MS`]; the
    /// result is always clamped to `[MIN_THRESHOLD_MS, MAX_THRESHOLD_MS]`.
    pub fn set_threshold(&mut self, raw: &str) -> u32 {
        let parsed = raw
            .trim()
            .parse::<i64>()
            .unwrap_or(DEFAULT_THRESHOLD_MS as i64);
        self.threshold_ms = clamp_threshold(parsed);
        self.threshold_ms
    }

    pub fn set_threshold_ms(&mut self, threshold_ms: u32) -> u32 {
        self.threshold_ms = clamp_threshold(threshold_ms as i64);
        self.threshold_ms
    }

    /// Repair values read from an untrusted source (e.g. a config file)
    pub fn normalized(mut self) -> Self {
        self.threshold_ms = clamp_threshold(self.threshold_ms as i64);
        if self.primary_key == self.secondary_key {
            let fallback = options_excluding(self.primary_key)
                .first()
                .copied()
                .unwrap_or(KeyCode::D);
            log::warn!(
                "primary and secondary key are both {}, rebinding secondary to {}",
                self.primary_key,
                fallback
            );
            self.secondary_key = fallback;
        }
        self
    }
}

fn clamp_threshold(value: i64) -> u32 {
    value.clamp(MIN_THRESHOLD_MS as i64, MAX_THRESHOLD_MS as i64) as u32
}

fn options_excluding(excluded: KeyCode) -> Vec<KeyCode> {
    TRAINABLE_KEYS
        .iter()
        .copied()
        .filter(|k| *k != excluded)
        .collect()
}

fn step_option(options: &[KeyCode], current: KeyCode, forward: bool) -> KeyCode {
    if options.is_empty() {
        return current;
    }
    let len = options.len();
    match options.iter().position(|k| *k == current) {
        Some(i) if forward => options[(i + 1) % len],
        Some(i) => options[(i + len - 1) % len],
        None => options[0],
    }
}

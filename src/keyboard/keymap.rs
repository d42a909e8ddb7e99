//! Key code definitions and display names

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Represents a physical key code (Linux evdev scancode numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const UNKNOWN: KeyCode = KeyCode(0);
    pub const ESCAPE: KeyCode = KeyCode(1);
    pub const Q: KeyCode = KeyCode(16);
    pub const W: KeyCode = KeyCode(17);
    pub const E: KeyCode = KeyCode(18);
    pub const ENTER: KeyCode = KeyCode(28);
    pub const LEFT_CTRL: KeyCode = KeyCode(29);
    pub const A: KeyCode = KeyCode(30);
    pub const S: KeyCode = KeyCode(31);
    pub const D: KeyCode = KeyCode(32);
    pub const LEFT_SHIFT: KeyCode = KeyCode(42);
    pub const C: KeyCode = KeyCode(46);
    pub const SPACE: KeyCode = KeyCode(57);

    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Display name for the key, e.g. "A" or "CTRL"
    pub fn name(&self) -> &'static str {
        get_key_info(*self).name
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<device_query::Keycode> for KeyCode {
    fn from(keycode: device_query::Keycode) -> Self {
        use device_query::Keycode as DK;
        let code = match keycode {
            DK::Escape => 1,
            DK::Key1 => 2,
            DK::Key2 => 3,
            DK::Key3 => 4,
            DK::Key4 => 5,
            DK::Key5 => 6,
            DK::Tab => 15,
            DK::Q => 16,
            DK::W => 17,
            DK::E => 18,
            DK::R => 19,
            DK::T => 20,
            DK::Enter => 28,
            DK::LControl => 29,
            DK::A => 30,
            DK::S => 31,
            DK::D => 32,
            DK::F => 33,
            DK::G => 34,
            DK::LShift => 42,
            DK::Z => 44,
            DK::X => 45,
            DK::C => 46,
            DK::V => 47,
            DK::B => 48,
            DK::RShift => 54,
            DK::LAlt => 56,
            DK::Space => 57,
            DK::CapsLock => 58,
            DK::RControl => 97,
            DK::Up => 103,
            DK::Left => 105,
            DK::Right => 106,
            DK::Down => 108,
            // Keys the trainer never binds
            _ => 0,
        };
        Self(code)
    }
}

/// Information about a key
#[derive(Debug, Clone)]
pub struct KeyInfo {
    /// Display name for the key
    pub name: &'static str,
    /// Short label for compact widgets
    pub label: &'static str,
}

impl KeyInfo {
    const fn new(name: &'static str, label: &'static str) -> Self {
        Self { name, label }
    }
}

/// Names for every key the listener can report
pub static KEYMAP: LazyLock<HashMap<KeyCode, KeyInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    map.insert(KeyCode(1), KeyInfo::new("ESC", "Esc"));
    map.insert(KeyCode(2), KeyInfo::new("1", "1"));
    map.insert(KeyCode(3), KeyInfo::new("2", "2"));
    map.insert(KeyCode(4), KeyInfo::new("3", "3"));
    map.insert(KeyCode(5), KeyInfo::new("4", "4"));
    map.insert(KeyCode(6), KeyInfo::new("5", "5"));
    map.insert(KeyCode(15), KeyInfo::new("TAB", "Tab"));
    map.insert(KeyCode(16), KeyInfo::new("Q", "Q"));
    map.insert(KeyCode(17), KeyInfo::new("W", "W"));
    map.insert(KeyCode(18), KeyInfo::new("E", "E"));
    map.insert(KeyCode(19), KeyInfo::new("R", "R"));
    map.insert(KeyCode(20), KeyInfo::new("T", "T"));
    map.insert(KeyCode(28), KeyInfo::new("ENTER", "Ent"));
    map.insert(KeyCode(29), KeyInfo::new("CTRL", "Ctrl"));
    map.insert(KeyCode(30), KeyInfo::new("A", "A"));
    map.insert(KeyCode(31), KeyInfo::new("S", "S"));
    map.insert(KeyCode(32), KeyInfo::new("D", "D"));
    map.insert(KeyCode(33), KeyInfo::new("F", "F"));
    map.insert(KeyCode(34), KeyInfo::new("G", "G"));
    map.insert(KeyCode(42), KeyInfo::new("SHIFT", "Shift"));
    map.insert(KeyCode(44), KeyInfo::new("Z", "Z"));
    map.insert(KeyCode(45), KeyInfo::new("X", "X"));
    map.insert(KeyCode(46), KeyInfo::new("C", "C"));
    map.insert(KeyCode(47), KeyInfo::new("V", "V"));
    map.insert(KeyCode(48), KeyInfo::new("B", "B"));
    map.insert(KeyCode(54), KeyInfo::new("RSHIFT", "RShift"));
    map.insert(KeyCode(56), KeyInfo::new("ALT", "Alt"));
    map.insert(KeyCode(57), KeyInfo::new("SPACE", "Space"));
    map.insert(KeyCode(58), KeyInfo::new("CAPS", "Caps"));
    map.insert(KeyCode(97), KeyInfo::new("RCTRL", "RCtrl"));
    map.insert(KeyCode(103), KeyInfo::new("UP", "↑"));
    map.insert(KeyCode(105), KeyInfo::new("LEFT", "←"));
    map.insert(KeyCode(106), KeyInfo::new("RIGHT", "→"));
    map.insert(KeyCode(108), KeyInfo::new("DOWN", "↓"));

    map
});

/// Get key info by code, returns a default if not found
pub fn get_key_info(code: KeyCode) -> KeyInfo {
    KEYMAP
        .get(&code)
        .cloned()
        .unwrap_or_else(|| KeyInfo::new("UNKNOWN", "?"))
}

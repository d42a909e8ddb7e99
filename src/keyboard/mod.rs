//! Keyboard event handling and state management

mod event;
mod state;
pub mod keymap;

pub use event::{sample_edges, KeyEvent, KeyEventType, KeyboardListener, ListenerHandle, POLL_INTERVAL};
pub use state::KeyboardState;
pub use keymap::{get_key_info, KeyCode, KeyInfo, KEYMAP};

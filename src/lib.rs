//! Counterstrafe Trainer - keyboard reflex trainer for movement key switches
//!
//! Measures how quickly a player releases one movement key and presses the
//! opposite one, scores each round, and runs fixed-length sessions in a
//! terminal UI.

pub mod bindings;
pub mod clock;
pub mod config;
pub mod event;
pub mod keyboard;
pub mod report;
pub mod reporter;
pub mod round;
pub mod session;
pub mod testing;
pub mod timer;
pub mod ui;
pub mod utils;

pub use bindings::KeyBindings;
pub use config::Config;
pub use event::TrainerEvent;
pub use round::{ReasonCode, RoundEvaluator, RoundOutcome, RoundPolicy};
pub use session::{Phase, SessionController, SessionSettings};

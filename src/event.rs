//! Events delivered to the session controller
//!
//! Every producer (key listener, alarm threads, terminal controls, the
//! Ctrl-C handler) sends a [`TrainerEvent`] into one `mpsc` channel and the
//! main loop is the only consumer. That channel is the single point through
//! which round state is mutated.

use crate::keyboard::KeyEvent;
use crate::timer::TimerToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainerEvent {
    /// A physical key edge
    Key(KeyEvent),
    /// The switch deadline armed with this token expired
    Deadline(TimerToken),
    /// The outcome display period armed with this token ended
    Intermission(TimerToken),
    /// Begin a new session from Setup
    Start,
    /// Abandon the running session and return to Setup
    Abort,
    /// Dismiss the final score and return to Setup
    Acknowledge,
    /// Leave the application
    Quit,
}

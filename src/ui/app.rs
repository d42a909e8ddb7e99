//! Main application state and logic

use crate::bindings::KeyBindings;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ConfigError};
use crate::event::TrainerEvent;
use crate::keyboard::KeyboardState;
use crate::report::SessionReport;
use crate::reporter::{Reporter, StyleHint};
use crate::round::RoundOutcome;
use crate::session::{Phase, SessionController};
use crate::timer::{Alarm, ChannelAlarm};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Instant;

/// Rounds kept for the history panel
const HISTORY_LEN: usize = 10;

/// Application running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

/// Setup field with keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    Primary,
    Secondary,
    Threshold,
}

impl SetupField {
    pub fn all() -> &'static [SetupField] {
        &[Self::Primary, Self::Secondary, Self::Threshold]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Primary => "Primary key",
            Self::Secondary => "Secondary key",
            Self::Threshold => "Threshold (ms)",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
            Self::Threshold => 2,
        }
    }

    fn next(self) -> Self {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    fn prev(self) -> Self {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}

/// Presentation state fed by the session controller
#[derive(Debug, Clone)]
pub struct Feedback {
    pub label: String,
    pub style: StyleHint,
    pub moving: bool,
    pub history: VecDeque<RoundOutcome>,
    pub final_score: Option<u32>,
}

impl Default for Feedback {
    fn default() -> Self {
        Self {
            label: "Ready".to_string(),
            style: StyleHint::Neutral,
            moving: false,
            history: VecDeque::with_capacity(HISTORY_LEN),
            final_score: None,
        }
    }
}

impl Reporter for Feedback {
    fn on_state_changed(&mut self, label: &str, style: StyleHint) {
        log::debug!("label: {}", label);
        self.label = label.to_string();
        self.style = style;
    }

    fn on_round_resolved(&mut self, outcome: &RoundOutcome) {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(outcome.clone());
    }

    fn on_session_complete(&mut self, total_score: u32, _max_rounds: u32, _threshold_ms: u32) {
        self.final_score = Some(total_score);
    }

    fn on_movement(&mut self, moving: bool) {
        self.moving = moving;
    }
}

/// Main application
pub struct App<A: Alarm = ChannelAlarm<TrainerEvent>, C: Clock = SystemClock> {
    /// Application state
    pub state: AppState,
    /// Configuration as loaded, updated on save
    pub config: Config,
    /// Edge filter in front of the controller
    pub keyboard_state: KeyboardState,
    /// Setup field with focus
    pub focus: SetupField,
    /// Threshold digits typed but not yet applied
    pub threshold_input: String,
    controller: SessionController<Feedback, A, C>,
    start_time: Instant,
    status_message: Option<String>,
    status_time: Option<Instant>,
}

impl<A: Alarm, C: Clock> App<A, C> {
    pub fn new(config: Config, deadline: A, intermission: A, clock: C) -> Self {
        let controller = SessionController::new(
            config.session_settings(),
            deadline,
            intermission,
            clock,
            Feedback::default(),
        );
        Self {
            state: AppState::Running,
            threshold_input: config.bindings.threshold_ms().to_string(),
            config,
            keyboard_state: KeyboardState::new(),
            focus: SetupField::Primary,
            controller,
            start_time: Instant::now(),
            status_message: None,
            status_time: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn controller(&self) -> &SessionController<Feedback, A, C> {
        &self.controller
    }

    pub fn bindings(&self) -> &KeyBindings {
        self.controller.bindings()
    }

    pub fn feedback(&self) -> &Feedback {
        self.controller.reporter()
    }

    /// Whether setup fields may be edited right now
    pub fn is_editable(&self) -> bool {
        matches!(self.phase(), Phase::Setup | Phase::Complete)
    }

    /// Route one queued event
    pub fn dispatch(&mut self, event: TrainerEvent) {
        match event {
            TrainerEvent::Key(key) => {
                if self.keyboard_state.accept(&key) {
                    self.controller.handle_key(&key);
                }
            }
            TrainerEvent::Quit => self.quit(),
            TrainerEvent::Start => self.start(),
            TrainerEvent::Acknowledge => {
                if self.controller.acknowledge() {
                    self.controller.reporter_mut().final_score = None;
                }
            }
            other => self.controller.dispatch(other),
        }
    }

    /// Clock-driven work for one frame
    pub fn tick(&mut self) {
        self.controller.tick();
    }

    fn start(&mut self) {
        self.commit_threshold();
        if self.controller.start() {
            log::debug!(
                "input so far: {} accepted, {} dropped, held {:?}",
                self.keyboard_state.total_events(),
                self.keyboard_state.dropped_events(),
                self.keyboard_state.pressed_keys()
            );
            self.controller.reporter_mut().history.clear();
            self.controller.reporter_mut().final_score = None;
        }
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.state = AppState::Quitting;
    }

    /// Move focus to the next setup field
    pub fn next_field(&mut self) {
        self.commit_threshold();
        self.focus = self.focus.next();
    }

    /// Move focus to the previous setup field
    pub fn prev_field(&mut self) {
        self.commit_threshold();
        self.focus = self.focus.prev();
    }

    /// Cycle the focused key binding or step the threshold
    pub fn adjust(&mut self, forward: bool) {
        let focus = self.focus;
        let Some(bindings) = self.controller.bindings_mut() else {
            return;
        };
        match focus {
            SetupField::Primary => bindings.cycle_primary(forward),
            SetupField::Secondary => bindings.cycle_secondary(forward),
            SetupField::Threshold => {
                let step: i64 = if forward { 5 } else { -5 };
                let next = (bindings.threshold_ms() as i64 + step).max(0) as u32;
                let applied = bindings.set_threshold_ms(next);
                self.threshold_input = applied.to_string();
            }
        }
    }

    /// Append a digit to the threshold being typed
    pub fn push_digit(&mut self, c: char) {
        if self.focus == SetupField::Threshold && self.is_editable() && c.is_ascii_digit() {
            if self.threshold_input.len() < 4 {
                self.threshold_input.push(c);
            }
        }
    }

    pub fn pop_digit(&mut self) {
        if self.focus == SetupField::Threshold && self.is_editable() {
            self.threshold_input.pop();
        }
    }

    /// Apply the typed threshold; malformed input falls back to the default
    pub fn commit_threshold(&mut self) {
        let input = std::mem::take(&mut self.threshold_input);
        let applied = match self.controller.bindings_mut() {
            Some(bindings) => {
                let applied = bindings.set_threshold(&input);
                if applied.to_string() != input.trim() {
                    self.set_status(format!("Threshold set to {}ms", applied));
                }
                applied
            }
            None => self.controller.bindings().threshold_ms(),
        };
        self.threshold_input = applied.to_string();
    }

    /// Persist the current bindings to the config file
    pub fn save_config(&mut self) -> Result<(), ConfigError> {
        self.commit_threshold();
        self.config.bindings = *self.controller.bindings();
        match self.config.save() {
            Ok(()) => {
                self.set_status("Settings saved".to_string());
                Ok(())
            }
            Err(e) => {
                log::error!("failed to save config: {}", e);
                self.set_status(format!("Save failed: {}", e));
                Err(e)
            }
        }
    }

    /// Set a status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(Instant::now());
    }

    /// Get status message if still valid (within 3 seconds)
    pub fn get_status(&self) -> Option<&str> {
        match (&self.status_message, self.status_time) {
            (Some(msg), Some(time)) if time.elapsed().as_secs() < 3 => Some(msg),
            _ => None,
        }
    }

    /// "round i/N" for the status bar
    pub fn progress(&self) -> String {
        let session = self.controller.session();
        match self.phase() {
            Phase::Setup => format!("0/{}", self.controller.settings().max_rounds),
            Phase::Playing => format!("{}/{}", session.round_index + 1, session.max_rounds),
            Phase::Intermission | Phase::Complete => {
                format!("{}/{}", session.round_index, session.max_rounds)
            }
        }
    }

    /// Get elapsed time formatted
    pub fn elapsed_formatted(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Report for the last completed session
    pub fn generate_report(&self) -> Option<SessionReport> {
        self.controller
            .completed_session()
            .map(SessionReport::new)
    }

    /// Export the last completed session to a JSON file
    pub fn export_report(&mut self, filename: &str) -> Result<String, std::io::Error> {
        let Some(report) = self.generate_report() else {
            self.set_status("No completed session to export".to_string());
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no completed session",
            ));
        };
        report.export_json(Path::new(filename))?;
        let msg = format!("Exported to {}", filename);
        log::info!("{}", msg);
        self.set_status(msg.clone());
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::KeyCode;
    use crate::testing::{press_at, release_at, ManualAlarm, ManualClock};

    fn app() -> (App<ManualAlarm, ManualClock>, ManualAlarm, ManualClock) {
        let pause = ManualAlarm::new();
        let clock = ManualClock::new();
        let app = App::new(Config::default(), ManualAlarm::new(), pause.clone(), clock.clone());
        (app, pause, clock)
    }

    #[test]
    fn feedback_tracks_round() {
        let (mut app, _, clock) = app();
        app.dispatch(TrainerEvent::Start);
        let base = clock.base();

        app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, 0)));
        assert!(app.feedback().moving);
        assert_eq!(app.feedback().label, "HOLDING A");

        app.dispatch(TrainerEvent::Key(release_at(KeyCode::A, base, 200)));
        app.dispatch(TrainerEvent::Key(press_at(KeyCode::D, base, 250)));
        assert!(!app.feedback().moving);
        assert_eq!(app.feedback().label, "SUCCESS - 50ms");
        assert_eq!(app.feedback().style, StyleHint::Success);
        assert_eq!(app.feedback().history.len(), 1);
        assert_eq!(app.progress(), "1/10");
    }

    #[test]
    fn repeated_presses_are_filtered() {
        let (mut app, _, clock) = app();
        app.dispatch(TrainerEvent::Start);
        let base = clock.base();

        app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, 0)));
        app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, 30)));
        app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, 60)));
        assert_eq!(app.keyboard_state.dropped_events(), 2);
        assert_eq!(app.feedback().label, "HOLDING A");
        assert!(app.feedback().history.is_empty());
    }

    #[test]
    fn setup_editing() {
        let (mut app, _, _) = app();
        app.adjust(true);
        // D is bound on the other side, so it is skipped
        assert_eq!(app.bindings().primary_key(), KeyCode::W);
        assert_eq!(app.bindings().secondary_key(), KeyCode::D);

        app.next_field();
        app.next_field();
        assert_eq!(app.focus, SetupField::Threshold);
        app.threshold_input.clear();
        app.push_digit('4');
        app.push_digit('x');
        app.push_digit('5');
        app.commit_threshold();
        assert_eq!(app.bindings().threshold_ms(), 45);

        app.threshold_input = "abc".to_string();
        app.commit_threshold();
        assert_eq!(app.bindings().threshold_ms(), 100);
        assert_eq!(app.threshold_input, "100");
    }

    #[test]
    fn setup_locked_while_playing() {
        let (mut app, _, _) = app();
        app.dispatch(TrainerEvent::Start);
        let before = *app.bindings();
        app.adjust(true);
        app.focus = SetupField::Threshold;
        app.push_digit('1');
        assert_eq!(*app.bindings(), before);
        assert!(!app.is_editable());
    }

    #[test]
    fn export_requires_completed_session() {
        let (mut app, _, _) = app();
        assert!(app.generate_report().is_none());
        assert!(app.export_report("unused.json").is_err());
    }

    #[test]
    fn quit_event_stops_app() {
        let (mut app, _, _) = app();
        app.dispatch(TrainerEvent::Quit);
        assert_eq!(app.state, AppState::Quitting);
    }

    #[test]
    fn focus_wraps() {
        assert_eq!(SetupField::Threshold.next(), SetupField::Primary);
        assert_eq!(SetupField::Primary.prev(), SetupField::Threshold);
    }
}

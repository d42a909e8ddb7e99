//! Session lifecycle: a fixed number of rounds, scoring, and pacing
//!
//! The controller is the only owner of round state. Everything reaches it
//! through [`SessionController::dispatch`] (or the individual handlers), one
//! event at a time, from the thread that drains the event channel.

use crate::bindings::KeyBindings;
use crate::clock::Clock;
use crate::event::TrainerEvent;
use crate::keyboard::KeyEvent;
use crate::reporter::{Reporter, StyleHint};
use crate::round::{ReasonCode, RoundEvaluator, RoundOutcome, RoundPolicy, Step};
use crate::timer::{Alarm, TimerToken};
use std::time::{Duration, Instant};

/// Settings fixed for the duration of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub bindings: KeyBindings,
    pub policy: RoundPolicy,
    /// How long an outcome stays on screen before the next round
    pub result_display: Duration,
    pub max_rounds: u32,
    /// Upper bound on the reported final score; `None` reports the raw sum
    pub score_cap: Option<u32>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        crate::config::Config::default().session_settings()
    }
}

/// Where the session is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Choosing keys and threshold
    Setup,
    /// A round is live and accepting input
    Playing,
    /// The last outcome is on screen; input is ignored
    Intermission,
    /// All rounds done, final score shown until acknowledged
    Complete,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Playing => "PLAYING",
            Self::Intermission => "RESULT",
            Self::Complete => "COMPLETE",
        }
    }
}

/// Progress and score of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub round_index: u32,
    pub max_rounds: u32,
    pub total_score: u32,
    pub outcomes: Vec<RoundOutcome>,
    pub threshold_ms: u32,
    /// Settings the session is played with, fixed at start
    pub settings: SessionSettings,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            round_index: 0,
            max_rounds: settings.max_rounds,
            total_score: 0,
            outcomes: Vec::with_capacity(settings.max_rounds as usize),
            threshold_ms: settings.bindings.threshold_ms(),
            settings,
            started_at: None,
            finished_at: None,
        }
    }

    fn record(&mut self, outcome: RoundOutcome) {
        self.total_score = self.total_score.saturating_add(outcome.score_delta);
        self.round_index += 1;
        self.outcomes.push(outcome);
    }

    pub fn is_finished(&self) -> bool {
        self.round_index >= self.max_rounds
    }

    /// Score after applying the session's optional cap
    pub fn final_score(&self) -> u32 {
        self.settings
            .score_cap
            .map_or(self.total_score, |cap| self.total_score.min(cap))
    }

    pub fn passes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }
}

/// Drives rounds from Setup to Complete and reports progress
pub struct SessionController<R: Reporter, A: Alarm, C: Clock> {
    settings: SessionSettings,
    phase: Phase,
    session: Session,
    completed: Option<Session>,
    evaluator: RoundEvaluator<A>,
    intermission: A,
    intermission_token: Option<TimerToken>,
    intermission_due: Option<Instant>,
    clock: C,
    reporter: R,
}

impl<R: Reporter, A: Alarm, C: Clock> SessionController<R, A, C> {
    /// `deadline` becomes the round evaluator's switch alarm; `intermission`
    /// paces the outcome display between rounds.
    pub fn new(settings: SessionSettings, deadline: A, intermission: A, clock: C, reporter: R) -> Self {
        Self {
            session: Session::new(settings),
            evaluator: RoundEvaluator::new(settings.policy, deadline),
            settings,
            phase: Phase::Setup,
            completed: None,
            intermission,
            intermission_token: None,
            intermission_due: None,
            clock,
            reporter,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.settings.bindings
    }

    /// Mutable settings, only while no session is running
    pub fn settings_mut(&mut self) -> Option<&mut SessionSettings> {
        match self.phase {
            Phase::Setup | Phase::Complete => Some(&mut self.settings),
            Phase::Playing | Phase::Intermission => None,
        }
    }

    /// Mutable key bindings, only while no session is running
    pub fn bindings_mut(&mut self) -> Option<&mut KeyBindings> {
        self.settings_mut().map(|s| &mut s.bindings)
    }

    /// The session in progress (or the empty one in Setup)
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The most recent session that reached Complete
    pub fn completed_session(&self) -> Option<&Session> {
        self.completed.as_ref()
    }

    pub fn evaluator(&self) -> &RoundEvaluator<A> {
        &self.evaluator
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    /// Single entry point for queued events
    pub fn dispatch(&mut self, event: TrainerEvent) {
        match event {
            TrainerEvent::Key(key) => self.handle_key(&key),
            TrainerEvent::Deadline(token) => self.on_deadline(token),
            TrainerEvent::Intermission(token) => self.on_intermission(token),
            TrainerEvent::Start => {
                self.start();
            }
            TrainerEvent::Abort => {
                self.abort();
            }
            TrainerEvent::Acknowledge => {
                self.acknowledge();
            }
            TrainerEvent::Quit => {}
        }
    }

    /// Begin a new session. Only valid in Setup.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Setup {
            return false;
        }

        let threshold_ms = self.settings.bindings.threshold_ms();
        self.session = Session::new(self.settings);
        self.session.started_at = Some(self.clock.now());
        self.evaluator.set_policy(self.settings.policy);
        self.evaluator.rearm();
        self.phase = Phase::Playing;

        log::info!(
            "session started: {} vs {}, threshold {}ms, {} rounds",
            self.settings.bindings.primary_key(),
            self.settings.bindings.secondary_key(),
            threshold_ms,
            self.settings.max_rounds
        );
        self.reporter.on_movement(false);
        self.report_ready();
        true
    }

    /// Tear down the running session without scoring it.
    ///
    /// Refused once the last round has an outcome: that session is scored
    /// and only waits for its final display.
    pub fn abort(&mut self) -> bool {
        let abortable = match self.phase {
            Phase::Playing => true,
            Phase::Intermission => !self.session.is_finished(),
            Phase::Setup | Phase::Complete => false,
        };
        if !abortable {
            return false;
        }

        self.evaluator.rearm();
        self.cancel_intermission();
        log::info!(
            "session aborted after {}/{} rounds",
            self.session.round_index,
            self.session.max_rounds
        );
        self.session = Session::new(self.settings);
        self.phase = Phase::Setup;
        self.reporter.on_movement(false);
        self.reporter.on_state_changed("Aborted", StyleHint::Neutral);
        true
    }

    /// Dismiss the final score and go back to Setup
    pub fn acknowledge(&mut self) -> bool {
        if self.phase != Phase::Complete {
            return false;
        }
        self.phase = Phase::Setup;
        self.session = Session::new(self.settings);
        self.reporter.on_state_changed("Ready", StyleHint::Neutral);
        true
    }

    /// Feed a key edge to the live round
    pub fn handle_key(&mut self, event: &KeyEvent) {
        if self.phase != Phase::Playing {
            return;
        }
        let step = self.evaluator.on_key(event, &self.settings.bindings);
        self.apply(step);
    }

    /// The switch deadline with `token` expired
    pub fn on_deadline(&mut self, token: TimerToken) {
        if self.phase != Phase::Playing {
            return;
        }
        let step = self.evaluator.on_deadline(token);
        self.apply(step);
    }

    /// The outcome display period with `token` ended
    pub fn on_intermission(&mut self, token: TimerToken) {
        if self.phase == Phase::Intermission && self.intermission_token == Some(token) {
            self.advance();
        }
    }

    /// Clock-driven checks; call once per frame
    pub fn tick(&mut self) {
        let now = self.clock.now();
        match self.phase {
            Phase::Playing => {
                let step = self.evaluator.check_deadline(now);
                self.apply(step);
            }
            Phase::Intermission if self.intermission_due.is_some_and(|due| now >= due) => {
                self.advance();
            }
            _ => {}
        }
    }

    fn apply(&mut self, step: Step) {
        match step {
            Step::Ignored => {}
            Step::Holding(key) => {
                self.reporter.on_state_changed(&format!("HOLDING {}", key), StyleHint::Neutral);
                self.reporter.on_movement(true);
            }
            Step::Waiting { .. } => {
                self.reporter.on_state_changed("WAITING...", StyleHint::Neutral);
            }
            Step::Resolved(outcome) => self.finish_round(outcome),
        }
    }

    fn finish_round(&mut self, outcome: RoundOutcome) {
        self.reporter.on_movement(false);
        self.reporter.on_round_resolved(&outcome);

        let (label, style) = outcome_label(&outcome);
        self.reporter.on_state_changed(&label, style);

        self.session.record(outcome);
        log::info!(
            "round {}/{} done, total {}",
            self.session.round_index,
            self.session.max_rounds,
            self.session.total_score
        );

        self.phase = Phase::Intermission;
        let display = self.settings.result_display;
        self.intermission_token = Some(self.intermission.arm(display));
        self.intermission_due = Some(self.clock.now() + display);
    }

    fn advance(&mut self) {
        self.cancel_intermission();

        if self.session.is_finished() {
            self.session.finished_at = Some(self.clock.now());
            self.phase = Phase::Complete;

            let score = self.session.final_score();
            let label = match self.session.settings.score_cap {
                Some(cap) => format!("Final Score: {} / {}", score, cap),
                None => format!("Final Score: {}", score),
            };
            self.reporter.on_state_changed(&label, StyleHint::Neutral);
            self.reporter.on_session_complete(
                score,
                self.session.max_rounds,
                self.session.threshold_ms,
            );
            self.completed = Some(self.session.clone());
        } else {
            self.evaluator.rearm();
            self.phase = Phase::Playing;
            self.report_ready();
        }
    }

    fn cancel_intermission(&mut self) {
        self.intermission.cancel();
        self.intermission_token = None;
        self.intermission_due = None;
    }

    fn report_ready(&mut self) {
        let label = format!(
            "Ready - round {}/{}",
            self.session.round_index + 1,
            self.session.max_rounds
        );
        self.reporter.on_state_changed(&label, StyleHint::Neutral);
    }
}

/// Headline text for an outcome
pub fn outcome_label(outcome: &RoundOutcome) -> (String, StyleHint) {
    match outcome.reason {
        ReasonCode::Success => (format!("SUCCESS - {}ms", outcome.elapsed_ms), StyleHint::Success),
        ReasonCode::TooSlowSwitch => (format!("FAIL - {}ms", outcome.elapsed_ms), StyleHint::Fail),
        ReasonCode::Timeout => (
            format!("FAIL - TIMEOUT ({}ms)", outcome.elapsed_ms),
            StyleHint::Fail,
        ),
        ReasonCode::Overlap => ("FAIL - OVERLAP".to_string(), StyleHint::Fail),
        ReasonCode::TooShortHold => (
            format!("FAIL - HOLD TOO SHORT ({}ms)", outcome.elapsed_ms),
            StyleHint::Fail,
        ),
    }
}

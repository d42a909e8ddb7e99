//! Integration tests for Counterstrafe Trainer
//!
//! These drive whole sessions through the public API: the session controller
//! with deterministic alarms and clock, the App event pipeline, config
//! persistence, report generation, and one run on real alarm threads.

use counterstrafe_trainer::config::Config;
use counterstrafe_trainer::event::TrainerEvent;
use counterstrafe_trainer::keyboard::{KeyCode, KeyEvent};
use counterstrafe_trainer::report::SessionReport;
use counterstrafe_trainer::reporter::{RecordingReporter, Reported, StyleHint};
use counterstrafe_trainer::session::{Phase, SessionController, SessionSettings};
use counterstrafe_trainer::testing::{press_at, release_at, ManualAlarm, ManualClock};
use counterstrafe_trainer::timer::ChannelAlarm;
use counterstrafe_trainer::ui::{App, SetupField};
use counterstrafe_trainer::{KeyBindings, ReasonCode};
use std::sync::mpsc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Rig {
    ctl: SessionController<RecordingReporter, ManualAlarm, ManualClock>,
    deadline: ManualAlarm,
    pause: ManualAlarm,
    clock: ManualClock,
}

fn rig(settings: SessionSettings) -> Rig {
    let deadline = ManualAlarm::new();
    let pause = ManualAlarm::new();
    let clock = ManualClock::new();
    let ctl = SessionController::new(
        settings,
        deadline.clone(),
        pause.clone(),
        clock.clone(),
        RecordingReporter::new(),
    );
    Rig {
        ctl,
        deadline,
        pause,
        clock,
    }
}

impl Rig {
    fn key(&mut self, event: KeyEvent) {
        self.ctl.dispatch(TrainerEvent::Key(event));
    }

    /// Hold `first` for 200ms starting at `t`, then press `second` after `gap`
    fn switch(&mut self, first: KeyCode, second: KeyCode, t: u64, gap: u64) {
        let base = self.clock.base();
        self.key(press_at(first, base, t));
        self.key(release_at(first, base, t + 200));
        self.key(press_at(second, base, t + 200 + gap));
        self.key(release_at(second, base, t + 260 + gap));
    }

    fn next_round(&mut self) {
        let token = self.pause.fire().expect("intermission armed");
        self.ctl.dispatch(TrainerEvent::Intermission(token));
    }

    fn last_outcome_reason(&self) -> ReasonCode {
        self.ctl
            .reporter()
            .outcomes()
            .last()
            .map(|o| o.reason)
            .expect("an outcome")
    }
}

// ---------------------------------------------------------------------------
// Round scenarios
// ---------------------------------------------------------------------------

#[test]
fn sixty_ms_switch_scores_sixteen() {
    let mut r = rig(SessionSettings::default());
    r.ctl.dispatch(TrainerEvent::Start);

    let base = r.clock.base();
    r.key(press_at(KeyCode::A, base, 0));
    r.key(release_at(KeyCode::A, base, 300));
    r.key(press_at(KeyCode::D, base, 360));

    let outcomes = r.ctl.reporter().outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].passed);
    assert_eq!(outcomes[0].elapsed_ms, 60);
    assert_eq!(outcomes[0].score_delta, 16);
    assert_eq!(outcomes[0].hold_ms, Some(300));
    assert_eq!(
        r.ctl.reporter().last_label(),
        Some(("SUCCESS - 60ms", StyleHint::Success))
    );
}

#[test]
fn slow_switch_fails_without_points() {
    let mut r = rig(SessionSettings::default());
    r.ctl.dispatch(TrainerEvent::Start);
    r.switch(KeyCode::A, KeyCode::D, 0, 400);

    assert_eq!(r.last_outcome_reason(), ReasonCode::TooSlowSwitch);
    assert_eq!(r.ctl.session().total_score, 0);
    assert_eq!(
        r.ctl.reporter().last_label(),
        Some(("FAIL - 400ms", StyleHint::Fail))
    );
}

#[test]
fn no_switch_times_out() {
    let mut r = rig(SessionSettings::default());
    r.ctl.dispatch(TrainerEvent::Start);

    let base = r.clock.base();
    r.key(press_at(KeyCode::A, base, 0));
    r.key(release_at(KeyCode::A, base, 300));
    assert_eq!(r.deadline.pending_duration(), Some(Duration::from_millis(1000)));

    let token = r.deadline.fire().expect("armed");
    r.ctl.dispatch(TrainerEvent::Deadline(token));

    assert_eq!(r.last_outcome_reason(), ReasonCode::Timeout);
    assert_eq!(
        r.ctl.reporter().last_label(),
        Some(("FAIL - TIMEOUT (1000ms)", StyleHint::Fail))
    );
}

#[test]
fn overlapping_keys_fail() {
    let mut r = rig(SessionSettings::default());
    r.ctl.dispatch(TrainerEvent::Start);

    let base = r.clock.base();
    r.key(press_at(KeyCode::A, base, 0));
    r.key(press_at(KeyCode::D, base, 120));

    assert_eq!(r.last_outcome_reason(), ReasonCode::Overlap);
    assert_eq!(r.ctl.reporter().last_label(), Some(("FAIL - OVERLAP", StyleHint::Fail)));
    assert_eq!(r.ctl.phase(), Phase::Intermission);
}

#[test]
fn rebound_keys_are_trained() {
    let mut settings = SessionSettings::default();
    settings.bindings = KeyBindings::new(KeyCode::W, KeyCode::S, 80).expect("distinct keys");
    let mut r = rig(settings);
    r.ctl.dispatch(TrainerEvent::Start);

    // The old bindings do nothing
    r.switch(KeyCode::A, KeyCode::D, 0, 30);
    assert!(r.ctl.reporter().outcomes().is_empty());

    r.switch(KeyCode::S, KeyCode::W, 1000, 80);
    assert_eq!(r.last_outcome_reason(), ReasonCode::Success);
    assert_eq!(r.ctl.reporter().outcomes()[0].active_key, KeyCode::S);
    assert_eq!(r.ctl.session().total_score, 12);
}

// ---------------------------------------------------------------------------
// Full sessions
// ---------------------------------------------------------------------------

#[test]
fn full_session_report_matches_rounds() {
    let mut r = rig(SessionSettings::default());
    r.ctl.dispatch(TrainerEvent::Start);

    let gaps = [40u64, 60, 150, 25, 100, 101, 5, 80, 300, 50];
    for (i, gap) in gaps.iter().enumerate() {
        let (first, second) = if i % 2 == 0 {
            (KeyCode::A, KeyCode::D)
        } else {
            (KeyCode::D, KeyCode::A)
        };
        r.switch(first, second, i as u64 * 3000, *gap);
        r.next_round();
    }

    assert_eq!(r.ctl.phase(), Phase::Complete);
    let expected: u32 = gaps
        .iter()
        .filter(|g| **g <= 100)
        .map(|g| (1000 / *g) as u32)
        .sum();
    assert_eq!(r.ctl.session().total_score, expected);
    assert!(r.ctl.reporter().events.contains(&Reported::Complete {
        total_score: expected,
        max_rounds: 10,
        threshold_ms: 100,
    }));

    let session = r.ctl.completed_session().expect("completed");
    let report = SessionReport::new(session);
    assert_eq!(report.summary.rounds_played, 10);
    assert_eq!(report.summary.passes, 7);
    assert_eq!(report.summary.total_score, expected);
    assert_eq!(report.summary.best_switch_ms, Some(5));
    assert_eq!(report.summary.worst_switch_ms, Some(300));
    assert_eq!(report.rounds.len(), 10);
    assert_eq!(report.rounds[1].key, "D");

    let json = report.to_json().expect("serializes");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["summary"]["passes"], 7);
    assert_eq!(value["rounds"][2]["reason"], "too_slow_switch");

    assert!(r.ctl.acknowledge());
    assert_eq!(r.ctl.phase(), Phase::Setup);
    // The finished session stays available for export
    assert!(r.ctl.completed_session().is_some());
}

#[test]
fn aborted_session_can_restart_cleanly() {
    let mut r = rig(SessionSettings::default());
    r.ctl.dispatch(TrainerEvent::Start);
    r.switch(KeyCode::A, KeyCode::D, 0, 10);
    r.next_round();

    let base = r.clock.base();
    r.key(press_at(KeyCode::A, base, 5000));
    r.ctl.dispatch(TrainerEvent::Abort);
    assert_eq!(r.ctl.phase(), Phase::Setup);
    assert_eq!(r.ctl.reporter().last_label(), Some(("Aborted", StyleHint::Neutral)));

    r.ctl.dispatch(TrainerEvent::Start);
    assert_eq!(r.ctl.session().round_index, 0);
    assert_eq!(r.ctl.session().total_score, 0);

    // The held A from before the abort does not leak into the new round
    r.key(release_at(KeyCode::A, base, 5100));
    assert_eq!(r.ctl.evaluator().state().name(), "Idle");
}

// ---------------------------------------------------------------------------
// App pipeline
// ---------------------------------------------------------------------------

#[test]
fn app_filters_auto_repeat_and_completes_session() {
    let pause = ManualAlarm::new();
    let clock = ManualClock::new();
    let mut config = Config::default();
    config.policy.max_rounds = 2;
    let mut app = App::new(config, ManualAlarm::new(), pause.clone(), clock.clone());

    app.dispatch(TrainerEvent::Start);
    let base = clock.base();
    for round in 0..2u64 {
        let t = round * 3000;
        app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, t)));
        // OS auto-repeat while held
        app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, t + 30)));
        app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, t + 60)));
        app.dispatch(TrainerEvent::Key(release_at(KeyCode::A, base, t + 200)));
        app.dispatch(TrainerEvent::Key(press_at(KeyCode::D, base, t + 250)));
        app.dispatch(TrainerEvent::Key(release_at(KeyCode::D, base, t + 300)));

        let token = pause.fire().expect("intermission armed");
        app.dispatch(TrainerEvent::Intermission(token));
    }

    assert_eq!(app.phase(), Phase::Complete);
    assert_eq!(app.feedback().final_score, Some(40));
    assert_eq!(app.feedback().label, "Final Score: 40");
    assert_eq!(app.keyboard_state.dropped_events(), 4);

    let report = app.generate_report().expect("completed session");
    assert_eq!(report.summary.passes, 2);

    app.dispatch(TrainerEvent::Acknowledge);
    assert_eq!(app.phase(), Phase::Setup);
    assert_eq!(app.feedback().final_score, None);
}

#[test]
fn report_ignores_settings_changed_after_session() {
    let pause = ManualAlarm::new();
    let clock = ManualClock::new();
    let mut config = Config::default();
    config.policy.max_rounds = 1;
    let mut app = App::new(config, ManualAlarm::new(), pause.clone(), clock.clone());

    app.dispatch(TrainerEvent::Start);
    let base = clock.base();
    app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, 0)));
    app.dispatch(TrainerEvent::Key(release_at(KeyCode::A, base, 200)));
    app.dispatch(TrainerEvent::Key(press_at(KeyCode::D, base, 202)));
    let token = pause.fire().expect("intermission armed");
    app.dispatch(TrainerEvent::Intermission(token));
    assert_eq!(app.phase(), Phase::Complete);

    // Rebind the primary key and lower the threshold while the score is shown
    app.adjust(true);
    app.focus = SetupField::Threshold;
    app.threshold_input = "20".to_string();
    app.commit_threshold();
    assert_eq!(app.bindings().primary_key(), KeyCode::W);

    let report = app.generate_report().expect("completed session");
    assert_eq!(report.summary.primary_key, "A");
    assert_eq!(report.summary.threshold_ms, 100);
    assert_eq!(report.summary.total_score, 500);
    assert_eq!(report.summary.final_score, 500);
    assert_eq!(report.rounds[0].key, "A");
}

#[test]
fn app_intermission_advances_on_tick() {
    let clock = ManualClock::new();
    let mut app = App::new(Config::default(), ManualAlarm::new(), ManualAlarm::new(), clock.clone());
    app.dispatch(TrainerEvent::Start);

    let base = clock.base();
    app.dispatch(TrainerEvent::Key(press_at(KeyCode::D, base, 0)));
    app.dispatch(TrainerEvent::Key(release_at(KeyCode::D, base, 200)));
    clock.set_ms(270);
    app.dispatch(TrainerEvent::Key(press_at(KeyCode::A, base, 270)));
    assert_eq!(app.phase(), Phase::Intermission);

    clock.set_ms(270 + 1499);
    app.tick();
    assert_eq!(app.phase(), Phase::Intermission);

    clock.set_ms(270 + 1500);
    app.tick();
    assert_eq!(app.phase(), Phase::Playing);
    assert_eq!(app.feedback().label, "Ready - round 2/10");
}

// ---------------------------------------------------------------------------
// Config persistence
// ---------------------------------------------------------------------------

#[test]
fn config_round_trips_through_file() {
    let path = std::env::temp_dir().join(format!(
        "counterstrafe-it-config-{}.toml",
        std::process::id()
    ));

    let mut config = Config::default();
    config.bindings = KeyBindings::new(KeyCode::LEFT_SHIFT, KeyCode::LEFT_CTRL, 60).expect("distinct");
    config.policy.min_hold_ms = 80;
    config.policy.score_cap = Some(500);
    config.save_to(&path).expect("save");

    let loaded = Config::load_from(&path).expect("load");
    assert_eq!(loaded, config);
    assert_eq!(loaded.session_settings().policy.min_hold, Duration::from_millis(80));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn config_out_of_range_values_are_repaired() {
    let path = std::env::temp_dir().join(format!(
        "counterstrafe-it-bad-config-{}.toml",
        std::process::id()
    ));
    std::fs::write(
        &path,
        "[bindings]\nthreshold_ms = 5000\n\n[policy]\nresult_display_ms = 100\nmax_rounds = 0\n",
    )
    .expect("write");

    let loaded = Config::load_from(&path).expect("load");
    assert_eq!(loaded.bindings.threshold_ms(), 200);
    assert_eq!(loaded.policy.result_display_ms, 1500);
    assert_eq!(loaded.policy.max_rounds, 1);
    let _ = std::fs::remove_file(&path);
}

// ---------------------------------------------------------------------------
// Real alarm threads
// ---------------------------------------------------------------------------

#[test]
fn threaded_deadline_times_out_round() {
    let (tx, rx) = mpsc::channel::<TrainerEvent>();
    let mut settings = SessionSettings::default();
    settings.policy.timeout = Duration::from_millis(50);

    let mut ctl = SessionController::new(
        settings,
        ChannelAlarm::new(tx.clone(), TrainerEvent::Deadline),
        ChannelAlarm::new(tx.clone(), TrainerEvent::Intermission),
        counterstrafe_trainer::clock::SystemClock,
        RecordingReporter::new(),
    );
    ctl.start();

    let t0 = Instant::now();
    ctl.handle_key(&KeyEvent::press(KeyCode::A, t0));
    ctl.handle_key(&KeyEvent::release(KeyCode::A, t0 + Duration::from_millis(100)));

    let event = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("deadline delivered");
    assert!(matches!(event, TrainerEvent::Deadline(_)));
    ctl.dispatch(event);

    let outcomes = ctl.reporter().outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].reason, ReasonCode::Timeout);
    assert_eq!(ctl.phase(), Phase::Intermission);

    // The intermission alarm comes through the same channel
    let event = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("intermission delivered");
    assert!(matches!(event, TrainerEvent::Intermission(_)));
    ctl.dispatch(event);
    assert_eq!(ctl.phase(), Phase::Playing);
}

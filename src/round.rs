//! Per-round counterstrafe evaluation
//!
//! [`RoundEvaluator`] turns key edges into exactly one [`RoundOutcome`] per
//! round. A round starts in [`RoundState::Idle`], moves to `Holding` when one
//! of the bound keys goes down, to `WaitingForSwitch` when that key comes back
//! up, and ends in `Resolved` on the counter key, an overlap, a too-short
//! hold, or the switch deadline. Once resolved, nothing but [`RoundEvaluator::rearm`]
//! changes the state again, so a late key press racing a deadline can never
//! produce a second outcome.

use crate::bindings::KeyBindings;
use crate::clock::millis_between;
use crate::keyboard::{KeyCode, KeyEvent, KeyEventType};
use crate::timer::{Alarm, TimerToken};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Fixed patience for the switch key, independent of the pass threshold
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
/// Minimum hold before a release counts; 0 disables the guard
pub const DEFAULT_MIN_HOLD_MS: u64 = 0;
/// Minimum hold used by the strict training variant
pub const STRICT_MIN_HOLD_MS: u64 = 80;
/// Score for a 1 ms switch; slower switches score `SCORE_SCALE / ms`
pub const SCORE_SCALE: u64 = 1000;

/// Timing policy applied to every round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundPolicy {
    pub min_hold: Duration,
    pub timeout: Duration,
}

impl Default for RoundPolicy {
    fn default() -> Self {
        Self {
            min_hold: Duration::from_millis(DEFAULT_MIN_HOLD_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl RoundPolicy {
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    pub fn min_hold_ms(&self) -> u64 {
        self.min_hold.as_millis() as u64
    }
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Success,
    Timeout,
    Overlap,
    TooShortHold,
    TooSlowSwitch,
}

impl ReasonCode {
    pub fn all() -> &'static [ReasonCode] {
        &[
            Self::Success,
            Self::Timeout,
            Self::Overlap,
            Self::TooShortHold,
            Self::TooSlowSwitch,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Timeout => "Timeout",
            Self::Overlap => "Overlap",
            Self::TooShortHold => "Hold too short",
            Self::TooSlowSwitch => "Switch too slow",
        }
    }
}

/// Result of one round; immutable once produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub passed: bool,
    /// Switch latency, timeout, hold, or overlap gap depending on `reason`
    pub elapsed_ms: u64,
    pub reason: ReasonCode,
    pub score_delta: u32,
    /// How long the first key was held, when it was released at all
    pub hold_ms: Option<u64>,
    /// The key the round started with
    pub active_key: KeyCode,
}

impl RoundOutcome {
    fn fail(reason: ReasonCode, elapsed_ms: u64, hold_ms: Option<u64>, active_key: KeyCode) -> Self {
        Self {
            passed: false,
            elapsed_ms,
            reason,
            score_delta: 0,
            hold_ms,
            active_key,
        }
    }

    fn success(delta_ms: u64, hold_ms: u64, active_key: KeyCode) -> Self {
        Self {
            passed: true,
            elapsed_ms: delta_ms,
            reason: ReasonCode::Success,
            score_delta: score_for(delta_ms),
            hold_ms: Some(hold_ms),
            active_key,
        }
    }
}

/// Points for a passing switch of `delta_ms`
pub fn score_for(delta_ms: u64) -> u32 {
    (SCORE_SCALE / delta_ms.max(1)) as u32
}

/// Where the current round stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    Holding {
        active_key: KeyCode,
        expected_key: KeyCode,
        pressed_at: Instant,
    },
    WaitingForSwitch {
        active_key: KeyCode,
        expected_key: KeyCode,
        released_at: Instant,
        hold_ms: u64,
        token: TimerToken,
    },
    Resolved {
        outcome: RoundOutcome,
    },
}

impl RoundState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Holding { .. } => "Holding",
            Self::WaitingForSwitch { .. } => "WaitingForSwitch",
            Self::Resolved { .. } => "Resolved",
        }
    }
}

/// What a single input did to the round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No state change
    Ignored,
    /// The round started with this key held down
    Holding(KeyCode),
    /// The held key was released; waiting for `expected_key`
    Waiting { active_key: KeyCode, expected_key: KeyCode },
    /// The round ended
    Resolved(RoundOutcome),
}

/// State machine for one round at a time, owning the switch deadline
pub struct RoundEvaluator<A: Alarm> {
    state: RoundState,
    policy: RoundPolicy,
    deadline: A,
}

impl<A: Alarm> RoundEvaluator<A> {
    pub fn new(policy: RoundPolicy, deadline: A) -> Self {
        Self {
            state: RoundState::Idle,
            policy,
            deadline,
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn policy(&self) -> RoundPolicy {
        self.policy
    }

    /// Replace the policy; takes effect from the next round armed
    pub fn set_policy(&mut self, policy: RoundPolicy) {
        self.policy = policy;
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, RoundState::Resolved { .. })
    }

    /// When the pending switch deadline expires, if one is pending
    pub fn deadline_at(&self) -> Option<Instant> {
        match self.state {
            RoundState::WaitingForSwitch { released_at, .. } => Some(released_at + self.policy.timeout),
            _ => None,
        }
    }

    /// Discard whatever the round was doing and wait for a fresh first press
    pub fn rearm(&mut self) {
        self.deadline.cancel();
        self.state = RoundState::Idle;
    }

    /// Feed one key edge
    pub fn on_key(&mut self, event: &KeyEvent, bindings: &KeyBindings) -> Step {
        let key = event.key;
        let ts = event.timestamp;

        match (&self.state, event.event_type) {
            (RoundState::Idle, KeyEventType::Press) => match bindings.opposite(key) {
                Some(expected_key) => {
                    log::debug!("holding {} (counter {})", key, expected_key);
                    self.state = RoundState::Holding {
                        active_key: key,
                        expected_key,
                        pressed_at: ts,
                    };
                    Step::Holding(key)
                }
                None => Step::Ignored,
            },
            (
                RoundState::Holding {
                    active_key,
                    expected_key,
                    pressed_at,
                },
                KeyEventType::Release,
            ) if key == *active_key => {
                let (active_key, expected_key) = (*active_key, *expected_key);
                let hold_ms = millis_between(*pressed_at, ts);

                if hold_ms < self.policy.min_hold_ms() {
                    return self.resolve(RoundOutcome::fail(
                        ReasonCode::TooShortHold,
                        hold_ms,
                        Some(hold_ms),
                        active_key,
                    ));
                }

                let token = self.deadline.arm(self.policy.timeout);
                log::debug!("released {} after {}ms, deadline {:?}", active_key, hold_ms, token);
                self.state = RoundState::WaitingForSwitch {
                    active_key,
                    expected_key,
                    released_at: ts,
                    hold_ms,
                    token,
                };
                Step::Waiting {
                    active_key,
                    expected_key,
                }
            }
            (
                RoundState::Holding {
                    active_key,
                    expected_key,
                    pressed_at,
                },
                KeyEventType::Press,
            ) if key == *expected_key => {
                let gap_ms = millis_between(*pressed_at, ts);
                let active_key = *active_key;
                self.resolve(RoundOutcome::fail(ReasonCode::Overlap, gap_ms, None, active_key))
            }
            (
                RoundState::WaitingForSwitch {
                    active_key,
                    expected_key,
                    released_at,
                    hold_ms,
                    ..
                },
                KeyEventType::Press,
            ) if key == *expected_key => {
                let delta_ms = millis_between(*released_at, ts);
                let (active_key, hold_ms) = (*active_key, *hold_ms);
                let timeout_ms = self.policy.timeout_ms();

                let outcome = if delta_ms >= timeout_ms {
                    // The deadline passed before this press; the alarm just hasn't been seen yet
                    RoundOutcome::fail(ReasonCode::Timeout, timeout_ms, Some(hold_ms), active_key)
                } else if delta_ms <= bindings.threshold_ms() as u64 {
                    RoundOutcome::success(delta_ms, hold_ms, active_key)
                } else {
                    RoundOutcome::fail(ReasonCode::TooSlowSwitch, delta_ms, Some(hold_ms), active_key)
                };
                self.resolve(outcome)
            }
            _ => Step::Ignored,
        }
    }

    /// The alarm armed with `token` expired
    pub fn on_deadline(&mut self, token: TimerToken) -> Step {
        match &self.state {
            RoundState::WaitingForSwitch {
                token: armed,
                active_key,
                hold_ms,
                ..
            } if *armed == token => {
                let outcome = RoundOutcome::fail(
                    ReasonCode::Timeout,
                    self.policy.timeout_ms(),
                    Some(*hold_ms),
                    *active_key,
                );
                self.resolve(outcome)
            }
            _ => {
                log::debug!("ignoring stale deadline {:?} in {}", token, self.state.name());
                Step::Ignored
            }
        }
    }

    /// Resolve a timeout by clock if the alarm has not been delivered yet
    pub fn check_deadline(&mut self, now: Instant) -> Step {
        let token = match (&self.state, self.deadline_at()) {
            (RoundState::WaitingForSwitch { token, .. }, Some(due)) if now >= due => *token,
            _ => return Step::Ignored,
        };
        self.on_deadline(token)
    }

    fn resolve(&mut self, outcome: RoundOutcome) -> Step {
        self.deadline.cancel();
        log::debug!(
            "round resolved: {} in {}ms (+{})",
            outcome.reason.label(),
            outcome.elapsed_ms,
            outcome.score_delta
        );
        self.state = RoundState::Resolved {
            outcome: outcome.clone(),
        };
        Step::Resolved(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{press_at, release_at, ManualAlarm};

    fn evaluator() -> (RoundEvaluator<ManualAlarm>, ManualAlarm) {
        let alarm = ManualAlarm::new();
        (RoundEvaluator::new(RoundPolicy::default(), alarm.clone()), alarm)
    }

    fn bindings(threshold_ms: u32) -> KeyBindings {
        KeyBindings::new(KeyCode::A, KeyCode::D, threshold_ms).expect("distinct keys")
    }

    fn outcome(step: Step) -> RoundOutcome {
        match step {
            Step::Resolved(outcome) => outcome,
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn score_formula() {
        assert_eq!(score_for(50), 20);
        assert_eq!(score_for(1), 1000);
        assert_eq!(score_for(0), 1000);
        assert_eq!(score_for(60), 16);
    }

    #[test]
    fn successful_counterstrafe() {
        let t0 = Instant::now();
        let (mut eval, alarm) = evaluator();
        let b = bindings(100);

        assert_eq!(eval.on_key(&press_at(KeyCode::A, t0, 0), &b), Step::Holding(KeyCode::A));
        assert_eq!(
            eval.on_key(&release_at(KeyCode::A, t0, 300), &b),
            Step::Waiting {
                active_key: KeyCode::A,
                expected_key: KeyCode::D
            }
        );
        assert_eq!(alarm.pending_duration(), Some(Duration::from_millis(1000)));

        let out = outcome(eval.on_key(&press_at(KeyCode::D, t0, 360), &b));
        assert!(out.passed);
        assert_eq!(out.reason, ReasonCode::Success);
        assert_eq!(out.elapsed_ms, 60);
        assert_eq!(out.score_delta, 16);
        assert_eq!(out.hold_ms, Some(300));
        assert_eq!(alarm.pending(), None);
    }

    #[test]
    fn secondary_key_can_start_the_round() {
        let t0 = Instant::now();
        let (mut eval, _alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::D, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::D, t0, 200), &b);
        let out = outcome(eval.on_key(&press_at(KeyCode::A, t0, 250), &b));
        assert_eq!(out.active_key, KeyCode::D);
        assert_eq!(out.score_delta, 20);
    }

    #[test]
    fn slow_switch_fails() {
        let t0 = Instant::now();
        let (mut eval, _alarm) = evaluator();
        let b = bindings(50);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::A, t0, 300), &b);
        let out = outcome(eval.on_key(&press_at(KeyCode::D, t0, 400), &b));
        assert!(!out.passed);
        assert_eq!(out.reason, ReasonCode::TooSlowSwitch);
        assert_eq!(out.elapsed_ms, 100);
        assert_eq!(out.score_delta, 0);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        for threshold in [10u32, 57, 100, 200] {
            for delta in [threshold as u64 - 1, threshold as u64, threshold as u64 + 1] {
                let t0 = Instant::now();
                let (mut eval, _alarm) = evaluator();
                let b = bindings(threshold);

                eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
                eval.on_key(&release_at(KeyCode::A, t0, 100), &b);
                let out = outcome(eval.on_key(&press_at(KeyCode::D, t0, 100 + delta), &b));
                assert_eq!(out.passed, delta <= threshold as u64, "threshold {threshold} delta {delta}");
            }
        }
    }

    #[test]
    fn deadline_resolves_timeout_once() {
        let t0 = Instant::now();
        let (mut eval, alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::A, t0, 300), &b);
        let token = alarm.fire().expect("deadline armed");

        let out = outcome(eval.on_deadline(token));
        assert_eq!(out.reason, ReasonCode::Timeout);
        assert_eq!(out.elapsed_ms, 1000);
        assert_eq!(out.score_delta, 0);

        // Duplicate delivery and a late switch press are both no-ops
        assert_eq!(eval.on_deadline(token), Step::Ignored);
        assert_eq!(eval.on_key(&press_at(KeyCode::D, t0, 1310), &b), Step::Ignored);
        assert!(eval.is_resolved());
    }

    #[test]
    fn switch_press_wins_over_late_alarm() {
        let t0 = Instant::now();
        let (mut eval, alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::A, t0, 300), &b);
        let token = alarm.pending().expect("armed");

        let out = outcome(eval.on_key(&press_at(KeyCode::D, t0, 340), &b));
        assert!(out.passed);
        assert_eq!(alarm.cancel_count(), 1);
        assert_eq!(eval.on_deadline(token), Step::Ignored);
    }

    #[test]
    fn press_after_deadline_time_counts_as_timeout() {
        let t0 = Instant::now();
        let (mut eval, _alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::A, t0, 300), &b);
        let out = outcome(eval.on_key(&press_at(KeyCode::D, t0, 1350), &b));
        assert_eq!(out.reason, ReasonCode::Timeout);
        assert_eq!(out.elapsed_ms, 1000);
    }

    #[test]
    fn check_deadline_uses_clock() {
        let t0 = Instant::now();
        let (mut eval, _alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::A, t0, 300), &b);
        assert_eq!(eval.deadline_at(), Some(t0 + Duration::from_millis(1300)));

        assert_eq!(eval.check_deadline(t0 + Duration::from_millis(1299)), Step::Ignored);
        let out = outcome(eval.check_deadline(t0 + Duration::from_millis(1300)));
        assert_eq!(out.reason, ReasonCode::Timeout);
        assert_eq!(eval.check_deadline(t0 + Duration::from_millis(2000)), Step::Ignored);
    }

    #[test]
    fn overlap_fails_immediately() {
        let t0 = Instant::now();
        let (mut eval, alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        let out = outcome(eval.on_key(&press_at(KeyCode::D, t0, 50), &b));
        assert_eq!(out.reason, ReasonCode::Overlap);
        assert_eq!(out.elapsed_ms, 50);
        assert_eq!(out.score_delta, 0);
        assert_eq!(out.hold_ms, None);
        assert_eq!(alarm.arm_count(), 0);
        assert_eq!(alarm.pending(), None);
    }

    #[test]
    fn short_hold_fails_when_floor_enabled() {
        let t0 = Instant::now();
        let alarm = ManualAlarm::new();
        let policy = RoundPolicy {
            min_hold: Duration::from_millis(STRICT_MIN_HOLD_MS),
            ..RoundPolicy::default()
        };
        let mut eval = RoundEvaluator::new(policy, alarm.clone());
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        let out = outcome(eval.on_key(&release_at(KeyCode::A, t0, 40), &b));
        assert_eq!(out.reason, ReasonCode::TooShortHold);
        assert_eq!(out.elapsed_ms, 40);
        assert_eq!(alarm.arm_count(), 0);
    }

    #[test]
    fn hold_at_floor_is_accepted() {
        let t0 = Instant::now();
        let alarm = ManualAlarm::new();
        let policy = RoundPolicy {
            min_hold: Duration::from_millis(STRICT_MIN_HOLD_MS),
            ..RoundPolicy::default()
        };
        let mut eval = RoundEvaluator::new(policy, alarm);
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        let step = eval.on_key(&release_at(KeyCode::A, t0, 80), &b);
        assert!(matches!(step, Step::Waiting { .. }));
    }

    #[test]
    fn unbound_keys_never_change_state() {
        let t0 = Instant::now();
        let (mut eval, _alarm) = evaluator();
        let b = bindings(100);

        assert_eq!(eval.on_key(&press_at(KeyCode::W, t0, 0), &b), Step::Ignored);
        assert_eq!(eval.state(), &RoundState::Idle);

        eval.on_key(&press_at(KeyCode::A, t0, 10), &b);
        let holding = eval.state().clone();
        assert_eq!(eval.on_key(&press_at(KeyCode::SPACE, t0, 20), &b), Step::Ignored);
        assert_eq!(eval.on_key(&release_at(KeyCode::SPACE, t0, 30), &b), Step::Ignored);
        assert_eq!(eval.state(), &holding);

        eval.on_key(&release_at(KeyCode::A, t0, 200), &b);
        let waiting = eval.state().clone();
        assert_eq!(eval.on_key(&press_at(KeyCode::S, t0, 210), &b), Step::Ignored);
        assert_eq!(eval.state(), &waiting);
    }

    #[test]
    fn repress_of_active_key_while_waiting_is_ignored() {
        let t0 = Instant::now();
        let (mut eval, alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::A, t0, 100), &b);
        assert_eq!(eval.on_key(&press_at(KeyCode::A, t0, 120), &b), Step::Ignored);
        assert!(alarm.pending().is_some());
    }

    #[test]
    fn rearm_cancels_pending_deadline() {
        let t0 = Instant::now();
        let (mut eval, alarm) = evaluator();
        let b = bindings(100);

        eval.on_key(&press_at(KeyCode::A, t0, 0), &b);
        eval.on_key(&release_at(KeyCode::A, t0, 100), &b);
        let token = alarm.pending().expect("armed");

        eval.rearm();
        assert_eq!(eval.state(), &RoundState::Idle);
        assert_eq!(alarm.pending(), None);
        assert_eq!(eval.on_deadline(token), Step::Ignored);
    }
}

//! Outward-facing notifications from the trainer core
//!
//! The core never formats colors or fonts. It emits a label plus a
//! [`StyleHint`] and leaves presentation to the implementor.

use crate::round::RoundOutcome;

/// How a label should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleHint {
    Neutral,
    Success,
    Fail,
}

/// Receives state, outcome, and session notifications
pub trait Reporter {
    /// The headline label changed
    fn on_state_changed(&mut self, label: &str, style: StyleHint);

    /// A round ended with this outcome
    fn on_round_resolved(&mut self, outcome: &RoundOutcome);

    /// All rounds are done
    fn on_session_complete(&mut self, total_score: u32, max_rounds: u32, threshold_ms: u32);

    /// The movement indicator should start or stop
    fn on_movement(&mut self, _moving: bool) {}
}

/// One captured notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reported {
    State { label: String, style: StyleHint },
    Round(RoundOutcome),
    Complete { total_score: u32, max_rounds: u32, threshold_ms: u32 },
    Movement(bool),
}

/// Keeps every notification in order, for tests and headless runs
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<Reported>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent label and its style
    pub fn last_label(&self) -> Option<(&str, StyleHint)> {
        self.events.iter().rev().find_map(|e| match e {
            Reported::State { label, style } => Some((label.as_str(), *style)),
            _ => None,
        })
    }

    pub fn labels(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Reported::State { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn outcomes(&self) -> Vec<&RoundOutcome> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Reported::Round(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Reported::Complete { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Reporter for RecordingReporter {
    fn on_state_changed(&mut self, label: &str, style: StyleHint) {
        self.events.push(Reported::State {
            label: label.to_string(),
            style,
        });
    }

    fn on_round_resolved(&mut self, outcome: &RoundOutcome) {
        self.events.push(Reported::Round(outcome.clone()));
    }

    fn on_session_complete(&mut self, total_score: u32, max_rounds: u32, threshold_ms: u32) {
        self.events.push(Reported::Complete {
            total_score,
            max_rounds,
            threshold_ms,
        });
    }

    fn on_movement(&mut self, moving: bool) {
        self.events.push(Reported::Movement(moving));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_reporter_keeps_order() {
        let mut r = RecordingReporter::new();
        r.on_state_changed("Ready", StyleHint::Neutral);
        r.on_movement(true);
        r.on_state_changed("HOLDING A", StyleHint::Neutral);
        r.on_session_complete(120, 10, 100);

        assert_eq!(r.labels(), vec!["Ready", "HOLDING A"]);
        assert_eq!(r.last_label(), Some(("HOLDING A", StyleHint::Neutral)));
        assert_eq!(r.completions(), 1);
        assert_eq!(r.events[1], Reported::Movement(true));
    }
}

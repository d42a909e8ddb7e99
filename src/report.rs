//! Session report and export functionality

use crate::round::{ReasonCode, RoundOutcome};
use crate::session::Session;
use crate::utils::{mean, MinMaxExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete session report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: SessionSummary,
    /// One entry per played round
    pub rounds: Vec<RoundEntry>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report generation timestamp
    pub generated_at: String,
    /// Application version
    pub version: String,
    /// Session duration in seconds, if the session finished
    pub duration_secs: Option<f64>,
}

/// Session summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub primary_key: String,
    pub secondary_key: String,
    pub threshold_ms: u32,
    pub min_hold_ms: u64,
    pub timeout_ms: u64,
    pub rounds_played: u32,
    pub max_rounds: u32,
    pub passes: u32,
    pub pass_rate: f64,
    /// Exact sum of every round's score
    pub total_score: u32,
    /// Score after the optional cap
    pub final_score: u32,
    pub score_cap: Option<u32>,
    /// Fastest measured switch (passing or too slow)
    pub best_switch_ms: Option<u64>,
    pub worst_switch_ms: Option<u64>,
    pub avg_switch_ms: Option<f64>,
    pub avg_hold_ms: Option<f64>,
    pub reasons: Vec<ReasonCount>,
}

/// How often a round ended for one reason
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReasonCount {
    pub reason: ReasonCode,
    pub count: u32,
}

/// Single round entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEntry {
    pub round: u32,
    pub key: String,
    pub reason: ReasonCode,
    pub passed: bool,
    pub elapsed_ms: u64,
    pub hold_ms: Option<u64>,
    pub score: u32,
}

impl RoundEntry {
    fn from_outcome(round: u32, outcome: &RoundOutcome) -> Self {
        Self {
            round,
            key: outcome.active_key.to_string(),
            reason: outcome.reason,
            passed: outcome.passed,
            elapsed_ms: outcome.elapsed_ms,
            hold_ms: outcome.hold_ms,
            score: outcome.score_delta,
        }
    }
}

/// Status of a summary line, for colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    Ok,
    Warning,
    Error,
    Info,
}

/// A labelled value for the results panel
#[derive(Debug, Clone)]
pub struct SummaryLine {
    pub label: String,
    pub value: String,
    pub status: ResultStatus,
}

impl SummaryLine {
    pub fn new(label: impl Into<String>, value: impl Into<String>, status: ResultStatus) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            status,
        }
    }

    pub fn info(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, ResultStatus::Info)
    }
}

fn is_measured_switch(outcome: &RoundOutcome) -> bool {
    matches!(outcome.reason, ReasonCode::Success | ReasonCode::TooSlowSwitch)
}

impl SessionReport {
    /// Build a report for `session` from the settings it was played with
    pub fn new(session: &Session) -> Self {
        let settings = &session.settings;
        let now: DateTime<Utc> = Utc::now();

        let duration_secs = match (session.started_at, session.finished_at) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start).as_secs_f64()),
            _ => None,
        };

        let mut best: Option<u64> = None;
        let mut worst: Option<u64> = None;
        for outcome in session.outcomes.iter().filter(|o| is_measured_switch(o)) {
            best.update_min(outcome.elapsed_ms);
            worst.update_max(outcome.elapsed_ms);
        }

        let avg_switch_ms = mean(
            session
                .outcomes
                .iter()
                .filter(|o| is_measured_switch(o))
                .map(|o| o.elapsed_ms),
        );
        let avg_hold_ms = mean(session.outcomes.iter().filter_map(|o| o.hold_ms));

        let reasons = ReasonCode::all()
            .iter()
            .map(|reason| ReasonCount {
                reason: *reason,
                count: session.outcomes.iter().filter(|o| o.reason == *reason).count() as u32,
            })
            .collect();

        let rounds_played = session.outcomes.len() as u32;
        let passes = session.passes() as u32;
        let pass_rate = if rounds_played == 0 {
            0.0
        } else {
            passes as f64 / rounds_played as f64
        };

        Self {
            metadata: ReportMetadata {
                generated_at: now.to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                duration_secs,
            },
            summary: SessionSummary {
                primary_key: settings.bindings.primary_key().to_string(),
                secondary_key: settings.bindings.secondary_key().to_string(),
                threshold_ms: session.threshold_ms,
                min_hold_ms: settings.policy.min_hold_ms(),
                timeout_ms: settings.policy.timeout_ms(),
                rounds_played,
                max_rounds: session.max_rounds,
                passes,
                pass_rate,
                total_score: session.total_score,
                final_score: session.final_score(),
                score_cap: settings.score_cap,
                best_switch_ms: best,
                worst_switch_ms: worst,
                avg_switch_ms,
                avg_hold_ms,
                reasons,
            },
            rounds: session
                .outcomes
                .iter()
                .enumerate()
                .map(|(i, o)| RoundEntry::from_outcome(i as u32 + 1, o))
                .collect(),
        }
    }

    /// Summary as labelled lines for the results panel
    pub fn summary_lines(&self) -> Vec<SummaryLine> {
        let s = &self.summary;
        let mut lines = Vec::new();

        lines.push(SummaryLine::info(
            "Keys",
            format!("{} / {}", s.primary_key, s.secondary_key),
        ));
        lines.push(SummaryLine::info("Threshold", format!("{} ms", s.threshold_ms)));

        let score = match s.score_cap {
            Some(cap) => format!("{} / {}", s.final_score, cap),
            None => s.final_score.to_string(),
        };
        lines.push(SummaryLine::new("Score", score, ResultStatus::Ok));

        let rate_status = if s.pass_rate >= 0.8 {
            ResultStatus::Ok
        } else if s.pass_rate >= 0.5 {
            ResultStatus::Warning
        } else {
            ResultStatus::Error
        };
        lines.push(SummaryLine::new(
            "Passed",
            format!("{}/{} ({:.0}%)", s.passes, s.rounds_played, s.pass_rate * 100.0),
            rate_status,
        ));

        if let Some(best) = s.best_switch_ms {
            lines.push(SummaryLine::new("Best Switch", format!("{} ms", best), ResultStatus::Ok));
        }
        if let Some(worst) = s.worst_switch_ms {
            let status = if worst as f64 > s.threshold_ms as f64 {
                ResultStatus::Warning
            } else {
                ResultStatus::Ok
            };
            lines.push(SummaryLine::new("Worst Switch", format!("{} ms", worst), status));
        }
        if let Some(avg) = s.avg_switch_ms {
            lines.push(SummaryLine::info("Avg Switch", format!("{:.1} ms", avg)));
        }
        if let Some(avg) = s.avg_hold_ms {
            lines.push(SummaryLine::info("Avg Hold", format!("{:.0} ms", avg)));
        }

        for rc in s.reasons.iter().filter(|rc| rc.count > 0 && rc.reason != ReasonCode::Success) {
            lines.push(SummaryLine::new(
                rc.reason.label(),
                rc.count.to_string(),
                ResultStatus::Error,
            ));
        }

        lines
    }

    /// Export report to JSON file
    pub fn export_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Export report to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        let _ = writeln!(out, "COUNTERSTRAFE SESSION");
        let _ = writeln!(out, "=====================");
        let _ = writeln!(out, "Generated: {}", self.metadata.generated_at);
        let _ = writeln!(
            out,
            "Keys: {} / {}   Threshold: {}ms   Timeout: {}ms",
            s.primary_key, s.secondary_key, s.threshold_ms, s.timeout_ms
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "SUMMARY");
        for line in self.summary_lines() {
            let _ = writeln!(out, "  {:<16} {}", format!("{}:", line.label), line.value);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "ROUNDS");
        for r in &self.rounds {
            let _ = writeln!(
                out,
                "  {:>2}. {:<6} {:<16} {:>5}ms {:>5}",
                r.round,
                r.key,
                r.reason.label(),
                r.elapsed_ms,
                r.score
            );
        }

        out
    }
}

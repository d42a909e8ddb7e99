//! Custom TUI widgets

use super::app::{Feedback, SetupField};
use super::theme::ThemeColors;
use crate::bindings::{KeyBindings, MAX_THRESHOLD_MS, MIN_THRESHOLD_MS};
use crate::keyboard::get_key_info;
use crate::report::{ResultStatus, SummaryLine};
use crate::round::RoundOutcome;
use crate::session::outcome_label;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

fn panel<'a>(title: &'a str, colors: &ThemeColors) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(colors.dim))
}

/// Large headline label with the movement indicator
pub struct FeedbackPanel<'a> {
    feedback: &'a Feedback,
    colors: ThemeColors,
}

impl<'a> FeedbackPanel<'a> {
    pub fn new(feedback: &'a Feedback, colors: ThemeColors) -> Self {
        Self { feedback, colors }
    }
}

impl<'a> Widget for FeedbackPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(" Counterstrafe ", &self.colors);
        let inner = block.inner(area);
        block.render(area, buf);

        let label_style = Style::default()
            .fg(self.colors.hint(self.feedback.style))
            .add_modifier(Modifier::BOLD);

        let indicator = if self.feedback.moving {
            Span::styled(
                ">>> MOVING <<<",
                Style::default().fg(self.colors.moving).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("-", Style::default().fg(self.colors.dim))
        };

        let mut lines = Vec::new();
        let pad = inner.height.saturating_sub(3) / 2;
        for _ in 0..pad {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(self.feedback.label.clone(), label_style)));
        lines.push(Line::from(""));
        lines.push(Line::from(indicator));

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(inner, buf);
    }
}

/// Key and threshold selection
pub struct SetupPanel<'a> {
    bindings: &'a KeyBindings,
    focus: SetupField,
    threshold_input: &'a str,
    editable: bool,
    colors: ThemeColors,
}

impl<'a> SetupPanel<'a> {
    pub fn new(
        bindings: &'a KeyBindings,
        focus: SetupField,
        threshold_input: &'a str,
        editable: bool,
        colors: ThemeColors,
    ) -> Self {
        Self {
            bindings,
            focus,
            threshold_input,
            editable,
            colors,
        }
    }

    fn value(&self, field: SetupField) -> String {
        match field {
            SetupField::Primary => {
                format!("< {} >", get_key_info(self.bindings.primary_key()).label)
            }
            SetupField::Secondary => {
                format!("< {} >", get_key_info(self.bindings.secondary_key()).label)
            }
            SetupField::Threshold => {
                let cursor = if self.editable && self.focus == field { "_" } else { "" };
                format!(
                    "{}{}  ({}-{})",
                    self.threshold_input, cursor, MIN_THRESHOLD_MS, MAX_THRESHOLD_MS
                )
            }
        }
    }
}

impl<'a> Widget for SetupPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.editable { " Setup " } else { " Setup (locked) " };
        let block = panel(title, &self.colors);
        let inner = block.inner(area);
        block.render(area, buf);

        for (i, field) in SetupField::all().iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.y + inner.height {
                break;
            }
            let focused = self.editable && *field == self.focus;
            let marker = if focused { "> " } else { "  " };
            let label_style = if focused {
                Style::default().fg(self.colors.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            let value_style = if self.editable {
                Style::default().fg(self.colors.fg)
            } else {
                Style::default().fg(self.colors.dim)
            };

            let line = Line::from(vec![
                Span::styled(marker, label_style),
                Span::styled(format!("{:<16}", field.name()), label_style),
                Span::styled(self.value(*field), value_style),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}

/// Most recent round outcomes, newest first
pub struct RoundHistory<'a> {
    outcomes: Vec<&'a RoundOutcome>,
    colors: ThemeColors,
}

impl<'a> RoundHistory<'a> {
    pub fn new(outcomes: impl DoubleEndedIterator<Item = &'a RoundOutcome>, colors: ThemeColors) -> Self {
        Self {
            outcomes: outcomes.rev().collect(),
            colors,
        }
    }
}

impl<'a> Widget for RoundHistory<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(" Rounds ", &self.colors);
        let inner = block.inner(area);
        block.render(area, buf);

        for (i, outcome) in self.outcomes.iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.y + inner.height {
                break;
            }
            let (label, hint) = outcome_label(outcome);
            let line = Line::from(vec![
                Span::styled(
                    format!("{:<6}", outcome.active_key),
                    Style::default().fg(self.colors.dim),
                ),
                Span::styled(label, Style::default().fg(self.colors.hint(hint))),
                Span::styled(
                    format!("  +{}", outcome.score_delta),
                    Style::default().fg(self.colors.fg),
                ),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}

/// Widget for displaying session summary lines
pub struct ResultsPanel<'a> {
    results: &'a [SummaryLine],
    title: &'a str,
    colors: ThemeColors,
}

impl<'a> ResultsPanel<'a> {
    pub fn new(results: &'a [SummaryLine], title: &'a str, colors: ThemeColors) -> Self {
        Self {
            results,
            title,
            colors,
        }
    }

    fn status_symbol(status: ResultStatus) -> &'static str {
        match status {
            ResultStatus::Ok => "[OK]",
            ResultStatus::Warning => "[!!]",
            ResultStatus::Error => "[XX]",
            ResultStatus::Info => "[--]",
        }
    }
}

impl<'a> Widget for ResultsPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(self.title, &self.colors);
        let inner = block.inner(area);
        block.render(area, buf);

        let mut y = inner.y;
        for result in self.results {
            if y >= inner.y + inner.height {
                break;
            }

            let color = self.colors.status(result.status);
            let line = Line::from(vec![
                Span::styled(
                    format!("{} ", Self::status_symbol(result.status)),
                    Style::default().fg(color),
                ),
                Span::styled(
                    format!("{}: ", result.label),
                    Style::default().fg(self.colors.fg).add_modifier(Modifier::BOLD),
                ),
                Span::styled(&result.value, Style::default().fg(color)),
            ]);

            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
        }
    }
}

/// Widget for the key help
pub struct HelpPanel {
    colors: ThemeColors,
}

impl HelpPanel {
    pub fn new(colors: ThemeColors) -> Self {
        Self { colors }
    }
}

impl Widget for HelpPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel(" Help ", &self.colors);
        let inner = block.inner(area);
        block.render(area, buf);

        let help_text = [
            " SETUP",
            " Up/Down, Tab     : Select field",
            " Left/Right       : Change key or threshold",
            " 0-9, Backspace   : Type threshold",
            " Enter            : Start session",
            " s                : Save settings",
            "",
            " SESSION",
            " Hold one key, release, press the other",
            " Esc              : Abort session",
            " Enter            : Dismiss final score",
            " e                : Export last session",
            " q / Ctrl+C       : Quit",
        ];

        for (i, line) in help_text.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            let style = if line.trim().chars().all(|c| c.is_ascii_uppercase()) && !line.trim().is_empty() {
                Style::default().fg(self.colors.warning).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            buf.set_string(inner.x, inner.y + i as u16, line, style);
        }
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    phase: &'a str,
    progress: &'a str,
    elapsed: &'a str,
    message: Option<&'a str>,
    colors: ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(phase: &'a str, progress: &'a str, elapsed: &'a str, colors: ThemeColors) -> Self {
        Self {
            phase,
            progress,
            elapsed,
            message: None,
            colors,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default().bg(self.colors.bar_bg).fg(self.colors.fg);
        for x in area.x..area.x + area.width {
            buf.set_string(x, area.y, " ", bg_style);
        }

        let left = format!(" {} | Round {} ", self.phase, self.progress);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        if let Some(msg) = self.message {
            let msg_style = bg_style.fg(self.colors.warning);
            let msg_x = area.x + (area.width / 2).saturating_sub(msg.len() as u16 / 2);
            buf.set_string(msg_x, area.y, msg, msg_style);
        }

        let right = format!(" {} ", self.elapsed);
        let right_x = area.x + area.width.saturating_sub(right.len() as u16);
        buf.set_string(right_x, area.y, &right, bg_style);
    }
}

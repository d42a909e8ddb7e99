//! Counterstrafe Trainer - terminal reflex trainer
//!
//! Hold one movement key, release it, and press the opposite key as fast as
//! possible. Each round is timed and scored.

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use std::{fs::File, io::stdout, sync::mpsc};

use counterstrafe_trainer::{
    clock::SystemClock,
    config::{app_dir, Config},
    event::TrainerEvent,
    keyboard::{KeyboardListener, POLL_INTERVAL},
    session::Phase,
    timer::ChannelAlarm,
    ui::{
        App, AppState, FeedbackPanel, HelpPanel, ResultsPanel, RoundHistory, SetupPanel,
        StatusBar, ThemeColors,
    },
};

/// Route log output to a file so it doesn't draw over the TUI
fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    match app_dir().and_then(|dir| Ok(File::create(dir.join("trainer.log"))?)) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn main() -> Result<()> {
    init_logging();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("config unreadable ({}), using defaults", e);
            Config::default()
        }
    };
    let colors = ThemeColors::from_theme(config.ui.theme);
    let tick_rate = config.refresh_interval();

    // Every producer feeds this one channel; only the loop below consumes it
    let (event_tx, event_rx) = mpsc::channel::<TrainerEvent>();

    let ctrlc_tx = event_tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(TrainerEvent::Quit);
    })
    .context("installing Ctrl-C handler")?;

    let deadline = ChannelAlarm::new(event_tx.clone(), TrainerEvent::Deadline);
    let intermission = ChannelAlarm::new(event_tx.clone(), TrainerEvent::Intermission);
    let mut app = App::new(config, deadline, intermission, SystemClock);
    // Sampled off the UI thread so edge timing isn't tied to the frame rate
    let mut listener = KeyboardListener::spawn(event_tx.clone(), POLL_INTERVAL)
        .context("starting key listener")?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &event_tx, &event_rx, colors, tick_rate);

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    listener.stop();
    result?;

    if let Some(report) = app.generate_report() {
        println!("{}", report.to_text());
    }
    println!("Counterstrafe Trainer session ended after {}.", app.elapsed_formatted());

    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    event_tx: &mpsc::Sender<TrainerEvent>,
    event_rx: &mpsc::Receiver<TrainerEvent>,
    colors: ThemeColors,
    tick_rate: std::time::Duration,
) -> Result<()> {
    loop {
        while let Ok(event) = event_rx.try_recv() {
            app.dispatch(event);
        }
        app.tick();

        if app.state == AppState::Quitting {
            return Ok(());
        }

        let report_lines = app
            .generate_report()
            .map(|r| r.summary_lines())
            .unwrap_or_default();

        terminal.draw(|frame| {
            let size = frame.area();

            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(9), // Feedback
                    Constraint::Min(8),    // Setup / history / results
                    Constraint::Length(1), // Status bar
                ])
                .split(size);

            frame.render_widget(FeedbackPanel::new(app.feedback(), colors), rows[0]);

            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(rows[1]);

            let left = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(5), Constraint::Min(3)])
                .split(cols[0]);

            frame.render_widget(
                SetupPanel::new(
                    app.bindings(),
                    app.focus,
                    &app.threshold_input,
                    app.is_editable(),
                    colors,
                ),
                left[0],
            );
            frame.render_widget(RoundHistory::new(app.feedback().history.iter(), colors), left[1]);

            if report_lines.is_empty() {
                frame.render_widget(HelpPanel::new(colors), cols[1]);
            } else {
                frame.render_widget(
                    ResultsPanel::new(&report_lines, " Last Session ", colors),
                    cols[1],
                );
            }

            let progress = app.progress();
            let elapsed = app.elapsed_formatted();
            let status = StatusBar::new(app.phase().name(), &progress, &elapsed, colors)
                .message(app.get_status());
            frame.render_widget(status, rows[2]);
        })?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_control(app, event_tx, key.code, key.modifiers);
                }
            }
        }
    }
}

/// Terminal keys that steer the application.
///
/// Trained keys also arrive here as characters, so letter shortcuts only
/// apply while no round is live.
fn handle_control(
    app: &mut App,
    event_tx: &mpsc::Sender<TrainerEvent>,
    code: CtKeyCode,
    modifiers: KeyModifiers,
) {
    let live = matches!(app.phase(), Phase::Playing | Phase::Intermission);
    let send = |event: TrainerEvent| {
        let _ = event_tx.send(event);
    };

    match code {
        CtKeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => send(TrainerEvent::Quit),
        CtKeyCode::Esc if live => send(TrainerEvent::Abort),
        CtKeyCode::Enter => match app.phase() {
            Phase::Setup => send(TrainerEvent::Start),
            Phase::Complete => send(TrainerEvent::Acknowledge),
            Phase::Playing | Phase::Intermission => {}
        },
        _ if live => {}
        CtKeyCode::Char('q') => send(TrainerEvent::Quit),
        CtKeyCode::Tab | CtKeyCode::Down => app.next_field(),
        CtKeyCode::BackTab | CtKeyCode::Up => app.prev_field(),
        CtKeyCode::Left => app.adjust(false),
        CtKeyCode::Right => app.adjust(true),
        CtKeyCode::Backspace => app.pop_digit(),
        CtKeyCode::Char(c) if c.is_ascii_digit() => app.push_digit(c),
        CtKeyCode::Char('s') => {
            let _ = app.save_config();
        }
        CtKeyCode::Char('e') => {
            let filename = format!(
                "counterstrafe_report_{}.json",
                chrono::Utc::now().format("%Y%m%d_%H%M%S")
            );
            if let Err(e) = app.export_report(&filename) {
                log::warn!("export failed: {}", e);
            }
        }
        _ => {}
    }
}

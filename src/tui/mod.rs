mod clipboard;
mod help;
mod state;

use crate::backend::HttpBackend;
use crate::cli::{build_config, Cli};
use crate::model::{Step, WizardEvent};
use crate::orchestrator::{self, UiCommand};
use crate::wizard::{WizardController, WizardState};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{push_wrapped_status_kv, KeyAction, UiState, TAB_WIZARD};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let service = Arc::new(HttpBackend::new(&cfg)?);
    let mut wizard = WizardController::new();
    let state_rx = wizard.subscribe();

    let (event_tx, event_rx) = mpsc::unbounded_channel::<WizardEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // The terminal is driven from its own thread; the runtime only handles requests.
    let initial_path = args
        .template
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let ui_handle =
        std::thread::spawn(move || run_threaded(initial_path, state_rx, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, service, &mut wizard, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    initial_path: String,
    mut state_rx: watch::Receiver<WizardState>,
    mut event_rx: UnboundedReceiver<WizardEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::new(initial_path);
    let initial = state_rx.borrow_and_update().clone();
    state.sync(initial);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        // Snapshot first: a DocumentReady is only accepted for the step it belongs to.
        match state_rx.has_changed() {
            Ok(true) => {
                let snapshot = state_rx.borrow_and_update().clone();
                state.sync(snapshot);
                dirty = true;
            }
            Ok(false) => {}
            // Controller is gone; nothing left to drive.
            Err(_) => break Ok(()),
        }
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
            dirty = true;
        }

        if dirty || last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                dirty = true;
                match state.on_key(k) {
                    KeyAction::None => {}
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyAction::Command(cmd) => {
                        if cmd_tx.send(cmd).is_err() {
                            break Ok(());
                        }
                    }
                    KeyAction::CopyLink(url) => {
                        state.info = match clipboard::copy_to_clipboard(&url) {
                            Ok(()) => "✓ Copied download link to clipboard".into(),
                            Err(e) => format!("Clipboard copy failed: {e:#}"),
                        };
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let banner_height = if state.wizard.error.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(banner_height),
                Constraint::Min(0),
                Constraint::Length(4),
            ]
            .as_ref(),
        )
        .split(area);

    let step_index = match state.wizard.step {
        Step::Upload => 0,
        Step::Fill => 1,
        Step::Download => 2,
    };
    let tabs = Tabs::new(vec![
        Line::from("1. Upload"),
        Line::from("2. Fill"),
        Line::from("3. Download"),
    ])
    .select(step_index)
    .block(Block::default().borders(Borders::ALL).title("docfill"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    if let Some(error) = state.wizard.error.as_deref() {
        let banner = Paragraph::new(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Error"),
        );
        f.render_widget(banner, chunks[1]);
    }

    if state.tab == TAB_WIZARD {
        match state.wizard.step {
            Step::Upload => draw_upload(chunks[2], f, state),
            Step::Fill => draw_fill(chunks[2], f, state),
            Step::Download => draw_download(chunks[2], f, state),
        }
    } else {
        help::draw_help(chunks[2], f);
    }

    draw_status(chunks[3], f, state);
}

fn input_line(prefix: &'static str, value: &str, active: bool) -> Line<'static> {
    let cursor = if active { "█" } else { "" };
    Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Gray)),
        Span::styled(format!("{value}{cursor}"), Style::default().fg(Color::White)),
    ])
}

fn action_line(key: &'static str, label: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("[{key}] "), Style::default().fg(Color::Magenta)),
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
    ])
}

fn pending_line(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(Color::Yellow)))
}

fn draw_upload(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let busy = state.wizard.submitting;
    let lines = vec![
        Line::from("Please upload a .docx file that uses {{ placeholder }} tags."),
        Line::from(""),
        input_line("Template: ", &state.input, !busy),
        Line::from(""),
        if busy {
            pending_line("Uploading…")
        } else {
            action_line("Enter", "Upload and Start")
        },
    ];

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title("1. Upload Your .docx Template"),
    );
    f.render_widget(p, area);
}

fn draw_fill(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let busy = state.wizard.submitting;
    let Some(prompt) = state.wizard.current_prompt() else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "Question {} of {}",
                state.wizard.current + 1,
                state.wizard.prompt_count()
            ),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            prompt.text.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        input_line("> ", &state.input, !busy),
        Line::from(""),
    ];

    lines.push(match (busy, state.wizard.is_last_prompt()) {
        (true, true) => pending_line("Generating document…"),
        (true, false) => pending_line("Working…"),
        (false, true) => action_line("Enter", "Generate Document"),
        (false, false) => action_line("Enter", "Next"),
    });
    if state.wizard.current > 0 && !busy {
        lines.push(action_line("↑", "Previous question"));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title("2. Fill Your Document"),
    );
    f.render_widget(p, area);
}

fn draw_download(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Your document has been generated successfully.",
            Style::default().fg(Color::Green),
        )),
        Line::from(""),
    ];
    if let Some(url) = state.wizard.download_url.as_deref() {
        push_wrapped_status_kv(&mut lines, "Download link", url, area.width);
    }
    if let Some(path) = state.outcome.as_ref().and_then(|o| o.saved_to.as_deref()) {
        push_wrapped_status_kv(
            &mut lines,
            "Saved to",
            &path.display().to_string(),
            area.width,
        );
    }
    lines.push(Line::from(""));
    lines.push(action_line("y", "Copy link"));
    lines.push(action_line("n", "Start over"));
    lines.push(action_line("q", "Quit"));

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("3. Download Your Document"),
    );
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut status_lines = Vec::new();
    push_wrapped_status_kv(&mut status_lines, "Info", &state.info, area.width);
    if status_lines.is_empty() {
        status_lines.push(Line::from(Span::styled(
            "Tab: help   Esc: quit",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let status =
        Paragraph::new(status_lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

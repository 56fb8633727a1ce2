mod export;
mod help;
mod state;
mod tables;

use crate::model::{NodeConfig, PresenterEvent};
use crate::node::{NodeClient, SourceLoader};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::{UiState, TAB_DEVICES, TAB_HELP, TAB_RUNS};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(cfg: NodeConfig) -> Result<()> {
    // Fail before touching the terminal if the node URL is unusable.
    let client = NodeClient::new(&cfg).context("failed to set up node client")?;
    let loader = SourceLoader::new(client);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<PresenterEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, loader, event_tx, cmd_rx).await;

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
pub fn run_threaded(
    cfg: NodeConfig,
    mut event_rx: UnboundedReceiver<PresenterEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(&cfg);

    let tick_rate = Duration::from_millis(100);
    let mut last_draw = Instant::now()
        .checked_sub(tick_rate)
        .unwrap_or_else(Instant::now);

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_draw.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_draw = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('r')) => {
                        let _ = cmd_tx.send(UiCommand::Reload);
                    }
                    (_, KeyCode::Char('e')) => match export::export_view_model(&state) {
                        Ok(p) => state.info = format!("Exported JSON: {}", p.display()),
                        Err(e) => {
                            state.info = format!("JSON export failed: {e:#}");
                        }
                    },
                    (_, KeyCode::Tab) => state.next_tab(),
                    (_, KeyCode::Char('?')) => state.tab = TAB_HELP,
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
                    _ => {}
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
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Runs"),
        Line::from("Devices"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("ethoscope-runs"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_RUNS => tables::draw_runs(chunks[1], f, state),
        TAB_DEVICES => tables::draw_devices(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f, state.auto_refresh),
    }

    draw_status(chunks[2], f, state);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let updated = match state.last_update {
        Some(t) => format!("updated {}s ago, tick {}", t.elapsed().as_secs(), state.ticks),
        None => "not loaded".into(),
    };
    let mut spans = vec![
        Span::styled("Node: ", Style::default().fg(Color::Gray)),
        Span::raw(state.base_url.clone()),
        Span::raw("  "),
        Span::styled(updated, Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::raw(state.info.clone()),
    ];
    if !state.view.errors.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} source error(s)", state.view.errors.len()),
            Style::default().fg(Color::Red),
        ));
    }
    let p = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

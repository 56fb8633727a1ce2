//! Runs and devices tables.

use super::state::UiState;
use crate::model::device_rows;
use crate::text_summary::{backup_label, duration_label};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use time::OffsetDateTime;

fn header(titles: &[&'static str]) -> Row<'static> {
    Row::new(titles.iter().map(|t| Cell::from(*t)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
}

fn placeholder(area: Rect, f: &mut Frame, title: &'static str, msg: String) {
    let p = Paragraph::new(Line::from(Span::styled(
        msg,
        Style::default().fg(Color::Gray),
    )))
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

pub fn draw_runs(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(runs) = state.view.runs.as_ref() else {
        let msg = match state.sources.runs.last_error() {
            Some(e) => format!("Runs unavailable: {e}"),
            None => "Loading runs…".into(),
        };
        return placeholder(area, f, "Runs", msg);
    };

    let now = OffsetDateTime::now_utc();
    let rows: Vec<Row> = runs
        .iter()
        .map(|view| {
            let backup_style = if view.has_backup {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            let end = if view.run.end_time.is_empty() {
                "-".to_string()
            } else {
                view.run.end_time.clone()
            };
            Row::new(vec![
                Cell::from(view.run.display_name()),
                Cell::from(view.run.extra_str("user_name").unwrap_or("").to_string()),
                Cell::from(view.run.start_time.clone()),
                Cell::from(end),
                Cell::from(duration_label(view, now)),
                Cell::from(backup_label(view, now)).style(backup_style),
            ])
        })
        .collect();

    let title = if state.view.backup_index_available {
        format!(
            "Runs ({}, {} backed up)",
            runs.len(),
            state.view.backed_up_count()
        )
    } else {
        format!("Runs ({}, backup index unavailable)", runs.len())
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(18),
            Constraint::Percentage(10),
            Constraint::Length(19),
            Constraint::Length(19),
            Constraint::Length(14),
            Constraint::Min(20),
        ],
    )
    .header(header(&[
        "Run", "User", "Start", "End", "Duration", "Last backup",
    ]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(Some(state.runs_selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

pub fn draw_devices(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(devices) = state.view.devices.as_ref() else {
        let msg = match state.sources.devices.last_error() {
            Some(e) => format!("Devices unavailable: {e}"),
            None => "Loading devices…".into(),
        };
        return placeholder(area, f, "Devices", msg);
    };

    let device_list = device_rows(devices);
    let title = format!("Devices ({})", device_list.len());
    let rows: Vec<Row> = device_list
        .into_iter()
        .map(|d| {
            let status_style = match d.status.as_str() {
                "running" | "recording" => Style::default().fg(Color::Green),
                "stopped" | "offline" => Style::default().fg(Color::Red),
                _ => Style::default(),
            };
            Row::new(vec![
                Cell::from(d.id),
                Cell::from(d.name),
                Cell::from(d.status).style(status_style),
                Cell::from(d.ip),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
            Constraint::Percentage(25),
        ],
    )
    .header(header(&["Id", "Name", "Status", "IP"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(Some(state.devices_selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

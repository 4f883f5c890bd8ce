//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{App, View, format_time};
use crate::audio::{PlaybackInfo, Status};
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::library::AudioFileRef;

/// Render the controls help text for the current view.
fn controls_text(view: View, seek_step: u64) -> String {
    let mut entries: Vec<String> = vec!["[j/k] up/down".to_string()];
    match view {
        View::Folders => entries.push("[enter] open folder".to_string()),
        View::Tracks => {
            entries.push("[enter] play/pause selected".to_string());
            entries.push("[esc/h] folders".to_string());
        }
    }
    entries.extend([
        "[space/p] play/pause".to_string(),
        "[n/N] next/prev".to_string(),
        format!("[H/L] seek -/+{}s", seek_step),
        "[0-9] jump".to_string(),
        "[s] stop".to_string(),
        "[r] rescan".to_string(),
        "[q] quit".to_string(),
    ]);
    entries.join(" | ")
}

/// Build the time text (elapsed/total/remaining) per `UiSettings`.
pub(crate) fn time_text(info: &PlaybackInfo, ui: &UiSettings) -> Option<String> {
    let known_total = (info.total_duration > 0.0).then_some(info.total_duration);
    let parts: Vec<String> = ui
        .time_fields
        .iter()
        .filter_map(|f| match f {
            TimeField::Elapsed => Some(format_time(info.current_time)),
            TimeField::Total => known_total.map(format_time),
            TimeField::Remaining => {
                known_total.map(|t| format!("-{}", format_time((t - info.current_time).max(0.0))))
            }
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.time_separator))
    }
}

/// One-line description of the playback state.
pub(crate) fn status_text(info: &PlaybackInfo, ui: &UiSettings) -> String {
    let describe = |label: &str, file: &AudioFileRef| {
        let mut s = format!("{}: {} ({})", label, file.name, file.folder);
        if let Some(time) = time_text(info, ui) {
            s.push_str(&format!(" [{}]", time));
        }
        s
    };

    match (info.status, &info.current, &info.loading) {
        (Status::Playing, Some(f), _) => describe("Playing", f),
        (Status::Paused, Some(f), _) => describe("Paused", f),
        (Status::Loading, _, Some(f)) => format!("Loading: {} ({})", f.name, f.folder),
        _ => "Stopped".to_string(),
    }
}

fn render_list(frame: &mut Frame, area: Rect, items: Vec<ListItem>, selected: usize, title: String) {
    let total = items.len();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    // ListState scrolls by item height, so two-line track rows stay in view.
    let mut state = ListState::default();
    if total > 0 {
        state.select(Some(selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn folder_items(app: &App) -> Vec<ListItem<'_>> {
    app.library
        .iter()
        .map(|(name, tracks)| ListItem::new(format!("{}  ({})", name, tracks.len())))
        .collect()
}

fn track_items<'a>(app: &'a App, info: &PlaybackInfo, ui: &UiSettings) -> Vec<ListItem<'a>> {
    app.visible_tracks()
        .iter()
        .map(|track| {
            let mark = match (&info.current, info.status) {
                (Some(c), Status::Playing) if c == track => "▶ ",
                (Some(c), Status::Paused) if c == track => "⏸ ",
                _ => "  ",
            };
            ListItem::new(vec![
                Line::from(vec![Span::raw(mark), Span::raw(track.name.as_str()).bold()]),
                Line::from(Span::raw(format!("  {}", track.short_path(ui.path_segments))).dim()),
            ])
        })
        .collect()
}

fn empty_message(app: &App) -> &'static str {
    if app.scanning {
        "Scanning…"
    } else {
        "No audio files found under the configured roots."
    }
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let info = app.playback();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" quaver ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = {
        let mut parts: Vec<String> = vec![status_text(&info, ui_settings)];
        if app.scanning {
            parts.push("Scanning…".to_string());
        } else if let Some(summary) = &app.summary {
            parts.push(format!(
                "{} tracks in {} folders",
                summary.files_accepted,
                app.library.len()
            ));
        }
        parts.join(" • ")
    };

    let mut status_lines = vec![Line::from(status)];
    if let Some(notice) = &info.notice {
        status_lines.push(Line::from(
            Span::raw(format!("{} (esc to dismiss)", notice)).fg(Color::Red),
        ));
    }
    let status_par = Paragraph::new(status_lines)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    let gauge_color = if info.is_playing() { Color::Cyan } else { Color::DarkGray };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(info.progress())
        .label(time_text(&info, ui_settings).unwrap_or_default());
    frame.render_widget(gauge, chunks[2]);

    // Main list
    if !app.has_tracks() {
        let empty = Paragraph::new(empty_message(app))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" folders "));
        frame.render_widget(empty, chunks[3]);
    } else {
        match app.view {
            View::Folders => render_list(
                frame,
                chunks[3],
                folder_items(app),
                app.folder_selected,
                " folders ".to_string(),
            ),
            View::Tracks => render_list(
                frame,
                chunks[3],
                track_items(app, &info, ui_settings),
                app.track_selected,
                format!(" {} ", app.open_folder.as_deref().unwrap_or("tracks")),
            ),
        }
    }

    let footer = Paragraph::new(controls_text(app.view, controls_settings.seek_step_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}

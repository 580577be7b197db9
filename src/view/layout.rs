//! Layout rendering (status bar, playlist pane, track pane)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph},
    Frame,
};

use crate::bridge::PlaybackSnapshot;
use crate::model::{ActiveSection, UiState};
use super::utils::{format_time, truncate_string};

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}

fn item_style(selected: bool, focused: bool) -> Style {
    if selected && focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

/// Session and readiness line for the status bar
pub fn status_line(ui_state: &UiState, playback: &PlaybackSnapshot) -> String {
    if !ui_state.logged_in {
        "Logged out. Press l to log in".to_string()
    } else if playback.ready {
        "Player ready".to_string()
    } else {
        "Initializing player...".to_string()
    }
}

pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    playback: &PlaybackSnapshot,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Readiness
            Constraint::Length(40), // Device id
        ])
        .split(area);

    let status_style = if playback.ready {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };
    let status = Paragraph::new(status_line(ui_state, playback))
        .style(status_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Player ")
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(status, chunks[0]);

    let device_text = if playback.device_id.is_empty() {
        "-".to_string()
    } else {
        format!("🎵 {}", playback.device_id)
    };
    let device = Paragraph::new(device_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Device "));
    frame.render_widget(device, chunks[1]);
}

pub fn render_playlists(frame: &mut Frame, area: Rect, ui_state: &UiState) {
    let focused = ui_state.active_section == ActiveSection::Playlists;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Playlists ")
        .padding(Padding::horizontal(1))
        .border_style(border_style(focused));

    if !ui_state.logged_in {
        frame.render_widget(
            Paragraph::new("Not logged in")
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }
    if ui_state.playlists_loading {
        frame.render_widget(Paragraph::new("Loading playlists...").block(block), area);
        return;
    }
    if let Some(ref error) = ui_state.playlists_error {
        let text = Paragraph::new(format!("{} (r to retry)", error))
            .style(Style::default().fg(Color::Red))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let name_width = (area.width as usize).saturating_sub(14).max(4);
    let items: Vec<ListItem> = ui_state
        .playlists
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            let line = Line::from(vec![
                Span::raw(truncate_string(&playlist.name, name_width)),
                Span::styled(
                    format!(" {:>4}", playlist.track_count()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line).style(item_style(i == ui_state.playlist_selected, focused))
        })
        .collect();

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    if !ui_state.playlists.is_empty() {
        state.select(Some(ui_state.playlist_selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

pub fn render_tracks(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    playback: &PlaybackSnapshot,
) {
    let focused = ui_state.active_section == ActiveSection::Tracks;
    let title = match &ui_state.open_playlist {
        Some(playlist) => format!(" {} ", playlist.name),
        None => " Tracks ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(border_style(focused));

    if ui_state.tracks_loading {
        frame.render_widget(Paragraph::new("Loading tracks...").block(block), area);
        return;
    }
    if ui_state.open_playlist.is_none() {
        frame.render_widget(
            Paragraph::new("Select a playlist and press Enter")
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }

    let current_id = playback.track.as_ref().map(|t| t.id.as_str());
    let inner = (area.width as usize).saturating_sub(4 + 2 + 7);
    let name_width = (inner * 2 / 5).max(4);
    let artist_width = (inner * 3 / 10).max(4);
    let album_width = inner.saturating_sub(name_width + artist_width + 2).max(4);

    let items: Vec<ListItem> = ui_state
        .tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let marker = match current_id {
                Some(id) if id == track.id => {
                    if playback.playing {
                        "▶ "
                    } else {
                        "⏸ "
                    }
                }
                _ => "  ",
            };
            let line = Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::raw(truncate_string(&track.name, name_width)),
                Span::raw(" "),
                Span::styled(
                    truncate_string(&track.artist_names(), artist_width),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(" "),
                Span::styled(
                    truncate_string(&track.album.name, album_width),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(format!(" {:>6}", format_time(track.duration_ms))),
            ]);
            ListItem::new(line).style(item_style(i == ui_state.track_selected, focused))
        })
        .collect();

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    if !ui_state.tracks.is_empty() {
        state.select(Some(ui_state.track_selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

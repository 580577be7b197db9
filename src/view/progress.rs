//! Now-playing bar

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::bridge::PlaybackSnapshot;
use super::utils::format_time;

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackSnapshot) {
    let status_text = match &playback.track {
        None => " No track playing".to_string(),
        Some(track) => {
            let icon = if playback.playing { " ▶" } else { "⏸ " };
            format!(
                "{} {} | {} ({})",
                icon,
                track.name,
                track.artist_names(),
                track.album.name
            )
        }
    };

    let time_str = if playback.duration_ms > 0 {
        format!(
            "{} / {}",
            format_time(playback.position_ms),
            format_time(playback.duration_ms)
        )
    } else {
        String::new()
    };

    let controls = " Space play/pause | n/p next/prev | ←/→ seek | L logout ";

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ", status_text))
                .title_bottom(Line::from(controls).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(playback.progress_ratio())
        .label(time_str);

    frame.render_widget(gauge, area);
}

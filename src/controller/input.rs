//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::bridge::EngineLauncher;
use crate::model::ActiveSection;

use super::{AppController, SessionRequest};

impl<L: EngineLauncher> AppController<L> {
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // An error line swallows Esc/Enter so it can be dismissed first
        if self.ui.error_message.is_some() && matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            self.ui.clear_error();
            return;
        }

        if !self.is_logged_in() {
            match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
                KeyCode::Char('l') => self.session_request = Some(SessionRequest::Login),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char('L') => {
                self.on_logout();
                self.session_request = Some(SessionRequest::Logout);
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.ui.active_section = self.ui.active_section.next();
            }
            KeyCode::Up => self.ui.move_up(),
            KeyCode::Down => self.ui.move_down(),
            KeyCode::Enter => match self.ui.active_section {
                ActiveSection::Playlists => self.select_playlist(self.ui.playlist_selected),
                ActiveSection::Tracks => self.select_track(self.ui.track_selected),
            },
            KeyCode::Char(' ') => self.toggle_playback(),
            KeyCode::Char('n') => self.next_track(),
            KeyCode::Char('p') => self.previous_track(),
            KeyCode::Right => self.seek_forward(),
            KeyCode::Left => self.seek_backward(),
            KeyCode::Char('r') => self.load_playlists(),
            _ => {}
        }
    }
}

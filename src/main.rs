use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use spotify_web_player::audio::LibrespotLauncher;
use spotify_web_player::auth::SessionProvider;
use spotify_web_player::bridge::{EngineLauncher, PlayerBridge};
use spotify_web_player::config::AppConfig;
use spotify_web_player::controller::{AppController, SessionRequest};
use spotify_web_player::logging;
use spotify_web_player::view::AppView;

const TOKEN_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load();

    let _log_guard = match logging::init_logging(&config.log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("=== Spotify Web Player Starting ===");

    let mut session = SessionProvider::new(&config);
    let credential = session.login().await?;

    let launcher = LibrespotLauncher::new(config.cache_dir.clone());
    let bridge = PlayerBridge::new(launcher, config.bridge_options());
    let mut controller = AppController::new(bridge, config.api_base.clone());
    controller.on_credential(credential).await;

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut controller, &mut session).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("Spotify Web Player shutting down");
    Ok(())
}

async fn run_app<L: EngineLauncher>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut AppController<L>,
    session: &mut SessionProvider,
) -> io::Result<()> {
    let mut last_token_check = Instant::now();

    loop {
        let logged_in = session.credential().is_some();
        if logged_in && last_token_check.elapsed() >= TOKEN_CHECK_INTERVAL {
            last_token_check = Instant::now();
            match session.refresh_if_needed().await {
                Ok(Some(credential)) => {
                    tracing::info!("Access token refreshed");
                    controller.on_credential_refreshed(credential);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Token refresh check failed"),
            }
        }

        match controller.take_session_request() {
            Some(SessionRequest::Logout) => session.logout(),
            Some(SessionRequest::Login) => match session.login().await {
                Ok(credential) => {
                    last_token_check = Instant::now();
                    controller.on_credential(credential).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Login failed");
                    controller.on_login_failed();
                }
            },
            None => {}
        }

        controller.tick();

        terminal.draw(|f| {
            AppView::render(f, controller.playback(), controller.ui_state());
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                controller.handle_key_event(key);
            }
        }

        if controller.should_quit() {
            break;
        }
    }

    Ok(())
}

//! Application configuration
//!
//! Defaults cover everything; environment variables (optionally from a
//! `.env` file) override individual values.

use std::path::PathBuf;

use crate::bridge::BridgeOptions;
use crate::model::DEFAULT_API_BASE;

const DEFAULT_CLIENT_ID: &str = "492e1e45ea814fa3ac555fe1576aaf5b";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8898/login";
const DEFAULT_PLAYER_NAME: &str = "Spotify Music Player";
pub const DEFAULT_VOLUME: f32 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub api_base: String,
    pub player_name: String,
    /// Initial engine output level in `0.0..=1.0`.
    pub volume: f32,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            volume: DEFAULT_VOLUME,
            cache_dir: PathBuf::from(".cache"),
            log_dir: PathBuf::from(".logs"),
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then applies environment overrides.
    pub fn load() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                eprintln!("Warning: could not read .env: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SPOTIFY_CLIENT_ID") {
            config.client_id = v;
        }
        if let Some(v) = get("SPOTIFY_REDIRECT_URI") {
            config.redirect_uri = v;
        }
        if let Some(v) = get("SPOTIFY_API_BASE") {
            config.api_base = v;
        }
        if let Some(v) = get("SPOTIFY_PLAYER_NAME") {
            config.player_name = v;
        }
        if let Some(v) = get("SPOTIFY_PLAYER_VOLUME") {
            match v.trim().parse::<f32>() {
                Ok(volume) if volume.is_finite() => config.volume = volume.clamp(0.0, 1.0),
                _ => eprintln!("Warning: ignoring invalid SPOTIFY_PLAYER_VOLUME {:?}", v),
            }
        }
        if let Some(v) = get("SPOTIFY_CACHE_DIR") {
            config.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SPOTIFY_LOG_DIR") {
            config.log_dir = PathBuf::from(v);
        }

        config
    }

    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            player_name: self.player_name.clone(),
            volume: self.volume,
        }
    }
}

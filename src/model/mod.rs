//! Model module - data types and catalog access
//!
//! - `content`: catalog value objects (playlists, tracks, artwork)
//! - `catalog_client`: Spotify Web API client for the catalog calls
//! - `types`: UI state

mod content;
mod catalog_client;
mod types;

pub use content::{Album, Artist, Image, Playlist, Track, TrackCount};

pub use catalog_client::{
    CatalogClient, CatalogError, PlaybackTarget, DEFAULT_API_BASE,
};

pub use types::{ActiveSection, UiState};

//! Catalog API client: playlists, playlist tracks and playback start

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::auth::Credential;

use super::content::{Page, Playlist, PlaylistEntry, Track};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const PLAYLIST_PAGE_LIMIT: u32 = 50;

/// Every catalog failure is a failed request as far as callers are concerned.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request failed: status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: no credential")]
    MissingCredential,

    #[error("request failed: invalid base url {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// What a playback start request should play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackTarget {
    /// A playlist, album or artist uri.
    Context(String),
    /// An explicit ordered list of track uris.
    Tracks(Vec<String>),
    /// Whatever the device has loaded.
    Resume,
}

impl PlaybackTarget {
    fn body(&self) -> serde_json::Value {
        match self {
            Self::Context(uri) => json!({ "context_uri": uri }),
            Self::Tracks(uris) => json!({ "uris": uris }),
            Self::Resume => json!({}),
        }
    }
}

/// Stateless catalog client. The credential is fixed at construction, so a
/// new credential means a new client.
#[derive(Clone, Debug)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
    credential: Credential,
}

impl CatalogClient {
    pub fn new(credential: Credential) -> Result<Self> {
        Self::with_base_url(credential, DEFAULT_API_BASE)
    }

    pub fn with_base_url(credential: Credential, base_url: impl Into<String>) -> Result<Self> {
        if credential.is_empty() {
            return Err(CatalogError::MissingCredential);
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(CatalogError::InvalidUrl(base_url));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("spotify-web-player/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.credential.secret())
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response> {
        crate::log_api_request!(operation);
        let result = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(CatalogError::Status {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(response)
        }
        .await;
        crate::log_api_result!(operation, result);
        result
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.send(operation, request).await?;
        let parsed = response.json::<T>().await;
        if let Err(e) = &parsed {
            tracing::error!(operation, error = %e, "Failed to parse API response");
        }
        Ok(parsed?)
    }

    /// First page of the current user's playlists.
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        let request = self
            .request(Method::GET, "/me/playlists")
            .query(&[("limit", PLAYLIST_PAGE_LIMIT)]);
        let page: Page<Playlist> = self.get_json("list_playlists", request).await?;
        tracing::debug!(count = page.items.len(), "Fetched playlists");
        Ok(page.items)
    }

    /// Tracks of a playlist, skipping entries that have no track id.
    pub async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        let request = self.request(Method::GET, &format!("/playlists/{playlist_id}/tracks"));
        let page: Page<PlaylistEntry> = self.get_json("list_tracks", request).await?;

        let total = page.items.len();
        let tracks: Vec<Track> = page
            .items
            .into_iter()
            .filter_map(|entry| entry.track.and_then(|t| t.into_track()))
            .collect();

        if tracks.len() < total {
            tracing::debug!(
                playlist_id,
                skipped = total - tracks.len(),
                "Skipped playlist entries without a track id"
            );
        }
        Ok(tracks)
    }

    /// Starts playback of `target` on the device `device_id`.
    pub async fn start_playback(&self, device_id: &str, target: &PlaybackTarget) -> Result<()> {
        let request = self
            .request(Method::PUT, "/me/player/play")
            .query(&[("device_id", device_id)])
            .json(&target.body());
        self.send("start_playback", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_bodies_match_the_api() {
        assert_eq!(
            PlaybackTarget::Context("spotify:playlist:p1".into()).body(),
            json!({ "context_uri": "spotify:playlist:p1" })
        );
        assert_eq!(
            PlaybackTarget::Tracks(vec!["spotify:track:a".into(), "spotify:track:b".into()]).body(),
            json!({ "uris": ["spotify:track:a", "spotify:track:b"] })
        );
        assert_eq!(PlaybackTarget::Resume.body(), json!({}));
    }

    #[test]
    fn rejects_missing_credential() {
        let result = CatalogClient::new(Credential::new(""));
        assert!(matches!(result, Err(CatalogError::MissingCredential)));
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let result = CatalogClient::with_base_url(Credential::new("t"), "api.example.com");
        assert!(matches!(result, Err(CatalogError::InvalidUrl(_))));
    }

    #[test]
    fn trims_trailing_slash() {
        let client = CatalogClient::with_base_url(Credential::new("t"), "http://localhost:1234/v1/")
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
    }

    #[test]
    fn errors_read_as_request_failures() {
        let error = CatalogError::Status {
            status: 401,
            message: "expired".into(),
        };
        assert!(error.to_string().starts_with("request failed"));
    }
}

//! Session provider: obtains and refreshes the user's bearer credential
//!
//! The OAuth flow itself is delegated to librespot-oauth. The rest of the
//! application only sees a [`Credential`].

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use librespot_oauth::OAuthClientBuilder;
use thiserror::Error;

use crate::config::AppConfig;

pub const SCOPES: &str = "streaming user-read-email user-read-private user-read-playback-state user-modify-playback-state playlist-read-private playlist-read-collaborative";

const RESPONSE: &str = r#"
<!doctype html>
<html>
<head><title>Success</title></head>
<body><h1>Authentication Successful!</h1><script>window.close();</script></body>
</html>
"#;
const REFRESH_TOKEN_FILE: &str = "refresh_token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 300;

/// Opaque bearer token. Its value never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(***)")
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth flow failed: {0}")]
    OAuth(#[from] librespot_oauth::OAuthError),

    #[error("not logged in")]
    NoSession,
}

/// Holds the current session's credential, or none after logout.
pub struct SessionProvider {
    client_id: String,
    redirect_uri: String,
    refresh_token_path: PathBuf,
    credential: Option<Credential>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            refresh_token_path: config.cache_dir.join(REFRESH_TOKEN_FILE),
            credential: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    fn oauth_builder(&self) -> OAuthClientBuilder {
        OAuthClientBuilder::new(
            &self.client_id,
            &self.redirect_uri,
            SCOPES.split_whitespace().collect(),
        )
    }

    /// Establishes a session, reusing a stored refresh token when it still works.
    pub async fn login(&mut self) -> Result<Credential, AuthError> {
        if let Ok(stored) = fs::read_to_string(&self.refresh_token_path) {
            let stored = stored.trim().to_string();
            if !stored.is_empty() {
                tracing::info!("Found stored refresh token");
                match self.exchange_refresh_token(&stored).await {
                    Ok(credential) => return Ok(credential),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "Stored refresh token failed, re-authenticating"
                        );
                    }
                }
            }
        }

        self.browser_login().await
    }

    async fn browser_login(&mut self) -> Result<Credential, AuthError> {
        tracing::info!("Starting browser-based OAuth flow");
        let client = self
            .oauth_builder()
            .open_in_browser()
            .with_custom_message(RESPONSE)
            .build()?;

        let token = client.get_access_token_async().await?;
        self.store(token.access_token, token.refresh_token);
        tracing::info!("Browser authentication completed successfully");
        self.credential.clone().ok_or(AuthError::NoSession)
    }

    async fn exchange_refresh_token(
        &mut self,
        refresh_token: &str,
    ) -> Result<Credential, AuthError> {
        let client = self.oauth_builder().build()?;
        let token = client.refresh_token_async(refresh_token).await?;
        self.store(token.access_token, token.refresh_token);
        tracing::debug!("Token refreshed successfully");
        self.credential.clone().ok_or(AuthError::NoSession)
    }

    fn store(&mut self, access_token: String, refresh_token: String) {
        if let Some(parent) = self.refresh_token_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&self.refresh_token_path, &refresh_token) {
            tracing::warn!(error = %e, "Could not persist refresh token");
        }

        self.credential = Some(Credential::new(access_token));
        self.refresh_token = Some(refresh_token);
        self.expires_at = Some(Utc::now() + Duration::seconds(TOKEN_LIFETIME_SECS));
    }

    pub fn needs_refresh(&self) -> bool {
        token_needs_refresh(self.expires_at, Utc::now())
    }

    /// Refreshes the credential if it is about to expire. Returns the new
    /// credential when it changed.
    pub async fn refresh_if_needed(&mut self) -> Result<Option<Credential>, AuthError> {
        if !self.needs_refresh() {
            return Ok(None);
        }
        let refresh_token = self.refresh_token.clone().ok_or(AuthError::NoSession)?;
        self.exchange_refresh_token(&refresh_token).await.map(Some)
    }

    /// Forgets the session and the stored refresh token.
    pub fn logout(&mut self) {
        self.credential = None;
        self.refresh_token = None;
        self.expires_at = None;
        let _ = fs::remove_file(&self.refresh_token_path);
        tracing::info!("Logged out");
    }
}

fn token_needs_refresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(exp) => (exp - now).num_seconds() < REFRESH_MARGIN_SECS,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_the_token() {
        let credential = Credential::new("secret-token");
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("secret-token"));
        assert_eq!(credential.secret(), "secret-token");
    }

    #[test]
    fn empty_credential_is_detected() {
        assert!(Credential::new("").is_empty());
        assert!(!Credential::new("x").is_empty());
    }

    #[test]
    fn refresh_needed_inside_margin() {
        let now = Utc::now();
        assert!(!token_needs_refresh(None, now));
        assert!(!token_needs_refresh(Some(now + Duration::seconds(3000)), now));
        assert!(token_needs_refresh(Some(now + Duration::seconds(100)), now));
        assert!(token_needs_refresh(Some(now - Duration::seconds(1)), now));
    }

    #[test]
    fn new_provider_has_no_session() {
        let provider = SessionProvider::new(&AppConfig::default());
        assert!(provider.credential().is_none());
        assert!(!provider.needs_refresh());
    }
}

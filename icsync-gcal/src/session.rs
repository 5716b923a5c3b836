//! On-disk OAuth session for a Google account.
//!
//! Tokens live in a TOML file under the platform config directory
//! (`~/.config/icsync/session/<account>.toml` on Linux). Loading a
//! session transparently refreshes an expired access token and writes
//! the file back.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use icsync_core::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use tracing::info;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug)]
pub struct Session {
    account: String,
    data: SessionData,
}

impl Session {
    pub fn new(account: impl Into<String>, data: SessionData) -> Self {
        Session { account: account.into(), data }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn access_token(&self) -> &str {
        &self.data.access_token
    }

    /// Loads the stored session for `account`, refreshing the access
    /// token first if it has expired.
    pub async fn load_valid(account: &str) -> SyncResult<Self> {
        let mut session = Self::load(account)?;
        if session.is_expired() {
            info!(account, "access token expired, refreshing");
            session.refresh_via(TOKEN_URL).await?;
            session.save()?;
        }
        Ok(session)
    }

    pub fn load(account: &str) -> SyncResult<Self> {
        let path = Self::path_for_account(account)?;
        let raw = fs::read_to_string(&path).map_err(|e| {
            SyncError::Auth(format!("no session for {account} at {}: {e}", path.display()))
        })?;
        let data: SessionData =
            toml::from_str(&raw).map_err(|e| SyncError::Serialization(e.to_string()))?;
        Ok(Session::new(account, data))
    }

    pub fn save(&self) -> SyncResult<()> {
        let path = Self::path_for_account(&self.account)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&self.data)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        fs::write(&path, raw)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.data.expires_at
    }

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh(&mut self) -> SyncResult<()> {
        self.refresh_via(TOKEN_URL).await
    }

    async fn refresh_via(&mut self, token_url: &str) -> SyncResult<()> {
        let response = reqwest::Client::new()
            .post(token_url)
            .form(&[
                ("client_id", self.data.client_id.as_str()),
                ("client_secret", self.data.client_secret.as_str()),
                ("refresh_token", self.data.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;
        if !status.is_success() {
            return Err(SyncError::Auth(format!(
                "token refresh failed with HTTP {}: {text}",
                status.as_u16()
            )));
        }
        let refreshed: RefreshResponse =
            serde_json::from_str(&text).map_err(|e| SyncError::Serialization(e.to_string()))?;

        self.data.access_token = refreshed.access_token;
        self.data.expires_at = Utc::now() + Duration::seconds(refreshed.expires_in);
        if let Some(token) = refreshed.refresh_token {
            // Google only rotates the refresh token occasionally.
            self.data.refresh_token = token;
        }
        info!(account = %self.account, "access token refreshed");
        Ok(())
    }

    fn path_for_account(account: &str) -> SyncResult<PathBuf> {
        let slug = account.replace(['/', '\\', ':'], "_");
        let base = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("could not determine the config directory".into()))?;
        Ok(base.join("icsync").join("session").join(format!("{slug}.toml")))
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_expiry() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn expired_session() -> Session {
        Session::new(
            "alice@example.com",
            SessionData {
                access_token: "old".into(),
                refresh_token: "refresh-1".into(),
                expires_at: Utc::now() - Duration::hours(1),
                client_id: "cid".into(),
                client_secret: "secret".into(),
            },
        )
    }

    #[test]
    fn session_data_round_trips_through_toml() {
        let data = expired_session().data;
        let raw = toml::to_string_pretty(&data).unwrap();
        let back: SessionData = toml::from_str(&raw).unwrap();
        assert_eq!(back.access_token, data.access_token);
        assert_eq!(back.expires_at, data.expires_at);
    }

    #[test]
    fn expiry_is_checked_against_now() {
        let mut session = expired_session();
        assert!(session.is_expired());
        session.data.expires_at = Utc::now() + Duration::hours(1);
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn refresh_swaps_the_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new",
                "expires_in": 3600,
                "token_type": "Bearer",
            })))
            .mount(&server)
            .await;

        let mut session = expired_session();
        session
            .refresh_via(&format!("{}/token", server.uri()))
            .await
            .unwrap();
        assert_eq!(session.access_token(), "new");
        assert!(!session.is_expired());
        assert_eq!(session.data.refresh_token, "refresh-1");
    }

    #[tokio::test]
    async fn refresh_failure_surfaces_as_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
            })))
            .mount(&server)
            .await;

        let mut session = expired_session();
        let err = session
            .refresh_via(&format!("{}/token", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }
}

//! Credentials and access-token management.
//!
//! Credentials are persisted as JSON in the config directory. The HTTP
//! provider refreshes the access token transparently when it is about to
//! expire.

use crate::error::{KataError, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Tokens expiring within this window are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Provides bearer tokens for API requests.
pub trait TokenProvider: Send + Sync {
    /// Whether credentials are stored locally (they may still be expired).
    fn has_credentials(&self) -> bool;

    /// Return a valid access token, refreshing it if it has expired.
    fn get_token(&self) -> Result<String>;

    /// Exchange an email and password for credentials and store them.
    fn login(&self, email: &str, password: &str) -> Result<()>;

    /// Forget stored credentials.
    fn logout(&self) -> Result<()>;
}

// ============================================================================
// Credential file
// ============================================================================

pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(credentials)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

// ============================================================================
// HTTP provider
// ============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    /// Lifetime of the access token in seconds.
    expires_in: i64,
}

impl TokenResponse {
    fn into_credentials(self, now: DateTime<Utc>) -> Credentials {
        Credentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: now + Duration::seconds(self.expires_in),
        }
    }
}

pub struct HttpTokenProvider {
    client: Client,
    api_url: String,
    store: CredentialStore,
    cached: Mutex<Option<Credentials>>,
}

impl HttpTokenProvider {
    pub fn new(api_url: &str, timeout: std::time::Duration, store: CredentialStore) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            store,
            cached: Mutex::new(None),
        })
    }

    fn refresh(&self, credentials: &Credentials) -> Result<Credentials> {
        tracing::info!("refreshing access token");
        let response = self
            .client
            .post(format!("{}/auth/refresh", self.api_url))
            .json(&RefreshRequest {
                refresh_token: &credentials.refresh_token,
            })
            .send()?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(KataError::Unauthorized),
            status if !status.is_success() => Err(KataError::Auth(format!(
                "token refresh returned {}",
                status
            ))),
            _ => {
                let token: TokenResponse = response.json()?;
                let refreshed = token.into_credentials(Utc::now());
                self.store.save(&refreshed)?;
                Ok(refreshed)
            }
        }
    }

    fn cache(&self, credentials: Option<Credentials>) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = credentials;
        }
    }

    fn cached(&self) -> Option<Credentials> {
        self.cached.lock().ok().and_then(|guard| guard.clone())
    }
}

impl TokenProvider for HttpTokenProvider {
    fn has_credentials(&self) -> bool {
        self.cached().is_some() || self.store.exists()
    }

    fn get_token(&self) -> Result<String> {
        let credentials = match self.cached() {
            Some(credentials) => credentials,
            None => self.store.load()?.ok_or(KataError::Unauthorized)?,
        };

        let credentials = if credentials.needs_refresh(Utc::now()) {
            self.refresh(&credentials)?
        } else {
            credentials
        };

        let token = credentials.access_token.clone();
        self.cache(Some(credentials));
        Ok(token)
    }

    fn login(&self, email: &str, password: &str) -> Result<()> {
        tracing::info!(email, "logging in");
        let response = self
            .client
            .post(format!("{}/auth/login", self.api_url))
            .json(&LoginRequest { email, password })
            .send()?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(KataError::Auth("invalid email or password".to_string()))
            }
            status if !status.is_success() => {
                Err(KataError::Auth(format!("login returned {}", status)))
            }
            _ => {
                let token: TokenResponse = response.json()?;
                let credentials = token.into_credentials(Utc::now());
                self.store.save(&credentials)?;
                self.cache(Some(credentials));
                Ok(())
            }
        }
    }

    fn logout(&self) -> Result<()> {
        self.cache(None);
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_credentials(expires_at: DateTime<Utc>) -> Credentials {
        Credentials {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_needs_refresh_inside_margin() {
        let now = Utc::now();
        assert!(sample_credentials(now + Duration::seconds(5)).needs_refresh(now));
        assert!(sample_credentials(now - Duration::seconds(5)).needs_refresh(now));
        assert!(!sample_credentials(now + Duration::minutes(10)).needs_refresh(now));
    }

    #[test]
    fn test_store_round_trip_and_clear() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("nested").join("credentials.json"));
        assert!(!store.exists());
        assert!(store.load().unwrap().is_none());

        let credentials = sample_credentials(Utc::now());
        store.save(&credentials).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), Some(credentials));

        store.clear().unwrap();
        assert!(!store.exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_get_token_uses_fresh_stored_credentials() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store
            .save(&sample_credentials(Utc::now() + Duration::hours(1)))
            .unwrap();

        // Unroutable address: a refresh attempt would fail, so success proves none happened.
        let provider = HttpTokenProvider::new(
            "http://127.0.0.1:9",
            std::time::Duration::from_millis(200),
            store,
        )
        .unwrap();

        assert!(provider.has_credentials());
        assert_eq!(provider.get_token().unwrap(), "access");
    }

    #[test]
    fn test_get_token_without_credentials_is_unauthorized() {
        let temp = TempDir::new().unwrap();
        let provider = HttpTokenProvider::new(
            "http://127.0.0.1:9",
            std::time::Duration::from_millis(200),
            CredentialStore::new(temp.path().join("credentials.json")),
        )
        .unwrap();

        assert!(!provider.has_credentials());
        assert!(matches!(provider.get_token(), Err(KataError::Unauthorized)));
    }

    #[test]
    fn test_logout_forgets_credentials() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store
            .save(&sample_credentials(Utc::now() + Duration::hours(1)))
            .unwrap();
        let provider = HttpTokenProvider::new(
            "http://127.0.0.1:9",
            std::time::Duration::from_millis(200),
            store,
        )
        .unwrap();
        provider.get_token().unwrap();

        provider.logout().unwrap();
        assert!(!provider.has_credentials());
    }
}

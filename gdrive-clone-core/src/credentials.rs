//! # credentials: file-backed OAuth credential provider
//!
//! [`TokenFileCredentials`] implements [`CredentialProvider`] on top of two
//! plain files kept in a user access-info folder:
//! - `token.json`, the authorized-user token (access token, refresh token, expiry),
//! - `client_secrets.json`, the OAuth client registration used for first login.
//!
//! The OAuth work itself is done by a `yup_oauth2` installed-flow
//! authenticator. This module supplies its token storage ([`TokenFile`]),
//! which keeps `token.json` in the authorized-user layout, and the consent
//! prompt ([`BrowserConsent`]).
//!
//! ## Resolution order
//! 1. A stored token that has not expired is used as-is.
//! 2. An expired token carrying a refresh token is refreshed at its `token_uri`.
//! 3. Otherwise the browser login runs against a loopback redirect listener.
//!
//! Any newly obtained token is written back to `token.json`. Token values are
//! never logged.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};
use yup_oauth2::storage::{TokenInfo, TokenStorage};
use yup_oauth2::{ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod};

pub use yup_oauth2::authenticator_delegate::InstalledFlowDelegate;

use crate::contract::{Credential, CredentialProvider};
use crate::error::DriveError;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const TOKEN_FILE: &str = "token.json";
pub const CLIENT_SECRETS_FILE: &str = "client_secrets.json";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Serialized authorized-user token, as stored in `token.json`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("has_token", &self.token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl StoredToken {
    pub fn expiry_time(&self) -> Option<DateTime<Utc>> {
        self.expiry.as_deref().and_then(parse_expiry)
    }

    /// The token in the authenticator's shape. An unreadable expiry counts as expired.
    pub fn token_info(&self) -> TokenInfo {
        let expires_at = self.expiry.as_ref().map(|_| {
            self.expiry_time()
                .and_then(|at| OffsetDateTime::from_unix_timestamp(at.timestamp()).ok())
                .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        });
        TokenInfo {
            access_token: self.token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at,
            id_token: None,
        }
    }

    /// Client registration recorded alongside the token, if complete.
    pub fn application_secret(&self) -> Option<ApplicationSecret> {
        Some(ApplicationSecret {
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            token_uri: self.token_uri.clone(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            redirect_uris: vec!["http://localhost".to_string()],
            ..Default::default()
        })
    }
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn format_expiry(at: OffsetDateTime) -> Option<String> {
    Utc.timestamp_opt(at.unix_timestamp(), 0)
        .single()
        .map(|at| at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
}

fn read_token(path: &Path) -> Result<Option<StoredToken>, DriveError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| DriveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| DriveError::Parse(format!("Invalid token file {}: {}", path.display(), e)))
}

fn write_token(path: &Path, token: &StoredToken) -> Result<(), DriveError> {
    let json = serde_json::to_string_pretty(token)
        .map_err(|e| DriveError::Parse(format!("Failed to serialize token: {}", e)))?;
    fs::write(path, json).map_err(|source| DriveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Saved token for the next run");
    Ok(())
}

/// `token.json` as the authenticator's token storage.
pub struct TokenFile {
    path: PathBuf,
    client: ApplicationSecret,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>, client: ApplicationSecret) -> Self {
        Self {
            path: path.into(),
            client,
        }
    }
}

#[async_trait]
impl TokenStorage for TokenFile {
    async fn set(&self, scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        let previous_refresh = read_token(&self.path)
            .ok()
            .flatten()
            .and_then(|stored| stored.refresh_token);

        let stored = StoredToken {
            token: token.access_token,
            refresh_token: token.refresh_token.or(previous_refresh),
            token_uri: self.client.token_uri.clone(),
            client_id: Some(self.client.client_id.clone()),
            client_secret: Some(self.client.client_secret.clone()),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expiry: token.expires_at.and_then(format_expiry),
        };
        write_token(&self.path, &stored)?;
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        match read_token(&self.path) {
            Ok(stored) => stored.map(|stored| stored.token_info()),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable token file");
                None
            }
        }
    }
}

/// Prints the consent URL and opens it in the default browser.
pub struct BrowserConsent;

impl InstalledFlowDelegate for BrowserConsent {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            println!(
                "Please visit this URL to authorize this application: {}",
                url
            );
            if let Err(e) = open::that(url) {
                warn!(error = %e, "Could not open a browser, open the URL manually");
            }
            if need_code {
                println!("Enter the authorization code:");
                let mut input = String::new();
                std::io::stdin()
                    .read_line(&mut input)
                    .map_err(|e| e.to_string())?;
                return Ok(input.trim().to_string());
            }
            Ok(String::new())
        })
    }
}

struct SharedConsent(Arc<dyn InstalledFlowDelegate>);

impl InstalledFlowDelegate for SharedConsent {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        self.0.present_user_url(url, need_code)
    }
}

pub struct TokenFileCredentials {
    folder: PathBuf,
    scopes: Vec<String>,
    consent: Arc<dyn InstalledFlowDelegate>,
}

impl TokenFileCredentials {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            scopes: vec![DRIVE_READONLY_SCOPE.to_string()],
            consent: Arc::new(BrowserConsent),
        }
    }

    /// Replace the browser prompt used when a fresh login is needed.
    pub fn with_consent(mut self, consent: impl InstalledFlowDelegate + 'static) -> Self {
        self.consent = Arc::new(consent);
        self
    }

    pub fn token_path(&self) -> PathBuf {
        self.folder.join(TOKEN_FILE)
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.folder.join(CLIENT_SECRETS_FILE)
    }

    pub fn load_token(&self) -> Result<Option<StoredToken>, DriveError> {
        read_token(&self.token_path())
    }

    /// Client registration from `client_secrets.json`, else from the stored token.
    pub fn application_secret(
        &self,
        stored: Option<&StoredToken>,
    ) -> Result<ApplicationSecret, DriveError> {
        let path = self.secrets_path();
        if path.exists() {
            let raw = fs::read(&path).map_err(|source| DriveError::Io {
                path: path.clone(),
                source,
            })?;
            return yup_oauth2::parse_application_secret(raw).map_err(|e| {
                DriveError::Parse(format!("Invalid client secrets file {}: {}", path.display(), e))
            });
        }
        stored
            .and_then(StoredToken::application_secret)
            .ok_or(DriveError::MissingFile(path))
    }
}

#[async_trait]
impl CredentialProvider for TokenFileCredentials {
    async fn credential(&self) -> Result<Credential, DriveError> {
        let stored = self.load_token()?;
        let secret = self.application_secret(stored.as_ref())?;
        let storage = TokenFile::new(self.token_path(), secret.clone());

        let auth =
            InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
                .with_storage(Box::new(storage))
                .flow_delegate(Box::new(SharedConsent(self.consent.clone())))
                .build()
                .await
                .map_err(|source| DriveError::Io {
                    path: self.token_path(),
                    source,
                })?;

        let token = auth
            .token(self.scopes.as_slice())
            .await
            .map_err(|e| DriveError::Auth(e.to_string()))?;
        info!("Obtained drive access token");

        token
            .token()
            .map(Credential::new)
            .ok_or_else(|| DriveError::Auth("token endpoint returned no access token".into()))
    }
}

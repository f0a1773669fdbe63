//! File-backed credential provider: token reuse, refresh, browser login and missing secrets.

use gdrive_clone_core::contract::CredentialProvider;
use gdrive_clone_core::credentials::{
    InstalledFlowDelegate, StoredToken, TokenFileCredentials, DRIVE_READONLY_SCOPE,
};
use gdrive_clone_core::error::DriveError;
use serde_json::json;
use std::fs;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_token(dir: &std::path::Path, token_uri: &str, expiry: &str) {
    let token = json!({
        "token": "stored-access",
        "refresh_token": "stored-refresh",
        "token_uri": token_uri,
        "client_id": "client-id",
        "client_secret": "client-secret",
        "scopes": [DRIVE_READONLY_SCOPE],
        "universe_domain": "googleapis.com",
        "expiry": expiry
    });
    fs::write(dir.join("token.json"), token.to_string()).unwrap();
}

fn write_client_secrets(dir: &std::path::Path, token_uri: &str) {
    let secrets = json!({
        "installed": {
            "client_id": "installed-client",
            "client_secret": "installed-secret",
            "project_id": "gdrive-clone-tests",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": token_uri,
            "redirect_uris": ["http://localhost"]
        }
    });
    fs::write(dir.join("client_secrets.json"), secrets.to_string()).unwrap();
}

/// Stands in for the user: follows the consent URL's redirect with a fixed code.
struct RedirectWithCode {
    code: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

impl InstalledFlowDelegate for RedirectWithCode {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        _need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(url.to_string());
            let consent = reqwest::Url::parse(url).map_err(|e| e.to_string())?;
            let redirect = consent
                .query_pairs()
                .find(|(key, _)| key == "redirect_uri")
                .map(|(_, value)| value.into_owned())
                .ok_or("consent URL has no redirect_uri")?;
            let callback = format!(
                "{}/?code={}",
                redirect.trim_end_matches('/').replace("localhost", "127.0.0.1"),
                self.code
            );
            tokio::spawn(async move {
                let _ = reqwest::get(callback).await;
            });
            Ok(String::new())
        })
    }
}

#[tokio::test]
async fn valid_stored_token_is_reused_without_network() {
    let dir = tempdir().unwrap();
    write_token(dir.path(), "http://127.0.0.1:9/unreachable", "2999-01-01T00:00:00.000000Z");

    let provider = TokenFileCredentials::new(dir.path());
    let credential = provider.credential().await.unwrap();

    assert_eq!(credential.access_token(), "stored-access");
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "expires_in": 3599,
            "scope": DRIVE_READONLY_SCOPE,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    write_token(
        dir.path(),
        &format!("{}/token", server.uri()),
        "2000-01-01T00:00:00.000000Z",
    );

    let provider = TokenFileCredentials::new(dir.path());
    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token(), "fresh-access");

    let saved: StoredToken =
        serde_json::from_str(&fs::read_to_string(dir.path().join("token.json")).unwrap()).unwrap();
    assert_eq!(saved.token.as_deref(), Some("fresh-access"));
    assert_eq!(saved.refresh_token.as_deref(), Some("stored-refresh"));
    assert_eq!(saved.client_id.as_deref(), Some("client-id"));
    assert!(saved.expiry_time().unwrap() > chrono::Utc::now());
}

#[tokio::test]
async fn first_login_exchanges_the_redirected_code_and_saves_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("client_id=installed-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued-access",
            "refresh_token": "issued-refresh",
            "expires_in": 3599,
            "scope": DRIVE_READONLY_SCOPE,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    write_client_secrets(dir.path(), &format!("{}/token", server.uri()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let provider = TokenFileCredentials::new(dir.path()).with_consent(RedirectWithCode {
        code: "auth-code",
        seen: seen.clone(),
    });

    let credential = tokio::time::timeout(Duration::from_secs(30), provider.credential())
        .await
        .expect("login did not complete")
        .unwrap();
    assert_eq!(credential.access_token(), "issued-access");

    let urls = seen.lock().unwrap().clone();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("client_id=installed-client"));
    assert!(urls[0].contains("drive.readonly"));

    let saved: StoredToken =
        serde_json::from_str(&fs::read_to_string(dir.path().join("token.json")).unwrap()).unwrap();
    assert_eq!(saved.token.as_deref(), Some("issued-access"));
    assert_eq!(saved.refresh_token.as_deref(), Some("issued-refresh"));
    assert_eq!(saved.client_id.as_deref(), Some("installed-client"));
    assert_eq!(saved.token_uri, format!("{}/token", server.uri()));
    assert_eq!(saved.scopes, vec![DRIVE_READONLY_SCOPE.to_string()]);

    let reused = TokenFileCredentials::new(dir.path())
        .credential()
        .await
        .unwrap();
    assert_eq!(reused.access_token(), "issued-access");
}

#[tokio::test]
async fn no_token_and_no_client_secrets_is_reported() {
    let dir = tempdir().unwrap();

    let err = TokenFileCredentials::new(dir.path())
        .credential()
        .await
        .unwrap_err();

    match err {
        DriveError::MissingFile(path) => assert_eq!(path, dir.path().join("client_secrets.json")),
        other => panic!("expected missing client secrets, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_client_secrets_is_a_parse_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("client_secrets.json"), r#"{"neither": {}}"#).unwrap();

    let err = TokenFileCredentials::new(dir.path())
        .credential()
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::Parse(msg) if msg.contains("client_secrets.json")));
}

#[tokio::test]
async fn corrupt_token_file_is_a_parse_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("token.json"), "{ not json").unwrap();

    let err = TokenFileCredentials::new(dir.path())
        .credential()
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::Parse(_)));
}

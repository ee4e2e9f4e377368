//! Lightweight OAuth2 Authorization Code flow (with PKCE) for desktop apps.
//!
//! 1. Opens browser to authorization URL
//! 2. Starts a tiny localhost HTTP server to receive the callback
//! 3. Exchanges the code for an access token (+ refresh token)
//! 4. Stores tokens through a [`TokenStore`]
//!
//! [`CredentialCache`] wraps all of this behind a single `access_token()`
//! call: the token is fetched once, reused while valid, and refreshed when
//! it expires.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::keyring_store;
use crate::error::{CoreError, OAuthError};

/// Seconds before the real expiry at which a token is treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>, // Unix timestamp
    pub token_type: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub service_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_port: u16,
}

impl OAuthConfig {
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.redirect_port)
    }

    pub fn auth_url_full(&self, state: &str, code_challenge: &str) -> Result<String, OAuthError> {
        let scopes = self.scopes.join(" ");
        let url = url::Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri().as_str()),
                ("response_type", "code"),
                ("scope", scopes.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| OAuthError::AuthorizationFailed(format!("invalid auth url: {e}")))?;
        Ok(url.into())
    }
}

/// Shape of a token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self, previous_refresh: Option<&str>) -> OAuthTokens {
        OAuthTokens {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(String::from)),
            expires_at: self
                .expires_in
                .map(|ei| chrono::Utc::now().timestamp() + ei),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: self.scope,
        }
    }
}

/// Where OAuth tokens are persisted between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self, service: &str) -> Result<Option<OAuthTokens>, OAuthError>;
    fn save(&self, service: &str, tokens: &OAuthTokens) -> Result<(), OAuthError>;
    fn delete(&self, service: &str) -> Result<(), OAuthError>;
}

/// Tokens serialized as JSON in the OS keyring.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringTokenStore;

impl TokenStore for KeyringTokenStore {
    fn load(&self, service: &str) -> Result<Option<OAuthTokens>, OAuthError> {
        match keyring_store::get(service)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| OAuthError::Store(format!("corrupt stored token: {e}"))),
            None => Ok(None),
        }
    }

    fn save(&self, service: &str, tokens: &OAuthTokens) -> Result<(), OAuthError> {
        let json = serde_json::to_string(tokens).map_err(|e| OAuthError::Store(e.to_string()))?;
        keyring_store::set(service, &json)?;
        Ok(())
    }

    fn delete(&self, service: &str) -> Result<(), OAuthError> {
        keyring_store::delete(service)?;
        Ok(())
    }
}

/// In-process token store, used by tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, OAuthTokens>>,
}

impl MemoryTokenStore {
    pub fn with_tokens(service: &str, tokens: OAuthTokens) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.tokens.lock() {
            guard.insert(service.to_string(), tokens);
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, service: &str) -> Result<Option<OAuthTokens>, OAuthError> {
        let guard = self
            .tokens
            .lock()
            .map_err(|_| OAuthError::Store("token store poisoned".into()))?;
        Ok(guard.get(service).cloned())
    }

    fn save(&self, service: &str, tokens: &OAuthTokens) -> Result<(), OAuthError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| OAuthError::Store("token store poisoned".into()))?;
        guard.insert(service.to_string(), tokens.clone());
        Ok(())
    }

    fn delete(&self, service: &str) -> Result<(), OAuthError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| OAuthError::Store("token store poisoned".into()))?;
        guard.remove(service);
        Ok(())
    }
}

fn random_urlsafe(len: usize) -> Result<String, OAuthError> {
    let mut buf = vec![0u8; len];
    getrandom::fill(&mut buf)
        .map_err(|e| OAuthError::AuthorizationFailed(format!("rng failure: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// S256 code challenge for a PKCE verifier.
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Run the full OAuth2 flow: open browser -> listen for callback -> exchange code.
pub async fn authorize(
    http: &Client,
    config: &OAuthConfig,
    store: &dyn TokenStore,
) -> Result<OAuthTokens, OAuthError> {
    let state = random_urlsafe(16)?;
    let verifier = random_urlsafe(32)?;
    let auth_url = config.auth_url_full(&state, &pkce_challenge(&verifier))?;

    // Bind before opening the browser so the redirect cannot race us.
    let listener = TcpListener::bind(("127.0.0.1", config.redirect_port))
        .await
        .map_err(|e| OAuthError::AuthorizationFailed(format!("cannot listen for callback: {e}")))?;

    info!(service = %config.service_name, "opening browser for authorization");
    if open::that(&auth_url).is_err() {
        eprintln!("Open this URL in your browser to continue:\n{auth_url}");
    }

    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| OAuthError::InvalidCallback(e.to_string()))?;
    let mut buf = [0u8; 4096];
    let n = stream
        .read(&mut buf)
        .await
        .map_err(|e| OAuthError::InvalidCallback(e.to_string()))?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let callback = parse_callback(&request);

    let body = if callback.is_ok() {
        "<h2>Authentication successful!</h2><p>You can close this tab.</p>"
    } else {
        "<h2>Authentication failed.</h2><p>Return to the terminal for details.</p>"
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body>{body}</body></html>"
    );
    // The browser page is cosmetic; the flow continues even if it cannot be written.
    let _ = stream.write_all(response.as_bytes()).await;
    drop(stream);
    drop(listener);

    let callback = callback?;
    if callback.state != state {
        return Err(OAuthError::InvalidCallback("state mismatch".into()));
    }

    let tokens = exchange_code(http, config, &callback.code, &verifier).await?;
    store.save(&config.service_name, &tokens)?;
    Ok(tokens)
}

async fn post_token_form(
    http: &Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse, String> {
    let resp = http
        .post(token_url)
        .form(params)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(format!("HTTP {status}: {text}"));
    }
    resp.json::<TokenResponse>().await.map_err(|e| e.to_string())
}

/// Exchange authorization code for tokens.
async fn exchange_code(
    http: &Client,
    config: &OAuthConfig,
    code: &str,
    verifier: &str,
) -> Result<OAuthTokens, OAuthError> {
    let redirect_uri = config.redirect_uri();
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("code_verifier", verifier),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    post_token_form(http, &config.token_url, &params)
        .await
        .map(|body| body.into_tokens(None))
        .map_err(OAuthError::TokenExchangeFailed)
}

/// Refresh an access token using a refresh token and persist the result.
pub async fn refresh_token(
    http: &Client,
    config: &OAuthConfig,
    store: &dyn TokenStore,
    refresh: &str,
) -> Result<OAuthTokens, OAuthError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh),
        ("grant_type", "refresh_token"),
    ];

    let tokens = post_token_form(http, &config.token_url, &params)
        .await
        .map(|body| body.into_tokens(Some(refresh)))
        .map_err(OAuthError::TokenRefreshFailed)?;

    store.save(&config.service_name, &tokens)?;
    Ok(tokens)
}

/// Check if tokens are expired (with 60s buffer).
pub fn is_expired(tokens: &OAuthTokens) -> bool {
    match tokens.expires_at {
        Some(exp) => chrono::Utc::now().timestamp() > exp - EXPIRY_BUFFER_SECS,
        None => false,
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

fn parse_callback(request: &str) -> Result<Callback, OAuthError> {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| OAuthError::InvalidCallback("empty request".into()))?;
    let url = url::Url::parse(&format!("http://localhost{path}"))
        .map_err(|e| OAuthError::InvalidCallback(e.to_string()))?;

    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if let Some(err) = params.get("error") {
        return Err(OAuthError::AuthorizationFailed(err.clone()));
    }
    let code = params
        .get("code")
        .cloned()
        .ok_or_else(|| OAuthError::InvalidCallback("no code in callback".into()))?;
    let state = params.get("state").cloned().unwrap_or_default();
    Ok(Callback { code, state })
}

/// Owned, lazily-populated access token for one OAuth service.
pub struct CredentialCache {
    config: OAuthConfig,
    store: Box<dyn TokenStore>,
    http: Client,
    cached: Option<OAuthTokens>,
}

impl CredentialCache {
    pub fn new(config: OAuthConfig, store: Box<dyn TokenStore>, http: Client) -> Self {
        Self {
            config,
            store,
            http,
            cached: None,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// Whether a token is stored (it may still need a refresh).
    pub fn is_authenticated(&self) -> bool {
        self.cached.is_some() || matches!(self.store.load(&self.config.service_name), Ok(Some(_)))
    }

    /// Whether client credentials are configured, so the browser flow can run.
    pub fn can_authorize(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.is_empty()
    }

    /// Return a valid access token, refreshing it if expired.
    ///
    /// When nothing usable is stored the interactive flow runs, provided
    /// client credentials are configured; otherwise this fails with
    /// [`CoreError::Authentication`].
    pub async fn access_token(&mut self) -> Result<String, CoreError> {
        if let Some(tokens) = self.cached.as_ref().filter(|t| !is_expired(t)) {
            return Ok(tokens.access_token.clone());
        }

        let stored = match self.cached.take() {
            Some(t) => Some(t),
            None => self.store.load(&self.config.service_name)?,
        };

        let tokens = match stored {
            Some(t) if !is_expired(&t) => t,
            Some(t) => match t.refresh_token.as_deref() {
                Some(refresh) => {
                    if !self.can_authorize() {
                        return Err(OAuthError::CredentialsNotConfigured {
                            service: self.config.service_name.clone(),
                        }
                        .into());
                    }
                    debug!(service = %self.config.service_name, "refreshing access token");
                    refresh_token(&self.http, &self.config, self.store.as_ref(), refresh)
                        .await
                        .map_err(|e| CoreError::Authentication(e.to_string()))?
                }
                None => {
                    self.login("access token expired and no refresh token available")
                        .await?
                }
            },
            None => {
                let reason = format!(
                    "not authenticated with {}; run `calnotion auth {} login`",
                    self.config.service_name, self.config.service_name
                );
                self.login(&reason).await?
            }
        };

        let token = tokens.access_token.clone();
        self.cached = Some(tokens);
        Ok(token)
    }

    /// Run the browser flow when possible, else fail with `reason`.
    async fn login(&self, reason: &str) -> Result<OAuthTokens, CoreError> {
        if !self.can_authorize() {
            return Err(CoreError::Authentication(reason.to_string()));
        }
        info!(service = %self.config.service_name, "no usable token, starting authorization");
        Ok(authorize(&self.http, &self.config, self.store.as_ref()).await?)
    }

    /// Run the interactive browser flow and cache the result.
    pub async fn authorize(&mut self) -> Result<(), CoreError> {
        if !self.can_authorize() {
            return Err(OAuthError::CredentialsNotConfigured {
                service: self.config.service_name.clone(),
            }
            .into());
        }
        let tokens = authorize(&self.http, &self.config, self.store.as_ref()).await?;
        self.cached = Some(tokens);
        Ok(())
    }

    /// Forget the cached token and remove it from the store.
    pub fn clear(&mut self) -> Result<(), CoreError> {
        self.cached = None;
        self.store.delete(&self.config.service_name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token_url: String) -> OAuthConfig {
        OAuthConfig {
            service_name: "google".into(),
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            auth_url: "https://accounts.example.com/auth".into(),
            token_url,
            scopes: vec!["scope.a".into(), "scope.b".into()],
            redirect_port: 19821,
        }
    }

    fn tokens(access: &str, expires_at: Option<i64>, refresh: Option<&str>) -> OAuthTokens {
        OAuthTokens {
            access_token: access.into(),
            refresh_token: refresh.map(String::from),
            expires_at,
            token_type: "Bearer".into(),
            scope: None,
        }
    }

    #[test]
    fn expiry_uses_buffer() {
        let now = chrono::Utc::now().timestamp();
        assert!(!is_expired(&tokens("a", None, None)));
        assert!(!is_expired(&tokens("a", Some(now + 3600), None)));
        assert!(is_expired(&tokens("a", Some(now + 30), None)));
        assert!(is_expired(&tokens("a", Some(now - 1), None)));
    }

    #[test]
    fn auth_url_carries_pkce_and_state() {
        let url = config("https://t".into())
            .auth_url_full("st4te", "chal")
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let params: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(params["state"], "st4te");
        assert_eq!(params["code_challenge"], "chal");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["scope"], "scope.a scope.b");
        assert_eq!(params["redirect_uri"], "http://localhost:19821/callback");
    }

    #[test]
    fn pkce_challenge_matches_rfc7636_example() {
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn parse_callback_extracts_code_and_state() {
        let req = "GET /callback?code=abc%2F123&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(
            parse_callback(req).unwrap(),
            Callback {
                code: "abc/123".into(),
                state: "xyz".into()
            }
        );
        assert!(matches!(
            parse_callback("GET /callback?error=access_denied HTTP/1.1"),
            Err(OAuthError::AuthorizationFailed(_))
        ));
        assert!(parse_callback("GET /callback HTTP/1.1").is_err());
        assert!(parse_callback("").is_err());
    }

    #[tokio::test]
    async fn cache_returns_stored_token_without_network() {
        let now = chrono::Utc::now().timestamp();
        let store = MemoryTokenStore::with_tokens("google", tokens("live", Some(now + 3600), None));
        let mut cache = CredentialCache::new(
            config("http://127.0.0.1:9/unused".into()),
            Box::new(store),
            Client::new(),
        );
        assert!(cache.is_authenticated());
        assert_eq!(cache.access_token().await.unwrap(), "live");
        assert_eq!(cache.access_token().await.unwrap(), "live");
    }

    fn without_client_credentials(token_url: String) -> OAuthConfig {
        OAuthConfig {
            client_id: String::new(),
            client_secret: String::new(),
            ..config(token_url)
        }
    }

    #[test]
    fn browser_flow_needs_client_credentials() {
        let with = CredentialCache::new(
            config("http://127.0.0.1:9/unused".into()),
            Box::new(MemoryTokenStore::default()),
            Client::new(),
        );
        assert!(with.can_authorize());

        let partial = OAuthConfig {
            client_secret: String::new(),
            ..config("http://127.0.0.1:9/unused".into())
        };
        let without = CredentialCache::new(
            partial,
            Box::new(MemoryTokenStore::default()),
            Client::new(),
        );
        assert!(!without.can_authorize());
    }

    #[tokio::test]
    async fn no_token_and_no_client_credentials_is_an_authentication_error() {
        let mut cache = CredentialCache::new(
            without_client_credentials("http://127.0.0.1:9/unused".into()),
            Box::new(MemoryTokenStore::default()),
            Client::new(),
        );
        assert!(!cache.is_authenticated());
        match cache.access_token().await {
            Err(CoreError::Authentication(msg)) => {
                assert!(msg.contains("calnotion auth google login"), "{msg}")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_token_without_refresh_or_client_credentials_is_an_authentication_error() {
        let store = MemoryTokenStore::with_tokens("google", tokens("old", Some(0), None));
        let mut cache = CredentialCache::new(
            without_client_credentials("http://127.0.0.1:9/unused".into()),
            Box::new(store),
            Client::new(),
        );
        assert!(matches!(
            cache.access_token().await,
            Err(CoreError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "r1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"fresh","expires_in":3600,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = std::sync::Arc::new(MemoryTokenStore::with_tokens(
            "google",
            tokens("stale", Some(0), Some("r1")),
        ));
        let mut cache = CredentialCache::new(
            config(format!("{}/token", server.url())),
            Box::new(SharedStore(store.clone())),
            Client::new(),
        );

        assert_eq!(cache.access_token().await.unwrap(), "fresh");
        // Memoized: no second refresh.
        assert_eq!(cache.access_token().await.unwrap(), "fresh");
        mock.assert_async().await;

        let saved = store.load("google").unwrap().unwrap();
        assert_eq!(saved.access_token, "fresh");
        assert_eq!(saved.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn failed_refresh_is_an_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let store = MemoryTokenStore::with_tokens("google", tokens("stale", Some(0), Some("r1")));
        let mut cache = CredentialCache::new(
            config(format!("{}/token", server.url())),
            Box::new(store),
            Client::new(),
        );
        match cache.access_token().await {
            Err(CoreError::Authentication(msg)) => assert!(msg.contains("invalid_grant")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn clear_removes_stored_tokens() {
        let store = MemoryTokenStore::with_tokens("google", tokens("a", None, None));
        let mut cache = CredentialCache::new(
            config("http://127.0.0.1:9/unused".into()),
            Box::new(store),
            Client::new(),
        );
        cache.clear().unwrap();
        assert!(!cache.is_authenticated());
    }

    /// Lets a test keep a handle on the store it hands to the cache.
    struct SharedStore(std::sync::Arc<MemoryTokenStore>);

    impl TokenStore for SharedStore {
        fn load(&self, service: &str) -> Result<Option<OAuthTokens>, OAuthError> {
            self.0.load(service)
        }
        fn save(&self, service: &str, tokens: &OAuthTokens) -> Result<(), OAuthError> {
            self.0.save(service, tokens)
        }
        fn delete(&self, service: &str) -> Result<(), OAuthError> {
            self.0.delete(service)
        }
    }
}

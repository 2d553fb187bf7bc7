//! OAuth2 credential management for the Gmail API
//!
//! Read and send permissions are deliberately separate: each scope has its
//! own persisted token file, so the fetch path never holds a send-capable
//! credential and vice versa.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, Instant};
use url::Url;

use crate::error::{DigestError, Result};

/// Scope granted when listing and reading messages
pub const READONLY_SCOPE_URL: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Scope granted when sending mail
pub const SEND_SCOPE_URL: &str = "https://www.googleapis.com/auth/gmail.send";

/// Leeway before the recorded expiry at which a token counts as expired
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Fallback token lifetime when the provider omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// How long the loopback listener waits for the consent redirect
const CONSENT_TIMEOUT: StdDuration = StdDuration::from_secs(120);

/// Permission set a credential is authorized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scope {
    /// List and read messages
    Readonly,
    /// Send mail
    Send,
}

impl Scope {
    pub fn url(&self) -> &'static str {
        match self {
            Scope::Readonly => READONLY_SCOPE_URL,
            Scope::Send => SEND_SCOPE_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Readonly => "readonly",
            Scope::Send => "send",
        }
    }

    /// Token file name for this scope, relative to the token directory
    pub fn token_file(&self) -> &'static str {
        match self {
            Scope::Readonly => "token-readonly.json",
            Scope::Send => "token-send.json",
        }
    }
}

/// Token material persisted between runs, one file per scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredCredential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }
}

/// Tokens returned by an authorization or refresh exchange (in-memory)
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Client secret structure matching Google's installed-app credentials JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecret {
    pub installed: InstalledApp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledApp {
    pub client_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Load the installed-app client secret from a JSON file
///
/// A missing file is not an error here; whether that matters depends on
/// whether a usable token is already cached.
pub async fn load_client_secret(path: &Path) -> Result<Option<InstalledApp>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let parsed: ClientSecret = serde_json::from_str(&content)?;
            Ok(Some(parsed.installed))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Capability for obtaining fresh token material out-of-band
///
/// Injected into [`CredentialManager`] so headless environments can swap the
/// browser flow for something else, and so tests can count calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthFlow: Send + Sync {
    /// Run the interactive authorization flow for `scope`
    async fn authorize(&self, scope: Scope) -> Result<TokenSet>;

    /// Exchange a refresh token for a new access token
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet>;
}

/// Wire format of Google's token endpoint responses
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Browser-based installed-app flow with a loopback redirect listener
pub struct InstalledFlow {
    secret: Option<InstalledApp>,
    redirect_port: u16,
    http: reqwest::Client,
}

impl InstalledFlow {
    pub fn new(secret: Option<InstalledApp>, redirect_port: u16) -> Self {
        Self {
            secret,
            redirect_port,
            http: reqwest::Client::new(),
        }
    }

    /// Build a flow from the client secret file; a missing file yields a
    /// flow that can only fail, which is fine as long as a valid token is
    /// already cached.
    pub async fn from_file(path: &Path, redirect_port: u16) -> Result<Self> {
        let secret = load_client_secret(path).await?;
        if secret.is_none() {
            tracing::warn!("No client secret at {:?}; only cached tokens are usable", path);
        }
        Ok(Self::new(secret, redirect_port))
    }

    fn secret(&self) -> Result<&InstalledApp> {
        self.secret.as_ref().ok_or_else(|| {
            DigestError::Auth(
                "no client secret configuration available and no valid credential cached"
                    .to_string(),
            )
        })
    }

    async fn request_tokens(&self, token_uri: &str, params: &[(&str, &str)]) -> Result<TokenSet> {
        let response = self
            .http
            .post(token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| DigestError::Auth(format!("Token endpoint unreachable: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DigestError::Auth(format!(
                "Token exchange failed: {} ({})",
                status, body
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| DigestError::Auth(format!("Malformed token response: {}", e)))?;

        Ok(TokenSet {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in,
        })
    }
}

#[async_trait]
impl AuthFlow for InstalledFlow {
    async fn authorize(&self, scope: Scope) -> Result<TokenSet> {
        let secret = self.secret()?.clone();
        let redirect_uri = format!("http://127.0.0.1:{}/callback", self.redirect_port);

        let consent_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            secret.auth_uri,
            urlencoding::encode(&secret.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(scope.url()),
        );

        println!(
            "Open this URL in your browser to authorize access:\n\n{}\n",
            consent_url
        );
        // best-effort: don't fail if the browser can't be opened
        if let Err(e) = open::that(&consent_url) {
            eprintln!("Warning: could not open browser automatically: {}", e);
        }

        let port = self.redirect_port;
        let code = tokio::task::spawn_blocking(move || wait_for_code(port))
            .await
            .map_err(|e| DigestError::Auth(format!("Authorization listener failed: {}", e)))??;

        tracing::info!("Authorization code received, exchanging for tokens");
        self.request_tokens(
            &secret.token_uri,
            &[
                ("code", code.as_str()),
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let secret = self.secret()?;
        self.request_tokens(
            &secret.token_uri,
            &[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }
}

/// Block until the consent redirect delivers an authorization code
///
/// Binds the listener before the browser opens so the redirect cannot race
/// the server startup.
fn wait_for_code(port: u16) -> Result<String> {
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let server = tiny_http::Server::http(bind_addr).map_err(|e| {
        DigestError::Auth(format!(
            "Failed to bind OAuth callback listener on {}: {:?}",
            bind_addr, e
        ))
    })?;

    let deadline = Instant::now() + CONSENT_TIMEOUT;
    while Instant::now() < deadline {
        let request = match server.recv_timeout(StdDuration::from_millis(500)) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(_) => continue,
        };

        // request.url() is path+query like "/callback?code=...&state=..."
        let full = format!("http://127.0.0.1:{}{}", port, request.url());
        let code = Url::parse(&full).ok().and_then(|parsed| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == "code")
                .map(|(_, v)| v.into_owned())
        });

        match code {
            Some(code) => {
                let _ = request.respond(tiny_http::Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                return Ok(code);
            }
            None => {
                let _ = request.respond(tiny_http::Response::from_string(
                    "No code found in redirect. You can close this tab.",
                ));
            }
        }
    }

    Err(DigestError::Auth(
        "No authorization code received within timeout".to_string(),
    ))
}


type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Obtains, refreshes, and persists per-scope credentials
pub struct CredentialManager {
    token_dir: PathBuf,
    flow: Box<dyn AuthFlow>,
    clock: Clock,
}

impl CredentialManager {
    pub fn new(token_dir: impl Into<PathBuf>, flow: Box<dyn AuthFlow>) -> Self {
        Self::with_clock(token_dir, flow, Box::new(Utc::now))
    }

    /// Constructor with an injectable clock for expiry checks
    pub fn with_clock(token_dir: impl Into<PathBuf>, flow: Box<dyn AuthFlow>, clock: Clock) -> Self {
        Self {
            token_dir: token_dir.into(),
            flow,
            clock,
        }
    }

    pub fn token_path(&self, scope: Scope) -> PathBuf {
        self.token_dir.join(scope.token_file())
    }

    /// Return a usable credential for `scope`, going through refresh or the
    /// interactive flow only when the cached one is unusable.
    pub async fn obtain(&self, scope: Scope) -> Result<StoredCredential> {
        let path = self.token_path(scope);

        if let Some(credential) = load_credential(&path).await? {
            if !credential.is_expired((self.clock)()) {
                tracing::debug!("Using cached {} credential", scope.as_str());
                return Ok(credential);
            }

            if let Some(refresh_token) = credential.refresh_token.clone() {
                tracing::info!("Refreshing expired {} credential", scope.as_str());
                let tokens = self.flow.refresh(&refresh_token).await?;
                let updated = self.stored_from(tokens, Some(refresh_token));
                self.persist(&path, &updated).await?;
                return Ok(updated);
            }
        }

        tracing::info!(
            "No usable {} credential, starting authorization flow",
            scope.as_str()
        );
        let tokens = self.flow.authorize(scope).await?;
        let credential = self.stored_from(tokens, None);
        self.persist(&path, &credential).await?;
        Ok(credential)
    }

    /// Convenience accessor for bearer-token call sites
    pub async fn access_token(&self, scope: Scope) -> Result<String> {
        Ok(self.obtain(scope).await?.access_token)
    }

    fn stored_from(&self, tokens: TokenSet, previous_refresh: Option<String>) -> StoredCredential {
        let lifetime = tokens.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        StoredCredential {
            access_token: tokens.access_token,
            // A refresh response usually omits the refresh token; keep the old one
            refresh_token: tokens.refresh_token.or(previous_refresh),
            expires_at: (self.clock)() + Duration::seconds(lifetime as i64),
        }
    }

    async fn persist(&self, path: &Path, credential: &StoredCredential) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(credential)?;
        tokio::fs::write(path, json).await?;
        secure_token_file(path).await?;
        tracing::debug!("Persisted credential to {:?}", path);
        Ok(())
    }
}

/// Load a persisted credential; a corrupt file is a hard error, never
/// silently re-authorized over.
async fn load_credential(path: &Path) -> Result<Option<StoredCredential>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let credential = serde_json::from_str(&content)?;
            Ok(Some(credential))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Restrict token file permissions to the owner on Unix systems
#[cfg(unix)]
async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(windows)]
async fn secure_token_file(_path: &Path) -> Result<()> {
    // Windows uses ACLs rather than Unix permission bits
    Ok(())
}

//! Common test utilities and fixtures

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gmail_digest::auth::{AuthFlow, CredentialManager, Scope, StoredCredential, TokenSet};
use gmail_digest::error::{DigestError, Result};
use serde_json::json;
use tempfile::TempDir;

/// AuthFlow that refuses every call. Tests seed token files directly, so any
/// attempt to go interactive is a bug.
pub struct DeniedFlow;

#[async_trait]
impl AuthFlow for DeniedFlow {
    async fn authorize(&self, _scope: Scope) -> Result<TokenSet> {
        Err(DigestError::Auth(
            "interactive flow is disabled in tests".to_string(),
        ))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet> {
        Err(DigestError::Auth(
            "token refresh is disabled in tests".to_string(),
        ))
    }
}

/// Credential manager over `dir` with far-future tokens for both scopes
pub async fn seeded_credentials(dir: &TempDir) -> CredentialManager {
    let expires_at = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
    for (scope, token) in [(Scope::Readonly, "read-token"), (Scope::Send, "send-token")] {
        let credential = StoredCredential {
            access_token: token.to_string(),
            refresh_token: None,
            expires_at,
        };
        tokio::fs::write(
            dir.path().join(scope.token_file()),
            serde_json::to_string(&credential).unwrap(),
        )
        .await
        .unwrap();
    }
    CredentialManager::new(dir.path(), Box::new(DeniedFlow))
}

/// Full-format Gmail message JSON with the given headers and snippet
pub fn message_json(id: &str, headers: &[(&str, &str)], snippet: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "threadId": id,
        "snippet": snippet,
        "payload": {
            "mimeType": "text/plain",
            "headers": headers
                .iter()
                .map(|(name, value)| json!({"name": name, "value": value}))
                .collect::<Vec<_>>()
        }
    })
}

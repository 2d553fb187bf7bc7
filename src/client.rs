//! Gmail REST API client for listing, fetching, and sending messages

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};

use crate::auth::{CredentialManager, Scope};
use crate::error::{DigestError, Result};
use crate::models::{ListMessagesResponse, Message, SendMessageRequest};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Trait defining the mail provider operations the digest needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailClient: Send + Sync {
    /// List ids of the most recent messages, newest first as the provider
    /// returns them
    async fn list_message_ids(&self, max_results: u32) -> Result<Vec<String>>;

    /// Fetch one message in full format (headers + snippet)
    async fn get_message(&self, id: &str) -> Result<Message>;

    /// Send a base64url-encoded RFC 2822 message as the user
    async fn send_message(&self, raw: &str) -> Result<()>;
}

/// HTTP client against the Gmail REST API
///
/// Listing and fetching authenticate with the readonly credential; sending
/// with the send credential. The base URL is injectable so tests can point
/// at a mock server.
pub struct HttpMailClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialManager,
}

impl HttpMailClient {
    pub fn new(credentials: CredentialManager) -> Self {
        Self::with_base_url(credentials, GMAIL_API_BASE)
    }

    pub fn with_base_url(credentials: CredentialManager, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            credentials,
        }
    }

    async fn success_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DigestError::ProviderStatus {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(text)
    }
}

fn transport_error(e: reqwest::Error) -> DigestError {
    DigestError::Provider(format!("request failed: {}", e))
}

fn decode_error(e: serde_json::Error) -> DigestError {
    DigestError::Provider(format!("unexpected response body: {}", e))
}

#[async_trait]
impl MailClient for HttpMailClient {
    async fn list_message_ids(&self, max_results: u32) -> Result<Vec<String>> {
        let token = self.credentials.access_token(Scope::Readonly).await?;
        let url = format!(
            "{}/users/me/messages?maxResults={}",
            self.base_url, max_results
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)?;
        let body = Self::success_body(response).await?;

        let parsed: ListMessagesResponse = serde_json::from_str(&body).map_err(decode_error)?;
        // An empty mailbox answers with no "messages" array at all
        Ok(parsed
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        let token = self.credentials.access_token(Scope::Readonly).await?;
        let url = format!("{}/users/me/messages/{}?format=full", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)?;
        let body = Self::success_body(response).await?;

        serde_json::from_str(&body).map_err(decode_error)
    }

    async fn send_message(&self, raw: &str) -> Result<()> {
        let token = self.credentials.access_token(Scope::Send).await?;
        let url = format!("{}/users/me/messages/send", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&SendMessageRequest {
                raw: raw.to_string(),
            })
            .send()
            .await
            .map_err(transport_error)?;
        Self::success_body(response).await?;

        Ok(())
    }
}

/// Build a plain-text RFC 2822 message and base64url-encode it for the
/// `users/me/messages/send` endpoint
pub fn encode_plain_text_message(to: &str, subject: &str, body: &str) -> String {
    let message = format!(
        "To: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"utf-8\"\r\n\r\n{}",
        to, subject, body
    );
    URL_SAFE.encode(message.as_bytes())
}

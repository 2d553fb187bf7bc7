//! Summarization backends behind a uniform capability interface
//!
//! Three interchangeable strategies: an abstractive local model (served over
//! an OpenAI-compatible endpoint), extractive TextRank, and a remote LLM.
//! The method selector is the only difference visible to callers.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::config::SummaryConfig;
use crate::error::{DigestError, Result};
use crate::textrank;

/// Characters per abstractive chunk. Crude fixed-size windows, not
/// token-aware; may split mid-word.
pub const MAX_CHUNK_CHARS: usize = 1024;

/// Generation bounds for the abstractive model, in output tokens
const ABSTRACTIVE_MIN_TOKENS: u32 = 30;
const ABSTRACTIVE_MAX_TOKENS: u32 = 130;

/// Sentences kept by the extractive ranker
const EXTRACTIVE_SENTENCES: usize = 5;

/// Output cap and sampling temperature for the remote LLM
const REMOTE_MAX_TOKENS: u32 = 300;
const REMOTE_TEMPERATURE: f64 = 0.5;

/// Environment variable consulted when no API key is passed explicitly
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const REMOTE_PROMPT_HEADER: &str =
    "Summarize the following emails into a short, clear summary:\n\n";

/// Closed set of summarization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMethod {
    /// Local abstractive model
    Abstractive,
    /// Extractive graph-based sentence ranking
    TextRank,
    /// Remote LLM chat completion
    OpenAi,
}

impl SummaryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMethod::Abstractive => "abstractive",
            SummaryMethod::TextRank => "textrank",
            SummaryMethod::OpenAi => "openai",
        }
    }
}

impl fmt::Display for SummaryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryMethod {
    type Err = DigestError;

    /// Unknown tags are rejected here, before any backend is touched
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abstractive" => Ok(SummaryMethod::Abstractive),
            "textrank" => Ok(SummaryMethod::TextRank),
            "openai" => Ok(SummaryMethod::OpenAi),
            other => Err(DigestError::InvalidMethod(other.to_string())),
        }
    }
}

/// Uniform summarization capability, one implementation per method
#[async_trait]
pub trait SummaryEngine: Send + Sync {
    async fn summarize(&self, snippets: &[String]) -> Result<String>;
}

/// Summarize `snippets` with the selected method.
///
/// An empty batch returns an empty summary without constructing or invoking
/// any backend (so, for instance, a missing OpenAI key only matters when
/// there is something to summarize).
pub async fn summarize(
    snippets: &[String],
    method: SummaryMethod,
    config: &SummaryConfig,
    api_key: Option<&str>,
) -> Result<String> {
    if snippets.is_empty() {
        return Ok(String::new());
    }
    let engine = engine_for(method, config, api_key)?;
    engine.summarize(snippets).await
}

/// Build the engine for a method
pub fn engine_for(
    method: SummaryMethod,
    config: &SummaryConfig,
    api_key: Option<&str>,
) -> Result<Box<dyn SummaryEngine>> {
    match method {
        SummaryMethod::Abstractive => Ok(Box::new(AbstractiveEngine::new(
            &config.ollama_url,
            &config.ollama_model,
        ))),
        SummaryMethod::TextRank => Ok(Box::new(TextRankEngine)),
        SummaryMethod::OpenAi => Ok(Box::new(OpenAiEngine::new(
            &config.openai_api_hostname,
            &config.openai_model,
            resolve_api_key(api_key)?,
        ))),
    }
}

/// API key from the explicit parameter, falling back to the environment
fn resolve_api_key(explicit: Option<&str>) -> Result<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok().filter(|k| !k.is_empty()))
        .ok_or_else(|| {
            DigestError::Auth(format!(
                "OpenAI API key missing: pass one explicitly or set {}",
                OPENAI_API_KEY_ENV
            ))
        })
}

/// Split `text` into fixed-size character chunks
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Chat-completion response shape shared by both HTTP backends
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| DigestError::Backend("response contained no choices".to_string()))
}

/// Abstractive summarization via a local model behind an OpenAI-compatible
/// `/v1/chat/completions` endpoint (Ollama and friends)
pub struct AbstractiveEngine {
    endpoint: String,
    model: String,
    http: reqwest::Client,
}

impl AbstractiveEngine {
    pub fn new(url: &str, model: &str) -> Self {
        Self {
            endpoint: format!("{}/v1/chat/completions", url.trim_end_matches('/')),
            model: model.to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn summarize_chunk(&self, chunk: &str) -> Result<String> {
        // The chat API has no output floor parameter; the floor rides in the
        // instruction instead. The cap and greedy decoding are parameters.
        let system_prompt = format!(
            "Summarize the given text in roughly {} to {} tokens. Respond with the summary only.",
            ABSTRACTIVE_MIN_TOKENS, ABSTRACTIVE_MAX_TOKENS
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": chunk }
            ],
            "temperature": 0.0,
            "max_tokens": ABSTRACTIVE_MAX_TOKENS,
            "stream": false
        });

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(Duration::from_secs(120))
            .json(&body)
            .send()
            .await
            .map_err(|e| DigestError::Backend(format!("local model request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DigestError::Backend(format!(
                "local model returned {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| DigestError::Backend(format!("malformed local model response: {}", e)))?;
        first_choice(parsed)
    }
}

#[async_trait]
impl SummaryEngine for AbstractiveEngine {
    async fn summarize(&self, snippets: &[String]) -> Result<String> {
        let joined = snippets.join(" ");
        let chunks = chunk_text(&joined, MAX_CHUNK_CHARS);
        debug!("Summarizing {} chunk(s) abstractively", chunks.len());

        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            summaries.push(self.summarize_chunk(chunk).await?);
        }
        Ok(summaries.join(" "))
    }
}

/// Extractive summarization: pick the best-ranked sentences verbatim
pub struct TextRankEngine;

#[async_trait]
impl SummaryEngine for TextRankEngine {
    async fn summarize(&self, snippets: &[String]) -> Result<String> {
        let joined = snippets.join(" ");
        Ok(textrank::top_sentences(&joined, EXTRACTIVE_SENTENCES).join(" "))
    }
}

/// Remote LLM summarization via an OpenAI-style chat completion API
pub struct OpenAiEngine {
    api_hostname: String,
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiEngine {
    pub fn new(api_hostname: &str, model: &str, api_key: String) -> Self {
        Self {
            api_hostname: api_hostname.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SummaryEngine for OpenAiEngine {
    async fn summarize(&self, snippets: &[String]) -> Result<String> {
        let prompt = format!("{}{}", REMOTE_PROMPT_HEADER, snippets.join("\n\n"));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": REMOTE_MAX_TOKENS,
            "temperature": REMOTE_TEMPERATURE,
        });
        let url = format!("{}/v1/chat/completions", self.api_hostname);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(120))
            .json(&body)
            .send()
            .await
            .map_err(|e| DigestError::Backend(format!("remote LLM request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DigestError::Backend(format!(
                "remote LLM returned {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| DigestError::Backend(format!("malformed remote LLM response: {}", e)))?;
        first_choice(parsed)
    }
}

//! Gmail Digest
//!
//! A small personal-automation utility that fetches your most recent emails,
//! prints them as a readable list, summarizes their snippets with one of
//! three interchangeable backends, and can mail the summary back to you.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 with per-scope token caching (read and send
//!   credentials are kept strictly separate)
//! - **Fetching**: sequential list-then-get against the Gmail REST API
//! - **Summarization**: abstractive (local model), extractive (TextRank), or
//!   a remote LLM, selected per run
//! - **Delivery**: optional summary email back to the user
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_digest::auth::{CredentialManager, InstalledFlow};
//! use gmail_digest::client::HttpMailClient;
//! use gmail_digest::fetcher;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let flow = InstalledFlow::from_file("credentials.json".as_ref(), 8080).await?;
//!     let credentials = CredentialManager::new(".gmail-digest", Box::new(flow));
//!     let client = HttpMailClient::new(credentials);
//!
//!     let records = fetcher::fetch_recent(&client, 20).await?;
//!     println!("fetched {} messages", records.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 credential management, one token file per scope
//! - [`client`] - Gmail REST API client
//! - [`cli`] - Command-line interface and pipeline orchestration
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result alias
//! - [`fetcher`] - Recent-message retrieval
//! - [`models`] - Core data structures and API wire shapes
//! - [`summarize`] - Summarization method dispatch and backends
//! - [`textrank`] - Extractive sentence ranking

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod summarize;
pub mod textrank;

// Re-export commonly used types for convenience
pub use error::{DigestError, Result};

pub use models::EmailRecord;

pub use auth::{AuthFlow, CredentialManager, InstalledFlow, Scope, StoredCredential};

pub use client::{HttpMailClient, MailClient};

pub use config::Config;

pub use summarize::{SummaryEngine, SummaryMethod};

pub use cli::{Cli, Commands};

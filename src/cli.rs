//! Command-line interface and digest pipeline orchestration

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::auth::{CredentialManager, InstalledFlow, Scope};
use crate::client::{encode_plain_text_message, HttpMailClient, MailClient};
use crate::config::Config;
use crate::error::{DigestError, Result};
use crate::fetcher;
use crate::models::EmailRecord;
use crate::summarize::{self, SummaryMethod};

#[derive(Parser, Debug)]
#[command(name = "gmail-digest")]
#[command(version)]
#[command(about = "Fetch, display, and summarize your most recent emails", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to the OAuth2 client secret file (overrides config)
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Directory holding cached per-scope tokens (overrides config)
    #[arg(long)]
    pub token_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch recent emails, print them, and summarize their snippets
    Run {
        /// How many recent messages to fetch (overrides config)
        #[arg(long)]
        count: Option<u32>,

        /// Summarization method: abstractive, textrank, or openai (overrides config)
        #[arg(long)]
        method: Option<String>,

        /// Email the finished summary back to yourself
        #[arg(long)]
        email_summary: bool,

        /// API key for the openai method (falls back to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Authorize a permission scope with the mail provider
    Auth {
        /// Scope to authorize
        #[arg(value_enum)]
        scope: Scope,

        /// Discard any cached token first
        #[arg(long)]
        force: bool,
    },

    /// Generate an example configuration file
    InitConfig {
        /// Path to create the config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Entry point after argument parsing and logging setup
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config).await?;
    if let Some(credentials) = &cli.credentials {
        config.auth.credentials_path = credentials.to_string_lossy().into_owned();
    }
    if let Some(token_dir) = &cli.token_dir {
        config.auth.token_dir = token_dir.to_string_lossy().into_owned();
    }

    match cli.command {
        Commands::Run {
            count,
            method,
            email_summary,
            api_key,
        } => {
            if let Some(count) = count {
                config.fetch.max_results = count;
            }
            if let Some(method) = method {
                config.summary.method = method;
            }
            if email_summary {
                config.delivery.email_summary = true;
            }
            // Re-check after overrides so bad CLI values fail like bad config
            config.validate()?;

            let method = SummaryMethod::from_str(&config.summary.method)?;
            run_digest(&config, method, api_key.as_deref()).await
        }

        Commands::Auth { scope, force } => authorize_scope(&config, scope, force).await,

        Commands::InitConfig { output, force } => init_config(&output, force).await,
    }
}

/// The full fetch -> display -> summarize -> optionally send pipeline
async fn run_digest(config: &Config, method: SummaryMethod, api_key: Option<&str>) -> Result<()> {
    let flow = InstalledFlow::from_file(
        Path::new(&config.auth.credentials_path),
        config.auth.redirect_port,
    )
    .await?;
    let credentials = CredentialManager::new(config.auth.token_dir.clone(), Box::new(flow));
    let client = HttpMailClient::new(credentials);

    let records = fetcher::fetch_recent(&client, config.fetch.max_results).await?;
    if records.is_empty() {
        println!("No emails found.");
        return Ok(());
    }

    println!("\nYour {} most recent emails:\n", records.len());
    println!("{}", format_vertical(&records));

    let snippets = collect_snippets(&records);
    if snippets.is_empty() {
        println!("No email snippets found.");
        return Ok(());
    }

    info!("Summarizing {} snippets with {}", snippets.len(), method);
    let summary = summarize::summarize(&snippets, method, &config.summary, api_key).await?;
    println!("\nSummary of your {} most recent emails:\n", records.len());
    println!("{}", summary);

    if config.delivery.email_summary {
        // Reply to whoever mailed most recently; "me" is the provider's
        // self-referential recipient token
        let to = records[0].sender.clone().unwrap_or_else(|| "me".to_string());
        let raw = encode_plain_text_message(&to, &config.delivery.subject, &summary);
        client.send_message(&raw).await?;
        println!("\nSummary emailed to you!");
    }

    Ok(())
}

/// Format records as a labeled vertical list, in fetch order
pub fn format_vertical(records: &[EmailRecord]) -> String {
    let mut lines = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        lines.push(format!("Email {}:", idx + 1));
        lines.push(format!(
            "From: {}",
            record.sender.as_deref().unwrap_or("(none)")
        ));
        lines.push(format!(
            "Subject: {}",
            record.subject.as_deref().unwrap_or("(none)")
        ));
        lines.push(format!(
            "Date: {}",
            record.date.as_deref().unwrap_or("(none)")
        ));
        lines.push(format!(
            "Snippet: {}",
            record.snippet.as_deref().unwrap_or("(none)")
        ));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// The non-absent, non-empty snippets of every record, in fetch order
pub fn collect_snippets(records: &[EmailRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.snippet.clone())
        .filter(|snippet| !snippet.is_empty())
        .collect()
}

async fn authorize_scope(config: &Config, scope: Scope, force: bool) -> Result<()> {
    let token_dir = Path::new(&config.auth.token_dir);
    let token_path = token_dir.join(scope.token_file());

    if force && token_path.exists() {
        tokio::fs::remove_file(&token_path).await?;
        info!("Removed cached {} token", scope.as_str());
    }

    let flow = InstalledFlow::from_file(
        Path::new(&config.auth.credentials_path),
        config.auth.redirect_port,
    )
    .await?;
    let credentials = CredentialManager::new(token_dir, Box::new(flow));
    credentials.obtain(scope).await?;

    println!("Successfully authorized the {} scope", scope.as_str());
    println!("Token cached at: {:?}", token_path);
    Ok(())
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(DigestError::Config(format!(
            "{:?} already exists (use --force to overwrite)",
            output
        )));
    }
    Config::create_example(output).await?;
    println!("Wrote example configuration to {:?}", output);
    Ok(())
}

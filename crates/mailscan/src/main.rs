//! `mailscan` - mailbox indexing and article extraction service
//!
//! Scans IMAP folders into a searchable index and extracts readable article
//! bodies from linked pages.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod api;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mailscan_core::{
    ArticleRepository, ImapConnector, MailConnector, MessageRepository, MessageStore, ScanMonitor,
    ScanOrchestrator, credentials,
};
use mailscan_extract::{Extractor, HttpFetcher, PageFetcher};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "mailscan", version, about)]
struct Cli {
    /// Path to config.json.
    #[arg(long, global = true, env = "MAILSCAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address, overriding the config.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Extract one article and print it as JSON.
    Extract {
        /// Article URL.
        url: String,
    },
    /// List the mailbox folders.
    Folders,
    /// Save the password from MAILSCAN_IMAP_PASSWORD to the system keyring.
    StorePassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailscan=info,mailscan_core=info,mailscan_extract=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).await?;
    config.apply_env(|key| std::env::var(key).ok());

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            serve(config).await
        }
        Command::Extract { url } => extract(&config, &url).await,
        Command::Folders => folders(&config).await,
        Command::StorePassword => store_password(&config),
    }
}

fn extractor(config: &AppConfig) -> anyhow::Result<Extractor<Arc<dyn PageFetcher>>> {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.fetch.to_fetch_config())?);
    Ok(Extractor::new(fetcher))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let messages: Arc<dyn MessageStore> = Arc::new(
        MessageRepository::new(&config.messages_db().to_string_lossy()).await?,
    );
    let articles = Arc::new(ArticleRepository::new(&config.articles_db().to_string_lossy()).await?);

    let credentials = match config.credentials() {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            warn!("Scanning disabled: {:#}", e);
            None
        }
    };

    let orchestrator = ScanOrchestrator::new(
        Arc::new(ImapConnector::new()),
        Arc::clone(&messages),
        Arc::new(ScanMonitor::new()),
    );
    let state = AppState {
        orchestrator,
        messages,
        articles,
        extractor: Arc::new(extractor(&config)?),
        credentials,
        default_folders: config.default_folders.clone(),
        page_size: config.page_size,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("Listening on {}", config.bind);
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}

async fn extract(config: &AppConfig, url: &str) -> anyhow::Result<()> {
    let result = extractor(config)?.extract(url).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn folders(config: &AppConfig) -> anyhow::Result<()> {
    let credentials = config.credentials()?;
    let mut session = ImapConnector::new().connect(&credentials).await?;
    let folders = session.list_folders().await;
    if let Err(e) = session.logout().await {
        warn!("Logout failed: {}", e);
    }
    for folder in folders? {
        println!("{folder}");
    }
    Ok(())
}

fn store_password(config: &AppConfig) -> anyhow::Result<()> {
    let password = config
        .imap
        .password
        .as_deref()
        .with_context(|| format!("set {} to the password to store", config::ENV_PASSWORD))?;
    credentials::store_password(&config.imap.username, password)?;
    info!("Stored IMAP password for {}", config.imap.username);
    Ok(())
}

//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use mailscan_core::{Credentials, Security, credentials};
use mailscan_extract::FetchConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Env var overriding the IMAP login.
pub const ENV_USERNAME: &str = "MAILSCAN_IMAP_USERNAME";
/// Env var supplying the IMAP password.
pub const ENV_PASSWORD: &str = "MAILSCAN_IMAP_PASSWORD";
/// Env var overriding the listen address.
pub const ENV_BIND: &str = "MAILSCAN_BIND";

/// Application configuration, loaded from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listen address.
    pub bind: String,
    /// Directory holding the SQLite databases.
    pub data_dir: PathBuf,
    /// Mail server account.
    pub imap: ImapConfig,
    /// Article fetching.
    pub fetch: FetchSettings,
    /// Folders scanned when a request names none.
    pub default_folders: Vec<String>,
    /// Search results per page.
    pub page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailscan"),
            imap: ImapConfig::default(),
            fetch: FetchSettings::default(),
            default_folders: vec!["INBOX".to_string()],
            page_size: 20,
        }
    }
}

/// IMAP account settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connection security.
    pub security: Security,
    /// Login name.
    pub username: String,
    /// Password; looked up in the keyring when absent.
    pub password: Option<String>,
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            security: Security::Tls,
            username: String::new(),
            password: None,
        }
    }
}

impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// HTTP client settings for article fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Redirect hop limit.
    pub max_redirects: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 45,
            max_redirects: 10,
        }
    }
}

impl FetchSettings {
    /// Converts to the fetcher's configuration.
    #[must_use]
    pub const fn to_fetch_config(self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
        }
    }
}

impl AppConfig {
    /// `<config dir>/mailscan/config.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailscan")
            .join("config.json")
    }

    /// Loads the config file, falling back to defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(username) = present(ENV_USERNAME) {
            self.imap.username = username;
        }
        if let Some(password) = present(ENV_PASSWORD) {
            self.imap.password = Some(password);
        }
        if let Some(bind) = present(ENV_BIND) {
            self.bind = bind;
        }
    }

    /// Resolves IMAP credentials, reading the password from the keyring when
    /// the configuration carries none.
    ///
    /// # Errors
    ///
    /// Returns an error if no username is configured, the keyring cannot be
    /// read, or no password is found anywhere.
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        let username = self.imap.username.trim();
        if username.is_empty() {
            bail!("no IMAP username configured (set imap.username or {ENV_USERNAME})");
        }
        let password = match &self.imap.password {
            Some(password) => password.clone(),
            None => credentials::get_password(username)?.with_context(|| {
                format!("no IMAP password for {username} (set {ENV_PASSWORD} or run store-password)")
            })?,
        };
        Ok(Credentials::new(username, password).with_server(
            self.imap.host.clone(),
            self.imap.port,
            self.imap.security,
        ))
    }

    /// Path of the message index database.
    #[must_use]
    pub fn messages_db(&self) -> PathBuf {
        self.data_dir.join("messages.db")
    }

    /// Path of the article database.
    #[must_use]
    pub fn articles_db(&self) -> PathBuf {
        self.data_dir.join("articles.db")
    }
}

//! Client configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$GMAIL_CLIENT_CONFIG` (environment variable)
//! 2. `~/.config/gmail-client/config.toml` (Linux/macOS)
//!    `%APPDATA%\gmail-client\config.toml` (Windows)
//! 3. Built-in defaults

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Well-known mailbox names of the account.
    pub mailboxes: MailboxNames,
    /// Attachment saving defaults.
    pub attachments: AttachmentConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Names of the special mailboxes that moves, deletes and thread
/// reconstruction refer to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MailboxNames {
    /// Mailbox holding sent mail, searched during thread reconstruction.
    pub sent: String,
    /// Archive destination.
    pub all_mail: String,
    /// Trash-equivalent mailboxes, in discovery preference order.
    /// Accounts expose one of these depending on locale.
    pub trash: Vec<String>,
}

/// Attachment saving defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Directory used when no output directory is given.
    pub output_dir: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for MailboxNames {
    fn default() -> Self {
        Self {
            sent: "[Gmail]/Sent Mail".to_string(),
            all_mail: "[Gmail]/All Mail".to_string(),
            trash: vec!["[Gmail]/Trash".to_string(), "[Gmail]/Bin".to_string()],
        }
    }
}

impl MailboxNames {
    /// Whether `name` is one of the trash-equivalent mailboxes.
    pub fn is_trash(&self, name: &str) -> bool {
        self.trash.iter().any(|t| t == name)
    }

    /// Pick the trash mailbox the account actually exposes.
    ///
    /// Returns the first configured trash name present in `known`, or the
    /// last configured name when none is listed.
    pub fn resolve_trash(&self, known: &BTreeSet<String>) -> Option<&str> {
        self.trash
            .iter()
            .find(|t| known.contains(t.as_str()))
            .or_else(|| self.trash.last())
            .map(String::as_str)
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("GMAIL_CLIENT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("gmail-client").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gmail-client")
}

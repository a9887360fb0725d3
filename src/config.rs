//! Configuration for smart-commit connections
//!
//! Settings come from, in increasing precedence:
//! - built-in defaults
//! - a JSON file named by `SMARTCOMMIT_CONFIG`
//! - the `DATABASE_DSN`, `SMART_COMMIT` and `AUTO_COMMIT` environment variables

use anyhow::{Context, Result, anyhow};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;

use crate::dsn::{to_safe_dsn, validate_dsn};

pub const DEFAULT_DSN: &str = "sqlite::memory:";

/// Settings applied when a connection is opened
pub struct SmartCommitConfig {
    /// Database connection string, with or without the `smartcommit:` prefix
    pub dsn: SecretString,
    pub smart_commit: bool,
    /// Initial auto-commit mode; `None` keeps the database's default
    pub auto_commit: Option<bool>,
}

// Custom Debug implementation that redacts sensitive data
impl std::fmt::Debug for SmartCommitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartCommitConfig")
            .field("dsn", &to_safe_dsn(self.dsn.expose_secret()))
            .field("smart_commit", &self.smart_commit)
            .field("auto_commit", &self.auto_commit)
            .finish()
    }
}

impl Default for SmartCommitConfig {
    fn default() -> Self {
        Self {
            dsn: SecretString::from(DEFAULT_DSN.to_string()),
            smart_commit: true,
            auto_commit: None,
        }
    }
}

/// On-disk representation; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    dsn: Option<String>,
    smart_commit: Option<bool>,
    auto_commit: Option<bool>,
}

impl SmartCommitConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("SMARTCOMMIT_CONFIG") {
            config.apply_file(Path::new(&path))?;
        }

        if let Some(dsn) = lookup("DATABASE_DSN") {
            config.dsn = SecretString::from(dsn);
        } else {
            log::info!("DATABASE_DSN not set, using {}", to_safe_dsn(config.dsn.expose_secret()));
        }
        if let Some(value) = lookup("SMART_COMMIT") {
            config.smart_commit = parse_bool(&value).context("SMART_COMMIT must be a boolean")?;
        }
        if let Some(value) = lookup("AUTO_COMMIT") {
            config.auto_commit =
                Some(parse_bool(&value).context("AUTO_COMMIT must be a boolean")?);
        }

        validate_dsn(config.dsn.expose_secret()).context("Invalid DATABASE_DSN")?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if let Some(dsn) = file.dsn {
            self.dsn = SecretString::from(dsn);
        }
        if let Some(smart_commit) = file.smart_commit {
            self.smart_commit = smart_commit;
        }
        if file.auto_commit.is_some() {
            self.auto_commit = file.auto_commit;
        }
        Ok(())
    }
}

/// Parse a boolean setting (`true/false`, `1/0`, `on/off`, `yes/no`)
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        other => Err(anyhow!("Invalid boolean value '{}'", other)),
    }
}

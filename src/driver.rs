//! Entry point for opening smart-commit connections from a URL

use crate::config::SmartCommitConfig;
use crate::connection::SqlxConnection;
use crate::dsn::{accepts_url, delegate_url, to_safe_dsn};
use crate::error::DatabaseError;
use crate::smart_commit::SmartCommitConnection;
use secrecy::ExposeSecret;

/// Opens [`SmartCommitConnection`]s for `smartcommit:`-prefixed URLs
///
/// The driver holds no state; any number of them can exist side by side.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartCommitDriver;

impl SmartCommitDriver {
    pub const MAJOR_VERSION: u32 = 1;
    pub const MINOR_VERSION: u32 = 0;

    pub fn new() -> Self {
        Self
    }

    pub fn accepts_url(&self, url: &str) -> bool {
        accepts_url(url)
    }

    /// Open a connection for `url`
    ///
    /// Returns `Ok(None)` if `url` is not a smart-commit URL, so callers can
    /// try other drivers.
    pub fn connect(
        &self,
        url: &str,
    ) -> Result<Option<SmartCommitConnection<SqlxConnection>>, DatabaseError> {
        let Some(delegate) = delegate_url(url) else {
            return Ok(None);
        };
        log::info!("Opening smart-commit connection to {}", to_safe_dsn(delegate));
        let connection = SqlxConnection::connect(delegate)?;
        SmartCommitConnection::new(connection).map(Some)
    }

    /// Open a connection from configuration and apply its settings
    ///
    /// Unlike [`SmartCommitDriver::connect`], the configured DSN may also be a
    /// plain database URL.
    pub fn open(
        &self,
        config: &SmartCommitConfig,
    ) -> Result<SmartCommitConnection<SqlxConnection>, DatabaseError> {
        let dsn = config.dsn.expose_secret();
        let url = delegate_url(dsn).unwrap_or(dsn);
        log::info!("Opening smart-commit connection to {}", to_safe_dsn(url));

        let mut connection = SmartCommitConnection::new(SqlxConnection::connect(url)?)?;
        connection.set_smart_commit(config.smart_commit)?;
        if let Some(auto_commit) = config.auto_commit {
            connection.set_auto_commit(auto_commit)?;
        }
        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_ignores_foreign_urls() {
        let driver = SmartCommitDriver::new();
        assert!(!driver.accepts_url("postgres://localhost/db"));
        assert!(matches!(driver.connect("postgres://localhost/db"), Ok(None)));
    }

    #[test]
    fn test_connect_rejects_unknown_database() {
        let result = SmartCommitDriver::new().connect("smartcommit:oracle://host/db");
        assert!(matches!(result, Err(DatabaseError::UnsupportedDatabase(_))));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_connect_sqlite() {
        let result = SmartCommitDriver::new().connect("smartcommit:sqlite::memory:");
        assert!(matches!(result, Ok(Some(_))), "connect failed: {:?}", result.err());
        if let Ok(Some(conn)) = result {
            assert!(conn.auto_commit());
            assert!(conn.smart_commit());
        }
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_open_applies_config() {
        let config = SmartCommitConfig {
            auto_commit: Some(false),
            smart_commit: false,
            ..SmartCommitConfig::default()
        };
        let result = SmartCommitDriver::new().open(&config);
        assert!(result.is_ok(), "open failed: {:?}", result.err());
        if let Ok(conn) = result {
            assert!(!conn.auto_commit());
            assert!(!conn.smart_commit());
            assert!(matches!(conn.delegate_auto_commit(), Ok(false)));
        }
    }
}

//! Error types for smart-commit connections

use thiserror::Error;

/// Errors raised by the statement scanner, the transaction controller and the
/// wrapped database connection.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQL text could not be scanned (e.g. an unclosed literal)
    #[error("Malformed statement: {0}")]
    MalformedStatement(String),

    /// Operation is not allowed in the current auto-commit mode
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Failed to connect to database
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed
    #[error("Query error: {0}")]
    QueryError(String),

    /// Database type not supported
    #[error("Unsupported database: {0}")]
    UnsupportedDatabase(String),

    /// sqlx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

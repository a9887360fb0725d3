//! Smart-commit connections
//!
//! Wraps a database connection so that, with auto-commit switched off, the
//! connection only enters a transaction once a statement actually changes
//! data or schema. Reads between transactions run in auto-commit.

pub mod error;
pub mod types;

pub mod config;
pub mod connection;
pub mod delegate;
pub mod driver;
pub mod dsn;
pub mod row_converter;
pub mod smart_commit;
pub mod sql_parser;
pub mod statement;
pub mod validate;

// Re-export secrecy types for consumers
pub use secrecy::{ExposeSecret, SecretString};

// Re-exports
pub use config::SmartCommitConfig;
pub use connection::SqlxConnection;
pub use delegate::{DelegateConnection, Row, Savepoint};
pub use driver::SmartCommitDriver;
pub use dsn::{DRIVER_PREFIX, accepts_url, delegate_url, to_safe_dsn, validate_dsn};
pub use error::DatabaseError;
pub use smart_commit::{PreparedStatement, SmartCommitConnection};
pub use sql_parser::{split_sql_statements, strip_comments_and_trim, strip_statement_hint};
pub use statement::{ParsedStatement, StatementClassifier, StatementKind};
pub use types::DatabaseType;
pub use validate::validate_savepoint_name;

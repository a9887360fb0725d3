//! The connection contract a smart-commit wrapper drives
//!
//! [`DelegateConnection`] is what [`crate::smart_commit::SmartCommitConnection`]
//! needs from the real database connection it wraps. Errors returned by a
//! delegate are passed back to callers unchanged.

use crate::error::DatabaseError;
use serde_json::{Map, Value};

/// A result row, keyed by column name
pub type Row = Map<String, Value>;

/// A point inside a transaction that can be rolled back to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Savepoint {
    id: u32,
    name: Option<String>,
}

impl Savepoint {
    pub fn new(id: u32, name: Option<String>) -> Self {
        Self { id, name }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Name given by the caller, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Identifier to use in `SAVEPOINT` statements
    pub fn sql_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("sp_{}", self.id),
        }
    }
}

impl std::fmt::Display for Savepoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

/// Underlying database connection with a JDBC-style auto-commit flag
///
/// Implementations are used from one thread at a time and need no internal
/// locking.
pub trait DelegateConnection {
    /// Current value of the connection's own auto-commit flag
    fn auto_commit(&self) -> Result<bool, DatabaseError>;

    /// Change the auto-commit flag. Switching it on commits any open
    /// transaction.
    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), DatabaseError>;

    fn commit(&mut self) -> Result<(), DatabaseError>;

    fn rollback(&mut self) -> Result<(), DatabaseError>;

    /// Create a savepoint, optionally with a caller-chosen name
    fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint, DatabaseError>;

    fn rollback_to_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), DatabaseError>;

    fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), DatabaseError>;

    /// Execute a statement and return the number of affected rows
    fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError>;

    /// Execute a query and return its rows
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DatabaseError>;

    /// Close the connection, releasing its resources
    fn close(self) -> Result<(), DatabaseError>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_savepoint_sql_name() {
        assert_eq!(Savepoint::new(3, None).sql_name(), "sp_3");
        assert_eq!(
            Savepoint::new(4, Some("before_update".into())).sql_name(),
            "before_update"
        );
        assert_eq!(Savepoint::new(4, Some("x".into())).to_string(), "x");
    }
}

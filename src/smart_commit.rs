//! Smart-commit connection wrapper
//!
//! [`SmartCommitConnection`] keeps two flags of its own: the auto-commit mode
//! the caller asked for and whether smart commit is enabled. With smart
//! commit on and auto-commit off, the wrapped connection stays in auto-commit
//! until a statement that changes data or schema is executed. At that point
//! auto-commit is switched off so the change becomes part of a transaction.
//! A successful `commit` or `rollback` switches the wrapped connection back
//! to auto-commit, so read-only work between transactions never holds one
//! open.
//!
//! With smart commit off the wrapper's auto-commit mode is applied directly
//! to the wrapped connection and commit/rollback pass straight through.
//!
//! A wrapper is owned by one thread at a time. It does no locking of its own.

use crate::delegate::{DelegateConnection, Row, Savepoint};
use crate::error::DatabaseError;
use crate::statement::StatementClassifier;

/// Connection wrapper that decides when the wrapped connection needs a
/// transaction
///
/// # Examples
/// ```no_run
/// # use smartcommit::connection::SqlxConnection;
/// # use smartcommit::smart_commit::SmartCommitConnection;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = SmartCommitConnection::new(SqlxConnection::connect("sqlite::memory:")?)?;
/// conn.execute("CREATE TABLE t (a INTEGER)")?;
/// conn.set_auto_commit(false)?;
///
/// // Reads keep the wrapped connection in auto-commit
/// conn.query("SELECT * FROM t")?;
/// assert!(conn.delegate_auto_commit()?);
///
/// // The first write opens a transaction
/// conn.execute("INSERT INTO t VALUES (1)")?;
/// assert!(!conn.delegate_auto_commit()?);
///
/// conn.commit()?;
/// assert!(conn.delegate_auto_commit()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SmartCommitConnection<D: DelegateConnection> {
    delegate: D,
    classifier: StatementClassifier,
    /// Auto-commit mode as seen by the caller
    auto_commit: bool,
    smart_commit: bool,
}

impl<D: DelegateConnection> SmartCommitConnection<D> {
    /// Wrap `delegate`, adopting its current auto-commit flag as the initial
    /// auto-commit mode. Smart commit starts enabled.
    pub fn new(delegate: D) -> Result<Self, DatabaseError> {
        let auto_commit = delegate.auto_commit()?;
        Ok(Self {
            delegate,
            classifier: StatementClassifier::new(),
            auto_commit,
            smart_commit: true,
        })
    }

    /// Auto-commit mode as set by the caller
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn smart_commit(&self) -> bool {
        self.smart_commit
    }

    /// Current auto-commit flag of the wrapped connection
    pub fn delegate_auto_commit(&self) -> Result<bool, DatabaseError> {
        self.delegate.auto_commit()
    }

    fn set_delegate_auto_commit(&mut self, auto_commit: bool) -> Result<(), DatabaseError> {
        log::trace!("Setting delegate autocommit to {}", auto_commit);
        self.delegate.set_auto_commit(auto_commit)
    }

    fn ensure_not_auto_commit(&self, operation: &str) -> Result<(), DatabaseError> {
        if self.auto_commit {
            return Err(DatabaseError::IllegalState(format!(
                "Cannot {} when in autocommit",
                operation
            )));
        }
        Ok(())
    }

    /// Change the caller-visible auto-commit mode
    ///
    /// Switching auto-commit off with smart commit enabled leaves the wrapped
    /// connection in auto-commit until the first write. With smart commit
    /// disabled the wrapped connection leaves auto-commit immediately.
    pub fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), DatabaseError> {
        if self.auto_commit == auto_commit {
            return Ok(());
        }
        if auto_commit {
            self.set_delegate_auto_commit(true)?;
        } else {
            let smart_commit = self.smart_commit;
            self.set_delegate_auto_commit(smart_commit)?;
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    pub fn set_smart_commit(&mut self, smart_commit: bool) -> Result<(), DatabaseError> {
        if self.smart_commit == smart_commit {
            return Ok(());
        }
        if smart_commit {
            self.set_delegate_auto_commit(true)?;
        } else if !self.auto_commit && self.delegate.auto_commit()? {
            self.set_delegate_auto_commit(false)?;
        }
        self.smart_commit = smart_commit;
        Ok(())
    }

    /// Prepare the wrapped connection for executing `sql`
    ///
    /// Must run before any statement is sent to the wrapped connection. If the
    /// wrapped connection is in auto-commit while the caller has auto-commit
    /// off, it is taken out of auto-commit when `always_suspend` is set
    /// (prepared and callable statements) or when `sql` changes data or
    /// schema. The caller-visible auto-commit mode never changes here, and
    /// writes made while the caller has auto-commit on are never suspended.
    pub fn before_execute(&mut self, sql: &str, always_suspend: bool) -> Result<(), DatabaseError> {
        if self.auto_commit || !self.delegate.auto_commit()? {
            return Ok(());
        }
        if always_suspend || self.classifier.is_update_or_ddl(sql) {
            log::trace!("Turning off delegate autocommit before: {}", sql);
            self.set_delegate_auto_commit(false)?;
        }
        Ok(())
    }

    /// Commit the current transaction
    ///
    /// # Errors
    /// Returns `DatabaseError::IllegalState` when auto-commit is on. Errors
    /// from the wrapped connection are returned unchanged.
    pub fn commit(&mut self) -> Result<(), DatabaseError> {
        self.ensure_not_auto_commit("commit")?;
        if !self.smart_commit {
            return self.delegate.commit();
        }
        if self.delegate.auto_commit()? {
            log::trace!("Delegate in autocommit, skipping commit");
        } else {
            log::trace!("Committing on delegate");
            self.delegate.commit()?;
        }
        self.set_delegate_auto_commit(true)
    }

    /// Roll back the current transaction
    ///
    /// # Errors
    /// Returns `DatabaseError::IllegalState` when auto-commit is on. Errors
    /// from the wrapped connection are returned unchanged.
    pub fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.ensure_not_auto_commit("rollback")?;
        if !self.smart_commit {
            return self.delegate.rollback();
        }
        if self.delegate.auto_commit()? {
            log::trace!("Delegate in autocommit, skipping rollback");
        } else {
            log::trace!("Rollback on delegate");
            self.delegate.rollback()?;
        }
        self.set_delegate_auto_commit(true)
    }

    /// Create a savepoint. A savepoint always opens a transaction on the
    /// wrapped connection.
    pub fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint, DatabaseError> {
        self.ensure_not_auto_commit("set savepoint")?;
        if self.delegate.auto_commit()? {
            self.set_delegate_auto_commit(false)?;
        }
        self.delegate.set_savepoint(name)
    }

    /// Roll back to `savepoint`. Nothing is rolled back if the wrapped
    /// connection has no open transaction.
    pub fn rollback_to_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), DatabaseError> {
        self.ensure_not_auto_commit("rollback savepoint")?;
        if self.delegate.auto_commit()? {
            log::trace!("Delegate in autocommit, skipping rollback savepoint");
            return Ok(());
        }
        log::trace!("Rollback savepoint {}", savepoint);
        self.delegate.rollback_to_savepoint(savepoint)
    }

    /// Release `savepoint`. Nothing is released if the wrapped connection has
    /// no open transaction.
    pub fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), DatabaseError> {
        if self.delegate.auto_commit()? {
            log::trace!("Delegate in autocommit, skipping release savepoint");
            return Ok(());
        }
        log::trace!("Release savepoint {}", savepoint);
        self.delegate.release_savepoint(savepoint)
    }

    /// Execute a statement, opening a transaction first if it writes
    pub fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        self.before_execute(sql, false)?;
        self.delegate.execute(sql)
    }

    /// Execute a query, opening a transaction first if it writes
    pub fn query(&mut self, sql: &str) -> Result<Vec<Row>, DatabaseError> {
        self.before_execute(sql, false)?;
        self.delegate.query(sql)
    }

    /// Prepare `sql` for execution. Executing a prepared statement always
    /// runs inside a transaction when auto-commit is off; prepared queries
    /// are classified like plain ones.
    pub fn prepare(&mut self, sql: &str) -> PreparedStatement<'_, D> {
        PreparedStatement {
            connection: self,
            sql: sql.to_string(),
        }
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Unwrap the connection without closing it
    pub fn into_inner(self) -> D {
        self.delegate
    }

    pub fn close(self) -> Result<(), DatabaseError> {
        self.delegate.close()
    }
}

/// A statement bound to a [`SmartCommitConnection`]
///
/// `execute` always suspends auto-commit before it runs, since the statement
/// may be a call with side effects. `query` only does so for writes.
#[derive(Debug)]
pub struct PreparedStatement<'a, D: DelegateConnection> {
    connection: &'a mut SmartCommitConnection<D>,
    sql: String,
}

impl<D: DelegateConnection> PreparedStatement<'_, D> {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn execute(&mut self) -> Result<u64, DatabaseError> {
        self.connection.before_execute(&self.sql, true)?;
        self.connection.delegate.execute(&self.sql)
    }

    pub fn query(&mut self) -> Result<Vec<Row>, DatabaseError> {
        self.connection.before_execute(&self.sql, false)?;
        self.connection.delegate.query(&self.sql)
    }
}

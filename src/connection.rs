//! sqlx-backed delegate connection
//!
//! sqlx has no auto-commit flag of its own, so [`SqlxConnection`] emulates
//! one: while auto-commit is off, `BEGIN` is sent lazily before the first
//! statement, and the transaction stays open until `commit`, `rollback` or
//! switching auto-commit back on. A single-threaded tokio runtime owned by
//! the connection drives sqlx, so every call is synchronous.

use crate::delegate::{DelegateConnection, Row, Savepoint};
use crate::error::DatabaseError;
use crate::row_converter::row_to_json;
use crate::types::DatabaseType;
use crate::validate::validate_savepoint_name;
use sqlx::{AnyConnection, Connection};
use tokio::runtime::Runtime;

/// A single database connection with JDBC-style auto-commit semantics
pub struct SqlxConnection {
    // Declared before `runtime` so it is dropped while the runtime still exists
    conn: AnyConnection,
    runtime: Runtime,
    db_type: DatabaseType,
    auto_commit: bool,
    in_transaction: bool,
    next_savepoint: u32,
}

impl std::fmt::Debug for SqlxConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxConnection")
            .field("db_type", &self.db_type)
            .field("auto_commit", &self.auto_commit)
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl SqlxConnection {
    /// Open a connection to `url`. The connection starts in auto-commit.
    ///
    /// # Errors
    /// Returns error if the URL names an unsupported database, or if the
    /// connection or its liveness check fails
    pub fn connect(url: &str) -> Result<Self, DatabaseError> {
        let db_type = DatabaseType::from_url(url)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        // Registers the compiled-in drivers (postgres, mysql, sqlite) for sqlx::any
        sqlx::any::install_default_drivers();

        let mut conn = runtime
            .block_on(AnyConnection::connect(url))
            .map_err(|e| DatabaseError::ConnectionError(format!("Failed to connect: {}", e)))?;

        // Simple ping to verify connection liveness
        runtime.block_on(sqlx::query("SELECT 1").fetch_one(&mut conn))?;

        log::info!("✓ Database connected ({})", db_type);

        Ok(Self {
            conn,
            runtime,
            db_type,
            auto_commit: true,
            in_transaction: false,
            next_savepoint: 0,
        })
    }

    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// True while a `BEGIN` has been sent and not yet ended
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn run(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        let result = self
            .runtime
            .block_on(sqlx::query(sql).execute(&mut self.conn))?;
        Ok(result.rows_affected())
    }

    fn ensure_transaction(&mut self) -> Result<(), DatabaseError> {
        if !self.auto_commit && !self.in_transaction {
            log::trace!("Beginning transaction");
            self.run("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn end_transaction(&mut self, statement: &str) -> Result<(), DatabaseError> {
        if self.in_transaction {
            log::trace!("Ending transaction with {}", statement);
            self.run(statement)?;
            self.in_transaction = false;
        }
        Ok(())
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
}

impl DelegateConnection for SqlxConnection {
    fn auto_commit(&self) -> Result<bool, DatabaseError> {
        Ok(self.auto_commit)
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), DatabaseError> {
        if auto_commit {
            self.end_transaction("COMMIT")?;
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DatabaseError> {
        self.ensure_not_auto_commit("commit")?;
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.ensure_not_auto_commit("rollback")?;
        self.end_transaction("ROLLBACK")
    }

    fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint, DatabaseError> {
        self.ensure_not_auto_commit("set savepoint")?;
        if let Some(name) = name {
            validate_savepoint_name(name)?;
        }
        self.ensure_transaction()?;

        self.next_savepoint += 1;
        let savepoint = Savepoint::new(self.next_savepoint, name.map(str::to_string));
        self.run(&format!("SAVEPOINT {}", savepoint.sql_name()))?;
        Ok(savepoint)
    }

    fn rollback_to_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), DatabaseError> {
        self.ensure_not_auto_commit("rollback savepoint")?;
        self.run(&format!("ROLLBACK TO SAVEPOINT {}", savepoint.sql_name()))?;
        Ok(())
    }

    fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<(), DatabaseError> {
        self.run(&format!("RELEASE SAVEPOINT {}", savepoint.sql_name()))?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        self.ensure_transaction()?;
        self.run(sql)
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DatabaseError> {
        self.ensure_transaction()?;
        let rows = self
            .runtime
            .block_on(sqlx::query(sql).fetch_all(&mut self.conn))?;
        rows.iter().map(row_to_json).collect()
    }

    fn close(self) -> Result<(), DatabaseError> {
        let Self { runtime, conn, db_type, in_transaction, .. } = self;
        if in_transaction {
            log::warn!("Closing {} connection with an open transaction", db_type);
        }
        runtime.block_on(conn.close())?;
        log::info!("Database connection closed ({})", db_type);
        Ok(())
    }
}

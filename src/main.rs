// Smart-commit SQL shell
//
// Executes SQL read from a script file or stdin through a smart-commit
// connection, so the effect of auto-commit and smart-commit settings can be
// observed statement by statement.
//
// OPTIONAL: DATABASE_DSN (defaults to sqlite::memory:), SMART_COMMIT,
// AUTO_COMMIT and SMARTCOMMIT_CONFIG environment variables.

use anyhow::{Context, Result, anyhow, bail};
use smartcommit::{
    DatabaseType, Savepoint, SmartCommitConfig, SmartCommitConnection, SmartCommitDriver,
    SqlxConnection, StatementClassifier, split_sql_statements,
};
use std::collections::HashMap;
use std::io::BufRead;

// ============================================================================
// META COMMANDS
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Commit,
    Rollback,
    AutoCommit(bool),
    SmartCommit(bool),
    Savepoint(Option<String>),
    Release(String),
    RollbackTo(String),
    Status,
}

/// Parse a `\command [argument]` line
fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.trim().trim_start_matches('\\').split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();

    let required = |what: &str| -> Result<String> {
        arg.map(str::to_string)
            .ok_or_else(|| anyhow!("\\{} requires {}", name, what))
    };

    match name.as_str() {
        "commit" => Ok(Command::Commit),
        "rollback" => Ok(Command::Rollback),
        "autocommit" => Ok(Command::AutoCommit(smartcommit::config::parse_bool(
            &required("on or off")?,
        )?)),
        "smartcommit" => Ok(Command::SmartCommit(smartcommit::config::parse_bool(
            &required("on or off")?,
        )?)),
        "savepoint" => Ok(Command::Savepoint(arg.map(str::to_string))),
        "release" => Ok(Command::Release(required("a savepoint name")?)),
        "rollback_to" => Ok(Command::RollbackTo(required("a savepoint name")?)),
        "status" => Ok(Command::Status),
        other => bail!("Unknown command \\{}", other),
    }
}

// ============================================================================
// SESSION
// ============================================================================

struct Session {
    connection: SmartCommitConnection<SqlxConnection>,
    classifier: StatementClassifier,
    savepoints: HashMap<String, Savepoint>,
}

impl Session {
    fn run_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Commit => self.connection.commit()?,
            Command::Rollback => self.connection.rollback()?,
            Command::AutoCommit(on) => self.connection.set_auto_commit(on)?,
            Command::SmartCommit(on) => self.connection.set_smart_commit(on)?,
            Command::Savepoint(name) => {
                let savepoint = self.connection.set_savepoint(name.as_deref())?;
                println!("savepoint {}", savepoint);
                self.savepoints.insert(savepoint.sql_name(), savepoint);
            }
            Command::Release(name) => {
                let savepoint = self.savepoint(&name)?;
                self.connection.release_savepoint(&savepoint)?;
                self.savepoints.remove(&name);
            }
            Command::RollbackTo(name) => {
                let savepoint = self.savepoint(&name)?;
                self.connection.rollback_to_savepoint(&savepoint)?;
            }
            Command::Status => self.print_status()?,
        }
        Ok(())
    }

    fn savepoint(&self, name: &str) -> Result<Savepoint> {
        self.savepoints
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown savepoint '{}'", name))
    }

    fn print_status(&self) -> Result<()> {
        println!(
            "autocommit={} smartcommit={} delegate_autocommit={}",
            self.connection.auto_commit(),
            self.connection.smart_commit(),
            self.connection.delegate_auto_commit()?
        );
        Ok(())
    }

    fn run_sql(&mut self, script: &str) -> Result<()> {
        let db_type: DatabaseType = self.connection.delegate().database_type();
        let statements = split_sql_statements(script, db_type).unwrap_or_else(|e| {
            log::debug!("Running script unsplit: {}", e);
            vec![script.to_string()]
        });

        for sql in statements {
            if self.classifier.classify(&sql)?.is_query() {
                for row in self.connection.query(&sql)? {
                    println!("{}", serde_json::Value::Object(row));
                }
            } else {
                let affected = self.connection.execute(&sql)?;
                println!("{} row(s) affected", affected);
            }
        }
        Ok(())
    }
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SmartCommitConfig::from_env()?;
    let connection = SmartCommitDriver::new()
        .open(&config)
        .context("Failed to open smart-commit connection")?;

    let mut session = Session {
        connection,
        classifier: StatementClassifier::new(),
        savepoints: HashMap::new(),
    };

    let input: Box<dyn BufRead> = match std::env::args().nth(1) {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(&path).with_context(|| format!("Failed to open {}", path))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };

    let mut buffer = String::new();
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();

        if buffer.trim().is_empty() && trimmed.starts_with('\\') {
            if let Err(e) = parse_command(trimmed).and_then(|c| session.run_command(c)) {
                eprintln!("Error: {:#}", e);
            }
            continue;
        }

        buffer.push_str(&line);
        buffer.push('\n');
        if trimmed.ends_with(';') {
            if let Err(e) = session.run_sql(&buffer) {
                eprintln!("Error: {:#}", e);
            }
            buffer.clear();
        }
    }

    if !buffer.trim().is_empty()
        && let Err(e) = session.run_sql(&buffer)
    {
        eprintln!("Error: {:#}", e);
    }

    session.connection.close()?;
    Ok(())
}

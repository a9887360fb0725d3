//! Statement classification by leading keyword
//!
//! Classification is shallow on purpose: the first keyword of the cleaned
//! statement decides the kind, and the statement itself is never validated.

use crate::error::DatabaseError;
use crate::sql_parser::{QUERY_KEYWORDS, first_token, strip_comments_and_trim, strip_statement_hint};

const UPDATE_KEYWORDS: [&str; 3] = ["INSERT", "UPDATE", "DELETE"];
const DDL_KEYWORDS: [&str; 3] = ["CREATE", "ALTER", "DROP"];

/// The kind of statement recognized by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Ddl,
    Query,
    Update,
    Unknown,
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ddl => write!(f, "DDL"),
            Self::Query => write!(f, "QUERY"),
            Self::Update => write!(f, "UPDATE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A classified statement together with its comment-free text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedStatement {
    kind: StatementKind,
    sql_without_comments: String,
}

impl ParsedStatement {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Statement text with comments, surrounding whitespace and the trailing
    /// terminator removed
    pub fn sql_without_comments(&self) -> &str {
        &self.sql_without_comments
    }

    pub fn is_query(&self) -> bool {
        self.kind == StatementKind::Query
    }

    pub fn is_update(&self) -> bool {
        self.kind == StatementKind::Update
    }

    pub fn is_ddl(&self) -> bool {
        self.kind == StatementKind::Ddl
    }
}

/// Classifies SQL text as DDL, query, update or unknown
///
/// The classifier holds no state; construct one wherever it is needed.
///
/// # Examples
/// ```
/// # use smartcommit::statement::{StatementClassifier, StatementKind};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let classifier = StatementClassifier::new();
///
/// let parsed = classifier.classify("/* audit */ INSERT INTO log VALUES (1);")?;
/// assert_eq!(parsed.kind(), StatementKind::Update);
/// assert_eq!(parsed.sql_without_comments(), "INSERT INTO log VALUES (1)");
///
/// assert!(classifier.classify("@{FORCE_INDEX=_BASE_TABLE} SELECT 1")?.is_query());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementClassifier;

impl StatementClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Strip comments from `sql_with_comments` and classify what remains
    ///
    /// # Errors
    /// Returns `DatabaseError::MalformedStatement` if the text contains an
    /// unclosed literal.
    pub fn classify(&self, sql_with_comments: &str) -> Result<ParsedStatement, DatabaseError> {
        let sql = strip_comments_and_trim(sql_with_comments)?;
        let kind = if self.is_query(&sql)? {
            StatementKind::Query
        } else if self.is_update_statement(&sql) {
            StatementKind::Update
        } else if self.is_ddl_statement(&sql) {
            StatementKind::Ddl
        } else {
            StatementKind::Unknown
        };
        log::debug!("Classified statement as {}: {}", kind, sql);
        Ok(ParsedStatement {
            kind,
            sql_without_comments: sql,
        })
    }

    /// True if the comment-free `sql` starts with `SELECT` or `WITH`,
    /// optionally behind a `@{...}` statement hint
    pub fn is_query(&self, sql: &str) -> Result<bool, DatabaseError> {
        if sql.starts_with('@') {
            let sql = strip_statement_hint(sql)?;
            return Ok(starts_with_any(&sql, &QUERY_KEYWORDS));
        }
        Ok(starts_with_any(sql, &QUERY_KEYWORDS))
    }

    /// True if the comment-free `sql` starts with `INSERT`, `UPDATE` or `DELETE`
    pub fn is_update_statement(&self, sql: &str) -> bool {
        starts_with_any(sql, &UPDATE_KEYWORDS)
    }

    /// True if the comment-free `sql` starts with `CREATE`, `ALTER` or `DROP`
    pub fn is_ddl_statement(&self, sql: &str) -> bool {
        starts_with_any(sql, &DDL_KEYWORDS)
    }

    /// True if `sql` would change data or schema
    ///
    /// Statements that cannot be scanned answer `false`; the database gets to
    /// reject them when they are executed.
    pub fn is_update_or_ddl(&self, sql: &str) -> bool {
        match self.classify(sql) {
            Ok(parsed) => parsed.is_update() || parsed.is_ddl(),
            Err(e) => {
                log::warn!("Could not classify statement, treating it as read-only: {}", e);
                false
            }
        }
    }
}

fn starts_with_any(sql: &str, keywords: &[&str]) -> bool {
    first_token(sql)
        .map(|token| keywords.iter().any(|k| token.eq_ignore_ascii_case(k)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(sql: &str) -> StatementKind {
        match StatementClassifier::new().classify(sql) {
            Ok(parsed) => parsed.kind(),
            Err(e) => panic!("unexpected error for {:?}: {}", sql, e),
        }
    }

    #[test]
    fn test_classify_basic_kinds() {
        assert_eq!(kind_of("-- c\nSELECT 1"), StatementKind::Query);
        assert_eq!(kind_of("/*x*/ UPDATE t SET a=1"), StatementKind::Update);
        assert_eq!(kind_of("DROP TABLE t"), StatementKind::Ddl);
        assert_eq!(kind_of("FOO BAR"), StatementKind::Unknown);
    }

    #[test]
    fn test_classify_all_keywords() {
        for sql in ["SELECT 1", "WITH a AS (SELECT 1) SELECT * FROM a"] {
            assert_eq!(kind_of(sql), StatementKind::Query, "{}", sql);
        }
        for sql in ["INSERT INTO t VALUES (1)", "UPDATE t SET a=1", "DELETE FROM t"] {
            assert_eq!(kind_of(sql), StatementKind::Update, "{}", sql);
        }
        for sql in ["CREATE TABLE t (a INT)", "ALTER TABLE t ADD b INT", "DROP INDEX i"] {
            assert_eq!(kind_of(sql), StatementKind::Ddl, "{}", sql);
        }
        for sql in ["BEGIN", "COMMIT", "SET x = 1", ""] {
            assert_eq!(kind_of(sql), StatementKind::Unknown, "{:?}", sql);
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(kind_of("select 1"), kind_of("SELECT 1"));
        assert_eq!(kind_of("iNsErT INTO t VALUES (1)"), StatementKind::Update);
        assert_eq!(kind_of("create table t (a int)"), StatementKind::Ddl);
    }

    #[test]
    fn test_keyword_must_be_whole_token() {
        assert_eq!(kind_of("SELECTED 1"), StatementKind::Unknown);
        assert_eq!(kind_of("SELECT\n*\nFROM t"), StatementKind::Query);
    }

    #[test]
    fn test_classify_with_statement_hint() {
        assert_eq!(
            kind_of("@{FORCE_INDEX=_BASE_TABLE} SELECT * FROM t"),
            StatementKind::Query
        );
        // A malformed hint is passed through and the statement stays unknown
        assert_eq!(kind_of("@FORCE SELECT * FROM t"), StatementKind::Unknown);
    }

    #[test]
    fn test_classify_keeps_cleaned_text() {
        let parsed = StatementClassifier::new().classify("  # note\nDELETE FROM t; ");
        assert!(parsed.is_ok());
        if let Ok(parsed) = parsed {
            assert_eq!(parsed.sql_without_comments(), "DELETE FROM t");
            assert!(parsed.is_update());
            assert!(!parsed.is_ddl());
            assert!(!parsed.is_query());
        }
    }

    #[test]
    fn test_parsed_statement_equality() {
        let classifier = StatementClassifier::new();
        let a = classifier.classify("SELECT 1 -- one").ok();
        let b = classifier.classify("/* one */ SELECT 1;").ok();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_classify_malformed() {
        let result = StatementClassifier::new().classify("SELECT 'abc");
        assert!(matches!(result, Err(DatabaseError::MalformedStatement(_))));
    }

    #[test]
    fn test_is_update_or_ddl() {
        let classifier = StatementClassifier::default();
        assert!(classifier.is_update_or_ddl("INSERT INTO t VALUES (1)"));
        assert!(classifier.is_update_or_ddl("-- c\ncreate index i on t (a)"));
        assert!(!classifier.is_update_or_ddl("SELECT * FROM t"));
        assert!(!classifier.is_update_or_ddl("BEGIN"));
        assert!(!classifier.is_update_or_ddl("INSERT INTO t VALUES ('oops"));
    }
}

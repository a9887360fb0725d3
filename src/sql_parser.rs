//! SQL scanning utilities: comment stripping, statement hints and script splitting
//!
//! The scanner is deliberately lexical. It knows about comments and quoted
//! literals (including triple-quoted ones) and nothing else, which is all the
//! statement classifier needs to find the first keyword of a statement.
//!
//! Supported comment styles:
//! - Single-line comments starting with `--`
//! - Single-line comments starting with `#`
//! - Multi-line comments between `/*` and `*/`

use crate::error::DatabaseError;
use crate::types::DatabaseType;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

const SINGLE_QUOTE: char = '\'';
const DOUBLE_QUOTE: char = '"';
const BACKTICK_QUOTE: char = '`';
const HYPHEN: char = '-';
const HASH: char = '#';
const SLASH: char = '/';
const ASTERISK: char = '*';
const BACKSLASH: char = '\\';
const TERMINATOR: char = ';';

/// Keywords that may follow a statement hint.
pub(crate) const QUERY_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

/// Get appropriate SQL dialect for the database type
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::Postgres => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL | DatabaseType::MariaDB => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

fn unclosed_literal(sql: &str) -> DatabaseError {
    DatabaseError::MalformedStatement(format!(
        "SQL statement contains an unclosed literal: {}",
        sql
    ))
}

/// Remove comments from a statement, trim it and drop a trailing `;`
///
/// Quoted literals (`'...'`, `"..."`, `` `...` `` and their triple-quoted
/// forms) are copied verbatim, so comment markers inside them survive. A
/// backslash escapes exactly the next character of a literal. The line feed
/// that ends a single-line comment is kept.
///
/// Only one trailing `;` is removed, so `SELECT 1;;` becomes `SELECT 1;` and
/// the function is not idempotent on repeated terminators.
///
/// # Examples
/// ```
/// # use smartcommit::sql_parser::strip_comments_and_trim;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sql = "-- fetch\nSELECT '-- kept' FROM t /* gone */;";
/// assert_eq!(strip_comments_and_trim(sql)?, "SELECT '-- kept' FROM t");
///
/// assert!(strip_comments_and_trim("SELECT 'abc").is_err());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns `DatabaseError::MalformedStatement` if a literal is still open at
/// the end of the input, or if a literal that is not triple-quoted contains a
/// line break.
pub fn strip_comments_and_trim(sql: &str) -> Result<String, DatabaseError> {
    let chars: Vec<char> = sql.chars().collect();
    let next_is = |index: usize, expected: char| chars.get(index) == Some(&expected);

    let mut res = String::with_capacity(sql.len());
    let mut in_quoted = false;
    let mut in_single_line_comment = false;
    let mut in_multi_line_comment = false;
    let mut start_quote = SINGLE_QUOTE;
    let mut escaped = false;
    let mut triple_quoted = false;

    let mut index = 0;
    while index < chars.len() {
        let c = chars[index];
        if in_quoted {
            if (c == '\n' || c == '\r') && !triple_quoted {
                return Err(unclosed_literal(sql));
            }
            if escaped {
                escaped = false;
            } else if c == BACKSLASH {
                escaped = true;
            } else if c == start_quote {
                if !triple_quoted {
                    in_quoted = false;
                } else if next_is(index + 1, start_quote) && next_is(index + 2, start_quote) {
                    in_quoted = false;
                    triple_quoted = false;
                    res.push(c);
                    res.push(c);
                    index += 2;
                }
            }
            res.push(c);
        } else if in_single_line_comment {
            if c == '\n' {
                in_single_line_comment = false;
                res.push(c);
            }
        } else if in_multi_line_comment {
            if c == ASTERISK && next_is(index + 1, SLASH) {
                in_multi_line_comment = false;
                index += 1;
            }
        } else if c == HASH || (c == HYPHEN && next_is(index + 1, HYPHEN)) {
            in_single_line_comment = true;
        } else if c == SLASH && next_is(index + 1, ASTERISK) {
            in_multi_line_comment = true;
            index += 1;
        } else {
            if matches!(c, SINGLE_QUOTE | DOUBLE_QUOTE | BACKTICK_QUOTE) {
                in_quoted = true;
                start_quote = c;
                if next_is(index + 1, c) && next_is(index + 2, c) {
                    triple_quoted = true;
                    res.push(c);
                    res.push(c);
                    index += 2;
                }
            }
            res.push(c);
        }
        index += 1;
    }

    if in_quoted {
        return Err(unclosed_literal(sql));
    }

    let trimmed = res.trim_end();
    let trimmed = trimmed.strip_suffix(TERMINATOR).unwrap_or(trimmed);
    Ok(trimmed.trim().to_string())
}

/// Remove a leading `@{...}` statement hint from a query
///
/// Hints are only valid in front of a query, so the hint is taken to end at
/// the last `}` before the first `SELECT` or `WITH`. If no matching `{` comes
/// before that brace, the text is returned unchanged and left for the
/// database to reject.
///
/// # Examples
/// ```
/// # use smartcommit::sql_parser::strip_statement_hint;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sql = "@{FORCE_INDEX=_BASE_TABLE} SELECT * FROM t";
/// assert_eq!(strip_statement_hint(sql)?, "SELECT * FROM t");
///
/// // No opening brace: passed through untouched
/// assert_eq!(strip_statement_hint("@} SELECT 1")?, "@} SELECT 1");
/// # Ok(())
/// # }
/// ```
pub fn strip_statement_hint(sql: &str) -> Result<String, DatabaseError> {
    let start_hint = sql.find('{');
    // ASCII uppercasing keeps byte offsets aligned with `sql`.
    let upper = sql.to_ascii_uppercase();
    let start_query = QUERY_KEYWORDS
        .iter()
        .filter_map(|keyword| upper.find(keyword))
        .min();

    let Some(start_query) = start_query else {
        return Ok(sql.to_string());
    };

    let end_hint = sql[..start_query].rfind('}');
    match (start_hint, end_hint) {
        (Some(start), Some(end)) if start < end => strip_comments_and_trim(&sql[end + 1..]),
        _ => Ok(sql.to_string()),
    }
}

/// First whitespace-delimited token of an already cleaned statement
pub fn first_token(sql: &str) -> Option<&str> {
    sql.split_ascii_whitespace().next()
}

/// Split multi-statement SQL by semicolons, respecting string literals
///
/// Uses sqlparser crate for proper SQL parsing with validation.
///
/// # Examples
/// ```
/// # use smartcommit::sql_parser::split_sql_statements;
/// # use smartcommit::types::DatabaseType;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sql = "SELECT 1; INSERT INTO t VALUES ('a;b'); SELECT 2;";
/// let stmts = split_sql_statements(sql, DatabaseType::Postgres)?;
/// assert_eq!(stmts.len(), 3);
/// assert_eq!(stmts[1], "INSERT INTO t VALUES ('a;b')");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns `DatabaseError::QueryError` if:
/// - SQL contains unterminated string literals
/// - SQL has invalid syntax that prevents parsing
pub fn split_sql_statements(
    sql: &str,
    db_type: DatabaseType,
) -> Result<Vec<String>, DatabaseError> {
    let dialect = get_dialect(db_type);

    Parser::parse_sql(&*dialect, sql)
        .map(|stmts| stmts.iter().map(|s| s.to_string()).collect())
        .map_err(|e| DatabaseError::QueryError(format!("SQL parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(sql: &str) -> String {
        match strip_comments_and_trim(sql) {
            Ok(s) => s,
            Err(e) => panic!("unexpected error for {:?}: {}", sql, e),
        }
    }

    #[test]
    fn test_single_line_comments() {
        assert_eq!(strip("-- comment\nSELECT 1"), "SELECT 1");
        assert_eq!(strip("# comment\nSELECT 1"), "SELECT 1");
        assert_eq!(strip("SELECT 1 -- trailing"), "SELECT 1");
    }

    #[test]
    fn test_line_feed_after_comment_is_kept() {
        assert_eq!(strip("SELECT a, -- first\nb FROM t"), "SELECT a, \nb FROM t");
    }

    #[test]
    fn test_multi_line_comments() {
        assert_eq!(strip("/* a\n b */ UPDATE t SET a=1"), "UPDATE t SET a=1");
        assert_eq!(strip("SELECT /* inline */1"), "SELECT 1");
    }

    #[test]
    fn test_comment_markers_inside_literals_are_kept() {
        assert_eq!(
            strip("SELECT '-- no', \"/* no */\", `# no` FROM t"),
            "SELECT '-- no', \"/* no */\", `# no` FROM t"
        );
    }

    #[test]
    fn test_escaped_quote_does_not_close_literal() {
        assert_eq!(strip(r"SELECT 'it\'s -- here'"), r"SELECT 'it\'s -- here'");
    }

    #[test]
    fn test_escaped_backslash_closes_literal() {
        assert_eq!(strip(r"SELECT 'a\\' -- c"), r"SELECT 'a\\'");
    }

    #[test]
    fn test_triple_quoted_literal_may_span_lines() {
        let sql = "SELECT '''line one\n-- still literal\nline three''' AS s";
        assert_eq!(strip(sql), sql);
    }

    #[test]
    fn test_triple_quoted_literal_with_single_quote_inside() {
        let sql = "SELECT \"\"\"say \"hi\" now\"\"\" FROM t -- c";
        assert_eq!(strip(sql), "SELECT \"\"\"say \"hi\" now\"\"\" FROM t");
    }

    #[test]
    fn test_empty_literal() {
        assert_eq!(strip("SELECT '' -- c"), "SELECT ''");
    }

    #[test]
    fn test_unterminated_single_quote() {
        let result = strip_comments_and_trim("SELECT 'abc");
        assert!(
            matches!(result, Err(DatabaseError::MalformedStatement(_))),
            "Expected MalformedStatement, got {:?}",
            result
        );
    }

    #[test]
    fn test_unterminated_triple_quote() {
        let result = strip_comments_and_trim("SELECT '''abc''");
        assert!(matches!(result, Err(DatabaseError::MalformedStatement(_))));
    }

    #[test]
    fn test_line_break_inside_literal() {
        let result = strip_comments_and_trim("SELECT 'abc\ndef'");
        assert!(matches!(result, Err(DatabaseError::MalformedStatement(_))));
        let result = strip_comments_and_trim("SELECT \"abc\r\ndef\"");
        assert!(matches!(result, Err(DatabaseError::MalformedStatement(_))));
    }

    #[test]
    fn test_trailing_terminator() {
        assert_eq!(strip("SELECT 1;"), "SELECT 1");
        assert_eq!(strip("  SELECT 1 ;  "), "SELECT 1");
        assert_eq!(strip("SELECT 1; -- done"), "SELECT 1");
        assert_eq!(strip("SELECT ';'"), "SELECT ';'");
    }

    #[test]
    fn test_unicode_is_preserved() {
        assert_eq!(
            strip("/* 注释 */ SELECT '日本語' -- コメント"),
            "SELECT '日本語'"
        );
    }

    #[test]
    fn test_idempotent_on_balanced_input() {
        let inputs = [
            "SELECT 1",
            "  -- c\nSELECT a FROM t WHERE b = 'x -- y';  ",
            "/* head */ INSERT INTO t VALUES (\"q\", `r`) # tail",
            "WITH x AS (SELECT 1) SELECT * FROM x;",
            "",
        ];
        for sql in inputs {
            let once = strip(sql);
            assert_eq!(strip(&once), once, "not idempotent for {:?}", sql);
        }
    }

    #[test]
    fn test_only_one_terminator_is_removed() {
        let once = strip("SELECT 1;;");
        assert_eq!(once, "SELECT 1;");
        assert_eq!(strip(&once), "SELECT 1");
        assert_eq!(strip("SELECT 1; ;"), "SELECT 1;");
    }

    #[test]
    fn test_strip_statement_hint() {
        let stripped = strip_statement_hint("@{FORCE_INDEX=_BASE_TABLE}\nselect * from t");
        assert_eq!(stripped.ok().as_deref(), Some("select * from t"));
    }

    #[test]
    fn test_strip_statement_hint_before_with() {
        let stripped = strip_statement_hint("@{OPT=1} WITH a AS (SELECT 1) SELECT * FROM a");
        assert_eq!(
            stripped.ok().as_deref(),
            Some("WITH a AS (SELECT 1) SELECT * FROM a")
        );
    }

    #[test]
    fn test_strip_statement_hint_without_query_keyword() {
        let sql = "@{OPT=1} UPDATE t SET a=1";
        assert_eq!(strip_statement_hint(sql).ok().as_deref(), Some(sql));
    }

    #[test]
    fn test_strip_statement_hint_inconsistent_braces() {
        let sql = "@}{ SELECT 1";
        assert_eq!(strip_statement_hint(sql).ok().as_deref(), Some(sql));
    }

    #[test]
    fn test_first_token() {
        assert_eq!(first_token("SELECT\t*\nFROM t"), Some("SELECT"));
        assert_eq!(first_token(""), None);
    }

    #[test]
    fn test_split_respects_string_literals() {
        let sql = "SELECT 1; INSERT INTO t VALUES ('a;b;c'); SELECT 2;";
        let result = split_sql_statements(sql, DatabaseType::Postgres);
        assert!(result.is_ok(), "split_sql_statements failed: {:?}", result.err());
        if let Ok(stmts) = result {
            assert_eq!(stmts.len(), 3);
            assert!(stmts[1].contains("'a;b;c'"));
        }
    }

    #[test]
    fn test_split_unterminated_single_quote() {
        let sql = "INSERT INTO t VALUES ('test);";
        let result = split_sql_statements(sql, DatabaseType::SQLite);
        assert!(result.is_err(), "Expected error for unterminated single quote");
        if let Err(e) = result {
            assert!(e.to_string().contains("parse error"));
        }
    }
}

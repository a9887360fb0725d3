//! Identifier validation for statements built by this crate

use crate::error::DatabaseError;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate a savepoint name before it is interpolated into SQL
///
/// `SAVEPOINT` does not accept bind parameters, so names are restricted to
/// `[A-Za-z_][A-Za-z0-9_]*`, at most 64 characters.
///
/// # Example
///
/// ```rust
/// use smartcommit::validate::validate_savepoint_name;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// validate_savepoint_name("before_update")?;
/// validate_savepoint_name("_sp1")?;
///
/// # assert!(validate_savepoint_name("").is_err());
/// # assert!(validate_savepoint_name("1sp").is_err());
/// # assert!(validate_savepoint_name("sp; DROP TABLE t").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_savepoint_name(name: &str) -> Result<(), DatabaseError> {
    if name.is_empty() {
        return Err(DatabaseError::QueryError(
            "Savepoint name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(DatabaseError::QueryError(format!(
            "Savepoint name too long: {} characters (max {})",
            name.len(),
            MAX_IDENTIFIER_LEN
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatabaseError::QueryError(format!(
            "Invalid savepoint name: '{}'. Only alphanumeric and underscore allowed",
            name
        )));
    }

    if let Some(first_char) = name.chars().next()
        && first_char.is_ascii_digit()
    {
        return Err(DatabaseError::QueryError(format!(
            "Savepoint name cannot start with digit: '{}'",
            name
        )));
    }

    Ok(())
}

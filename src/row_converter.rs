//! Row conversion for query results
//!
//! Converts sqlx AnyRow instances to JSON objects keyed by column name.

use crate::delegate::Row as JsonRow;
use crate::error::DatabaseError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use sqlx::any::{Any, AnyRow};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

fn extract<'r, T>(
    row: &'r AnyRow,
    ordinal: usize,
    name: &str,
    type_name: &str,
) -> Result<Option<T>, DatabaseError>
where
    T: Decode<'r, Any> + Type<Any>,
{
    row.try_get::<Option<T>, _>(ordinal).map_err(|e| {
        DatabaseError::QueryError(format!(
            "Failed to extract column '{}' as {}: {}",
            name, type_name, e
        ))
    })
}

/// Best effort for columns the driver could not type (e.g. SQLite expressions)
fn extract_untyped(row: &AnyRow, ordinal: usize) -> Value {
    if let Ok(Some(v)) = row.try_get_unchecked::<Option<i64>, _>(ordinal) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get_unchecked::<Option<f64>, _>(ordinal) {
        return Value::from(v);
    }
    if let Ok(Some(s)) = row.try_get_unchecked::<Option<String>, _>(ordinal) {
        return Value::String(s);
    }
    Value::Null
}

/// Convert a sqlx row to a JSON object
///
/// Binary values are base64 encoded.
///
/// # Errors
/// Returns error if a column cannot be decoded as its reported type
pub fn row_to_json(row: &AnyRow) -> Result<JsonRow, DatabaseError> {
    let mut columns = JsonRow::new();

    for column in row.columns() {
        let ordinal = column.ordinal();
        let name = column.name().to_string();
        let type_name = column.type_info().name();

        let value = match type_name {
            "BOOLEAN" => extract::<bool>(row, ordinal, &name, type_name)?.map(Value::Bool),
            "SMALLINT" | "INTEGER" | "BIGINT" => {
                extract::<i64>(row, ordinal, &name, type_name)?.map(Value::from)
            }
            "REAL" | "DOUBLE" => extract::<f64>(row, ordinal, &name, type_name)?.map(Value::from),
            "TEXT" => extract::<String>(row, ordinal, &name, type_name)?.map(Value::String),
            "BLOB" => extract::<Vec<u8>>(row, ordinal, &name, type_name)?
                .map(|bytes| Value::String(STANDARD.encode(bytes))),
            _ => Some(extract_untyped(row, ordinal)),
        };

        columns.insert(name, value.unwrap_or(Value::Null));
    }

    Ok(columns)
}

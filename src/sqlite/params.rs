use rusqlite::types::Value;

use crate::error::SqlFacadeError;
use crate::types::{RowValues, StatementParam};

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// Timestamps are stored as text (`YYYY-MM-DD HH:MM:SS[.fff]`), booleans as
/// integers and JSON as its serialised text.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Lower statement parameters to rusqlite values.
///
/// # Errors
/// Returns `SqlFacadeError::Unimplemented` for out parameters, which SQLite
/// has no notion of.
pub fn convert_params(params: &[StatementParam]) -> Result<Vec<Value>, SqlFacadeError> {
    params
        .iter()
        .map(|param| match param {
            StatementParam::In(value) => Ok(row_value_to_sqlite_value(value)),
            StatementParam::Out(_) | StatementParam::InOut(..) => Err(
                SqlFacadeError::Unimplemented("out parameters are not supported by SQLite".into()),
            ),
        })
        .collect()
}

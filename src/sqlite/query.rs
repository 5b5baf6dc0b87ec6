use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::config::ResultSetType;
use crate::error::SqlFacadeError;
use crate::results::VecCursor;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlFacadeError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SqlFacadeError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a prepared query and materialise its rows into a cursor.
///
/// At most `max_rows` rows are read when it is non-zero.
///
/// # Errors
/// Returns `SqlFacadeError` if execution or value extraction fails.
pub fn build_cursor(
    stmt: &mut Statement<'_>,
    params: &[Value],
    max_rows: usize,
    cursor_type: ResultSetType,
) -> Result<VecCursor, SqlFacadeError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut rows_iter = stmt.query(params_from_iter(params.iter()))?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        rows.push(row_values);
        if max_rows > 0 && rows.len() >= max_rows {
            break;
        }
    }

    Ok(VecCursor::new(column_names, rows, cursor_type))
}

//! Conversion of SQLite cells into JSON values.

use rusqlite::types::ValueRef;
use rusqlite::{Row, Statement};
use serde_json::{Number, Value};

use crate::types::RowValues;

/// Convert one cell. Byte arrays (TEXT and BLOB) become strings, decoded
/// lossily; non-finite reals become null.
pub fn cell_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Decode the first `width` cells of `row`.
pub fn decode_row(row: &Row<'_>, width: usize) -> rusqlite::Result<RowValues> {
    (0..width).map(|i| row.get_ref(i).map(cell_value)).collect()
}

pub fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::codec;
use crate::error::SqlClientError;
use crate::results::ResultSet;
use crate::types::SqlType;

use super::params::from_sqlite_value;

/// Run a prepared statement and build a [`ResultSet`].
///
/// Column values are decoded by each column's declared type; expression
/// columns without one keep their storage class.
///
/// # Errors
/// Returns `SqlClientError` if execution fails or a value does not fit its
/// column's declared type.
pub fn build_result_set(stmt: &mut Statement<'_>, params: &[Value]) -> Result<ResultSet, SqlClientError> {
    let columns = stmt.columns();
    let column_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let declared: Vec<SqlType> = columns
        .iter()
        .map(|c| c.decl_type().map_or(SqlType::Null, SqlType::from_declared))
        .collect();
    let width = column_names.len();

    let mut rows_iter = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(width);
        for (idx, declared) in declared.iter().enumerate() {
            let value: Value = row.get(idx)?;
            values.push(codec::decode(from_sqlite_value(value), *declared)?);
        }
        rows.push(values);
    }

    ResultSet::new(column_names, rows)
}

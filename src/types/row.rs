use std::sync::Arc;

use crate::error::{Result, SqlFetchError};
use crate::types::{FromSqlValue, SqlValue};

/// Driver-agnostic raw result from a database query.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<SqlValue>>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Consumes the result as a single-pass cursor of rows.
    /// All rows share one column list.
    pub fn into_rows(self) -> impl Iterator<Item = Row> {
        let columns = Arc::new(self.columns);
        self.rows.into_iter().map(move |values| Row {
            columns: Arc::clone(&columns),
            values,
        })
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single row result from a query: an ordered mapping of column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a new Row from column names and values.
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self {
            columns: Arc::new(columns),
            values,
        }
    }

    /// Creates a Row from `(column, value)` pairs, in order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<SqlValue>,
    {
        let mut row = Row::default();
        for (column, value) in pairs {
            row.set(column, value);
        }
        row
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.position(column)
            .map(|i| &self.values[i])
            .ok_or_else(|| SqlFetchError::ColumnNotFound(column.to_string()))
    }

    /// Gets a value by column name, converted to `T`.
    pub fn try_get<T: FromSqlValue>(&self, column: &str) -> Result<T> {
        T::from_sql_value(self.get(column)?.clone())
    }

    /// Gets a value by column position.
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Sets a column value, appending the column if the row does not have it.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(i) => self.values[i] = value,
            None => {
                Arc::make_mut(&mut self.columns).push(column);
                self.values.push(value);
            }
        }
    }

    /// Returns all column names in this row, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns all values in this row, in column order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Splits the row into its values, in column order.
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for Row {
    fn default() -> Self {
        Row::new(Vec::new(), Vec::new())
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let values = vec![SqlValue::Int64(1), SqlValue::from("John")];
        let row = Row::new(columns, values);

        assert_eq!(row.get("id").unwrap(), &SqlValue::Int64(1));
        assert_eq!(row.try_get::<String>("name").unwrap(), "John");
        assert!(matches!(
            row.get("missing"),
            Err(SqlFetchError::ColumnNotFound(c)) if c == "missing"
        ));
    }

    #[test]
    fn test_into_rows_preserves_cursor_order() {
        let raw = RawQueryResult::new(
            vec!["id".to_string()],
            vec![vec![SqlValue::Int64(2)], vec![SqlValue::Int64(1)]],
        );
        let ids: Vec<_> = raw
            .into_rows()
            .map(|row| row.try_get::<i64>("id").unwrap())
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_set_does_not_leak_into_sibling_rows() {
        let raw = RawQueryResult::new(
            vec!["id".to_string()],
            vec![vec![SqlValue::Int64(1)], vec![SqlValue::Int64(2)]],
        );
        let mut rows: Vec<Row> = raw.into_rows().collect();
        rows[0].set("extra", true);

        assert_eq!(rows[0].columns(), &["id".to_string(), "extra".to_string()]);
        assert_eq!(rows[1].columns(), &["id".to_string()]);
    }

    #[test]
    fn test_from_pairs_equals_cursor_row() {
        let raw = RawQueryResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![SqlValue::Int64(1), SqlValue::from("a")]],
        );
        let row = raw.into_rows().next().unwrap();
        assert_eq!(row, Row::from_pairs([("id", SqlValue::Int64(1)), ("name", "a".into())]));
    }
}

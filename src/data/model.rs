use std::fmt;

use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed scalar cell.
///
/// Integers and floats are kept apart so integer columns survive a round trip
/// through every encoding; comparisons between the two are numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Short type name used in log lines and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// TabularDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An immutable table: ordered, unique column names and rows of cells.
///
/// Every row holds exactly one value per column, in column order. The fields
/// are private so that invariant can only be established by [`TabularDataset::try_new`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabularDataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TabularDataset {
    /// Build a dataset, checking column uniqueness and row widths.
    pub fn try_new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, SchemaError> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].contains(col) {
                return Err(SchemaError::DuplicateColumn(col.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SchemaError::RowWidth {
                    row: i + 1,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(TabularDataset { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Position of a column; names are case-sensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// A new dataset holding the given rows, in the given order.
    pub(crate) fn select_rows(&self, indices: &[usize]) -> TabularDataset {
        TabularDataset {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> TabularDataset {
        TabularDataset::try_new(
            vec!["age".into(), "name".into()],
            vec![
                vec![Value::Integer(30), "A".into()],
                vec![Value::Integer(15), "B".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let err = TabularDataset::try_new(vec!["a".into(), "a".into()], vec![]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("a".into()));
    }

    #[test]
    fn test_rejects_short_row() {
        let err = TabularDataset::try_new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Null, Value::Null], vec![Value::Null]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::RowWidth {
                row: 2,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_columns_are_case_sensitive() {
        let ds = TabularDataset::try_new(vec!["Age".into(), "age".into()], vec![]).unwrap();
        assert_eq!(ds.column_index("age"), Some(1));
        assert_eq!(ds.column_index("AGE"), None);
    }

    #[test]
    fn test_value_lookup() {
        let ds = people();
        assert_eq!(ds.value(1, "name"), Some(&Value::from("B")));
        assert_eq!(ds.value(2, "name"), None);
        assert_eq!(ds.value(0, "height"), None);
        assert_eq!(ds.row(0), Some(&[Value::Integer(30), Value::from("A")][..]));
    }

    #[test]
    fn test_select_rows_is_independent_copy() {
        let ds = people();
        let picked = ds.select_rows(&[1]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked.columns(), ds.columns());
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("3").as_f64(), None);
        assert_eq!(Value::Null.to_string(), "<null>");
    }
}

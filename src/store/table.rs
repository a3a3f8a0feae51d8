///! Column-oriented query results and the SQL value type
use chrono::{DateTime, NaiveDateTime};
use rusqlite::types::{ToSqlOutput, ValueRef};
use serde::Serialize;

/// A single SQL value, plus the post-load calendar-timestamp form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Real(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            // The monitor schema carries no blob columns
            ValueRef::Blob(_) => Value::Null,
        }
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as SqlValue;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(s) => ToSqlOutput::Owned(SqlValue::Text(s.clone())),
            Value::Timestamp(ts) => ToSqlOutput::Owned(SqlValue::Integer(ts.and_utc().timestamp())),
        })
    }
}

/// Column-oriented tabular result of one query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    names: Vec<String>,
    cols: Vec<Vec<Value>>,
    rows: usize,
}

impl Table {
    pub fn with_columns(names: Vec<String>) -> Self {
        let cols = names.iter().map(|_| Vec::new()).collect();
        Self {
            names,
            cols,
            rows: 0,
        }
    }

    pub(crate) fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.cols.len());
        for (col, value) in self.cols.iter_mut().zip(row) {
            col.push(value);
        }
        self.rows += 1;
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.index_of(name).map(|i| self.cols[i].as_slice())
    }

    /// Integer view of a column. Non-integer values are skipped.
    pub fn i64_column(&self, name: &str) -> Option<Vec<i64>> {
        self.column(name)
            .map(|col| col.iter().filter_map(Value::as_i64).collect())
    }

    /// Numeric view of a column. Values with no numeric form become NaN so
    /// the result stays aligned with sibling columns.
    pub fn f64_column(&self, name: &str) -> Option<Vec<f64>> {
        self.column(name)
            .map(|col| col.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
    }

    /// Reinterprets the listed columns as calendar timestamps.
    ///
    /// Raw values are integer epoch seconds (UTC); the converted value is
    /// `v - offset_secs` rendered as a naive calendar time, so the result is
    /// local time under the configured fixed offset rather than the host
    /// timezone. Columns absent from the result and non-integer values are
    /// left untouched.
    pub fn convert_timestamps(&mut self, datetimes: &[String], offset_secs: i64) {
        for name in datetimes {
            let Some(i) = self.index_of(name) else {
                continue;
            };
            for value in &mut self.cols[i] {
                if let Value::Integer(secs) = value {
                    if let Some(dt) = DateTime::from_timestamp(*secs - offset_secs, 0) {
                        *value = Value::Timestamp(dt.naive_utc());
                    }
                }
            }
        }
    }
}

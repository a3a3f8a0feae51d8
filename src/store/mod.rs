///! SQLite-backed tabular data source
///!
///! One connection is opened per call and dropped on return, so concurrent
///! callers never share a handle. Query execution faults propagate as
///! `StoreError`; the existence probe reports misses as `Ok(false)`.

mod query;
mod table;

pub use query::{BoolOp, FilterTerm, TableQuery};
pub use table::{Table, Value};

use std::path::{Path, PathBuf};

use rusqlite::{Connection, params_from_iter};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Handle to the monitor database.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    utc_offset_secs: i64,
}

impl Store {
    /// `utc_offset_secs` is subtracted from epoch values when a query asks
    /// for calendar-timestamp conversion.
    pub fn new(path: impl AsRef<Path>, utc_offset_secs: i64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            utc_offset_secs,
        }
    }

    /// Offset applied to epoch values on calendar conversion, in seconds.
    pub fn utc_offset_secs(&self) -> i64 {
        self.utc_offset_secs
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Executes a structured query and returns its rows, with any requested
    /// timestamp columns converted.
    ///
    /// A projection naming a column the relation does not have falls back to
    /// all columns for that request. A direct escape-hatch query runs
    /// verbatim and skips projection resolution and timestamp conversion.
    pub fn load(&self, query: &TableQuery) -> Result<Table> {
        let conn = self.connect()?;

        if let Some(sql) = query.direct_sql() {
            debug!(table = query.table(), "executing direct query");
            return fetch(&conn, sql, &[]);
        }

        let select_list = resolve_projection(&conn, query)?;
        let (sql, params) = query.render(&select_list)?;
        debug!(sql = %sql, params = params.len(), "executing table query");

        let mut table = fetch(&conn, &sql, &params)?;
        table.convert_timestamps(query.datetime_columns(), self.utc_offset_secs);
        Ok(table)
    }

    /// Executes a pre-written parameterized query. Used by reports whose
    /// joins are beyond the filter model.
    pub fn load_query(&self, sql: &str, params: &[Value]) -> Result<Table> {
        let conn = self.connect()?;
        debug!(sql = %sql, params = params.len(), "executing query");
        fetch(&conn, sql, params)
    }

    /// Existence probe.
    ///
    /// With a value: true iff at least one row of `table` has
    /// `column = value`. Without: true iff `column` is among the table's
    /// columns. Advisory input for callers validating request parameters;
    /// `load` never invokes it on their behalf.
    pub fn exists(&self, column: &str, table: &str, value: Option<&Value>) -> Result<bool> {
        let conn = self.connect()?;
        match value {
            Some(value) => {
                let sql = format!("SELECT 1 FROM {table} WHERE {column} = ? LIMIT 1");
                let mut stmt = conn.prepare(&sql)?;
                Ok(stmt.exists([value])?)
            }
            None => Ok(table_columns(&conn, table)?.iter().any(|n| n == column)),
        }
    }
}

fn resolve_projection(conn: &Connection, query: &TableQuery) -> Result<String> {
    let requested = query.requested_columns();
    if requested.is_empty() {
        return Ok("*".to_string());
    }

    let names = table_columns(conn, query.table())?;
    if requested.iter().all(|c| names.contains(c)) {
        Ok(requested.join(", "))
    } else {
        warn!(
            table = query.table(),
            "projection names a missing column, selecting all columns"
        );
        Ok("*".to_string())
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let stmt = conn.prepare(&format!("SELECT * FROM {table} LIMIT 0"))?;
    Ok(stmt.column_names().iter().map(|n| n.to_string()).collect())
}

fn fetch(conn: &Connection, sql: &str, params: &[Value]) -> Result<Table> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
    let ncols = names.len();

    let mut table = Table::with_columns(names);
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(ncols);
        for i in 0..ncols {
            values.push(Value::from(row.get_ref(i)?));
        }
        table.push_row(values);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seeded_store;

    #[test]
    fn test_projection_preserves_requested_order() {
        let (_dir, store) = seeded_store();
        let query = TableQuery::new("signal").columns(["seq", "channel"]);
        let table = store.load(&query).unwrap();
        assert_eq!(table.names(), &["seq".to_string(), "channel".to_string()]);
    }

    #[test]
    fn test_projection_falls_back_to_all_columns() {
        let (_dir, store) = seeded_store();
        let query = TableQuery::new("signal").columns(["channel", "no_such_column"]);
        let table = store.load(&query).unwrap();
        assert_eq!(
            table.names(),
            &["scan_instance", "channel", "snq", "ss", "seq"]
        );
    }

    #[test]
    fn test_equals_round_trip_finds_existing_value() {
        let (_dir, store) = seeded_store();
        // A channel value loaded from the table must be findable again
        let all = store.load(&TableQuery::new("signal")).unwrap();
        let channel = all.column("channel").unwrap()[0].clone();

        let query = TableQuery::new("signal").filter(FilterTerm::Equals {
            column: "channel".to_string(),
            value: channel,
            negate: false,
        });
        assert!(!store.load(&query).unwrap().is_empty());
    }

    #[test]
    fn test_load_is_idempotent() {
        let (_dir, store) = seeded_store();
        let query = TableQuery::new("signal")
            .columns(["channel", "snq"])
            .filter(FilterTerm::equals("scan_instance", 80));
        assert_eq!(store.load(&query).unwrap(), store.load(&query).unwrap());
    }

    #[test]
    fn test_distinct_deduplicates() {
        let (_dir, store) = seeded_store();
        let query = TableQuery::new("signal").columns(["channel"]).distinct(true);
        let table = store.load(&query).unwrap();
        let mut channels = table.i64_column("channel").unwrap();
        let total = channels.len();
        channels.sort_unstable();
        channels.dedup();
        assert_eq!(channels.len(), total);
    }

    #[test]
    fn test_multi_value_filter_matches_each_value() {
        let (_dir, store) = seeded_store();
        let query = TableQuery::new("signal")
            .columns(["channel"])
            .distinct(true)
            .filter(FilterTerm::any_of(
                "channel",
                vec![Value::Integer(27), Value::Integer(32)],
            ));
        let mut channels = store.load(&query).unwrap().i64_column("channel").unwrap();
        channels.sort_unstable();
        assert_eq!(channels, vec![27, 32]);
    }

    #[test]
    fn test_direct_query_runs_verbatim() {
        let (_dir, store) = seeded_store();
        let query = TableQuery::direct(
            "signal",
            "SELECT channel FROM signal WHERE snq > 0 AND scan_instance = 80",
        );
        let table = store.load(&query).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_datetimes_converted_on_load() {
        let (_dir, store) = seeded_store();
        let query = TableQuery::new("scan")
            .columns(["scan_instance", "start_time"])
            .datetimes(["start_time"]);
        let table = store.load(&query).unwrap();
        assert!(matches!(
            table.column("start_time").unwrap()[0],
            Value::Timestamp(_)
        ));
        // scan_instance is untouched
        assert!(matches!(
            table.column("scan_instance").unwrap()[0],
            Value::Integer(_)
        ));
    }

    #[test]
    fn test_exists_probe_row_check() {
        let (_dir, store) = seeded_store();
        assert!(
            store
                .exists("channel", "mapping", Some(&Value::Integer(27)))
                .unwrap()
        );
        assert!(
            !store
                .exists("channel", "mapping", Some(&Value::Integer(99)))
                .unwrap()
        );
    }

    #[test]
    fn test_exists_probe_schema_check() {
        let (_dir, store) = seeded_store();
        assert!(store.exists("snq", "signal", None).unwrap());
        assert!(!store.exists("no_such_column", "signal", None).unwrap());
    }

    #[test]
    fn test_missing_relation_is_fatal() {
        let (_dir, store) = seeded_store();
        let result = store.load(&TableQuery::new("no_such_table"));
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }
}

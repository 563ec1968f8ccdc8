//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random SQL values, tables and whole
//! databases whose snapshots must survive a round trip.

use proptest::prelude::*;
use rusqlite::Connection;
use snapsql_codec::SqlValue;

/// Strategy for any storable SQL value.
///
/// NaN is excluded because SQLite stores it as NULL.
pub fn sql_value_strategy() -> impl Strategy<Value = SqlValue> {
    prop_oneof![
        1 => Just(SqlValue::Null),
        3 => any::<i64>().prop_map(SqlValue::Integer),
        2 => any::<f64>()
            .prop_filter("NaN is stored as NULL", |f| !f.is_nan())
            .prop_map(SqlValue::Real),
        3 => text_strategy().prop_map(SqlValue::Text),
        1 => raw_text_strategy().prop_map(SqlValue::RawText),
        2 => prop::collection::vec(any::<u8>(), 0..64).prop_map(SqlValue::Blob),
    ]
}

/// Strategy for short mixed-script text.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 _'\"éüß日本]{0,24}").expect("Invalid regex")
}

/// Strategy for TEXT bytes that are not valid UTF-8.
pub fn raw_text_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..16).prop_map(|mut bytes| {
        bytes.insert(0, 0xff);
        bytes
    })
}

/// Strategy for valid identifiers.
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}")
        .expect("Invalid regex")
        .prop_filter("sqlite_ prefix is reserved", |s| !s.starts_with("sqlite_"))
}

/// A randomly shaped table and its rows.
#[derive(Debug, Clone)]
pub struct TableFixture {
    /// Table name.
    pub name: String,
    /// Column names, all without declared type.
    pub columns: Vec<String>,
    /// Whether the table is declared `WITHOUT ROWID` (first column is the key).
    pub without_rowid: bool,
    /// Rows, each as wide as `columns`.
    pub rows: Vec<Vec<SqlValue>>,
}

impl TableFixture {
    /// `CREATE TABLE` statement for this table.
    pub fn create_sql(&self) -> String {
        let cols: Vec<String> = self.columns.iter().map(|c| format!("\"{c}\"")).collect();
        if self.without_rowid {
            format!(
                "CREATE TABLE \"{}\" ({}, PRIMARY KEY (\"{}\")) WITHOUT ROWID",
                self.name,
                cols.join(", "),
                self.columns[0]
            )
        } else {
            format!("CREATE TABLE \"{}\" ({})", self.name, cols.join(", "))
        }
    }

    /// Creates the table and inserts every row.
    pub fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(&self.create_sql())?;
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        let mut stmt = conn.prepare(&format!(
            "INSERT INTO \"{}\" VALUES ({})",
            self.name,
            placeholders.join(", ")
        ))?;
        for row in &self.rows {
            stmt.execute(rusqlite::params_from_iter(row.iter()))?;
        }
        Ok(())
    }
}

/// Strategy for a table with 1-4 columns and up to `max_rows` rows.
///
/// `WITHOUT ROWID` tables get a unique integer key in the first column.
pub fn table_strategy(max_rows: usize) -> impl Strategy<Value = TableFixture> {
    (
        identifier_strategy(),
        prop::collection::btree_set(identifier_strategy(), 1..=4),
        any::<bool>(),
    )
        .prop_flat_map(move |(name, columns, without_rowid)| {
            let columns: Vec<String> = columns.into_iter().collect();
            let width = columns.len();
            let rows = prop::collection::vec(
                prop::collection::vec(sql_value_strategy(), width),
                0..=max_rows,
            );
            (Just(name), Just(columns), Just(without_rowid), rows)
        })
        .prop_map(|(name, columns, without_rowid, mut rows)| {
            if without_rowid {
                for (i, row) in rows.iter_mut().enumerate() {
                    row[0] = SqlValue::Integer(i as i64);
                }
            }
            TableFixture {
                name,
                columns,
                without_rowid,
                rows,
            }
        })
}

/// Strategy for a set of tables with distinct names.
pub fn database_strategy(max_tables: usize, max_rows: usize) -> impl Strategy<Value = Vec<TableFixture>> {
    prop::collection::vec(table_strategy(max_rows), 0..=max_tables).prop_map(|tables| {
        let mut seen = std::collections::HashSet::new();
        tables
            .into_iter()
            .filter(|t| seen.insert(t.name.clone()))
            .collect()
    })
}

/// Reads every row of `table` in a stable order for comparison.
pub fn dump_table(conn: &Connection, table: &str, width: usize) -> Vec<Vec<SqlValue>> {
    let order: Vec<String> = (1..=width).map(|i| i.to_string()).collect();
    let mut stmt = conn
        .prepare(&format!(
            "SELECT * FROM \"{table}\" ORDER BY {}",
            order.join(", ")
        ))
        .expect("Failed to prepare dump");
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, SqlValue>(i))
                .collect::<rusqlite::Result<Vec<SqlValue>>>()
        })
        .expect("Failed to query dump")
        .collect::<rusqlite::Result<Vec<_>>>()
        .expect("Failed to read dump");
    rows
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 128,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 24,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

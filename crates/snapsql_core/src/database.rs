//! The shared database handle.

use parking_lot::Mutex;
use rusqlite::{Connection, Params};
use snapsql_codec::{CodecResult, Snapshot};

/// Where a database's contents came from at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Decoded from the stored snapshot.
    Restored,
    /// Created empty because nothing was stored.
    Fresh,
    /// Created empty because the stored snapshot could not be decoded.
    Recovered,
    /// Created empty because the store could not be opened.
    Detached,
}

impl Origin {
    /// Returns true if the contents did not come from a stored snapshot.
    pub fn is_fresh(self) -> bool {
        !matches!(self, Origin::Restored)
    }
}

/// The process-wide in-memory SQL database.
///
/// A `Database` is shared as `Arc<Database>` between the manager and every
/// collaborator. The connection sits behind a synchronous mutex that is
/// only taken inside the closures passed to [`with_conn`](Self::with_conn)
/// and [`with_conn_mut`](Self::with_conn_mut), so it can never be held
/// across an await point.
///
/// Writes made through this handle are in memory only until the
/// coordinator persists them.
pub struct Database {
    conn: Mutex<Connection>,
    origin: Origin,
}

impl Database {
    pub(crate) fn new(conn: Connection, origin: Origin) -> Self {
        Self {
            conn: Mutex::new(conn),
            origin,
        }
    }

    /// How this database was created.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Runs `f` with shared access to the connection.
    pub fn with_conn<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Runs `f` with exclusive access, e.g. to open a transaction.
    ///
    /// A transaction left open when `f` returns makes every later persist
    /// fail until it is closed.
    pub fn with_conn_mut<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> R {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    /// Executes one statement, returning the number of changed rows.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the statement fails.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<usize> {
        self.with_conn(|conn| conn.execute(sql, params))
    }

    /// Executes a batch of semicolon-separated statements.
    ///
    /// # Errors
    ///
    /// Returns the engine error of the first failing statement.
    pub fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.with_conn(|conn| conn.execute_batch(sql))
    }

    /// Encodes the current contents.
    pub(crate) fn snapshot(&self) -> CodecResult<Snapshot> {
        self.with_conn(snapsql_codec::encode)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> Database {
        Database::new(Connection::open_in_memory().unwrap(), Origin::Fresh)
    }

    #[test]
    fn execute_and_query() {
        let db = database();
        db.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        assert_eq!(db.execute("INSERT INTO t VALUES (?1)", [5]).unwrap(), 1);

        let x: i64 = db
            .with_conn(|c| c.query_row("SELECT x FROM t", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(x, 5);
    }

    #[test]
    fn transaction_through_with_conn_mut() {
        let db = database();
        db.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        db.with_conn_mut(|c| {
            let tx = c.transaction()?;
            tx.execute("INSERT INTO t VALUES (1)", [])?;
            tx.execute("INSERT INTO t VALUES (2)", [])?;
            tx.commit()
        })
        .unwrap();

        let n: i64 = db
            .with_conn(|c| c.query_row("SELECT count(*) FROM t", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn snapshot_refuses_open_transaction() {
        let db = database();
        db.execute_batch("CREATE TABLE t (x); BEGIN; INSERT INTO t VALUES (1);")
            .unwrap();
        assert!(db.snapshot().is_err());
        db.execute_batch("COMMIT").unwrap();
        assert!(db.snapshot().is_ok());
    }

    #[test]
    fn origin_freshness() {
        assert!(!Origin::Restored.is_fresh());
        assert!(Origin::Fresh.is_fresh());
        assert!(Origin::Recovered.is_fresh());
        assert!(Origin::Detached.is_fresh());
    }
}

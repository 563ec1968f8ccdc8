//! Sample schema collaborator: the `reaction_times` table.
//!
//! It owns its schema and queries, talks to the shared database through the
//! lifecycle manager, and persists after every write.

use rusqlite::params;
use snapsql_core::{CoreError, LifecycleManager, StoreBackend};
use thiserror::Error;

/// Errors from the sample collaborator.
#[derive(Debug, Error)]
pub enum ReactionError {
    /// A statement failed.
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The core failed to bootstrap or persist.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// One recorded reaction test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionTest {
    /// Row id.
    pub id: i64,
    /// Label typed by the player.
    pub test_value: String,
    /// Epoch milliseconds when the stimulus was shown.
    pub start_time: i64,
    /// Epoch milliseconds when the response arrived.
    pub end_time: i64,
    /// `end_time - start_time`.
    pub reaction_time: i64,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS reaction_times (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    testValue    TEXT    NOT NULL,
    startTime    INTEGER NOT NULL,
    endTime      INTEGER NOT NULL,
    reactionTime INTEGER NOT NULL
)";

/// Accessors for the `reaction_times` table.
pub struct ReactionTimes<B: StoreBackend> {
    manager: LifecycleManager<B>,
}

impl<B: StoreBackend> ReactionTimes<B> {
    /// Wraps a manager. Call [`ensure_schema`](Self::ensure_schema) before use.
    pub fn new(manager: LifecycleManager<B>) -> Self {
        Self { manager }
    }

    /// Initializes the database and creates the table if missing.
    ///
    /// The table is not persisted on its own; the first write carries it.
    ///
    /// # Errors
    ///
    /// Returns the bootstrap error or the engine error.
    pub async fn ensure_schema(&self) -> Result<(), ReactionError> {
        let db = self.manager.initialize().await?;
        db.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Records a test and persists the database.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before bootstrap, the engine error, or the
    /// persist error. On a persist error the row stays in memory.
    pub async fn add_test(
        &self,
        test_value: &str,
        start_time: i64,
        end_time: i64,
        reaction_time: i64,
    ) -> Result<i64, ReactionError> {
        self.manager
            .mutate(|conn| -> Result<i64, ReactionError> {
                conn.execute(
                    "INSERT INTO reaction_times (testValue, startTime, endTime, reactionTime)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![test_value, start_time, end_time, reaction_time],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Returns every recorded test ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before bootstrap or the engine error.
    pub fn all_tests(&self) -> Result<Vec<ReactionTest>, ReactionError> {
        let db = self.manager.get()?;
        let tests = db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, testValue, startTime, endTime, reactionTime
                   FROM reaction_times ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ReactionTest {
                    id: row.get(0)?,
                    test_value: row.get(1)?,
                    start_time: row.get(2)?,
                    end_time: row.get(3)?,
                    reaction_time: row.get(4)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(tests)
    }

    /// Returns the underlying manager.
    pub fn manager(&self) -> &LifecycleManager<B> {
        &self.manager
    }
}

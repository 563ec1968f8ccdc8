//! Exec command implementation.

use super::{CliResult, Target};
use snapsql_core::Origin;
use tracing::info;

/// Outcome of an exec run.
#[derive(Debug)]
pub struct ExecResult {
    /// How the database was obtained.
    pub origin: Origin,
    /// Rows changed by the statements.
    pub changes: i64,
}

/// Bootstraps the store, runs `sql` and persists the result.
pub async fn execute(target: &Target, sql: &str) -> CliResult<ExecResult> {
    let manager = target.manager()?;
    let db = manager.initialize().await?;
    info!(origin = ?db.origin(), "database ready");

    let changes = db.with_conn(|conn| -> rusqlite::Result<i64> {
        conn.execute_batch(sql)?;
        conn.query_row("SELECT total_changes()", [], |row| row.get(0))
    })?;
    manager.persist().await?;

    Ok(ExecResult {
        origin: db.origin(),
        changes,
    })
}

/// Runs the exec command.
pub async fn run(target: &Target, sql: &str) -> CliResult<()> {
    let result = execute(target, sql).await?;
    println!("✓ {} row(s) changed, snapshot persisted", result.changes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::inspect;
    use tempfile::TempDir;

    #[tokio::test]
    async fn first_exec_creates_the_store() {
        let dir = TempDir::new().unwrap();
        let target = Target::new(dir.path().to_path_buf(), "scores".to_string());

        let result = execute(&target, "CREATE TABLE t (x); INSERT INTO t VALUES (1);")
            .await
            .unwrap();
        assert_eq!(result.origin, Origin::Fresh);
        assert_eq!(result.changes, 1);
        assert!(target.manifest().unwrap().is_some());

        let result = execute(&target, "INSERT INTO t VALUES (2), (3);")
            .await
            .unwrap();
        assert_eq!(result.origin, Origin::Restored);
        assert_eq!(result.changes, 2);
    }

    #[tokio::test]
    async fn sql_error_leaves_record_untouched() {
        let dir = TempDir::new().unwrap();
        let target = Target::new(dir.path().to_path_buf(), "scores".to_string());
        execute(&target, "CREATE TABLE t (x); INSERT INTO t VALUES (1);")
            .await
            .unwrap();
        let before = inspect::collect(&target).await.unwrap().snapshot.unwrap();

        assert!(execute(&target, "INSERT INTO t VALUES (2); INSERT INTO missing VALUES (1)")
            .await
            .is_err());

        let after = inspect::collect(&target).await.unwrap().snapshot.unwrap();
        assert_eq!(after.checksum, before.checksum);
        assert_eq!(after.total_rows(), 1);
    }
}

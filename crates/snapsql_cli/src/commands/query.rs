//! Query command implementation.

use super::{CliResult, Target};
use serde::Serialize;
use snapsql_codec::SqlValue;

/// Rows returned by a query.
#[derive(Debug, Serialize)]
pub struct QueryResult {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// One entry per row.
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Bootstraps the store and runs `sql`. Nothing is persisted.
pub async fn select(target: &Target, sql: &str) -> CliResult<QueryResult> {
    let manager = target.manager()?;
    let db = manager.initialize().await?;

    let result = db.with_conn(|conn| -> rusqlite::Result<QueryResult> {
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i).map(json_value))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(QueryResult { columns, rows })
    })?;

    Ok(result)
}

/// Runs the query command.
pub async fn run(target: &Target, sql: &str, format: &str) -> CliResult<()> {
    let result = select(target, sql).await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("{}", result.columns.join("\t"));
            for row in &result.rows {
                let cells: Vec<String> = row.iter().map(text_cell).collect();
                println!("{}", cells.join("\t"));
            }
        }
    }

    Ok(())
}

fn json_value(value: SqlValue) -> serde_json::Value {
    match value {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Integer(i) => i.into(),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        SqlValue::Text(s) => s.into(),
        raw @ SqlValue::RawText(_) => raw.to_string().into(),
        blob @ SqlValue::Blob(_) => blob.to_string().into(),
    }
}

fn text_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

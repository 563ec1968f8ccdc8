//! Benchmark utilities.

use rusqlite::Connection;

/// Table used by every benchmark.
pub const TABLE: &str = "bench";

/// Deterministic payload of `size` bytes for row `seed`.
pub fn payload(seed: usize, size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (seed.wrapping_mul(31).wrapping_add(i * 7) % 251) as u8)
        .collect()
}

/// Creates the benchmark table and fills it with `rows` rows.
pub fn populate(conn: &Connection, rows: usize, payload_size: usize) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS bench (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            score REAL,
            data BLOB
        );
        CREATE INDEX IF NOT EXISTS bench_label ON bench (label);",
    )?;

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO bench (label, score, data) VALUES (?1, ?2, ?3)")?;
        for i in 0..rows {
            stmt.execute(rusqlite::params![
                format!("row-{i}"),
                i as f64 * 0.5,
                payload(i, payload_size)
            ])?;
        }
    }
    tx.commit()
}

/// An in-memory connection holding `rows` benchmark rows.
pub fn populated(rows: usize, payload_size: usize) -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    populate(&conn, rows, payload_size).expect("populate benchmark table");
    conn
}

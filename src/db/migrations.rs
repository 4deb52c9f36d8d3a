use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS calendar_days (
            date          TEXT PRIMARY KEY,
            hijri_day     INTEGER NOT NULL,
            hijri_month   INTEGER NOT NULL,
            hijri_year    INTEGER NOT NULL,
            hijri_name_ar TEXT NOT NULL,
            hijri_name_en TEXT NOT NULL,
            fajr          TEXT NOT NULL,
            sunrise       TEXT NOT NULL,
            dhuhr         TEXT NOT NULL,
            asr           TEXT NOT NULL,
            maghrib       TEXT NOT NULL,
            isha          TEXT NOT NULL,
            source        TEXT NOT NULL DEFAULT 'api'
                          CHECK(source IN ('api','offline')),
            fetched_at    TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS session (
            id          INTEGER PRIMARY KEY CHECK(id = 1),
            token       TEXT NOT NULL,
            user_json   TEXT NOT NULL,
            remember    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory db");
    run_migrations(&conn).expect("migrations");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('calendar_days', 'session', 'app_meta')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}

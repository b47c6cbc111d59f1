use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 3;

/// Columns added after the first schema: (table, column, DDL).
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("seats", "has_ac", "INTEGER NOT NULL DEFAULT 0"),
    ("seats", "view_quality", "INTEGER NOT NULL DEFAULT 5"),
    ("seats", "famous_note", "TEXT"),
    ("bookings", "price", "REAL"),
];

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS seats (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            layer        INTEGER NOT NULL,
            side         TEXT,
            position     INTEGER NOT NULL,
            price        REAL NOT NULL,
            is_available INTEGER NOT NULL DEFAULT 1,
            seat_type    TEXT NOT NULL DEFAULT 'regular',
            has_ac       INTEGER NOT NULL DEFAULT 0,
            view_quality INTEGER NOT NULL DEFAULT 5,
            famous_note  TEXT,
            UNIQUE(layer, side, position)
        );

        CREATE TABLE IF NOT EXISTS bookings (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            seat_id        INTEGER NOT NULL REFERENCES seats(id),
            user_name      TEXT NOT NULL,
            user_email     TEXT NOT NULL,
            price          REAL,
            booking_date   TEXT NOT NULL DEFAULT (datetime('now')),
            payment_status TEXT NOT NULL DEFAULT 'pending'
        );

        CREATE INDEX IF NOT EXISTS idx_bookings_seat ON bookings(seat_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_name ON bookings(user_name);
        ",
    )?;

    // Older catalogs predate these columns
    for (table, column, ddl) in ADDED_COLUMNS {
        if !has_column(conn, table, column) {
            conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {ddl};"))?;
            tracing::info!("added {table}.{column}");
        }
    }

    // Some v1 catalogs carry the historical note under its older name
    if has_column(conn, "seats", "famous_occupant") {
        let copied = conn.execute(
            "UPDATE seats SET famous_note = famous_occupant
             WHERE famous_note IS NULL AND famous_occupant IS NOT NULL",
            [],
        )?;
        if copied > 0 {
            tracing::info!("copied {copied} famous_occupant notes into famous_note");
        }
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> bool {
    conn.prepare(&format!("SELECT {column} FROM {table} LIMIT 0"))
        .is_ok()
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .optional()?;
    Ok(version)
}

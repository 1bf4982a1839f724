use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    // Several processes may share one database file; writers wait instead
    // of failing immediately. Set before anything that takes a lock.
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS aggregates (
            user_id              TEXT PRIMARY KEY,
            version              INTEGER NOT NULL,
            dream_count          INTEGER NOT NULL,
            upper_dynamic_count  INTEGER NOT NULL DEFAULT 0,
            upper_dynamic_last   INTEGER NOT NULL DEFAULT 0,
            upper_static_count   INTEGER NOT NULL DEFAULT 0,
            upper_static_last    INTEGER NOT NULL DEFAULT 0,
            downer_dynamic_count INTEGER NOT NULL DEFAULT 0,
            downer_dynamic_last  INTEGER NOT NULL DEFAULT 0,
            downer_static_count  INTEGER NOT NULL DEFAULT 0,
            downer_static_last   INTEGER NOT NULL DEFAULT 0,
            valence_sum          REAL NOT NULL,
            energy_sum           REAL NOT NULL,
            confidence_sum       REAL NOT NULL,
            complexity           INTEGER NOT NULL,
            palette_bias         REAL NOT NULL,
            symmetry_factor      REAL NOT NULL,
            dominant_quadrant    TEXT NOT NULL,
            updated_at           TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS dreams (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES aggregates(user_id),
            sequence    INTEGER NOT NULL,
            text        TEXT NOT NULL,
            valence     REAL NOT NULL,
            energy      REAL NOT NULL,
            quadrant    TEXT NOT NULL,
            confidence  REAL NOT NULL,
            keywords    TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (user_id, sequence)
        );

        CREATE INDEX IF NOT EXISTS idx_dreams_user_seq ON dreams(user_id, sequence);
        ",
    )?;

    match get_schema_version(conn)? {
        Some(found) if found > SCHEMA_VERSION => {
            return Err(StoreError::InvalidData(format!(
                "database schema v{found} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        Some(found) if found == SCHEMA_VERSION => {}
        _ => {
            conn.execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
                [SCHEMA_VERSION.to_string()],
            )?;
        }
    }

    Ok(())
}

/// Stored schema version, `None` before the first [`initialize`].
pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|v| {
        v.parse::<i64>()
            .map_err(|_| StoreError::InvalidData(format!("schema_version '{v}' is not a number")))
    })
    .transpose()
}

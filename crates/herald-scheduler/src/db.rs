use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `messages` table (idempotent) and the indexes backing the
/// two hot filters: the per-chat name lookup used by the replacement
/// protocol and the `completed = 0` scan used by recovery and `/list`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id                  TEXT    NOT NULL PRIMARY KEY,
            destination         INTEGER NOT NULL,   -- Telegram chat ID
            schedule_name       TEXT    NOT NULL,
            body                TEXT    NOT NULL,
            media_type          TEXT,               -- 'photo' | 'video' | NULL
            media_ref           TEXT,               -- platform file ID
            media_access_token  TEXT,
            buttons             TEXT    NOT NULL DEFAULT '[]',  -- JSON [{text,url}]
            interval_seconds    INTEGER,            -- NULL for one-shot schedules
            fire_at             TEXT,               -- RFC3339 or NULL
            completed           INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_messages_dest_name
            ON messages (destination, schedule_name);
        CREATE INDEX IF NOT EXISTS idx_messages_completed
            ON messages (completed);
        ",
    )?;
    Ok(())
}

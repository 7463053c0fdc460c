use std::str::FromStr;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use herald_core::outbound::{Button, MediaKind, MediaRef};

use crate::db::init_db;
use crate::error::Result;
use crate::types::{MessageDraft, ScheduledMessage, Trigger};

/// Thread-safe store for schedule rows.
///
/// Wraps a single SQLite connection in a `Mutex`; every operation is a
/// single statement, so each call is atomic on its own. The engine makes
/// no cross-call transactional assumption — in particular the
/// replacement protocol sequences a delete and an insert as two calls.
pub struct MessageStore {
    db: Mutex<Connection>,
}

const COLUMNS: &str = "id, destination, schedule_name, body, media_type, media_ref, \
     media_access_token, buttons, interval_seconds, fire_at, completed, created_at";

impl MessageStore {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Insert a new schedule row. Assigns and returns the row ID.
    pub fn insert(&self, draft: &MessageDraft) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let (interval_seconds, fire_at) = match &draft.trigger {
            Trigger::Every { seconds } => (Some(*seconds as i64), None),
            Trigger::At { when } => (None, Some(when.to_rfc3339())),
        };
        let (media_type, media_ref, media_access_token) = match &draft.media {
            Some(m) => (
                Some(m.kind.to_string()),
                Some(m.file_ref.clone()),
                m.access_token.clone(),
            ),
            None => (None, None, None),
        };
        let buttons_json = serde_json::to_string(&draft.buttons)
            .map_err(|e| crate::error::SchedulerError::InvalidTrigger(e.to_string()))?;

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO messages
             (id, destination, schedule_name, body, media_type, media_ref,
              media_access_token, buttons, interval_seconds, fire_at, completed, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,0,?11)",
            rusqlite::params![
                id,
                draft.destination,
                draft.schedule_name,
                draft.body,
                media_type,
                media_ref,
                media_access_token,
                buttons_json,
                interval_seconds,
                fire_at,
                now,
            ],
        )?;
        Ok(id)
    }

    /// Fetch a row by ID, `None` when absent.
    pub fn get(&self, id: &str) -> Result<Option<ScheduledMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt =
            db.prepare_cached(&format!("SELECT {COLUMNS} FROM messages WHERE id = ?1"))?;
        match stmt.query_row([id], row_to_message) {
            Ok(m) => Ok(Some(m)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up the row (sent or unsent) holding a (destination, name) pair.
    pub fn find_by_name(&self, destination: i64, name: &str) -> Result<Option<ScheduledMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM messages
             WHERE destination = ?1 AND schedule_name = ?2"
        ))?;
        match stmt.query_row(rusqlite::params![destination, name], row_to_message) {
            Ok(m) => Ok(Some(m)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Unsent schedules for one destination, in creation order.
    pub fn list_pending(&self, destination: i64) -> Result<Vec<ScheduledMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM messages
             WHERE destination = ?1 AND completed = 0
             ORDER BY created_at"
        ))?;
        let rows = stmt.query_map([destination], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Every unsent schedule — the recovery scan.
    pub fn all_pending(&self) -> Result<Vec<ScheduledMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM messages WHERE completed = 0 ORDER BY created_at"
        ))?;
        let rows = stmt.query_map([], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Flip `completed` on. No-op (Ok) when the row is already gone.
    pub fn mark_completed(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("UPDATE messages SET completed = 1 WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Delete by ID regardless of state. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let n = db.execute("DELETE FROM messages WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    /// Delete only if the row is unsent and belongs to `destination`.
    ///
    /// Returns `false` when nothing matched — unknown ID, wrong chat, or
    /// already completed.
    pub fn delete_pending(&self, id: &str, destination: i64) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "DELETE FROM messages WHERE id = ?1 AND destination = ?2 AND completed = 0",
            rusqlite::params![id, destination],
        )?;
        Ok(n > 0)
    }
}

/// Map a SQLite row to a `ScheduledMessage`.
///
/// Corrupt button JSON degrades to an empty list rather than failing the
/// row; the trigger columns are deliberately left unvalidated here (see
/// `ScheduledMessage::trigger`).
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledMessage> {
    let media_type: Option<String> = row.get(4)?;
    let media_ref: Option<String> = row.get(5)?;
    let media_access_token: Option<String> = row.get(6)?;
    let media = match (media_type, media_ref) {
        (Some(kind), Some(file_ref)) => MediaKind::from_str(&kind).ok().map(|kind| MediaRef {
            kind,
            file_ref,
            access_token: media_access_token,
        }),
        _ => None,
    };

    let buttons_json: String = row.get(7)?;
    let buttons: Vec<Button> = serde_json::from_str(&buttons_json).unwrap_or_default();

    Ok(ScheduledMessage {
        id: row.get(0)?,
        destination: row.get(1)?,
        schedule_name: row.get(2)?,
        body: row.get(3)?,
        media,
        buttons,
        interval_seconds: row.get(8)?,
        fire_at: row.get(9)?,
        completed: row.get::<_, i64>(10)? != 0,
        created_at: row.get(11)?,
    })
}

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use herald_core::outbound::{Button, MediaRef, Outbound};

/// Defines when a schedule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Repeat every fixed number of seconds.
    Every { seconds: u64 },

    /// Send once at the given UTC instant.
    At { when: DateTime<Utc> },
}

/// Validation failure when parsing operator input into a [`Trigger`].
///
/// The `Display` strings double as the inline replies sent back to the
/// operator, so they are phrased as instructions rather than diagnostics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerParseError {
    #[error("Interval must be a positive number of seconds!")]
    NonPositive,

    #[error("Cannot schedule messages in the past!")]
    Past,

    #[error("Invalid input! Enter a number of seconds (e.g. '300') or a time (YYYY-MM-DD HH:MM:SS).")]
    Unrecognized,
}

impl Trigger {
    /// Parse operator input: a positive integer of seconds (repeating),
    /// or an absolute `YYYY-MM-DD HH:MM:SS` timestamp (UTC, one-shot)
    /// strictly in the future.
    pub fn parse(input: &str, now: DateTime<Utc>) -> std::result::Result<Self, TriggerParseError> {
        let input = input.trim();

        if let Ok(seconds) = input.parse::<i64>() {
            if seconds <= 0 {
                return Err(TriggerParseError::NonPositive);
            }
            return Ok(Trigger::Every {
                seconds: seconds as u64,
            });
        }

        match NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
            Ok(naive) => {
                let when = naive.and_utc();
                if when <= now {
                    return Err(TriggerParseError::Past);
                }
                Ok(Trigger::At { when })
            }
            Err(_) => Err(TriggerParseError::Unrecognized),
        }
    }
}

/// Why the trigger columns of a stored row could not be validated.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("interval_seconds must be positive (got {0})")]
    NonPositiveInterval(i64),

    #[error("unparseable fire_at timestamp: {0}")]
    BadTimestamp(String),

    #[error("no interval or time set")]
    Missing,
}

/// A new schedule as collected from the operator, before the store has
/// assigned it an identity.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub destination: i64,
    pub schedule_name: String,
    pub body: String,
    pub media: Option<MediaRef>,
    pub buttons: Vec<Button>,
    pub trigger: Trigger,
}

/// A persisted schedule row.
///
/// The trigger columns are kept as stored (`interval_seconds` /
/// `fire_at`) rather than pre-parsed: recovery must be able to see and
/// skip rows whose trigger data is corrupt, so validation happens in
/// [`ScheduledMessage::trigger`], not in the row mapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMessage {
    /// UUID v4 string assigned by the store on insert.
    pub id: String,
    /// Target chat ID.
    pub destination: i64,
    /// Operator-chosen label; unique per destination among live rows.
    pub schedule_name: String,
    /// Message text.
    pub body: String,
    pub media: Option<MediaRef>,
    pub buttons: Vec<Button>,
    /// Repeat cadence in seconds; `None` for one-shot schedules.
    pub interval_seconds: Option<i64>,
    /// RFC3339 send time; `None` for repeating schedules.
    pub fire_at: Option<String>,
    /// `true` once a one-shot schedule has been delivered (or discarded
    /// as past-due during recovery). Repeating schedules stay `false`.
    pub completed: bool,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl ScheduledMessage {
    /// Validate the stored trigger columns into a typed [`Trigger`].
    ///
    /// `interval_seconds` wins when both columns are set, matching the
    /// order the recovery procedure checks them in.
    pub fn trigger(&self) -> std::result::Result<Trigger, TriggerError> {
        if let Some(seconds) = self.interval_seconds {
            if seconds <= 0 {
                return Err(TriggerError::NonPositiveInterval(seconds));
            }
            return Ok(Trigger::Every {
                seconds: seconds as u64,
            });
        }

        if let Some(ref raw) = self.fire_at {
            let when = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| TriggerError::BadTimestamp(raw.clone()))?
                .with_timezone(&Utc);
            return Ok(Trigger::At { when });
        }

        Err(TriggerError::Missing)
    }

    /// Whether this schedule repeats (delivery never completes it).
    pub fn is_recurring(&self) -> bool {
        self.interval_seconds.is_some()
    }

    /// Render into the transport-facing message shape.
    pub fn to_outbound(&self) -> Outbound {
        Outbound {
            destination: self.destination,
            body: self.body.clone(),
            media: self.media.clone(),
            buttons: self.buttons.clone(),
        }
    }
}

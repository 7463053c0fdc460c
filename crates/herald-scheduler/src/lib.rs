//! `herald-scheduler` — the scheduling and delivery engine.
//!
//! # Overview
//!
//! Schedules are persisted to a SQLite `messages` table ([`store::MessageStore`])
//! and mirrored into an in-memory [`triggers::TriggerSet`]. The
//! [`engine::Engine`] rebuilds the trigger set from durable rows on startup
//! (recovery), runs a periodic tick loop, and hands every due schedule to
//! [`delivery::deliver`], which re-reads the row, renders it and sends it
//! through the [`transport::ChatTransport`] the engine was built with.
//!
//! # Trigger variants
//!
//! | Variant | Behaviour                                                     |
//! |---------|---------------------------------------------------------------|
//! | `Every` | Repeat every N seconds until the schedule is deleted          |
//! | `At`    | Single send; the live timer fires at the timestamp's clock time daily and is cancelled after the first delivery |
//!
//! A new schedule reusing an existing (destination, name) pair replaces the
//! old one unconditionally — row deleted, trigger cancelled.

pub mod db;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod store;
pub mod transport;
pub mod triggers;
pub mod types;

pub use engine::{CreateOutcome, Engine, EngineConfig, RecoveryReport};
pub use error::{Result, SchedulerError};
pub use store::MessageStore;
pub use transport::{ChatTransport, TransportError};
pub use triggers::TriggerSet;
pub use types::{MessageDraft, ScheduledMessage, Trigger};

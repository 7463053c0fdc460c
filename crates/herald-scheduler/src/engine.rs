use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::delivery;
use crate::error::{Result, SchedulerError};
use crate::store::MessageStore;
use crate::transport::ChatTransport;
use crate::triggers::TriggerSet;
use crate::types::{MessageDraft, ScheduledMessage, Trigger};

/// Timing knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Period of the trigger-evaluation loop.
    pub tick_interval: Duration,
    /// Attempts against the store during the startup scan.
    pub store_retries: u32,
    /// Fixed delay between startup scan attempts.
    pub store_retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            store_retries: 3,
            store_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Result of [`Engine::create`].
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// ID assigned to the new schedule.
    pub id: String,
    /// ID of the same-named schedule that was deleted, if any.
    pub replaced: Option<String>,
}

/// Counters from the startup recovery scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// The scheduling engine: owns the trigger set, mediates every mutation
/// of the schedule table, and drives deliveries from its tick loop.
pub struct Engine<T: ChatTransport> {
    pub(crate) store: Arc<MessageStore>,
    pub(crate) triggers: Mutex<TriggerSet>,
    pub(crate) transport: Arc<T>,
    config: EngineConfig,
}

impl<T: ChatTransport + 'static> Engine<T> {
    pub fn new(store: Arc<MessageStore>, transport: Arc<T>, config: EngineConfig) -> Self {
        Self {
            store,
            triggers: Mutex::new(TriggerSet::new()),
            transport,
            config,
        }
    }

    /// Read access to the schedule table (used by `/list`).
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Whether a live timer exists for `job_id`.
    pub fn has_trigger(&self, job_id: &str) -> bool {
        self.triggers.lock().unwrap().contains(job_id)
    }

    /// Create a schedule, replacing any existing one with the same
    /// (destination, name) pair — sent or unsent, unconditionally.
    ///
    /// The replacement is sequenced delete-then-insert on a per-call
    /// atomic store; a crash between the two calls can lose the old row
    /// without creating the new one (narrow, accepted window).
    pub fn create(&self, draft: MessageDraft) -> Result<CreateOutcome> {
        let replaced = match self
            .store
            .find_by_name(draft.destination, &draft.schedule_name)?
        {
            Some(old) => {
                self.store.delete(&old.id)?;
                if !old.completed {
                    self.triggers.lock().unwrap().cancel(&old.id);
                }
                info!(
                    old_id = %old.id,
                    was_completed = old.completed,
                    name = %draft.schedule_name,
                    destination = draft.destination,
                    "replaced same-named schedule"
                );
                Some(old.id)
            }
            None => None,
        };

        let id = self.store.insert(&draft)?;
        let now = Utc::now();
        match &draft.trigger {
            Trigger::Every { seconds } => {
                self.triggers
                    .lock()
                    .unwrap()
                    .install(&id, draft.trigger.clone(), now);
                info!(job_id = %id, every_secs = seconds, "repeating schedule created");
            }
            Trigger::At { when } if *when > now => {
                self.triggers
                    .lock()
                    .unwrap()
                    .install(&id, draft.trigger.clone(), now);
                info!(job_id = %id, fire_at = %when, "one-time schedule created");
            }
            Trigger::At { when } => {
                // Past timestamps get no trigger but keep the row as-is;
                // only the recovery path marks past-due rows completed.
                warn!(job_id = %id, fire_at = %when, "schedule time already passed; no trigger installed");
            }
        }

        Ok(CreateOutcome { id, replaced })
    }

    /// Delete an unsent schedule and disarm its timer.
    ///
    /// `NotFound` when no unsent row with that ID exists in `destination`
    /// — unknown, already sent, or another chat's schedule.
    pub fn cancel(&self, id: &str, destination: i64) -> Result<()> {
        if !self.store.delete_pending(id, destination)? {
            return Err(SchedulerError::NotFound { id: id.to_string() });
        }
        self.triggers.lock().unwrap().cancel(id);
        info!(job_id = %id, destination, "schedule deleted");
        Ok(())
    }

    /// Rebuild the trigger set from durable rows.
    ///
    /// Per-row problems (missing fields, unreachable destination, bad
    /// trigger data) skip that row with a warning; the scan itself is
    /// retried a bounded number of times, and exhausting the retries is
    /// a fatal startup error.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let pending = self.scan_with_retries().await?;
        let now = Utc::now();

        let mut report = RecoveryReport::default();
        for msg in pending {
            match self.restore(&msg, now).await {
                Ok(true) => report.loaded += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    error!(job_id = %msg.id, error = %e, "error restoring schedule");
                    report.skipped += 1;
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            "schedule recovery complete"
        );
        Ok(report)
    }

    async fn scan_with_retries(&self) -> Result<Vec<ScheduledMessage>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.all_pending() {
                Ok(rows) => return Ok(rows),
                Err(e) if attempt < self.config.store_retries => {
                    error!(
                        attempt,
                        retries = self.config.store_retries,
                        error = %e,
                        "pending-schedule scan failed; retrying"
                    );
                    tokio::time::sleep(self.config.store_retry_delay).await;
                }
                Err(e) => {
                    return Err(SchedulerError::StoreUnavailable {
                        attempts: attempt,
                        last: e.to_string(),
                    })
                }
            }
        }
    }

    /// Validate one recovered row and arm its timer.
    ///
    /// Returns `Ok(true)` when a trigger was installed, `Ok(false)` when
    /// the row was skipped.
    async fn restore(&self, msg: &ScheduledMessage, now: chrono::DateTime<Utc>) -> Result<bool> {
        if msg.destination == 0 || msg.schedule_name.is_empty() || msg.body.is_empty() {
            warn!(job_id = %msg.id, "skipping schedule with missing required fields");
            return Ok(false);
        }

        if !self.transport.resolve(msg.destination).await {
            warn!(
                job_id = %msg.id,
                destination = msg.destination,
                "skipping schedule for unreachable destination"
            );
            return Ok(false);
        }

        match msg.trigger() {
            Ok(trigger @ Trigger::Every { .. }) => {
                self.triggers.lock().unwrap().install(&msg.id, trigger, now);
                info!(job_id = %msg.id, name = %msg.schedule_name, "restored repeating schedule");
                Ok(true)
            }
            Ok(trigger @ Trigger::At { when }) => {
                if when <= now {
                    // Missed while offline — swallow by marking sent so a
                    // restart never floods the chat with stale messages.
                    self.store.mark_completed(&msg.id)?;
                    info!(
                        job_id = %msg.id,
                        name = %msg.schedule_name,
                        "schedule time passed while offline; marked completed"
                    );
                    Ok(false)
                } else {
                    self.triggers.lock().unwrap().install(&msg.id, trigger, now);
                    info!(job_id = %msg.id, name = %msg.schedule_name, "restored one-time schedule");
                    Ok(true)
                }
            }
            Err(e) => {
                warn!(job_id = %msg.id, error = %e, "skipping schedule with invalid trigger");
                Ok(false)
            }
        }
    }

    /// Advance the trigger set to `now` and return the due IDs.
    ///
    /// Exposed separately from [`Engine::run`] so tests can drive the
    /// engine with a synthetic clock.
    pub fn tick_once(&self, now: chrono::DateTime<Utc>) -> Vec<String> {
        self.triggers.lock().unwrap().tick(now)
    }

    /// Tick loop. Runs until `shutdown` broadcasts `true`.
    ///
    /// Deliveries are spawned so a slow transport call never stalls the
    /// tick; there is no ordering guarantee between distinct schedules.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            period_ms = self.config.tick_interval.as_millis() as u64,
            "scheduler engine started"
        );

        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for job_id in self.tick_once(Utc::now()) {
                        let engine = Arc::clone(&self);
                        tokio::spawn(async move {
                            delivery::deliver(engine.as_ref(), &job_id).await;
                        });
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }
}

//! Delivery of one due schedule.

use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::transport::ChatTransport;

/// Deliver the schedule `job_id` fired for.
///
/// The row is re-read first: a schedule cancelled or replaced between
/// the trigger firing and this call is silently dropped, which also
/// makes a duplicate invocation for an already-completed ID a no-op.
///
/// Transport failures abort the attempt without any send retry —
/// repeating schedules self-heal on their next firing; a failed
/// one-shot stays pending until an operator deletes it.
pub async fn deliver<T: ChatTransport>(engine: &Engine<T>, job_id: &str) {
    let msg = match engine.store.get(job_id) {
        Ok(Some(m)) => m,
        Ok(None) => {
            debug!(job_id, "schedule gone before delivery; nothing to send");
            return;
        }
        Err(e) => {
            error!(job_id, error = %e, "could not read schedule for delivery");
            return;
        }
    };
    if msg.completed {
        debug!(job_id, "schedule already completed; nothing to send");
        return;
    }

    if let Err(e) = engine.transport.send(&msg.to_outbound()).await {
        warn!(
            job_id,
            destination = msg.destination,
            name = %msg.schedule_name,
            error = %e,
            "delivery failed"
        );
        return;
    }
    info!(
        job_id,
        destination = msg.destination,
        name = %msg.schedule_name,
        media = msg.media.is_some(),
        "message delivered"
    );

    if !msg.is_recurring() {
        // Completed is flipped before the timer is disarmed: if the
        // cancel step is ever missed, tomorrow's clock-time re-fire
        // hits the re-read guard above and sends nothing.
        if let Err(e) = engine.store.mark_completed(job_id) {
            error!(job_id, error = %e, "failed to mark one-shot schedule completed");
        }
        engine.triggers.lock().unwrap().cancel(job_id);
    }
}

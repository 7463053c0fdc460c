//! In-memory trigger table — maps schedule IDs to live timers.
//!
//! No background timer tasks: the set is a pure data structure advanced
//! by [`TriggerSet::tick`] with an explicit `now`, so the engine can be
//! driven by a synthetic clock in tests. The engine's run loop calls
//! `tick(Utc::now())` once per period.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::types::Trigger;

/// One armed timer.
#[derive(Debug, Clone)]
struct Armed {
    trigger: Trigger,
    next_fire: DateTime<Utc>,
}

/// The set of live timers, keyed by schedule ID.
#[derive(Debug, Default)]
pub struct TriggerSet {
    armed: HashMap<String, Armed>,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for `job_id`, replacing any existing one.
    ///
    /// `Every` timers first fire one full period after install. `At`
    /// timers fire at the timestamp's wall-clock time-of-day, evaluated
    /// daily — a one-shot schedule therefore must be cancelled after its
    /// first delivery or the timer fires again the next day.
    pub fn install(&mut self, job_id: &str, trigger: Trigger, now: DateTime<Utc>) {
        let next_fire = match &trigger {
            Trigger::Every { seconds } => now + Duration::seconds(*seconds as i64),
            Trigger::At { when } => next_clock_time(*when, now),
        };
        self.armed
            .insert(job_id.to_string(), Armed { trigger, next_fire });
    }

    /// Disarm the timer for `job_id`. No-op when absent.
    pub fn cancel(&mut self, job_id: &str) -> bool {
        self.armed.remove(job_id).is_some()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.armed.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    /// Return the IDs whose timer fired since the previous tick, in no
    /// particular order, and rearm them past `now`.
    ///
    /// At-least-once per firing: a timer that is several periods overdue
    /// yields its ID once per tick observation, then skips ahead — the
    /// tick period bounds delivery latency, not delivery frequency.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut due = Vec::new();
        for (id, armed) in self.armed.iter_mut() {
            if armed.next_fire > now {
                continue;
            }
            due.push(id.clone());

            let period = match &armed.trigger {
                Trigger::Every { seconds } => Duration::seconds(*seconds as i64),
                Trigger::At { .. } => Duration::days(1),
            };
            while armed.next_fire <= now {
                armed.next_fire += period;
            }
        }
        due
    }
}

/// Next occurrence of `when`'s time-of-day strictly after `now`.
fn next_clock_time(when: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = now.date_naive().and_time(when.time()).and_utc();
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    #[test]
    fn interval_fires_after_one_period() {
        let mut set = TriggerSet::new();
        let t0 = at("2026-01-10 12:00:00");
        set.install("a", Trigger::Every { seconds: 60 }, t0);

        assert!(set.tick(t0 + Duration::seconds(59)).is_empty());
        assert_eq!(set.tick(t0 + Duration::seconds(60)), vec!["a".to_string()]);
    }

    #[test]
    fn interval_rearms_on_cadence() {
        let mut set = TriggerSet::new();
        let t0 = at("2026-01-10 12:00:00");
        set.install("a", Trigger::Every { seconds: 5 }, t0);

        assert_eq!(set.tick(t0 + Duration::seconds(5)).len(), 1);
        assert!(set.tick(t0 + Duration::seconds(6)).is_empty());
        assert_eq!(set.tick(t0 + Duration::seconds(10)).len(), 1);
    }

    #[test]
    fn overdue_interval_fires_once_per_tick() {
        let mut set = TriggerSet::new();
        let t0 = at("2026-01-10 12:00:00");
        set.install("a", Trigger::Every { seconds: 5 }, t0);

        // 100 seconds late — one firing observed, timer skips ahead.
        let late = t0 + Duration::seconds(100);
        assert_eq!(set.tick(late).len(), 1);
        assert!(set.tick(late + Duration::seconds(1)).is_empty());
        assert_eq!(set.tick(late + Duration::seconds(5)).len(), 1);
    }

    #[test]
    fn one_shot_fires_at_clock_time_today() {
        let mut set = TriggerSet::new();
        let now = at("2026-01-10 12:00:00");
        set.install(
            "a",
            Trigger::At {
                when: at("2026-01-10 14:30:00"),
            },
            now,
        );

        assert!(set.tick(at("2026-01-10 14:29:59")).is_empty());
        assert_eq!(set.tick(at("2026-01-10 14:30:00")).len(), 1);
    }

    #[test]
    fn one_shot_clock_time_already_passed_today_arms_for_tomorrow() {
        let mut set = TriggerSet::new();
        // Timestamp is days away but its clock time (09:00) already passed
        // today — the daily timer arms for tomorrow 09:00.
        let now = at("2026-01-10 12:00:00");
        set.install(
            "a",
            Trigger::At {
                when: at("2026-01-15 09:00:00"),
            },
            now,
        );

        assert!(set.tick(at("2026-01-10 23:59:59")).is_empty());
        assert_eq!(set.tick(at("2026-01-11 09:00:00")).len(), 1);
    }

    #[test]
    fn one_shot_refires_daily_until_cancelled() {
        let mut set = TriggerSet::new();
        let now = at("2026-01-10 12:00:00");
        set.install(
            "a",
            Trigger::At {
                when: at("2026-01-10 14:00:00"),
            },
            now,
        );

        assert_eq!(set.tick(at("2026-01-10 14:00:01")).len(), 1);
        // Not cancelled — fires again at the same clock time tomorrow.
        assert_eq!(set.tick(at("2026-01-11 14:00:01")).len(), 1);
    }

    #[test]
    fn cancel_disarms() {
        let mut set = TriggerSet::new();
        let t0 = at("2026-01-10 12:00:00");
        set.install("a", Trigger::Every { seconds: 1 }, t0);

        assert!(set.cancel("a"));
        assert!(!set.contains("a"));
        assert!(set.tick(t0 + Duration::seconds(10)).is_empty());
        // Second cancel is a no-op.
        assert!(!set.cancel("a"));
    }

    #[test]
    fn install_replaces_existing_timer() {
        let mut set = TriggerSet::new();
        let t0 = at("2026-01-10 12:00:00");
        set.install("a", Trigger::Every { seconds: 5 }, t0);
        set.install("a", Trigger::Every { seconds: 3600 }, t0);

        assert_eq!(set.len(), 1);
        assert!(set.tick(t0 + Duration::seconds(10)).is_empty());
    }

    #[test]
    fn distinct_jobs_fire_independently() {
        let mut set = TriggerSet::new();
        let t0 = at("2026-01-10 12:00:00");
        set.install("a", Trigger::Every { seconds: 5 }, t0);
        set.install("b", Trigger::Every { seconds: 60 }, t0);

        let mut due = set.tick(t0 + Duration::seconds(5));
        due.sort();
        assert_eq!(due, vec!["a".to_string()]);

        let mut due = set.tick(t0 + Duration::seconds(60));
        due.sort();
        assert_eq!(due, vec!["a".to_string(), "b".to_string()]);
    }
}

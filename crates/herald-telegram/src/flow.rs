//! Per-operator conversation state for `/schedule`.
//!
//! Each operator gets one explicit state value in a concurrent map,
//! advanced step by step by the handler. Entries expire after a TTL and
//! can be dropped early with `/cancel`; a flow only accepts messages
//! from the chat it was started in.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use herald_core::outbound::{Button, MediaRef};

/// Which prompt the operator answers next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Name,
    Body,
    Media,
    Buttons,
    Trigger,
}

/// One operator's in-progress schedule definition.
#[derive(Debug, Clone)]
pub struct FlowState {
    /// Chat the flow was started in.
    pub chat_id: i64,
    pub step: FlowStep,
    pub schedule_name: String,
    pub body: String,
    pub media: Option<MediaRef>,
    pub buttons: Vec<Button>,
    started_at: DateTime<Utc>,
}

impl FlowState {
    fn new(chat_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            step: FlowStep::Name,
            schedule_name: String::new(),
            body: String::new(),
            media: None,
            buttons: Vec::new(),
            started_at: now,
        }
    }
}

/// Concurrent map of live flows, keyed by operator user ID.
pub struct FlowMap {
    flows: DashMap<u64, FlowState>,
    ttl: Duration,
}

impl FlowMap {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            flows: DashMap::new(),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Start a fresh flow for `operator`, discarding any previous one.
    pub fn begin(&self, operator: u64, chat_id: i64, now: DateTime<Utc>) {
        self.flows.insert(operator, FlowState::new(chat_id, now));
    }

    /// Drop the operator's flow. Returns whether one existed.
    pub fn cancel(&self, operator: u64) -> bool {
        self.flows.remove(&operator).is_some()
    }

    /// The operator's live flow in `chat_id`, if any.
    ///
    /// Expired entries are removed as if cancelled. A flow started in a
    /// different chat is left alone and `None` is returned.
    pub fn get(&self, operator: u64, chat_id: i64, now: DateTime<Utc>) -> Option<FlowState> {
        let state = self.flows.get(&operator)?.value().clone();
        if now - state.started_at > self.ttl {
            self.flows.remove(&operator);
            return None;
        }
        if state.chat_id != chat_id {
            return None;
        }
        Some(state)
    }

    /// Write back an advanced state.
    pub fn put(&self, operator: u64, state: FlowState) {
        self.flows.insert(operator, state);
    }
}

/// Parse a `label|url` button line. The URL must parse; the label must
/// be non-empty.
pub fn parse_button_line(line: &str) -> Option<Button> {
    let (text, url) = line.split_once('|')?;
    let text = text.trim();
    let url = url.trim();
    if text.is_empty() {
        return None;
    }
    url::Url::parse(url).ok()?;
    Some(Button {
        text: text.to_string(),
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP: u64 = 42;
    const CHAT: i64 = -1001;

    #[test]
    fn begin_then_get() {
        let flows = FlowMap::new(600);
        let now = Utc::now();
        flows.begin(OP, CHAT, now);

        let state = flows.get(OP, CHAT, now).expect("flow missing");
        assert_eq!(state.step, FlowStep::Name);
        assert_eq!(state.chat_id, CHAT);
    }

    #[test]
    fn flow_ignores_other_chats_but_survives() {
        let flows = FlowMap::new(600);
        let now = Utc::now();
        flows.begin(OP, CHAT, now);

        assert!(flows.get(OP, -999, now).is_none());
        assert!(flows.get(OP, CHAT, now).is_some());
    }

    #[test]
    fn expired_flow_is_dropped() {
        let flows = FlowMap::new(600);
        let now = Utc::now();
        flows.begin(OP, CHAT, now);

        let later = now + Duration::seconds(601);
        assert!(flows.get(OP, CHAT, later).is_none());
        // Gone for good, even at the original time.
        assert!(flows.get(OP, CHAT, now).is_none());
    }

    #[test]
    fn cancel_reports_whether_flow_existed() {
        let flows = FlowMap::new(600);
        assert!(!flows.cancel(OP));
        flows.begin(OP, CHAT, Utc::now());
        assert!(flows.cancel(OP));
        assert!(!flows.cancel(OP));
    }

    #[test]
    fn begin_discards_previous_flow() {
        let flows = FlowMap::new(600);
        let now = Utc::now();
        flows.begin(OP, CHAT, now);
        let mut state = flows.get(OP, CHAT, now).unwrap();
        state.step = FlowStep::Trigger;
        flows.put(OP, state);

        flows.begin(OP, CHAT, now);
        assert_eq!(flows.get(OP, CHAT, now).unwrap().step, FlowStep::Name);
    }

    #[test]
    fn put_persists_progress() {
        let flows = FlowMap::new(600);
        let now = Utc::now();
        flows.begin(OP, CHAT, now);

        let mut state = flows.get(OP, CHAT, now).unwrap();
        state.schedule_name = "Daily Reminder".into();
        state.step = FlowStep::Body;
        flows.put(OP, state);

        let state = flows.get(OP, CHAT, now).unwrap();
        assert_eq!(state.schedule_name, "Daily Reminder");
        assert_eq!(state.step, FlowStep::Body);
    }

    #[test]
    fn button_line_parses() {
        let b = parse_button_line("Join|https://example.com").expect("parse failed");
        assert_eq!(b.text, "Join");
        assert_eq!(b.url, "https://example.com");
    }

    #[test]
    fn button_line_trims_parts() {
        let b = parse_button_line("  Tasks  |  https://example.com/tasks ").unwrap();
        assert_eq!(b.text, "Tasks");
        assert_eq!(b.url, "https://example.com/tasks");
    }

    #[test]
    fn button_line_rejects_bad_input() {
        assert!(parse_button_line("no pipe here").is_none());
        assert!(parse_button_line("|https://example.com").is_none());
        assert!(parse_button_line("Join|not a url").is_none());
    }
}

//! Session context
//!
//! Per-session event tracking so callers can say "rate the last response"
//! without holding event ids. Sessions are created on demand and never
//! shared across callers.

use std::collections::HashMap;

/// One caller session: ordered event ids plus the most recent one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub session_id: String,
    pub event_ids: Vec<String>,
    pub last_event_id: Option<String>,
}

impl Session {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            event_ids: Vec::new(),
            last_event_id: None,
        }
    }

    pub fn record_event(&mut self, event_id: &str) {
        self.event_ids.push(event_id.to_string());
        self.last_event_id = Some(event_id.to_string());
    }
}

/// All live sessions, keyed by id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn record_event(&mut self, session_id: &str, event_id: &str) {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id))
            .record_event(event_id);
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn last_event_id(&self, session_id: &str) -> Option<String> {
        self.sessions
            .get(session_id)
            .and_then(|s| s.last_event_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tracks_order_and_last() {
        let mut registry = SessionRegistry::default();
        registry.record_event("s1", "e1");
        registry.record_event("s1", "e2");
        registry.record_event("s2", "e3");

        let s1 = registry.get("s1").unwrap();
        assert_eq!(s1.event_ids, vec!["e1", "e2"]);
        assert_eq!(registry.last_event_id("s1"), Some("e2".to_string()));
        assert_eq!(registry.last_event_id("s2"), Some("e3".to_string()));
    }

    #[test]
    fn test_unknown_session_has_no_last_event() {
        let registry = SessionRegistry::default();
        assert!(registry.last_event_id("missing").is_none());
    }
}

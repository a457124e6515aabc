use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use actix_ws::Session;
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::models::poll::{PollStatus, PollType};

// The `type` tags are contract: poll_created, poll_status_changed and
// vote_submitted are what connected clients key off.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PollCreated {
        poll_id: String,
        title: String,
        poll_type: PollType,
    },
    PollStatusChanged {
        poll_id: String,
        status: PollStatus,
    },
    VoteSubmitted {
        poll_id: String,
        voter_id: String,
        timestamp: DateTime<Utc>,
    },
}

// Process-wide registry of open observer sessions. Sends are best effort:
// a failed send drops the session, nothing is queued or replayed.
pub struct Broadcaster {
    sessions: Mutex<HashMap<u64, Session>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn register(&self, session: Session) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.lock().unwrap().insert(id, session);
        id
    }

    pub fn unregister(&self, id: u64) {
        self.sessions.lock().unwrap().remove(&id);
    }

    pub fn observer_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub async fn publish(&self, event: &Event) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to serialize event: {}", e);
                return;
            }
        };
        // clone sessions out so the lock is not held across sends
        let targets: Vec<(u64, Session)> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(|(id, session)| (*id, session.clone()))
            .collect();
        let mut dead = Vec::new();
        for (id, mut session) in targets {
            if session.text(payload.clone()).await.is_err() {
                dead.push(id);
            }
        }
        if !dead.is_empty() {
            let mut sessions = self.sessions.lock().unwrap();
            for id in dead {
                sessions.remove(&id);
            }
        }
    }

    pub async fn close_all(&self) {
        let targets: Vec<Session> = self.sessions.lock().unwrap().drain().map(|(_, s)| s).collect();
        for session in targets {
            let _ = session.close(None).await;
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_tags() {
        let created = Event::PollCreated {
            poll_id: "p1".into(),
            title: "Approve Budget".into(),
            poll_type: PollType::YesNo,
        };
        let json = serde_json::to_string(&created).unwrap();
        assert!(json.contains(r#""type":"poll_created""#));
        assert!(json.contains(r#""poll_type":"yes_no""#));

        let changed = Event::PollStatusChanged {
            poll_id: "p1".into(),
            status: PollStatus::Closed,
        };
        let json = serde_json::to_string(&changed).unwrap();
        assert!(json.contains(r#""type":"poll_status_changed""#));
        assert!(json.contains(r#""status":"closed""#));

        let submitted = Event::VoteSubmitted {
            poll_id: "p1".into(),
            voter_id: "u1".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&submitted).unwrap();
        assert!(json.contains(r#""type":"vote_submitted""#));
        assert!(json.contains(r#""voter_id":"u1""#));
        // no choice content rides along with a submission event
        assert!(!json.contains("answer"));
        assert!(!json.contains("choices"));
    }
}

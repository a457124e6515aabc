use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::Error;

#[derive(sqlx::Type)]
#[sqlx(type_name = "session_status")]
#[sqlx(rename_all = "snake_case")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Scheduled, SessionStatus::Open) | (SessionStatus::Open, SessionStatus::Closed)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "open" => Ok(SessionStatus::Open),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(Error::Validation(format!("unknown session status: {}", other))),
        }
    }
}

#[derive(sqlx::Type)]
#[sqlx(type_name = "attendance_response")]
#[sqlx(rename_all = "snake_case")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceResponse {
    Present,
    Excused,
    Absent,
}

impl AttendanceResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceResponse::Present => "present",
            AttendanceResponse::Excused => "excused",
            AttendanceResponse::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceResponse {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceResponse::Present),
            "excused" => Ok(AttendanceResponse::Excused),
            "absent" => Ok(AttendanceResponse::Absent),
            other => Err(Error::Validation(format!("unknown attendance response: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceSession {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub meeting_date: NaiveDate,
    pub status: SessionStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub session_id: String,
    pub user_id: String,
    pub response: AttendanceResponse,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_session_status_transitions() {
        assert!(SessionStatus::Scheduled.can_transition_to(SessionStatus::Open));
        assert!(SessionStatus::Open.can_transition_to(SessionStatus::Closed));

        assert!(!SessionStatus::Scheduled.can_transition_to(SessionStatus::Closed));
        assert!(!SessionStatus::Open.can_transition_to(SessionStatus::Scheduled));
        assert!(!SessionStatus::Closed.can_transition_to(SessionStatus::Open));
        assert!(!SessionStatus::Closed.can_transition_to(SessionStatus::Scheduled));
    }

    #[test]
    fn test_response_from_str() {
        assert_eq!(AttendanceResponse::from_str("present").unwrap(), AttendanceResponse::Present);
        assert_eq!(AttendanceResponse::from_str("excused").unwrap(), AttendanceResponse::Excused);
        assert_eq!(AttendanceResponse::from_str("absent").unwrap(), AttendanceResponse::Absent);
        assert!(AttendanceResponse::from_str("late").is_err());
    }
}

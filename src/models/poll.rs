use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::Error;

#[derive(sqlx::Type)]
#[sqlx(type_name = "poll_type")]
#[sqlx(rename_all = "snake_case")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollType {
    YesNo,
    MultipleChoice,
    RankedChoice,
}

impl PollType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollType::YesNo => "yes_no",
            PollType::MultipleChoice => "multiple_choice",
            PollType::RankedChoice => "ranked_choice",
        }
    }
}

impl fmt::Display for PollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes_no" => Ok(PollType::YesNo),
            "multiple_choice" => Ok(PollType::MultipleChoice),
            "ranked_choice" => Ok(PollType::RankedChoice),
            other => Err(Error::Validation(format!("unknown poll type: {}", other))),
        }
    }
}

#[derive(sqlx::Type)]
#[sqlx(type_name = "poll_status")]
#[sqlx(rename_all = "snake_case")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Draft,
    Active,
    Closed,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Draft => "draft",
            PollStatus::Active => "active",
            PollStatus::Closed => "closed",
        }
    }

    // forward-only lifecycle, no reopening
    pub fn can_transition_to(&self, next: PollStatus) -> bool {
        matches!(
            (self, next),
            (PollStatus::Draft, PollStatus::Active) | (PollStatus::Active, PollStatus::Closed)
        )
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PollStatus::Draft),
            "active" => Ok(PollStatus::Active),
            "closed" => Ok(PollStatus::Closed),
            other => Err(Error::Validation(format!("unknown poll status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub poll_type: PollType,
    pub status: PollStatus,
    pub options: Option<Vec<String>>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: String,
    pub requires_quorum: bool,
    pub quorum_threshold: Option<i32>,
    pub allow_real_time_results: bool,
    pub send_notifications: bool,
    pub created_at: DateTime<Utc>,
}

pub fn normalize_options(options: Vec<String>) -> Vec<String> {
    options
        .into_iter()
        .map(|o| o.trim().to_owned())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalize_options_trims_and_drops_blanks() {
        let opts = vec![
            "  Red ".to_owned(),
            "".to_owned(),
            "Blue".to_owned(),
            "   ".to_owned(),
        ];
        assert_eq!(normalize_options(opts), vec!["Red".to_owned(), "Blue".to_owned()]);
    }

    #[test]
    fn test_normalize_options_empty() {
        assert_eq!(normalize_options(vec![]), Vec::<String>::new());
        assert_eq!(normalize_options(vec!["  ".to_owned()]), Vec::<String>::new());
    }

    #[test]
    fn test_poll_status_transitions() {
        assert!(PollStatus::Draft.can_transition_to(PollStatus::Active));
        assert!(PollStatus::Active.can_transition_to(PollStatus::Closed));

        assert!(!PollStatus::Draft.can_transition_to(PollStatus::Closed));
        assert!(!PollStatus::Active.can_transition_to(PollStatus::Draft));
        assert!(!PollStatus::Closed.can_transition_to(PollStatus::Draft));
        assert!(!PollStatus::Closed.can_transition_to(PollStatus::Active));
        assert!(!PollStatus::Active.can_transition_to(PollStatus::Active));
    }

    #[test]
    fn test_poll_type_from_str() {
        assert_eq!(PollType::from_str("yes_no").unwrap(), PollType::YesNo);
        assert_eq!(PollType::from_str("multiple_choice").unwrap(), PollType::MultipleChoice);
        assert_eq!(PollType::from_str("ranked_choice").unwrap(), PollType::RankedChoice);
        assert!(PollType::from_str("approval").is_err());
    }
}

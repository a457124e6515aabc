use std::str::FromStr;

use actix_web::http::StatusCode;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use sqlx::{query, query_as, query_scalar, FromRow, PgPool};
use uuid::Uuid;

use crate::broadcast::{Broadcaster, Event};
use crate::context::UserInfo;
use crate::error::Error;
use crate::handlers::ensure_admin;
use crate::models::ballot::{Answer, Choices};
use crate::models::poll::{normalize_options, Poll, PollStatus, PollType};
use crate::request::Pagination;
use crate::response::{CreateResponse, List};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Creation {
    title: String,
    description: Option<String>,
    #[serde(rename = "type")]
    poll_type: String,
    start_date: String,
    end_date: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    requires_quorum: bool,
    quorum_threshold: Option<i32>,
    #[serde(default = "default_true")]
    allow_real_time_results: bool,
    #[serde(default)]
    send_notifications: bool,
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| Error::Validation(format!("invalid {}: {}", field, value)))
}

pub async fn create(
    user_info: UserInfo,
    Json(body): Json<Creation>,
    db: Data<PgPool>,
    broadcaster: Data<Broadcaster>,
) -> Result<Json<CreateResponse>, Error> {
    let title = body.title.trim().to_owned();
    if title.is_empty() {
        return Err(Error::Validation("title must not be empty".into()));
    }
    let poll_type = PollType::from_str(&body.poll_type)?;
    let start_date = parse_timestamp(&body.start_date, "start date")?;
    let end_date = parse_timestamp(&body.end_date, "end date")?;
    if end_date <= start_date {
        return Err(Error::Validation("end date must be after start date".into()));
    }
    let options = match poll_type {
        PollType::YesNo => None,
        _ => {
            let opts = normalize_options(body.options.unwrap_or_default());
            if opts.len() < 2 {
                return Err(Error::Validation("at least 2 options required".into()));
            }
            Some(opts)
        }
    };
    let id = Uuid::new_v4().to_string();
    let mut tx = db.begin().await?;
    ensure_admin(&mut tx, &user_info.id).await?;
    query(
        "INSERT INTO polls (id, title, description, poll_type, status, options, start_date, end_date, created_by, requires_quorum, quorum_threshold, allow_real_time_results, send_notifications)
        VALUES ($1, $2, $3, $4, 'active', $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(&id)
    .bind(&title)
    .bind(&body.description)
    .bind(poll_type)
    .bind(&options)
    .bind(start_date)
    .bind(end_date)
    .bind(&user_info.id)
    .bind(body.requires_quorum)
    .bind(body.quorum_threshold)
    .bind(body.allow_real_time_results)
    .bind(body.send_notifications)
    .execute(&mut tx)
    .await?;
    tx.commit().await?;
    broadcaster
        .publish(&Event::PollCreated {
            poll_id: id.clone(),
            title,
            poll_type,
        })
        .await;
    Ok(Json(CreateResponse::new(id)))
}

pub async fn list(_user_info: UserInfo, Query(Pagination { page, size }): Query<Pagination>, db: Data<PgPool>) -> Result<Json<List<Poll>>, Error> {
    let mut tx = db.begin().await?;
    let (total,): (i64,) = query_as("SELECT COUNT(*) FROM polls").fetch_one(&mut tx).await?;
    let polls: Vec<Poll> = query_as("SELECT * FROM polls ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(size)
        .bind((page - 1) * size)
        .fetch_all(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(Json(List::new(polls, total)))
}

pub async fn detail(_user_info: UserInfo, poll_id: Path<(String,)>, db: Data<PgPool>) -> Result<Json<Poll>, Error> {
    let poll: Poll = query_as("SELECT * FROM polls WHERE id = $1")
        .bind(&poll_id.into_inner().0)
        .fetch_optional(&mut db.acquire().await?)
        .await?
        .ok_or(Error::NotFound("poll"))?;
    Ok(Json(poll))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    status: String,
}

pub async fn set_status(
    user_info: UserInfo,
    poll_id: Path<(String,)>,
    Json(body): Json<StatusUpdate>,
    db: Data<PgPool>,
    broadcaster: Data<Broadcaster>,
) -> Result<HttpResponse, Error> {
    let poll_id = poll_id.into_inner().0;
    let next = PollStatus::from_str(&body.status)?;
    let mut tx = db.begin().await?;
    ensure_admin(&mut tx, &user_info.id).await?;
    let current: PollStatus = query_scalar("SELECT status FROM polls WHERE id = $1 FOR UPDATE")
        .bind(&poll_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or(Error::NotFound("poll"))?;
    if !current.can_transition_to(next) {
        return Err(Error::Validation(format!("illegal status transition: {} -> {}", current, next)));
    }
    query("UPDATE polls SET status = $1 WHERE id = $2")
        .bind(next)
        .bind(&poll_id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    broadcaster
        .publish(&Event::PollStatusChanged { poll_id, status: next })
        .await;
    Ok(HttpResponse::build(StatusCode::OK).finish())
}

#[derive(Debug, Serialize, FromRow)]
pub struct Participant {
    voter_id: String,
    name: String,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Participation {
    total_votes: i64,
    voters: Vec<Participant>,
}

pub async fn participation(_user_info: UserInfo, poll_id: Path<(String,)>, db: Data<PgPool>) -> Result<Json<Participation>, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let exists: bool = query_scalar("SELECT EXISTS(SELECT id FROM polls WHERE id = $1)")
        .bind(&poll_id)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        return Err(Error::NotFound("poll"));
    }
    let voters: Vec<Participant> = query_as(
        "SELECT b.voter_id, u.first_name || ' ' || u.last_name AS name, b.submitted_at
        FROM ballots AS b
        JOIN users AS u ON b.voter_id = u.id
        WHERE b.poll_id = $1
        ORDER BY b.submitted_at",
    )
    .bind(&poll_id)
    .fetch_all(&mut conn)
    .await?;
    Ok(Json(Participation {
        total_votes: voters.len() as i64,
        voters,
    }))
}

#[derive(Debug, PartialEq, Serialize)]
pub struct OptionCount {
    pub option: String,
    pub count: i64,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tally {
    YesNo { yes: i64, no: i64 },
    MultipleChoice { counts: Vec<OptionCount> },
    // no tabulation method has been agreed for ranked ballots, so no
    // numbers are reported for them
    RankedChoice { computed: bool },
}

pub fn tally_ballots(poll_type: PollType, options: &[String], choices: &[Choices]) -> Tally {
    match poll_type {
        PollType::YesNo => {
            let yes = choices
                .iter()
                .filter(|c| matches!(c, Choices::YesNo { answer: Answer::Yes }))
                .count() as i64;
            let no = choices
                .iter()
                .filter(|c| matches!(c, Choices::YesNo { answer: Answer::No }))
                .count() as i64;
            Tally::YesNo { yes, no }
        }
        PollType::MultipleChoice => {
            let counted = choices
                .iter()
                .filter_map(|c| match c {
                    Choices::MultipleChoice { selected_option } => Some(selected_option.as_str()),
                    _ => None,
                })
                .counts();
            Tally::MultipleChoice {
                counts: options
                    .iter()
                    .map(|o| OptionCount {
                        option: o.clone(),
                        count: *counted.get(o.as_str()).unwrap_or(&0) as i64,
                    })
                    .collect(),
            }
        }
        PollType::RankedChoice => Tally::RankedChoice { computed: false },
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct BallotEntry {
    voter_id: String,
    choices: SqlJson<Choices>,
}

#[derive(Debug, Serialize)]
pub struct Results {
    poll_id: String,
    total_votes: i64,
    tally: Tally,
    ballots: Vec<BallotEntry>,
}

pub async fn results(_user_info: UserInfo, poll_id: Path<(String,)>, db: Data<PgPool>) -> Result<Json<Results>, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let poll: Poll = query_as("SELECT * FROM polls WHERE id = $1")
        .bind(&poll_id)
        .fetch_optional(&mut conn)
        .await?
        .ok_or(Error::NotFound("poll"))?;
    let ballots: Vec<BallotEntry> = query_as("SELECT voter_id, choices FROM ballots WHERE poll_id = $1 ORDER BY submitted_at")
        .bind(&poll_id)
        .fetch_all(&mut conn)
        .await?;
    let choices: Vec<Choices> = ballots.iter().map(|b| b.choices.0.clone()).collect();
    let tally = tally_ballots(poll.poll_type, poll.options.as_deref().unwrap_or(&[]), &choices);
    Ok(Json(Results {
        poll_id,
        total_votes: ballots.len() as i64,
        tally,
        ballots,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2025-06-01T12:00:00Z", "start date").is_ok());
        assert!(parse_timestamp("2025-06-01T12:00:00+02:00", "start date").is_ok());
        assert!(parse_timestamp("2025-06-01", "start date").is_err());
        assert!(parse_timestamp("next tuesday", "start date").is_err());
    }

    #[test]
    fn test_tally_yes_no() {
        let choices = vec![
            Choices::YesNo { answer: Answer::Yes },
            Choices::YesNo { answer: Answer::Yes },
            Choices::YesNo { answer: Answer::Yes },
            Choices::YesNo { answer: Answer::No },
            Choices::YesNo { answer: Answer::No },
        ];
        let tally = tally_ballots(PollType::YesNo, &[], &choices);
        assert_eq!(tally, Tally::YesNo { yes: 3, no: 2 });
    }

    #[test]
    fn test_tally_multiple_choice_zero_fills() {
        let options = vec!["Red".to_owned(), "Blue".to_owned(), "Green".to_owned()];
        let choices = vec![
            Choices::MultipleChoice {
                selected_option: "Red".into(),
            },
            Choices::MultipleChoice {
                selected_option: "Red".into(),
            },
            Choices::MultipleChoice {
                selected_option: "Blue".into(),
            },
        ];
        let tally = tally_ballots(PollType::MultipleChoice, &options, &choices);
        assert_eq!(
            tally,
            Tally::MultipleChoice {
                counts: vec![
                    OptionCount {
                        option: "Red".into(),
                        count: 2
                    },
                    OptionCount {
                        option: "Blue".into(),
                        count: 1
                    },
                    OptionCount {
                        option: "Green".into(),
                        count: 0
                    },
                ]
            }
        );
    }

    #[test]
    fn test_tally_ignores_mismatched_shapes() {
        let options = vec!["Red".to_owned(), "Blue".to_owned()];
        let choices = vec![
            Choices::MultipleChoice {
                selected_option: "Red".into(),
            },
            Choices::YesNo { answer: Answer::Yes },
        ];
        let tally = tally_ballots(PollType::MultipleChoice, &options, &choices);
        assert_eq!(
            tally,
            Tally::MultipleChoice {
                counts: vec![
                    OptionCount {
                        option: "Red".into(),
                        count: 1
                    },
                    OptionCount {
                        option: "Blue".into(),
                        count: 0
                    },
                ]
            }
        );
    }

    #[test]
    fn test_tally_ranked_choice_not_computed() {
        let options = vec!["Red".to_owned(), "Blue".to_owned()];
        let choices = vec![Choices::RankedChoice {
            ranking: vec!["Red".into(), "Blue".into()],
        }];
        let tally = tally_ballots(PollType::RankedChoice, &options, &choices);
        assert_eq!(tally, Tally::RankedChoice { computed: false });
    }
}

use std::str::FromStr;

use actix_web::http::StatusCode;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar, FromRow, PgPool};
use uuid::Uuid;

use crate::context::UserInfo;
use crate::error::Error;
use crate::handlers::ensure_admin;
use crate::models::attendance::{AttendanceRecord, AttendanceResponse, AttendanceSession, SessionStatus};
use crate::request::Pagination;
use crate::response::{CreateResponse, List};

#[derive(Debug, Clone, Deserialize)]
pub struct Creation {
    title: String,
    description: Option<String>,
    meeting_date: String,
}

pub async fn create(user_info: UserInfo, Json(body): Json<Creation>, db: Data<PgPool>) -> Result<Json<CreateResponse>, Error> {
    let title = body.title.trim().to_owned();
    if title.is_empty() {
        return Err(Error::Validation("title must not be empty".into()));
    }
    let meeting_date = NaiveDate::parse_from_str(&body.meeting_date, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("invalid meeting date: {}", body.meeting_date)))?;
    let id = Uuid::new_v4().to_string();
    let mut tx = db.begin().await?;
    ensure_admin(&mut tx, &user_info.id).await?;
    query("INSERT INTO attendance_sessions (id, title, description, meeting_date, status, created_by) VALUES ($1, $2, $3, $4, 'scheduled', $5)")
        .bind(&id)
        .bind(&title)
        .bind(&body.description)
        .bind(meeting_date)
        .bind(&user_info.id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(Json(CreateResponse::new(id)))
}

pub async fn list(
    _user_info: UserInfo,
    Query(Pagination { page, size }): Query<Pagination>,
    db: Data<PgPool>,
) -> Result<Json<List<AttendanceSession>>, Error> {
    let mut tx = db.begin().await?;
    let (total,): (i64,) = query_as("SELECT COUNT(*) FROM attendance_sessions").fetch_one(&mut tx).await?;
    let sessions: Vec<AttendanceSession> = query_as("SELECT * FROM attendance_sessions ORDER BY meeting_date DESC LIMIT $1 OFFSET $2")
        .bind(size)
        .bind((page - 1) * size)
        .fetch_all(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(Json(List::new(sessions, total)))
}

pub async fn detail(_user_info: UserInfo, session_id: Path<(String,)>, db: Data<PgPool>) -> Result<Json<AttendanceSession>, Error> {
    let session: AttendanceSession = query_as("SELECT * FROM attendance_sessions WHERE id = $1")
        .bind(&session_id.into_inner().0)
        .fetch_optional(&mut db.acquire().await?)
        .await?
        .ok_or(Error::NotFound("attendance session"))?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    status: String,
}

// status changes here are not broadcast, clients poll the session list
pub async fn set_status(
    user_info: UserInfo,
    session_id: Path<(String,)>,
    Json(body): Json<StatusUpdate>,
    db: Data<PgPool>,
) -> Result<HttpResponse, Error> {
    let session_id = session_id.into_inner().0;
    let next = SessionStatus::from_str(&body.status)?;
    let mut tx = db.begin().await?;
    ensure_admin(&mut tx, &user_info.id).await?;
    let current: SessionStatus = query_scalar("SELECT status FROM attendance_sessions WHERE id = $1 FOR UPDATE")
        .bind(&session_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or(Error::NotFound("attendance session"))?;
    if !current.can_transition_to(next) {
        return Err(Error::Validation(format!("illegal status transition: {} -> {}", current, next)));
    }
    query("UPDATE attendance_sessions SET status = $1 WHERE id = $2")
        .bind(next)
        .bind(&session_id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(HttpResponse::build(StatusCode::OK).finish())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mark {
    response: Option<String>,
    note: Option<String>,
}

pub async fn mark(
    user_info: UserInfo,
    session_id: Path<(String,)>,
    Json(body): Json<Mark>,
    db: Data<PgPool>,
) -> Result<Json<AttendanceRecord>, Error> {
    let session_id = session_id.into_inner().0;
    let response = match &body.response {
        Some(r) => AttendanceResponse::from_str(r)?,
        None => AttendanceResponse::Present,
    };
    let mut tx = db.begin().await?;
    let status: SessionStatus = query_scalar("SELECT status FROM attendance_sessions WHERE id = $1 FOR SHARE")
        .bind(&session_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or(Error::NotFound("attendance session"))?;
    if status == SessionStatus::Closed {
        return Err(Error::Validation("attendance session is closed".into()));
    }
    // last write wins for (session, voter)
    let record: AttendanceRecord = query_as(
        "INSERT INTO attendance_records (session_id, user_id, response, note, recorded_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (session_id, user_id)
        DO UPDATE SET response = EXCLUDED.response, note = EXCLUDED.note, recorded_at = EXCLUDED.recorded_at
        RETURNING *",
    )
    .bind(&session_id)
    .bind(&user_info.id)
    .bind(response)
    .bind(&body.note)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(Json(record))
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Counts {
    pub present: i64,
    pub excused: i64,
    pub absent: i64,
    pub total: i64,
}

pub fn summarize(responses: &[AttendanceResponse]) -> Counts {
    let mut counts = Counts::default();
    for response in responses {
        match response {
            AttendanceResponse::Present => counts.present += 1,
            AttendanceResponse::Excused => counts.excused += 1,
            AttendanceResponse::Absent => counts.absent += 1,
        }
        counts.total += 1;
    }
    counts
}

#[derive(Debug, Serialize, FromRow)]
pub struct SummaryRecord {
    user_id: String,
    name: String,
    email: Option<String>,
    response: AttendanceResponse,
    note: Option<String>,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    counts: Counts,
    records: Vec<SummaryRecord>,
}

pub async fn summary(_user_info: UserInfo, session_id: Path<(String,)>, db: Data<PgPool>) -> Result<Json<Summary>, Error> {
    let session_id = session_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let exists: bool = query_scalar("SELECT EXISTS(SELECT id FROM attendance_sessions WHERE id = $1)")
        .bind(&session_id)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        return Err(Error::NotFound("attendance session"));
    }
    let records: Vec<SummaryRecord> = query_as(
        "SELECT r.user_id, u.first_name || ' ' || u.last_name AS name, u.email, r.response, r.note, r.recorded_at
        FROM attendance_records AS r
        JOIN users AS u ON r.user_id = u.id
        WHERE r.session_id = $1
        ORDER BY r.recorded_at",
    )
    .bind(&session_id)
    .fetch_all(&mut conn)
    .await?;
    let responses: Vec<AttendanceResponse> = records.iter().map(|r| r.response).collect();
    Ok(Json(Summary {
        counts: summarize(&responses),
        records,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), Counts::default());
    }

    #[test]
    fn test_summarize_single_present() {
        let counts = summarize(&[AttendanceResponse::Present]);
        assert_eq!(
            counts,
            Counts {
                present: 1,
                excused: 0,
                absent: 0,
                total: 1,
            }
        );
    }

    #[test]
    fn test_summarize_mixed() {
        let counts = summarize(&[
            AttendanceResponse::Present,
            AttendanceResponse::Present,
            AttendanceResponse::Excused,
            AttendanceResponse::Absent,
            AttendanceResponse::Present,
        ]);
        assert_eq!(
            counts,
            Counts {
                present: 3,
                excused: 1,
                absent: 1,
                total: 5,
            }
        );
    }
}

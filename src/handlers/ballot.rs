use actix_web::web::{Data, Json, Path};
use chrono::Utc;
use sqlx::types::Json as SqlJson;
use sqlx::{query_as, PgPool};

use crate::broadcast::{Broadcaster, Event};
use crate::context::UserInfo;
use crate::error::Error;
use crate::models::ballot::{Ballot, Choices};
use crate::models::poll::{Poll, PollStatus};

pub async fn cast(
    user_info: UserInfo,
    poll_id: Path<(String,)>,
    Json(choices): Json<Choices>,
    db: Data<PgPool>,
    broadcaster: Data<Broadcaster>,
) -> Result<Json<Ballot>, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut tx = db.begin().await?;
    let poll: Poll = query_as("SELECT * FROM polls WHERE id = $1 FOR SHARE")
        .bind(&poll_id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or(Error::NotFound("poll"))?;
    if poll.status != PollStatus::Active {
        return Err(Error::Validation(format!("poll is {}, not accepting ballots", poll.status)));
    }
    choices.validate(poll.poll_type, poll.options.as_deref().unwrap_or(&[]))?;
    let submitted_at = Utc::now();
    // the unique index on (poll_id, voter_id) decides the race, the loser
    // gets no row back
    let inserted: Option<Ballot> = query_as(
        "INSERT INTO ballots (poll_id, voter_id, choices, submitted_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (poll_id, voter_id) DO NOTHING
        RETURNING *",
    )
    .bind(&poll_id)
    .bind(&user_info.id)
    .bind(SqlJson(&choices))
    .bind(submitted_at)
    .fetch_optional(&mut tx)
    .await?;
    let ballot = inserted.ok_or(Error::DuplicateSubmission("already voted"))?;
    tx.commit().await?;
    broadcaster
        .publish(&Event::VoteSubmitted {
            poll_id,
            voter_id: user_info.id,
            timestamp: submitted_at,
        })
        .await;
    Ok(Json(ballot))
}

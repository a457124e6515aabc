use actix_web::web::{Data, Json, Query};
use serde::Serialize;
use sqlx::{query_as, query_scalar, FromRow, PgPool};

use crate::context::UserInfo;
use crate::error::Error;
use crate::models::user::{Profile, User};
use crate::request::Pagination;
use crate::response::List;

pub async fn me(user_info: UserInfo, db: Data<PgPool>) -> Result<Json<Profile>, Error> {
    let user: User = query_as("SELECT * FROM users WHERE id = $1")
        .bind(&user_info.id)
        .fetch_optional(&mut db.acquire().await?)
        .await?
        .ok_or(Error::NotFound("user"))?;
    Ok(Json(Profile {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        role: user.role,
        chapter: user.chapter,
        avatar: user.avatar,
    }))
}

#[derive(Debug, Serialize, FromRow)]
pub struct Item {
    id: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    chapter: Option<String>,
    role: String,
    is_active: bool,
}

pub async fn list(_user_info: UserInfo, Query(Pagination { page, size }): Query<Pagination>, db: Data<PgPool>) -> Result<Json<List<Item>>, Error> {
    let mut conn = db.acquire().await?;
    let total: i64 = query_scalar("SELECT COUNT(*) FROM users").fetch_one(&mut conn).await?;
    let list: Vec<Item> = query_as(
        "SELECT id, first_name, last_name, email, chapter, role, is_active
        FROM users
        ORDER BY last_name, first_name
        LIMIT $1 OFFSET $2",
    )
    .bind(size)
    .bind((page - 1) * size)
    .fetch_all(&mut conn)
    .await?;
    Ok(Json(List::new(list, total)))
}

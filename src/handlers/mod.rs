pub mod attendance;
pub mod ballot;
pub mod events;
pub mod poll;
pub mod user;

use actix_web::{
    cookie::{time::OffsetDateTime, Cookie, CookieBuilder},
    http::StatusCode,
    HttpResponse, HttpResponseBuilder,
};
use actix_web::web::{Data, Json};
use hex::ToHex;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::{query, query_as, query_scalar, PgConnection, PgPool};
use std::ops::Add;
use uuid::Uuid;

use crate::error::Error;
use crate::middlewares::jwt::{Claim, JWT_SECRET, JWT_TOKEN};
use crate::models::user::User;
use crate::response::CreateResponse;
use crate::tokener::{Tokener, JWT};

fn hash_password(pass: &str, slt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass);
    hasher.update(slt);
    hasher.finalize().encode_hex()
}

fn random_salt() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

pub async fn ensure_admin(conn: &mut PgConnection, user_id: &str) -> Result<(), Error> {
    let is_admin: bool = query_scalar("SELECT EXISTS(SELECT id FROM users WHERE id = $1 AND role = 'admin' AND is_active)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if !is_admin {
        return Err(Error::Authorization("administrator role required".into()));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

pub async fn login(Json(Login { email, password }): Json<Login>, db: Data<PgPool>) -> Result<HttpResponse, Error> {
    let mut tx = db.begin().await?;
    if let Some(user) = query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&mut tx)
        .await?
    {
        if !user.is_active {
            return Err(Error::Authorization("account is deactivated".into()));
        }
        if hash_password(&password, &user.salt) != user.password {
            return Ok(HttpResponse::build(StatusCode::FORBIDDEN).finish());
        }
        query("UPDATE users SET updated_at = NOW() WHERE id = $1")
            .bind(&user.id)
            .execute(&mut tx)
            .await?;
        tx.commit().await?;
        let claim = Claim {
            user: user.id,
            exp: chrono::Utc::now().add(chrono::Duration::days(30)).timestamp(),
        };
        let secret = dotenv::var(JWT_SECRET)?;
        let tokener = JWT::new(secret.as_bytes().to_owned());
        let token = tokener.gen_token(&claim)?;
        return Ok(HttpResponse::build(StatusCode::OK).cookie(Cookie::new(JWT_TOKEN, token)).finish());
    }
    Err(Error::Validation("invalid email or password".into()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    chapter: Option<String>,
}

pub async fn signup(
    Json(Signup {
        email,
        password,
        first_name,
        last_name,
        chapter,
    }): Json<Signup>,
    db: Data<PgPool>,
) -> Result<Json<CreateResponse>, Error> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::Validation("email and password are required".into()));
    }
    let mut tx = db.begin().await?;
    let taken: bool = query_scalar("SELECT EXISTS(SELECT id FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&mut tx)
        .await?;
    if taken {
        return Err(Error::Validation("email already registered".into()));
    }
    let id = Uuid::new_v4().to_string();
    let slt = random_salt();
    query("INSERT INTO users (id, email, first_name, last_name, password, salt, chapter) VALUES ($1, $2, $3, $4, $5, $6, $7)")
        .bind(&id)
        .bind(&email)
        .bind(first_name)
        .bind(last_name)
        .bind(hash_password(&password, &slt))
        .bind(slt)
        .bind(chapter)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(Json(CreateResponse::new(id)))
}

pub async fn logout() -> HttpResponse {
    HttpResponseBuilder::new(StatusCode::OK)
        .cookie(CookieBuilder::new(JWT_TOKEN, "").expires(OffsetDateTime::now_utc()).finish())
        .finish()
}

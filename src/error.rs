use actix_web::http::StatusCode;
use actix_web::ResponseError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    DuplicateSubmission(&'static str),

    #[error("{0}")]
    Authorization(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("jwt error")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("dotenv error")]
    DotEnv(#[from] dotenv::Error),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::DuplicateSubmission(_) => StatusCode::CONFLICT,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::Storage(_) | Error::Token(_) | Error::DotEnv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

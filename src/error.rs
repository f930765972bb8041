use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use tracing::error;

#[derive(Debug)]
pub enum AppError {
    /// A referenced entity does not exist; rendered as a plain 404.
    NotFound(String),
    /// A request was well-formed but violates a store-level rule.
    Invalid(String),
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> AppError {
        AppError::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> AppError {
        AppError::Invalid(what.into())
    }
}

impl Error for AppError {}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(what) => write!(f, "{} not found", what),
            AppError::Invalid(what) => write!(f, "invalid request: {}", what),
            AppError::Internal(what) => write!(f, "internal error: {}", what),
        }
    }
}

impl<T> From<PoisonError<T>> for AppError {
    fn from(e: PoisonError<T>) -> AppError {
        AppError::Internal(e.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> AppError {
        AppError::Internal(e.to_string())
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> AppError {
        AppError::Internal(s.to_string())
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        match self {
            AppError::NotFound(what) => {
                (Status::NotFound, format!("{} not found", what)).respond_to(request)
            }
            AppError::Invalid(what) => (Status::UnprocessableEntity, what).respond_to(request),
            AppError::Internal(what) => {
                error!("request failed: {}", what);
                (Status::InternalServerError, String::from("internal server error"))
                    .respond_to(request)
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

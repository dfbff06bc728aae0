use actix_web::{http::StatusCode, HttpResponse};
use derive_more::{Display, Error};
use serde_json::json;

/// Error taxonomy for every handler. Each variant carries the message
/// surfaced to the client; internal errors are logged and answered with a
/// generic message.
#[derive(Debug, Display, Error)]
pub enum ServiceError {
    #[display(fmt = "{}", _0)]
    Validation(#[error(not(source))] String),
    #[display(fmt = "{}", _0)]
    Conflict(#[error(not(source))] String),
    #[display(fmt = "{}", _0)]
    Unauthorized(#[error(not(source))] String),
    #[display(fmt = "{}", _0)]
    Forbidden(#[error(not(source))] String),
    #[display(fmt = "{}", _0)]
    NotFound(#[error(not(source))] String),
    #[display(fmt = "Internal server error")]
    Inner(#[error(not(source))] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ServiceError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

impl actix_web::error::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Inner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ServiceError::Inner(err) = self {
            log::error!("internal error: {:?}", err);
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}

impl From<mongodb::error::Error> for ServiceError {
    fn from(err: mongodb::error::Error) -> Self {
        ServiceError::Inner(err.into())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Inner(err)
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

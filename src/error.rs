use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::models::{BookingUpdateError, ValidationError};

/// Errors surfaced by handlers. Rendered as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Store(StoreError),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        ApiError::Forbidden(reason.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::Store(other),
        }
    }
}

impl From<BookingUpdateError> for ApiError {
    fn from(err: BookingUpdateError) -> Self {
        match err {
            BookingUpdateError::Forbidden(reason) => ApiError::Forbidden(reason.to_string()),
            BookingUpdateError::Invalid(e) => ApiError::Validation(e),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("bcrypt: {err}"))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Log the actual error, return generic message
        match self {
            ApiError::Store(e) => error!("Store error: {}", e),
            ApiError::Internal(message) => error!("Internal error: {}", message),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::Empty { field: "name" }).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::forbidden("nope").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("School not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::Conflict("Email already exists".into())).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::Internal("pool exhausted on 10.0.0.3".into()).error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");
    }

    #[test]
    fn booking_rule_errors_map_to_http() {
        let forbidden = ApiError::from(BookingUpdateError::Forbidden("Students may only cancel a booking"));
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.to_string(), "Students may only cancel a booking");
    }
}

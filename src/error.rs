use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::baht_text::BahtTextError;
use crate::numbering::NumberingError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Username or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn db(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "database error");
        ApiError::Internal(format!("db error: {e}"))
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound("NOT_FOUND", format!("{what} not found"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::BadRequest("VALIDATION_ERROR", message.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(code, _) => (StatusCode::UNAUTHORIZED, *code),
            ApiError::Forbidden(code, _) => (StatusCode::FORBIDDEN, *code),
            ApiError::BadRequest(code, _) => (StatusCode::BAD_REQUEST, *code),
            ApiError::NotFound(code, _) => (StatusCode::NOT_FOUND, *code),
            ApiError::Conflict(code, _) => (StatusCode::CONFLICT, *code),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(_, m)
            | ApiError::Forbidden(_, m)
            | ApiError::BadRequest(_, m)
            | ApiError::NotFound(_, m)
            | ApiError::Conflict(_, m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl From<NumberingError> for ApiError {
    fn from(e: NumberingError) -> Self {
        match e {
            NumberingError::MalformedDocumentNumber(_) => {
                ApiError::Conflict("MALFORMED_DOCUMENT_NUMBER", e.to_string())
            }
            NumberingError::InvalidSeriesCode(_) => {
                ApiError::BadRequest("INVALID_SERIES_CODE", e.to_string())
            }
        }
    }
}

impl From<BahtTextError> for ApiError {
    fn from(e: BahtTextError) -> Self {
        match e {
            BahtTextError::OutOfRangeAmount(_) => {
                ApiError::BadRequest("AMOUNT_OUT_OF_RANGE", e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: self.message().to_string(),
            },
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_codes() {
        let e: ApiError = NumberingError::MalformedDocumentNumber("x".into()).into();
        assert_eq!(e.status_and_code(), (StatusCode::CONFLICT, "MALFORMED_DOCUMENT_NUMBER"));

        let e: ApiError = NumberingError::InvalidSeriesCode("A-B".into()).into();
        assert_eq!(e.status_and_code(), (StatusCode::BAD_REQUEST, "INVALID_SERIES_CODE"));

        let e: ApiError = BahtTextError::OutOfRangeAmount("-1".into()).into();
        assert_eq!(e.status_and_code(), (StatusCode::BAD_REQUEST, "AMOUNT_OUT_OF_RANGE"));
    }

    #[test]
    fn response_status_matches_variant() {
        let resp = ApiError::not_found("patient").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = ApiError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::AdmissionError;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Error returned by every handler.
///
/// `Validation` renders as `{"field": ["message", ...]}` with 400, the rest
/// as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Validation(BTreeMap<String, Vec<String>>),
    Unauthorized(String),
    Forbidden,
    NotFound,
    Internal,
}

impl ApiError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::Validation(errors)
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => json!(errors),
            Self::Unauthorized(message) => json!({ "detail": message }),
            Self::Forbidden => json!({ "detail": "You do not have permission to perform this action." }),
            Self::NotFound => json!({ "detail": "Not found." }),
            Self::Internal => json!({ "detail": "Internal server error." }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let message = err.to_string();
        match err {
            AdmissionError::OutOfRange(e) => Self::field(e.field(), message),
            AdmissionError::SeatTaken { .. } => Self::non_field(message),
            AdmissionError::EmptyReservation => Self::field("tickets", message),
            AdmissionError::SessionNotFound(_) => Self::field("show_session", message),
            AdmissionError::Storage(e) => {
                tracing::error!("booking storage error: {:?}", e);
                Self::Internal
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => {
                tracing::error!("sql error: {:?}", other);
                Self::Internal
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        for (field, field_errors) in errors.field_errors() {
            let messages = field_errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        Self::Validation(fields)
    }
}

/// Maps a unique violation on `constraint` to a field error, anything else through `From<sqlx::Error>`.
pub fn unique_violation_as_field(err: sqlx::Error, constraint: &str, field: &str, message: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.constraint() == Some(constraint) {
            return ApiError::field(field, message);
        }
    }
    ApiError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SeatValidationError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn out_of_range_is_a_field_error() {
        let err = AdmissionError::OutOfRange(SeatValidationError::OutOfRange {
            field: "row",
            bound_field: "rows",
            value: 6,
            bound: 5,
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "row": ["row number must be in available range: (1, rows): (1, 5)"] })
        );
    }

    #[tokio::test]
    async fn seat_taken_is_a_non_field_error() {
        let err = AdmissionError::SeatTaken { session_id: 3, row: 1, seat: 1 };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body[NON_FIELD_ERRORS][0].as_str().unwrap().contains("already taken"));
    }

    #[tokio::test]
    async fn empty_reservation_points_at_tickets() {
        let response = ApiError::from(AdmissionError::EmptyReservation).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await.get("tickets").is_some());
    }

    #[tokio::test]
    async fn storage_failure_hides_details() {
        let err = AdmissionError::Storage(crate::storage::StoreError::Database(sqlx::Error::PoolTimedOut));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "detail": "Internal server error." }));
    }

    #[test]
    fn row_not_found_maps_to_404() {
        assert_eq!(ApiError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
    }
}

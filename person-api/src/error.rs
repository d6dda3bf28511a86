use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use person_common::store::StoreError;
use person_common::validation::ValidationError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("user {0} not found")]
    NotFound(i64),
    #[error("failed to fetch users: {0}")]
    Query(StoreError),
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl ApiError {
    pub fn bad_request(msg: &str) -> Self {
        ApiError::BadRequest(msg.to_owned())
    }

    /// Wrap a failed mutation, keeping a missing row distinct from a broken store.
    pub fn from_mutation(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            err => ApiError::Storage(err),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Query(e) => {
                error!(error = %e, "failed to fetch users");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to fetch users".to_owned(),
                )
            }
            ApiError::Storage(e) => {
                error!(error = %e, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

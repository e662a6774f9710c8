//! Mapping of service failures to HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use social_types::{ErrorResponse, GraphStoreError, ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body could not be read as the expected JSON object.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                ServiceError::MissingField(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) | ServiceError::RelationNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ServiceError::Store(GraphStoreError::Conflict(_)) => StatusCode::CONFLICT,
                ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

use crate::error::ServiceError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidPassword => StatusCode::BAD_REQUEST,
            ServiceError::DuplicateEmail => StatusCode::CONFLICT,
            ServiceError::InvalidCredentials | ServiceError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            // Authenticated, but not the owner.
            ServiceError::Unauthorized => StatusCode::FORBIDDEN,
            ServiceError::UserNotFound
            | ServiceError::PlaylistNotFound
            | ServiceError::TrackNotFound => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ServiceError::Internal(err) => {
                error!("Internal service error: {:#}", err);
                json!({ "error": "Internal server error" })
            }
            ServiceError::Validation(fields) => {
                debug!("Validation failed: {:?}", fields);
                json!({ "error": self.to_string(), "fields": fields })
            }
            _ => {
                debug!("Client error: {}", self);
                json!({ "error": self.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

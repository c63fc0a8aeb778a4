use serde::Serialize;
use thiserror::Error;

use crate::user::token::TokenError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Failures surfaced by the domain services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Email already registered")]
    DuplicateEmail,

    /// Used for both unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid current password")]
    InvalidPassword,

    #[error("User not found")]
    UserNotFound,

    #[error("Playlist not found")]
    PlaylistNotFound,

    #[error("Track not found")]
    TrackNotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => ServiceError::InvalidToken,
            TokenError::Signing(err) => ServiceError::Internal(err.into()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

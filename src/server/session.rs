use super::state::ServerState;
use crate::error::ServiceError;
use crate::store::User;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{debug, error};

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

pub const BEARER_PREFIX: &str = "Bearer ";

pub enum SessionExtractionError {
    Unauthorized,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            SessionExtractionError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response(),
        }
    }
}

#[derive(Debug)]
pub(super) enum Identity {
    Anonymous,
    Authenticated(User),
    Rejected,
}

fn extract_bearer_token(parts: &Parts) -> Option<Result<String, ()>> {
    let value = parts.headers.get(AUTHORIZATION)?;
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    Some(token.ok_or(()))
}

/// Resolves who is making the request. Only store failures are errors,
/// every token problem ends up as [`Identity::Rejected`].
pub(super) fn resolve_identity(
    parts: &Parts,
    ctx: &ServerState,
) -> Result<Identity, ServiceError> {
    let token = match extract_bearer_token(parts) {
        None => {
            debug!("No token in headers.");
            return Ok(Identity::Anonymous);
        }
        Some(Err(())) => {
            debug!("Malformed authorization header.");
            return Ok(Identity::Rejected);
        }
        Some(Ok(token)) => token,
    };

    let user_id = match ctx.token_issuer.verify(&token) {
        Ok(user_id) => user_id,
        Err(err) => {
            debug!("Token verification failed: {}", err);
            return Ok(Identity::Rejected);
        }
    };

    match ctx.user_manager.find_user(&user_id)? {
        Some(user) => Ok(Identity::Authenticated(user)),
        None => {
            debug!("Token refers to missing user {}", user_id);
            Ok(Identity::Rejected)
        }
    }
}

fn identity_or_internal_error(
    parts: &Parts,
    ctx: &ServerState,
) -> Result<Identity, SessionExtractionError> {
    resolve_identity(parts, ctx).map_err(|err| {
        error!("Failed to resolve request identity: {}", err);
        SessionExtractionError::InternalError
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        match identity_or_internal_error(parts, ctx)? {
            Identity::Authenticated(user) => Ok(Session { user }),
            Identity::Anonymous | Identity::Rejected => Err(SessionExtractionError::Unauthorized),
        }
    }
}

impl FromRequestParts<ServerState> for Option<Session> {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        match identity_or_internal_error(parts, ctx)? {
            Identity::Authenticated(user) => Ok(Some(Session { user })),
            Identity::Anonymous | Identity::Rejected => Ok(None),
        }
    }
}

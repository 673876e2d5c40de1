use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Decides whether a request credential may reach the course endpoints.
pub trait AccessGuard: Send + Sync {
    fn validate(&self, credential: Option<&str>) -> bool;
}

/// Accepts only requests carrying the configured token, either bare or as
/// `Bearer <token>`.
pub struct TokenGuard {
    token: String,
}

impl TokenGuard {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl AccessGuard for TokenGuard {
    fn validate(&self, credential: Option<&str>) -> bool {
        let Some(credential) = credential else {
            return false;
        };
        let presented = credential.strip_prefix("Bearer ").unwrap_or(credential);
        presented == self.token
    }
}

/// Lets every request through. Used when no token is configured.
pub struct AllowAll;

impl AccessGuard for AllowAll {
    fn validate(&self, _credential: Option<&str>) -> bool {
        true
    }
}

/// Rejects the request with 403 unless the state's guard accepts its
/// `Authorization` header.
pub async fn require_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !state.guard.validate(credential) {
        warn!("rejected request to {} with invalid token", request.uri().path());
        return Err(AppError::Forbidden("invalid token".to_string()));
    }

    Ok(next.run(request).await)
}

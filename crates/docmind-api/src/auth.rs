//! Bearer-token authentication and caller identity.
//!
//! Protected routes require `Authorization: Bearer <token>`. The caller's
//! owner id is read from the `X-Owner-Id` header by the [`OwnerContext`]
//! extractor and is the only source of tenant identity for a request.

use std::path::Path;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;
use tracing::{info, warn};

use docmind_core::types::OwnerId;

use crate::error::ApiError;
use crate::state::AppState;

pub const OWNER_HEADER: &str = "x-owner-id";

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Load the token from `token_path`, or generate and persist a new one.
pub fn load_or_generate_token(token_path: &Path) -> String {
    if let Ok(contents) = std::fs::read_to_string(token_path) {
        let token = contents.trim().to_string();
        if !token.is_empty() {
            info!(path = %token_path.display(), "API token loaded");
            return token;
        }
    }

    let token = generate_token();
    if let Some(parent) = token_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(token_path, &token) {
        Ok(()) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ =
                    std::fs::set_permissions(token_path, std::fs::Permissions::from_mode(0o600));
            }
            info!(path = %token_path.display(), "API token saved");
        }
        Err(e) => warn!(error = %e, path = %token_path.display(), "Failed to save API token"),
    }
    token
}

/// Middleware rejecting requests without the configured bearer token.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let header = match req.headers().get(axum::http::header::AUTHORIZATION) {
        Some(value) => value,
        None => {
            return ApiError::Unauthorized("Missing Authorization header".into()).into_response()
        }
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) if token == state.api_token => next.run(req).await,
        _ => ApiError::Unauthorized("Invalid bearer token".into()).into_response(),
    }
}

/// Owner of the current request, taken from the `X-Owner-Id` header.
#[derive(Debug, Clone)]
pub struct OwnerContext(pub OwnerId);

impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-Owner-Id header".into()))?
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid X-Owner-Id header encoding".into()))?;
        let owner = OwnerId::new(raw.trim())
            .map_err(|_| ApiError::Unauthorized("X-Owner-Id header is empty".into()))?;
        Ok(OwnerContext(owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_token_persisted_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("api.token");

        let first = load_or_generate_token(&path);
        assert!(path.exists());
        let second = load_or_generate_token(&path);
        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_token_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.token");
        std::fs::write(&path, "  abc123\n").unwrap();
        assert_eq!(load_or_generate_token(&path), "abc123");
    }
}

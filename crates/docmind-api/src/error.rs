//! API error type and JSON error bodies.
//!
//! Pipeline and agent errors are mapped onto HTTP status codes here so
//! handlers can use `?` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use docmind_agent::AgentError;
use docmind_core::error::DocmindError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "bad_request").
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 - rejected input.
    BadRequest(String),
    /// 401 - missing or wrong credentials.
    Unauthorized(String),
    NotFound(String),
    /// 422 - the model refused to produce output.
    UnprocessableEntity(String),
    /// 502 - an upstream service or the model misbehaved.
    BadGateway(String),
    /// 503 - component disabled by configuration.
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::UnprocessableEntity(_) => "refused",
            ApiError::BadGateway(_) => "upstream_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code().to_string();
        let message = match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::UnprocessableEntity(m)
            | ApiError::BadGateway(m)
            | ApiError::ServiceUnavailable(m)
            | ApiError::Internal(m) => m,
        };
        if status.is_server_error() {
            warn!(status = status.as_u16(), %message, "Request failed");
        }
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

impl From<DocmindError> for ApiError {
    fn from(err: DocmindError) -> Self {
        match err {
            DocmindError::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            DocmindError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DocmindError::Refusal(_) => ApiError::UnprocessableEntity(err.to_string()),
            DocmindError::Upstream { .. } => ApiError::BadGateway(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Core(inner) => inner.into(),
            AgentError::EmptyMessage | AgentError::MessageTooLong(_) => {
                ApiError::BadRequest(err.to_string())
            }
            AgentError::UnknownTool(_) | AgentError::InvalidToolArguments { .. } => {
                ApiError::BadGateway(err.to_string())
            }
            AgentError::InvalidTransition(..) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (DocmindError::invalid("empty"), StatusCode::BAD_REQUEST),
            (DocmindError::NotFound("d1".into()), StatusCode::NOT_FOUND),
            (DocmindError::Refusal("no".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (DocmindError::upstream("qdrant", "503"), StatusCode::BAD_GATEWAY),
            (DocmindError::Config("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_agent_error_mapping() {
        assert_eq!(
            ApiError::from(AgentError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AgentError::MessageTooLong(4000)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AgentError::UnknownTool("x".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(AgentError::Core(DocmindError::Refusal("no".into()))).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            error: "bad_request".into(),
            message: "query is required".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "bad_request");
        assert_eq!(json["message"], "query is required");
    }
}

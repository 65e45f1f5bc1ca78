use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// ApiError
///
/// The typed failure taxonomy for every core operation. Handlers and the
/// MFA state machine return these instead of raw status codes so that the
/// distinction the access contract cares about (Forbidden for an existing
/// but out-of-scope row versus NotFound for a missing or malformed id) is
/// explicit at the type level and translated to HTTP in exactly one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Principal is authenticated, the entity exists, but it is outside the
    /// principal's access scope. Maps to 403.
    ScopeDenied,
    /// Entity absent, or the id was malformed. The conflation of the two is
    /// intentional: it avoids leaking existence. Maps to 404.
    NotFound,
    /// Credential or MFA code failure. Maps to 401.
    Unauthorized,
    /// A state precondition was violated (e.g. verifying MFA before any
    /// secret was set up). Maps to 400.
    BadRequest(&'static str),
    /// An infrastructure failure the caller cannot act on. Maps to 500.
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ScopeDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::ScopeDenied => "forbidden",
            ApiError::NotFound => "not found",
            ApiError::Unauthorized => "unauthorized",
            ApiError::BadRequest(msg) => msg,
            ApiError::Internal => "internal error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

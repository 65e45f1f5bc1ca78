use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::Role,
    repository::RepositoryState,
};

/// Session token lifetime in seconds (8 hours).
const TOKEN_TTL_SECS: u64 = 8 * 60 * 60;

/// Claims
///
/// Payload structure of a session JWT, signed with the server secret and
/// validated on every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID, used to re-fetch role and existence.
    pub sub: Uuid,
    /// Expiration time; expired tokens are rejected outright.
    pub exp: usize,
    /// Issued-at timestamp.
    pub iat: usize,
}

/// Principal
///
/// The resolved identity of an authenticated request: who is asking, and
/// under which role family the scope resolver should answer. Ephemeral:
/// derived from the token per request, never persisted.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// Issues a signed session token for a user. Called by the MFA state
/// machine once the login branch decides a token may actually be handed out
/// (neither enrollment nor verification pending).
pub fn issue_token(user_id: Uuid, jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + TOKEN_TTL_SECS) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

/// Principal Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making `Principal` usable as a
/// function argument in any authenticated handler and keeping authentication
/// out of business logic entirely.
///
/// The flow:
/// 1. Dependency resolution: Repository and AppConfig from the app state.
/// 2. Local bypass: in `Env::Local` only, an `x-user-id` header naming an
///    existing user authenticates the request (development convenience).
/// 3. Bearer token extraction and JWT validation.
/// 4. Database lookup: the user must still exist, be active, and carry a
///    recognized role. A token outlives none of those.
///
/// Rejection: 401 Unauthorized on any failure.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local development bypass. Guarded by the Env check; production
        // requests fall straight through to JWT validation.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Some(user) = repo.get_user(user_id).await {
                            if user.is_active {
                                if let Some(role) = user.role() {
                                    return Ok(Principal { id: user.id, role });
                                }
                            }
                        }
                    }
                }
            }
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                match e.kind() {
                    // Expired tokens are the common failure for a
                    // valid-but-old session; same rejection either way.
                    ErrorKind::ExpiredSignature => return Err(StatusCode::UNAUTHORIZED),
                    _ => return Err(StatusCode::UNAUTHORIZED),
                }
            }
        };

        // Final verification against the database. A deactivated or deleted
        // user must not be able to ride out an old token.
        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .filter(|u| u.is_active)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let role = user.role().ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Principal { id: user.id, role })
    }
}

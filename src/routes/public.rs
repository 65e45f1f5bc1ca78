use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated**: the health probe and the
/// three-legged login/MFA gateway. Everything else in the API requires a
/// session token issued by one of these endpoints.
///
/// Security Mandate:
/// The MFA endpoints take a user id in the body but are not usable without
/// knowledge the server verifies independently (the account password for
/// setup, a valid TOTP code for verify). Malformed or unknown ids resolve
/// to 404 without leaking which logins exist.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        // Verifies credentials and reports which MFA step (if any) is still pending.
        // Only an account with MFA fully enrolled receives a token from this endpoint.
        .route("/auth/login", post(handlers::login))
        // POST /auth/mfa/setup
        // Generates and stores a fresh TOTP secret after password reverification.
        // Returns the secret and its otpauth:// URI for the authenticator app.
        .route("/auth/mfa/setup", post(handlers::mfa_setup))
        // POST /auth/mfa/verify
        // Verifies a TOTP code, flips MFA to enabled (idempotently) and issues
        // the session token. This is the only exit from the enrollment flow.
        .route("/auth/mfa/verify", post(handlers::mfa_verify))
}

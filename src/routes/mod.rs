/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.
///
/// The three modules map directly to the authentication stages of the API.

/// Routes accessible without a session token (the login and MFA gateway).
pub mod public;

/// Routes protected by the `Principal` extractor middleware.
/// Requires a validated session; block-scope checks happen in the handlers.
pub mod authenticated;

/// Routes restricted exclusively to users with the 'admin' role.
/// Implements mandatory authorization checks inside each handler.
pub mod admin;

use crate::{
    auth::issue_token,
    error::ApiError,
    models::User,
    password::verify_password,
    repository::Repository,
    totp,
};
use uuid::Uuid;

/// LoginOutcome
///
/// The three-way branch taken after a successful credential check. A real
/// session token is only issued on the `LoggedIn` arm; the other two tell
/// the client which step of the MFA lifecycle must complete first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// First login: a TOTP secret must be enrolled before anything else.
    SetupRequired { user_id: Uuid },
    /// MFA is enabled: a code must be verified before a token is issued.
    MfaRequired { user_id: Uuid },
    /// No MFA step pending; the session token is ready to use.
    LoggedIn { user_id: Uuid, token: String },
}

/// MfaEnrollment
///
/// Output of a successful setup: the fresh shared secret and the
/// provisioning URI for the authenticator app.
#[derive(Debug, Clone)]
pub struct MfaEnrollment {
    pub user_id: Uuid,
    pub secret: String,
    pub otpauth_url: String,
}

/// Verifies credentials and decides the login branch.
///
/// Lookup is case-sensitive and a missing or deactivated account is
/// indistinguishable from a wrong password (both Unauthorized). When both
/// `first_login` and `mfa_enabled` are true, enrollment wins: verification
/// is meaningless before a fresh secret exists.
pub async fn login(
    repo: &dyn Repository,
    jwt_secret: &str,
    login: &str,
    password: &str,
) -> Result<LoginOutcome, ApiError> {
    if password.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let user = repo
        .find_user_by_login(login)
        .await
        .filter(|u| u.is_active)
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    if user.first_login {
        return Ok(LoginOutcome::SetupRequired { user_id: user.id });
    }
    if user.mfa_enabled {
        return Ok(LoginOutcome::MfaRequired { user_id: user.id });
    }

    repo.update_last_login(user.id).await;
    let token = issue_token(user.id, jwt_secret).map_err(|_| ApiError::Internal)?;
    Ok(LoginOutcome::LoggedIn {
        user_id: user.id,
        token,
    })
}

/// Enrolls (or re-enrolls) MFA for a user after password reverification.
///
/// State transition: Unset/Pending -> Pending. `first_login` is cleared,
/// `mfa_enabled` stays false until the first code verifies. A malformed or
/// unknown user id resolves to NotFound, never a crash; an empty or wrong
/// password is Unauthorized.
pub async fn setup(
    repo: &dyn Repository,
    user_id: &str,
    password: &str,
) -> Result<MfaEnrollment, ApiError> {
    let user = load_user(repo, user_id).await?;

    if password.is_empty() || !verify_password(password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let secret = totp::generate_secret();
    if !repo.store_mfa_secret(user.id, &secret).await {
        return Err(ApiError::Internal);
    }

    Ok(MfaEnrollment {
        user_id: user.id,
        otpauth_url: totp::otpauth_url(&user.login, &secret),
        secret,
    })
}

/// Verifies a TOTP code and issues the session token.
///
/// Preconditions in order: the user must exist (NotFound), a secret must
/// have been set up (BadRequest, there is nothing to verify otherwise),
/// and the code must be a valid current code (Unauthorized; malformed codes
/// fail closed the same way). Success flips `mfa_enabled` on, idempotent
/// when it already is, and stamps `last_login_at`.
pub async fn verify(
    repo: &dyn Repository,
    jwt_secret: &str,
    user_id: &str,
    code: &str,
) -> Result<String, ApiError> {
    let user = load_user(repo, user_id).await?;

    let secret = user
        .mfa_secret
        .as_deref()
        .ok_or(ApiError::BadRequest("mfa has not been set up"))?;

    if !totp::verify(secret, code) {
        return Err(ApiError::Unauthorized);
    }

    if !repo.enable_mfa(user.id).await {
        return Err(ApiError::Internal);
    }

    issue_token(user.id, jwt_secret).map_err(|_| ApiError::Internal)
}

/// Resolves a raw user-id string to an active user. A malformed id is the
/// same NotFound as an absent row, so responses never leak which ids exist.
async fn load_user(repo: &dyn Repository, user_id: &str) -> Result<User, ApiError> {
    let id = Uuid::parse_str(user_id).map_err(|_| ApiError::NotFound)?;
    repo.get_user(id)
        .await
        .filter(|u| u.is_active)
        .ok_or(ApiError::NotFound)
}

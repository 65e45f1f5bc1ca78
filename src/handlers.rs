use crate::{
    AppState,
    auth::Principal,
    crypto::FieldCipher,
    error::ApiError,
    mfa::{self, LoginOutcome},
    models::{
        AssignmentRequest, AuditEntry, Block, BlockAssignment, Contact, ContactResponse,
        CreateBlockRequest, CreateContactRequest, CreateInteractionRequest, CreateUserRequest,
        CreateWatchlistItemRequest, DashboardStats, Interaction, InteractionResponse, LoginRequest,
        LoginResponse, MfaSetupRequest, MfaSetupResponse, MfaVerifyRequest, MfaVerifyResponse,
        Role, UpdateBlockRequest, UpdateContactRequest, UpdateWatchlistItemRequest, User,
        UserResponse, WatchlistItem, WatchlistItemResponse,
    },
    password::hash_password,
    repository::{
        ContactUpdate, NewAuditEntry, NewContact, NewInteraction, NewUser, NewWatchlistItem,
        WatchlistUpdate,
    },
    scope::{self, AccessScope},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

// --- Filter Structs ---

/// ContactFilter
///
/// Accepted query parameters for GET /contacts. An explicit `block_id`
/// narrows the listing further; it is intersected with the caller's access
/// scope, never widened past it.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ContactFilter {
    pub block_id: Option<Uuid>,
}

/// AuditFilter
///
/// Accepted query parameters for GET /admin/audit.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct AuditFilter {
    /// Maximum number of entries to return (default 100).
    pub limit: Option<i64>,
}

// --- Presentation helpers (the decrypt-at-the-read-boundary step) ---

fn present_user(cipher: &FieldCipher, user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        login: user.login.clone(),
        full_name: cipher.decrypt(&user.full_name),
        role: user.role.clone(),
        mfa_enabled: user.mfa_enabled,
        first_login: user.first_login,
        is_active: user.is_active,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    }
}

fn present_contact(cipher: &FieldCipher, contact: &Contact) -> ContactResponse {
    ContactResponse {
        id: contact.id,
        block_id: contact.block_id,
        full_name: cipher.decrypt(&contact.full_name),
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        notes: cipher.decrypt_opt(contact.notes.as_deref()),
        is_active: contact.is_active,
        created_at: contact.created_at,
        updated_at: contact.updated_at,
    }
}

fn present_interaction(cipher: &FieldCipher, interaction: &Interaction) -> InteractionResponse {
    InteractionResponse {
        id: interaction.id,
        contact_id: interaction.contact_id,
        block_id: interaction.block_id,
        kind: interaction.kind.clone(),
        comment: cipher.decrypt(&interaction.comment),
        occurred_at: interaction.occurred_at,
        created_by: interaction.created_by,
        created_at: interaction.created_at,
    }
}

fn present_watchlist_item(cipher: &FieldCipher, item: &WatchlistItem) -> WatchlistItemResponse {
    WatchlistItemResponse {
        id: item.id,
        label: item.label.clone(),
        notes: cipher.decrypt_opt(item.notes.as_deref()),
        severity: item.severity.clone(),
        created_by: item.created_by,
        is_active: item.is_active,
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

// --- Role gates ---

fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.role != Role::Admin {
        return Err(ApiError::ScopeDenied);
    }
    Ok(())
}

/// The watchlist domain belongs to threat analysts (and Admin, which
/// bypasses everything); curators have no business there.
fn require_watchlist_access(principal: &Principal) -> Result<(), ApiError> {
    match principal.role {
        Role::Admin | Role::ThreatAnalyst => Ok(()),
        Role::Curator => Err(ApiError::ScopeDenied),
    }
}

/// Loads a contact and applies the single-entity scope gate: absent row is
/// NotFound, existing-but-out-of-scope is ScopeDenied. Never conflated.
async fn load_scoped_contact(
    state: &AppState,
    scope: &AccessScope,
    id: Uuid,
) -> Result<Contact, ApiError> {
    let contact = state.repo.get_contact(id).await.ok_or(ApiError::NotFound)?;
    if !scope.can_access(contact.block_id) {
        return Err(ApiError::ScopeDenied);
    }
    Ok(contact)
}

// --- Auth Handlers ---

/// login
///
/// [Public Route] Verifies credentials and branches on the MFA lifecycle:
/// a fresh account gets `setup_required`, an enrolled one `mfa_required`;
/// only an account with no MFA step pending receives a token directly.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login outcome", body = LoginResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = mfa::login(
        state.repo.as_ref(),
        &state.config.jwt_secret,
        &payload.login,
        &payload.password,
    )
    .await?;

    let response = match outcome {
        LoginOutcome::SetupRequired { user_id } => LoginResponse {
            status: "setup_required".to_string(),
            user_id,
            token: None,
        },
        LoginOutcome::MfaRequired { user_id } => LoginResponse {
            status: "mfa_required".to_string(),
            user_id,
            token: None,
        },
        LoginOutcome::LoggedIn { user_id, token } => LoginResponse {
            status: "ok".to_string(),
            user_id,
            token: Some(token),
        },
    };
    Ok(Json(response))
}

/// mfa_setup
///
/// [Public Route] Enrolls MFA after password reverification. Returns the
/// fresh shared secret and the otpauth URI for the authenticator app.
#[utoipa::path(
    post,
    path = "/auth/mfa/setup",
    request_body = MfaSetupRequest,
    responses(
        (status = 200, description = "Secret generated", body = MfaSetupResponse),
        (status = 401, description = "Bad password"),
        (status = 404, description = "Unknown or malformed user id")
    )
)]
pub async fn mfa_setup(
    State(state): State<AppState>,
    Json(payload): Json<MfaSetupRequest>,
) -> Result<Json<MfaSetupResponse>, ApiError> {
    let enrollment = mfa::setup(state.repo.as_ref(), &payload.user_id, &payload.password).await?;
    Ok(Json(MfaSetupResponse {
        user_id: enrollment.user_id,
        secret: enrollment.secret,
        otpauth_url: enrollment.otpauth_url,
    }))
}

/// mfa_verify
///
/// [Public Route] Verifies a TOTP code, enables MFA (idempotently) and
/// issues the session token. Verifying before any secret was set up is a
/// 400, not a 401: the state is wrong, not the credential.
#[utoipa::path(
    post,
    path = "/auth/mfa/verify",
    request_body = MfaVerifyRequest,
    responses(
        (status = 200, description = "Verified", body = MfaVerifyResponse),
        (status = 400, description = "MFA not set up"),
        (status = 401, description = "Bad or malformed code"),
        (status = 404, description = "Unknown or malformed user id")
    )
)]
pub async fn mfa_verify(
    State(state): State<AppState>,
    Json(payload): Json<MfaVerifyRequest>,
) -> Result<Json<MfaVerifyResponse>, ApiError> {
    let token = mfa::verify(
        state.repo.as_ref(),
        &state.config.jwt_secret,
        &payload.user_id,
        &payload.code,
    )
    .await?;
    Ok(Json(MfaVerifyResponse { token }))
}

// --- Profile ---

/// get_me
///
/// [Authenticated Route] The authenticated user's own profile, with the
/// encrypted name decrypted at the read boundary.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserResponse))
)]
pub async fn get_me(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .repo
        .get_user(principal.id)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(present_user(&state.cipher, &user)))
}

// --- Blocks ---

/// list_blocks
///
/// [Authenticated Route] Lists the blocks visible to the principal. Admin
/// sees everything (query stays unfiltered); a curator sees assigned
/// blocks; a threat analyst sees none.
#[utoipa::path(
    get,
    path = "/blocks",
    responses((status = 200, description = "Visible blocks", body = [Block]))
)]
pub async fn list_blocks(principal: Principal, State(state): State<AppState>) -> Json<Vec<Block>> {
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    Json(state.repo.list_blocks(&scope).await)
}

/// get_block_details
///
/// [Authenticated Route] Single block detail with the 403-vs-404 contract:
/// an existing block outside the caller's scope is Forbidden, a missing
/// one NotFound.
#[utoipa::path(
    get,
    path = "/blocks/{id}",
    params(("id" = Uuid, Path, description = "Block ID")),
    responses(
        (status = 200, description = "Found", body = Block),
        (status = 403, description = "Out of scope"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_block_details(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Block>, ApiError> {
    let block = state.repo.get_block(id).await.ok_or(ApiError::NotFound)?;
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    if !scope.can_access(block.id) {
        return Err(ApiError::ScopeDenied);
    }
    Ok(Json(block))
}

// --- Contacts ---

/// list_contacts
///
/// [Authenticated Route] Scope-filtered contact listing. The scope is
/// resolved once and pushed into the query as a `block_id = ANY(...)`
/// clause (no clause at all for Admin); results are decrypted before the
/// response DTO is built.
#[utoipa::path(
    get,
    path = "/contacts",
    params(ContactFilter),
    responses((status = 200, description = "Contacts in scope", body = [ContactResponse]))
)]
pub async fn list_contacts(
    principal: Principal,
    State(state): State<AppState>,
    Query(filter): Query<ContactFilter>,
) -> Json<Vec<ContactResponse>> {
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    let contacts = state.repo.list_contacts(&scope, filter.block_id).await;
    Json(
        contacts
            .iter()
            .map(|c| present_contact(&state.cipher, c))
            .collect(),
    )
}

/// get_contact_details
///
/// [Authenticated Route] Single contact detail under the scope gate.
#[utoipa::path(
    get,
    path = "/contacts/{id}",
    params(("id" = Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Found", body = ContactResponse),
        (status = 403, description = "Out of scope"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_contact_details(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactResponse>, ApiError> {
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    let contact = load_scoped_contact(&state, &scope, id).await?;
    Ok(Json(present_contact(&state.cipher, &contact)))
}

/// create_contact
///
/// [Authenticated Route] Creates a contact in a block the principal can
/// access. Sensitive fields are encrypted before they reach the
/// repository; an audit entry trails the write.
#[utoipa::path(
    post,
    path = "/contacts",
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Created", body = ContactResponse),
        (status = 403, description = "Block out of scope"),
        (status = 404, description = "Block not found")
    )
)]
pub async fn create_contact(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    // Existence first, scope second: the block must be real before the
    // caller learns whether they may touch it.
    let block = state
        .repo
        .get_block(payload.block_id)
        .await
        .ok_or(ApiError::NotFound)?;
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    if !scope.can_access(block.id) {
        return Err(ApiError::ScopeDenied);
    }

    let contact = state
        .repo
        .create_contact(NewContact {
            block_id: block.id,
            full_name: state.cipher.encrypt(&payload.full_name),
            email: payload.email,
            phone: payload.phone,
            notes: state.cipher.encrypt_opt(payload.notes.as_deref()),
        })
        .await
        .ok_or(ApiError::Internal)?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "contact.create".to_string(),
            entity_type: "contact".to_string(),
            entity_id: Some(contact.id),
            old_value: None,
            new_value: Some(json!({ "block_id": contact.block_id }).to_string()),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(present_contact(&state.cipher, &contact)),
    ))
}

/// update_contact
///
/// [Authenticated Route] Partial update under the scope gate; provided
/// sensitive fields are re-encrypted. Last write wins; there is no version
/// token.
#[utoipa::path(
    put,
    path = "/contacts/{id}",
    params(("id" = Uuid, Path, description = "Contact ID")),
    request_body = UpdateContactRequest,
    responses(
        (status = 200, description = "Updated", body = ContactResponse),
        (status = 403, description = "Out of scope"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_contact(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    let contact = load_scoped_contact(&state, &scope, id).await?;

    let updated = state
        .repo
        .update_contact(
            contact.id,
            ContactUpdate {
                full_name: payload.full_name.map(|n| state.cipher.encrypt(&n)),
                email: payload.email,
                phone: payload.phone,
                notes: payload.notes.map(|n| state.cipher.encrypt(&n)),
            },
        )
        .await
        .ok_or(ApiError::NotFound)?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "contact.update".to_string(),
            entity_type: "contact".to_string(),
            entity_id: Some(updated.id),
            old_value: None,
            new_value: None,
        })
        .await;

    Ok(Json(present_contact(&state.cipher, &updated)))
}

/// deactivate_contact
///
/// [Authenticated Route] Soft delete: flips `is_active` off. Inactive rows
/// stay in place because audit and history reads depend on them.
#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    params(("id" = Uuid, Path, description = "Contact ID")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 403, description = "Out of scope"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn deactivate_contact(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    let contact = load_scoped_contact(&state, &scope, id).await?;

    if !state.repo.deactivate_contact(contact.id).await {
        return Err(ApiError::NotFound);
    }

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "contact.deactivate".to_string(),
            entity_type: "contact".to_string(),
            entity_id: Some(contact.id),
            old_value: Some(json!({ "is_active": true }).to_string()),
            new_value: Some(json!({ "is_active": false }).to_string()),
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// --- Interactions ---

/// list_contact_interactions
///
/// [Authenticated Route] Interactions of one contact. Scope is checked on
/// the parent contact; the rows inherit its block.
#[utoipa::path(
    get,
    path = "/contacts/{id}/interactions",
    params(("id" = Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Interactions", body = [InteractionResponse]),
        (status = 403, description = "Out of scope"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_contact_interactions(
    principal: Principal,
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Vec<InteractionResponse>>, ApiError> {
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    let contact = load_scoped_contact(&state, &scope, contact_id).await?;

    let interactions = state.repo.list_interactions(contact.id).await;
    Ok(Json(
        interactions
            .iter()
            .map(|i| present_interaction(&state.cipher, i))
            .collect(),
    ))
}

/// add_interaction
///
/// [Authenticated Route] Logs a touchpoint against a contact in scope. The
/// comment is encrypted before persistence; the parent's block id is
/// denormalized onto the row for scope filtering.
#[utoipa::path(
    post,
    path = "/contacts/{id}/interactions",
    params(("id" = Uuid, Path, description = "Contact ID")),
    request_body = CreateInteractionRequest,
    responses(
        (status = 201, description = "Created", body = InteractionResponse),
        (status = 403, description = "Out of scope"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_interaction(
    principal: Principal,
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
    Json(payload): Json<CreateInteractionRequest>,
) -> Result<(StatusCode, Json<InteractionResponse>), ApiError> {
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    let contact = load_scoped_contact(&state, &scope, contact_id).await?;

    let interaction = state
        .repo
        .add_interaction(NewInteraction {
            contact_id: contact.id,
            block_id: contact.block_id,
            kind: payload.kind,
            comment: state.cipher.encrypt(&payload.comment),
            occurred_at: payload.occurred_at.unwrap_or_else(Utc::now),
            created_by: principal.id,
        })
        .await
        .ok_or(ApiError::Internal)?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "interaction.create".to_string(),
            entity_type: "interaction".to_string(),
            entity_id: Some(interaction.id),
            old_value: None,
            new_value: None,
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(present_interaction(&state.cipher, &interaction)),
    ))
}

/// deactivate_interaction
///
/// [Authenticated Route] Soft-deletes one interaction, gated by the block
/// it inherited from its contact.
#[utoipa::path(
    delete,
    path = "/interactions/{id}",
    params(("id" = Uuid, Path, description = "Interaction ID")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 403, description = "Out of scope"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn deactivate_interaction(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let interaction = state
        .repo
        .get_interaction(id)
        .await
        .ok_or(ApiError::NotFound)?;
    let scope = scope::resolve_for(state.repo.as_ref(), &principal).await;
    if !scope.can_access(interaction.block_id) {
        return Err(ApiError::ScopeDenied);
    }

    if !state.repo.deactivate_interaction(interaction.id).await {
        return Err(ApiError::NotFound);
    }

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "interaction.deactivate".to_string(),
            entity_type: "interaction".to_string(),
            entity_id: Some(interaction.id),
            old_value: Some(json!({ "is_active": true }).to_string()),
            new_value: Some(json!({ "is_active": false }).to_string()),
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// --- Watchlist ---

/// list_watchlist
///
/// [Authenticated Route] The watchlist domain is not block-scoped: it is
/// gated purely by role (ThreatAnalyst or Admin).
#[utoipa::path(
    get,
    path = "/watchlist",
    responses(
        (status = 200, description = "Watchlist", body = [WatchlistItemResponse]),
        (status = 403, description = "Curators have no watchlist access")
    )
)]
pub async fn list_watchlist(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<WatchlistItemResponse>>, ApiError> {
    require_watchlist_access(&principal)?;
    let items = state.repo.list_watchlist().await;
    Ok(Json(
        items
            .iter()
            .map(|i| present_watchlist_item(&state.cipher, i))
            .collect(),
    ))
}

/// create_watchlist_item
///
/// [Authenticated Route] Adds a watchlist item (analyst/admin only).
#[utoipa::path(
    post,
    path = "/watchlist",
    request_body = CreateWatchlistItemRequest,
    responses(
        (status = 201, description = "Created", body = WatchlistItemResponse),
        (status = 403, description = "Curators have no watchlist access")
    )
)]
pub async fn create_watchlist_item(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateWatchlistItemRequest>,
) -> Result<(StatusCode, Json<WatchlistItemResponse>), ApiError> {
    require_watchlist_access(&principal)?;

    let item = state
        .repo
        .create_watchlist_item(NewWatchlistItem {
            label: payload.label,
            notes: state.cipher.encrypt_opt(payload.notes.as_deref()),
            severity: payload.severity,
            created_by: principal.id,
        })
        .await
        .ok_or(ApiError::Internal)?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "watchlist.create".to_string(),
            entity_type: "watchlist_item".to_string(),
            entity_id: Some(item.id),
            old_value: None,
            new_value: None,
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(present_watchlist_item(&state.cipher, &item)),
    ))
}

/// update_watchlist_item
///
/// [Authenticated Route] Partial update of a watchlist item.
#[utoipa::path(
    put,
    path = "/watchlist/{id}",
    params(("id" = Uuid, Path, description = "Watchlist item ID")),
    request_body = UpdateWatchlistItemRequest,
    responses(
        (status = 200, description = "Updated", body = WatchlistItemResponse),
        (status = 403, description = "Curators have no watchlist access"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_watchlist_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWatchlistItemRequest>,
) -> Result<Json<WatchlistItemResponse>, ApiError> {
    require_watchlist_access(&principal)?;

    let updated = state
        .repo
        .update_watchlist_item(
            id,
            WatchlistUpdate {
                label: payload.label,
                notes: payload.notes.map(|n| state.cipher.encrypt(&n)),
                severity: payload.severity,
            },
        )
        .await
        .ok_or(ApiError::NotFound)?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "watchlist.update".to_string(),
            entity_type: "watchlist_item".to_string(),
            entity_id: Some(updated.id),
            old_value: None,
            new_value: None,
        })
        .await;

    Ok(Json(present_watchlist_item(&state.cipher, &updated)))
}

/// deactivate_watchlist_item
///
/// [Authenticated Route] Soft delete of a watchlist item.
#[utoipa::path(
    delete,
    path = "/watchlist/{id}",
    params(("id" = Uuid, Path, description = "Watchlist item ID")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 403, description = "Curators have no watchlist access"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn deactivate_watchlist_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_watchlist_access(&principal)?;

    if !state.repo.deactivate_watchlist_item(id).await {
        return Err(ApiError::NotFound);
    }

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "watchlist.deactivate".to_string(),
            entity_type: "watchlist_item".to_string(),
            entity_id: Some(id),
            old_value: Some(json!({ "is_active": true }).to_string()),
            new_value: Some(json!({ "is_active": false }).to_string()),
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = DashboardStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    require_admin(&principal)?;
    Ok(Json(state.repo.get_stats().await))
}

/// list_users
///
/// [Admin Route] All users (active and deactivated), decrypted names.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&principal)?;
    let users = state.repo.list_users().await;
    Ok(Json(
        users
            .iter()
            .map(|u| present_user(&state.cipher, u))
            .collect(),
    ))
}

/// create_user
///
/// [Admin Route] Provisions an account. The password is hashed (Argon2id)
/// and the name encrypted before anything reaches the repository; new
/// accounts start with `first_login=true`, forcing MFA enrollment.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserResponse),
        (status = 400, description = "Login already taken"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_user(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_admin(&principal)?;

    if payload.login.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("login and password are required"));
    }

    let password_hash = hash_password(&payload.password).map_err(|_| ApiError::Internal)?;
    let user = state
        .repo
        .create_user(NewUser {
            login: payload.login,
            full_name: state.cipher.encrypt(&payload.full_name),
            password_hash,
            role: payload.role.as_str().to_string(),
        })
        .await
        .ok_or(ApiError::BadRequest("login already taken"))?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "user.create".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(user.id),
            old_value: None,
            new_value: Some(json!({ "role": user.role }).to_string()),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(present_user(&state.cipher, &user)),
    ))
}

/// deactivate_user
///
/// [Admin Route] Soft delete; the row stays for audit history and any
/// outstanding session token dies at the extractor's is_active check.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn deactivate_user(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin(&principal)?;

    if !state.repo.deactivate_user(id).await {
        return Err(ApiError::NotFound);
    }

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "user.deactivate".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(id),
            old_value: Some(json!({ "is_active": true }).to_string()),
            new_value: Some(json!({ "is_active": false }).to_string()),
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// create_block
///
/// [Admin Route] Creates an organizational block.
#[utoipa::path(
    post,
    path = "/admin/blocks",
    request_body = CreateBlockRequest,
    responses(
        (status = 201, description = "Created", body = Block),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_block(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateBlockRequest>,
) -> Result<(StatusCode, Json<Block>), ApiError> {
    require_admin(&principal)?;

    let block = state
        .repo
        .create_block(&payload.name, payload.description.as_deref())
        .await
        .ok_or(ApiError::Internal)?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "block.create".to_string(),
            entity_type: "block".to_string(),
            entity_id: Some(block.id),
            old_value: None,
            new_value: Some(json!({ "name": block.name }).to_string()),
        })
        .await;

    Ok((StatusCode::CREATED, Json(block)))
}

/// update_block
///
/// [Admin Route] Partial update of a block.
#[utoipa::path(
    put,
    path = "/admin/blocks/{id}",
    params(("id" = Uuid, Path, description = "Block ID")),
    request_body = UpdateBlockRequest,
    responses(
        (status = 200, description = "Updated", body = Block),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_block(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlockRequest>,
) -> Result<Json<Block>, ApiError> {
    require_admin(&principal)?;
    let block = state
        .repo
        .update_block(id, payload)
        .await
        .ok_or(ApiError::NotFound)?;

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "block.update".to_string(),
            entity_type: "block".to_string(),
            entity_id: Some(block.id),
            old_value: None,
            new_value: None,
        })
        .await;

    Ok(Json(block))
}

/// deactivate_block
///
/// [Admin Route] Soft delete of a block. Assignments stay in place; a
/// deactivated block simply stops appearing in listings.
#[utoipa::path(
    delete,
    path = "/admin/blocks/{id}",
    params(("id" = Uuid, Path, description = "Block ID")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn deactivate_block(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin(&principal)?;

    if !state.repo.deactivate_block(id).await {
        return Err(ApiError::NotFound);
    }

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "block.deactivate".to_string(),
            entity_type: "block".to_string(),
            entity_id: Some(id),
            old_value: Some(json!({ "is_active": true }).to_string()),
            new_value: Some(json!({ "is_active": false }).to_string()),
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// list_block_assignments
///
/// [Admin Route] Who is assigned to a block, and in which capacity.
#[utoipa::path(
    get,
    path = "/admin/blocks/{id}/assignments",
    params(("id" = Uuid, Path, description = "Block ID")),
    responses(
        (status = 200, description = "Assignments", body = [BlockAssignment]),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_block_assignments(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BlockAssignment>>, ApiError> {
    require_admin(&principal)?;
    // 404 for a block that does not exist, even to an admin.
    state.repo.get_block(id).await.ok_or(ApiError::NotFound)?;
    Ok(Json(state.repo.list_block_assignments(id).await))
}

/// add_assignment
///
/// [Admin Route] Links a curator to a block. Idempotent at the storage
/// layer; re-adding the same (block, user, kind) triple is a 400.
#[utoipa::path(
    post,
    path = "/admin/assignments",
    request_body = AssignmentRequest,
    responses(
        (status = 201, description = "Assigned"),
        (status = 400, description = "Duplicate assignment"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Block or user not found")
    )
)]
pub async fn add_assignment(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentRequest>,
) -> Result<StatusCode, ApiError> {
    require_admin(&principal)?;

    state
        .repo
        .get_block(payload.block_id)
        .await
        .ok_or(ApiError::NotFound)?;
    state
        .repo
        .get_user(payload.user_id)
        .await
        .ok_or(ApiError::NotFound)?;

    if !state
        .repo
        .add_assignment(payload.block_id, payload.user_id, payload.kind.as_str())
        .await
    {
        return Err(ApiError::BadRequest("assignment already exists"));
    }

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "assignment.create".to_string(),
            entity_type: "block_assignment".to_string(),
            entity_id: Some(payload.block_id),
            old_value: None,
            new_value: Some(
                json!({ "user_id": payload.user_id, "kind": payload.kind.as_str() }).to_string(),
            ),
        })
        .await;

    Ok(StatusCode::CREATED)
}

/// remove_assignment
///
/// [Admin Route] Unlinks a curator from a block. Assignments are removed
/// explicitly and only explicitly; they never expire on their own.
#[utoipa::path(
    delete,
    path = "/admin/assignments",
    request_body = AssignmentRequest,
    responses(
        (status = 204, description = "Removed"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such assignment")
    )
)]
pub async fn remove_assignment(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentRequest>,
) -> Result<StatusCode, ApiError> {
    require_admin(&principal)?;

    if !state
        .repo
        .remove_assignment(payload.block_id, payload.user_id, payload.kind.as_str())
        .await
    {
        return Err(ApiError::NotFound);
    }

    state
        .repo
        .record_audit(NewAuditEntry {
            user_id: principal.id,
            action: "assignment.remove".to_string(),
            entity_type: "block_assignment".to_string(),
            entity_id: Some(payload.block_id),
            old_value: Some(
                json!({ "user_id": payload.user_id, "kind": payload.kind.as_str() }).to_string(),
            ),
            new_value: None,
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// list_audit
///
/// [Admin Route] The compliance trail, newest first.
#[utoipa::path(
    get,
    path = "/admin/audit",
    params(AuditFilter),
    responses(
        (status = 200, description = "Audit entries", body = [AuditEntry]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_audit(
    principal: Principal,
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    require_admin(&principal)?;
    let limit = filter.limit.unwrap_or(100).clamp(1, 1000);
    Ok(Json(state.repo.list_audit(limit).await))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Role & Assignment Enums (API boundary types) ---

/// Role
///
/// The three role families recognized by the access-control layer. Rows store
/// the role as text (like every other enum-ish column here); this type is the
/// parsed form carried by the `Principal` and consulted by the scope resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    /// Unrestricted access to every block-scoped domain plus administration.
    Admin,
    /// Access limited to blocks the user holds an assignment for.
    Curator,
    /// No block-scoped access; works the (unscoped) watchlist domain.
    ThreatAnalyst,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Curator => "curator",
            Role::ThreatAnalyst => "threat_analyst",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "curator" => Some(Role::Curator),
            "threat_analyst" => Some(Role::ThreatAnalyst),
            _ => None,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Curator
    }
}

/// AssignmentKind
///
/// The capacity in which a curator is attached to a block. A user may hold
/// both kinds for the same block, but not the same kind twice (enforced by
/// the unique constraint on the assignment triple).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AssignmentKind {
    Primary,
    Backup,
}

impl AssignmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentKind::Primary => "primary",
            AssignmentKind::Backup => "backup",
        }
    }
}

impl Default for AssignmentKind {
    fn default() -> Self {
        AssignmentKind::Primary
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. Besides identity and
/// RBAC fields it embeds the MFA state: `mfa_secret` unset means enrollment
/// has not started; set with `mfa_enabled=false` means pending confirmation;
/// `mfa_enabled=true` means verification is required on every login.
///
/// `full_name` is ciphertext at rest; `password_hash` and `mfa_secret` are
/// never serialized into responses (responses use `UserResponse`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    /// Login name. Uniqueness and lookup are case-sensitive, deliberately.
    pub login: String,
    /// ENCRYPTED at rest.
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Stored as text: 'admin' | 'curator' | 'threat_analyst'.
    pub role: String,
    /// Base32 TOTP secret; None until enrollment starts.
    #[serde(skip_serializing)]
    pub mfa_secret: Option<String>,
    pub mfa_enabled: bool,
    /// Forces MFA enrollment before anything else succeeds. True on creation.
    pub first_login: bool,
    /// Soft-delete flag; deactivated users keep their rows for audit history.
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

/// Block
///
/// The organizational grouping of contacts that anchors access scope.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Block {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// BlockAssignment
///
/// Many-to-many link between curators and blocks. Created by an Admin,
/// deleted explicitly, never implicitly expired. The scope resolver takes
/// the union over both kinds.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct BlockAssignment {
    pub block_id: Uuid,
    pub user_id: Uuid,
    /// Stored as text: 'primary' | 'backup'.
    pub kind: String,
}

/// Contact
///
/// A block-scoped contact record. `full_name` and `notes` are ciphertext at
/// rest; handlers decrypt immediately before building a `ContactResponse`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Contact {
    pub id: Uuid,
    /// Anchors the access-scope check.
    pub block_id: Uuid,
    /// ENCRYPTED at rest.
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// ENCRYPTED at rest.
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Interaction
///
/// A logged touchpoint with a contact. Carries the parent contact's
/// `block_id` denormalized so list queries can apply the scope filter
/// without a join. `comment` is ciphertext at rest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Interaction {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub block_id: Uuid,
    /// Free-form channel tag: 'call' | 'email' | 'meeting' | 'note' | ...
    pub kind: String,
    /// ENCRYPTED at rest.
    pub comment: String,
    pub occurred_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// WatchlistItem
///
/// Threat-analyst domain record. Not anchored to a block; access is gated
/// by role (Admin or ThreatAnalyst) rather than by the scope resolver.
/// `notes` is ciphertext at rest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct WatchlistItem {
    pub id: Uuid,
    pub label: String,
    /// ENCRYPTED at rest.
    pub notes: Option<String>,
    pub severity: String,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// AuditEntry
///
/// Post-hoc compliance trail row, written by controllers after scope and
/// encryption decisions have been made. Values hold small JSON snapshots
/// for status toggles and are never decrypted PII.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Auth Payloads ---

/// LoginRequest
///
/// Input for POST /auth/login. The login is matched case-sensitively.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// LoginResponse
///
/// Three-way outcome of the login branch: `setup_required` (fresh account,
/// no token yet), `mfa_required` (enrolled, must verify a code), or `ok`
/// with a session token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub status: String,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// MfaSetupRequest
///
/// Input for POST /auth/mfa/setup. The user id travels as a string so a
/// malformed value resolves to NotFound instead of a routing-layer reject.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MfaSetupRequest {
    pub user_id: String,
    pub password: String,
}

/// MfaSetupResponse
///
/// The freshly generated shared secret plus the otpauth provisioning URI
/// the frontend renders as a QR code.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MfaSetupResponse {
    pub user_id: Uuid,
    pub secret: String,
    pub otpauth_url: String,
}

/// MfaVerifyRequest
///
/// Input for POST /auth/mfa/verify.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MfaVerifyRequest {
    pub user_id: String,
    pub code: String,
}

/// MfaVerifyResponse
///
/// Issued session token after a successful code verification.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MfaVerifyResponse {
    pub token: String,
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Admin-only user provisioning. The password is hashed locally (Argon2id)
/// before it reaches the repository; it is never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub login: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

/// CreateBlockRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBlockRequest {
    pub name: String,
    pub description: Option<String>,
}

/// UpdateBlockRequest
///
/// Partial update; only `Some` fields are written (COALESCE in the query).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateBlockRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// AssignmentRequest
///
/// Input for creating or removing a block assignment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AssignmentRequest {
    pub block_id: Uuid,
    pub user_id: Uuid,
    pub kind: AssignmentKind,
}

/// CreateContactRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateContactRequest {
    pub block_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// UpdateContactRequest
///
/// Partial update payload; sensitive fields are re-encrypted when present.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateContactRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// CreateInteractionRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateInteractionRequest {
    pub kind: String,
    pub comment: String,
    /// Defaults to "now" when omitted.
    #[ts(type = "string | null")]
    pub occurred_at: Option<DateTime<Utc>>,
}

/// CreateWatchlistItemRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateWatchlistItemRequest {
    pub label: String,
    pub notes: Option<String>,
    pub severity: String,
}

/// UpdateWatchlistItemRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateWatchlistItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

// --- Response Schemas (Output, decrypted at the read boundary) ---

/// UserResponse
///
/// Safe projection of a `User`: decrypted name, no hash, no secret.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub login: String,
    pub full_name: String,
    pub role: String,
    pub mfa_enabled: bool,
    pub first_login: bool,
    pub is_active: bool,
    #[ts(type = "string | null")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ContactResponse
///
/// A `Contact` with its encrypted fields decrypted for presentation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactResponse {
    pub id: Uuid,
    pub block_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// InteractionResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct InteractionResponse {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub block_id: Uuid,
    pub kind: String,
    pub comment: String,
    #[ts(type = "string")]
    pub occurred_at: DateTime<Utc>,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// WatchlistItemResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct WatchlistItemResponse {
    pub id: Uuid,
    pub label: String,
    pub notes: Option<String>,
    pub severity: String,
    pub created_by: Uuid,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// DashboardStats
///
/// Output schema for the administrative statistics endpoint (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_blocks: i64,
    pub total_contacts: i64,
    pub total_curators: i64,
    pub total_interactions: i64,
    /// Active (non-deactivated) watchlist items.
    pub open_watchlist_items: i64,
}

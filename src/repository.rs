use crate::{
    models::{
        AuditEntry, Block, BlockAssignment, Contact, DashboardStats, Interaction, UpdateBlockRequest,
        User, WatchlistItem,
    },
    scope::AccessScope,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

// --- Storage-shaped write payloads ---
//
// These carry values in their at-rest form: every ENCRYPTED field has
// already been run through the codec by the calling handler. The repository
// never sees plaintext PII.

/// NewUser
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub login: String,
    /// Already encrypted.
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
}

/// NewContact
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub block_id: Uuid,
    /// Already encrypted.
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Already encrypted.
    pub notes: Option<String>,
}

/// ContactUpdate
///
/// Partial update in at-rest form; `None` fields keep their current value
/// (COALESCE in the query).
#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// NewInteraction
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub contact_id: Uuid,
    /// Denormalized from the parent contact by the handler.
    pub block_id: Uuid,
    pub kind: String,
    /// Already encrypted.
    pub comment: String,
    pub occurred_at: DateTime<Utc>,
    pub created_by: Uuid,
}

/// NewWatchlistItem
#[derive(Debug, Clone, Default)]
pub struct NewWatchlistItem {
    pub label: String,
    /// Already encrypted.
    pub notes: Option<String>,
    pub severity: String,
    pub created_by: Uuid,
}

/// WatchlistUpdate
#[derive(Debug, Clone, Default)]
pub struct WatchlistUpdate {
    pub label: Option<String>,
    pub notes: Option<String>,
    pub severity: Option<String>,
}

/// NewAuditEntry
#[derive(Debug, Clone, Default)]
pub struct NewAuditEntry {
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing
/// handlers and the MFA state machine to interact with the data layer
/// without knowing the specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users / identity ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    /// Case-sensitive exact match on the login column. No normalization.
    async fn find_user_by_login(&self, login: &str) -> Option<User>;
    async fn create_user(&self, new: NewUser) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;
    /// Soft delete: flips `is_active` off, keeps the row.
    async fn deactivate_user(&self, id: Uuid) -> bool;

    // --- MFA state transitions (single-row updates, last write wins) ---
    /// Stores a fresh TOTP secret: Unset/Pending -> Pending. Also clears
    /// `first_login`; `mfa_enabled` stays false until verification.
    async fn store_mfa_secret(&self, id: Uuid, secret: &str) -> bool;
    /// Pending/Enabled -> Enabled. Idempotent; also stamps `last_login_at`.
    async fn enable_mfa(&self, id: Uuid) -> bool;
    async fn update_last_login(&self, id: Uuid) -> bool;

    // --- Blocks ---
    async fn create_block(&self, name: &str, description: Option<&str>) -> Option<Block>;
    async fn get_block(&self, id: Uuid) -> Option<Block>;
    /// Scope-filtered listing: unfiltered for the Admin sentinel, otherwise
    /// narrowed to the scope's block ids.
    async fn list_blocks(&self, scope: &AccessScope) -> Vec<Block>;
    async fn update_block(&self, id: Uuid, req: UpdateBlockRequest) -> Option<Block>;
    async fn deactivate_block(&self, id: Uuid) -> bool;

    // --- Block assignments ---
    async fn get_assignments_for_user(&self, user_id: Uuid) -> Vec<BlockAssignment>;
    async fn list_block_assignments(&self, block_id: Uuid) -> Vec<BlockAssignment>;
    /// Idempotent insert: returns true only if a new row was created.
    async fn add_assignment(&self, block_id: Uuid, user_id: Uuid, kind: &str) -> bool;
    async fn remove_assignment(&self, block_id: Uuid, user_id: Uuid, kind: &str) -> bool;

    // --- Contacts ---
    async fn create_contact(&self, new: NewContact) -> Option<Contact>;
    async fn get_contact(&self, id: Uuid) -> Option<Contact>;
    async fn list_contacts(&self, scope: &AccessScope, block_id: Option<Uuid>) -> Vec<Contact>;
    async fn update_contact(&self, id: Uuid, update: ContactUpdate) -> Option<Contact>;
    async fn deactivate_contact(&self, id: Uuid) -> bool;

    // --- Interactions ---
    async fn add_interaction(&self, new: NewInteraction) -> Option<Interaction>;
    async fn get_interaction(&self, id: Uuid) -> Option<Interaction>;
    async fn list_interactions(&self, contact_id: Uuid) -> Vec<Interaction>;
    async fn deactivate_interaction(&self, id: Uuid) -> bool;

    // --- Watchlist (unscoped domain) ---
    async fn create_watchlist_item(&self, new: NewWatchlistItem) -> Option<WatchlistItem>;
    async fn get_watchlist_item(&self, id: Uuid) -> Option<WatchlistItem>;
    async fn list_watchlist(&self) -> Vec<WatchlistItem>;
    async fn update_watchlist_item(&self, id: Uuid, update: WatchlistUpdate)
    -> Option<WatchlistItem>;
    async fn deactivate_watchlist_item(&self, id: Uuid) -> bool;

    // --- Audit & dashboard ---
    async fn record_audit(&self, entry: NewAuditEntry);
    async fn list_audit(&self, limit: i64) -> Vec<AuditEntry>;
    async fn get_stats(&self) -> DashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by
/// PostgreSQL. Queries are runtime-checked (`sqlx::query_as`), so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

const USER_COLS: &str = "id, login, full_name, password_hash, role, mfa_secret, \
     mfa_enabled, first_login, is_active, last_login_at, created_at, updated_at";
const BLOCK_COLS: &str = "id, name, description, is_active, created_at, updated_at";
const CONTACT_COLS: &str =
    "id, block_id, full_name, email, phone, notes, is_active, created_at, updated_at";
const INTERACTION_COLS: &str =
    "id, contact_id, block_id, kind, comment, occurred_at, created_by, is_active, created_at";
const WATCHLIST_COLS: &str =
    "id, label, notes, severity, created_by, is_active, created_at, updated_at";

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users ---

    async fn get_user(&self, id: Uuid) -> Option<User> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// Exact `=` comparison: logins are case-sensitive by design and tests
    /// assert it, so no ILIKE/lower() here.
    async fn find_user_by_login(&self, login: &str) -> Option<User> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE login = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("find_user_by_login error: {:?}", e);
                None
            })
    }

    async fn create_user(&self, new: NewUser) -> Option<User> {
        let sql = format!(
            "INSERT INTO users (id, login, full_name, password_hash, role, mfa_secret, \
             mfa_enabled, first_login, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NULL, false, true, true, NOW(), NOW()) \
             RETURNING {USER_COLS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.login)
            .bind(new.full_name)
            .bind(new.password_hash)
            .bind(new.role)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                // Unique violation on login lands here too.
                tracing::error!("create_user error: {:?}", e);
                None
            })
    }

    async fn list_users(&self) -> Vec<User> {
        let sql = format!("SELECT {USER_COLS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            })
    }

    async fn deactivate_user(&self, id: Uuid) -> bool {
        execute_bool(
            sqlx::query("UPDATE users SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await,
            "deactivate_user",
        )
    }

    // --- MFA transitions ---

    async fn store_mfa_secret(&self, id: Uuid, secret: &str) -> bool {
        execute_bool(
            sqlx::query(
                "UPDATE users SET mfa_secret = $2, mfa_enabled = false, first_login = false, \
                 updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .bind(secret)
            .execute(&self.pool)
            .await,
            "store_mfa_secret",
        )
    }

    async fn enable_mfa(&self, id: Uuid) -> bool {
        // Idempotent: re-running against an already-enabled row affects the
        // row again (stamping last_login_at) and stays enabled.
        execute_bool(
            sqlx::query(
                "UPDATE users SET mfa_enabled = true, last_login_at = NOW(), updated_at = NOW() \
                 WHERE id = $1 AND mfa_secret IS NOT NULL",
            )
            .bind(id)
            .execute(&self.pool)
            .await,
            "enable_mfa",
        )
    }

    async fn update_last_login(&self, id: Uuid) -> bool {
        execute_bool(
            sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await,
            "update_last_login",
        )
    }

    // --- Blocks ---

    async fn create_block(&self, name: &str, description: Option<&str>) -> Option<Block> {
        let sql = format!(
            "INSERT INTO blocks (id, name, description, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, true, NOW(), NOW()) RETURNING {BLOCK_COLS}"
        );
        sqlx::query_as::<_, Block>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(description)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_block error: {:?}", e);
                None
            })
    }

    async fn get_block(&self, id: Uuid) -> Option<Block> {
        let sql = format!("SELECT {BLOCK_COLS} FROM blocks WHERE id = $1");
        sqlx::query_as::<_, Block>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_block error: {:?}", e);
                None
            })
    }

    /// Scope filtering via QueryBuilder: the Admin sentinel adds no WHERE
    /// clause at all, rather than materializing a list of every block id.
    async fn list_blocks(&self, scope: &AccessScope) -> Vec<Block> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {BLOCK_COLS} FROM blocks WHERE is_active = true"
        ));

        if let Some(ids) = scope.block_ids() {
            if ids.is_empty() {
                return vec![];
            }
            builder.push(" AND id = ANY(");
            builder.push_bind(ids);
            builder.push(")");
        }
        builder.push(" ORDER BY name ASC");

        match builder.build_query_as::<Block>().fetch_all(&self.pool).await {
            Ok(blocks) => blocks,
            Err(e) => {
                tracing::error!("list_blocks error: {:?}", e);
                vec![]
            }
        }
    }

    async fn update_block(&self, id: Uuid, req: UpdateBlockRequest) -> Option<Block> {
        let sql = format!(
            "UPDATE blocks SET name = COALESCE($2, name), \
             description = COALESCE($3, description), updated_at = NOW() \
             WHERE id = $1 RETURNING {BLOCK_COLS}"
        );
        sqlx::query_as::<_, Block>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.description)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_block error: {:?}", e);
                None
            })
    }

    async fn deactivate_block(&self, id: Uuid) -> bool {
        execute_bool(
            sqlx::query("UPDATE blocks SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await,
            "deactivate_block",
        )
    }

    // --- Assignments ---

    async fn get_assignments_for_user(&self, user_id: Uuid) -> Vec<BlockAssignment> {
        sqlx::query_as::<_, BlockAssignment>(
            "SELECT block_id, user_id, kind FROM block_assignments WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_assignments_for_user error: {:?}", e);
            vec![]
        })
    }

    async fn list_block_assignments(&self, block_id: Uuid) -> Vec<BlockAssignment> {
        sqlx::query_as::<_, BlockAssignment>(
            "SELECT block_id, user_id, kind FROM block_assignments WHERE block_id = $1 \
             ORDER BY kind ASC",
        )
        .bind(block_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_block_assignments error: {:?}", e);
            vec![]
        })
    }

    /// Uses `ON CONFLICT DO NOTHING` on the (block_id, user_id, kind)
    /// unique constraint: holding the same kind twice is a no-op, holding
    /// both kinds is two rows.
    async fn add_assignment(&self, block_id: Uuid, user_id: Uuid, kind: &str) -> bool {
        execute_bool(
            sqlx::query(
                "INSERT INTO block_assignments (block_id, user_id, kind) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(block_id)
            .bind(user_id)
            .bind(kind)
            .execute(&self.pool)
            .await,
            "add_assignment",
        )
    }

    async fn remove_assignment(&self, block_id: Uuid, user_id: Uuid, kind: &str) -> bool {
        execute_bool(
            sqlx::query(
                "DELETE FROM block_assignments WHERE block_id = $1 AND user_id = $2 AND kind = $3",
            )
            .bind(block_id)
            .bind(user_id)
            .bind(kind)
            .execute(&self.pool)
            .await,
            "remove_assignment",
        )
    }

    // --- Contacts ---

    async fn create_contact(&self, new: NewContact) -> Option<Contact> {
        let sql = format!(
            "INSERT INTO contacts (id, block_id, full_name, email, phone, notes, is_active, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, true, NOW(), NOW()) \
             RETURNING {CONTACT_COLS}"
        );
        sqlx::query_as::<_, Contact>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.block_id)
            .bind(new.full_name)
            .bind(new.email)
            .bind(new.phone)
            .bind(new.notes)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_contact error: {:?}", e);
                None
            })
    }

    /// Retrieval by id without any visibility restriction: the caller is
    /// responsible for the scope check, because "absent" (404) and "out of
    /// scope" (403) must remain distinguishable.
    async fn get_contact(&self, id: Uuid) -> Option<Contact> {
        let sql = format!("SELECT {CONTACT_COLS} FROM contacts WHERE id = $1");
        sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_contact error: {:?}", e);
                None
            })
    }

    async fn list_contacts(&self, scope: &AccessScope, block_id: Option<Uuid>) -> Vec<Contact> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {CONTACT_COLS} FROM contacts WHERE is_active = true"
        ));

        if let Some(ids) = scope.block_ids() {
            if ids.is_empty() {
                return vec![];
            }
            builder.push(" AND block_id = ANY(");
            builder.push_bind(ids);
            builder.push(")");
        }
        if let Some(block) = block_id {
            builder.push(" AND block_id = ");
            builder.push_bind(block);
        }
        builder.push(" ORDER BY created_at DESC");

        match builder
            .build_query_as::<Contact>()
            .fetch_all(&self.pool)
            .await
        {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::error!("list_contacts error: {:?}", e);
                vec![]
            }
        }
    }

    async fn update_contact(&self, id: Uuid, update: ContactUpdate) -> Option<Contact> {
        let sql = format!(
            "UPDATE contacts SET full_name = COALESCE($2, full_name), \
             email = COALESCE($3, email), phone = COALESCE($4, phone), \
             notes = COALESCE($5, notes), updated_at = NOW() \
             WHERE id = $1 RETURNING {CONTACT_COLS}"
        );
        sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(update.full_name)
            .bind(update.email)
            .bind(update.phone)
            .bind(update.notes)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_contact error: {:?}", e);
                None
            })
    }

    async fn deactivate_contact(&self, id: Uuid) -> bool {
        execute_bool(
            sqlx::query("UPDATE contacts SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await,
            "deactivate_contact",
        )
    }

    // --- Interactions ---

    async fn add_interaction(&self, new: NewInteraction) -> Option<Interaction> {
        let sql = format!(
            "INSERT INTO interactions (id, contact_id, block_id, kind, comment, occurred_at, \
             created_by, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, true, NOW()) \
             RETURNING {INTERACTION_COLS}"
        );
        sqlx::query_as::<_, Interaction>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.contact_id)
            .bind(new.block_id)
            .bind(new.kind)
            .bind(new.comment)
            .bind(new.occurred_at)
            .bind(new.created_by)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("add_interaction error: {:?}", e);
                None
            })
    }

    async fn get_interaction(&self, id: Uuid) -> Option<Interaction> {
        let sql = format!("SELECT {INTERACTION_COLS} FROM interactions WHERE id = $1");
        sqlx::query_as::<_, Interaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_interaction error: {:?}", e);
                None
            })
    }

    async fn list_interactions(&self, contact_id: Uuid) -> Vec<Interaction> {
        let sql = format!(
            "SELECT {INTERACTION_COLS} FROM interactions \
             WHERE contact_id = $1 AND is_active = true ORDER BY occurred_at DESC"
        );
        sqlx::query_as::<_, Interaction>(&sql)
            .bind(contact_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_interactions error: {:?}", e);
                vec![]
            })
    }

    async fn deactivate_interaction(&self, id: Uuid) -> bool {
        execute_bool(
            sqlx::query("UPDATE interactions SET is_active = false WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await,
            "deactivate_interaction",
        )
    }

    // --- Watchlist ---

    async fn create_watchlist_item(&self, new: NewWatchlistItem) -> Option<WatchlistItem> {
        let sql = format!(
            "INSERT INTO watchlist_items (id, label, notes, severity, created_by, is_active, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, true, NOW(), NOW()) \
             RETURNING {WATCHLIST_COLS}"
        );
        sqlx::query_as::<_, WatchlistItem>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.label)
            .bind(new.notes)
            .bind(new.severity)
            .bind(new.created_by)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_watchlist_item error: {:?}", e);
                None
            })
    }

    async fn get_watchlist_item(&self, id: Uuid) -> Option<WatchlistItem> {
        let sql = format!("SELECT {WATCHLIST_COLS} FROM watchlist_items WHERE id = $1");
        sqlx::query_as::<_, WatchlistItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_watchlist_item error: {:?}", e);
                None
            })
    }

    async fn list_watchlist(&self) -> Vec<WatchlistItem> {
        let sql = format!(
            "SELECT {WATCHLIST_COLS} FROM watchlist_items WHERE is_active = true \
             ORDER BY severity ASC, created_at DESC"
        );
        sqlx::query_as::<_, WatchlistItem>(&sql)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_watchlist error: {:?}", e);
                vec![]
            })
    }

    async fn update_watchlist_item(
        &self,
        id: Uuid,
        update: WatchlistUpdate,
    ) -> Option<WatchlistItem> {
        let sql = format!(
            "UPDATE watchlist_items SET label = COALESCE($2, label), \
             notes = COALESCE($3, notes), severity = COALESCE($4, severity), \
             updated_at = NOW() WHERE id = $1 RETURNING {WATCHLIST_COLS}"
        );
        sqlx::query_as::<_, WatchlistItem>(&sql)
            .bind(id)
            .bind(update.label)
            .bind(update.notes)
            .bind(update.severity)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_watchlist_item error: {:?}", e);
                None
            })
    }

    async fn deactivate_watchlist_item(&self, id: Uuid) -> bool {
        execute_bool(
            sqlx::query(
                "UPDATE watchlist_items SET is_active = false, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .execute(&self.pool)
            .await,
            "deactivate_watchlist_item",
        )
    }

    // --- Audit & dashboard ---

    /// Best effort by design: a failed audit write is logged but never
    /// fails the mutation it trails.
    async fn record_audit(&self, entry: NewAuditEntry) {
        let result = sqlx::query(
            "INSERT INTO audit_log (user_id, action, entity_type, entity_id, old_value, \
             new_value, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW())",
        )
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.old_value)
        .bind(entry.new_value)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!("record_audit error: {:?}", e);
        }
    }

    async fn list_audit(&self, limit: i64) -> Vec<AuditEntry> {
        sqlx::query_as::<_, AuditEntry>(
            "SELECT id, user_id, action, entity_type, entity_id, old_value, new_value, \
             created_at FROM audit_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_audit error: {:?}", e);
            vec![]
        })
    }

    /// Compiles all dashboard counters in a single call.
    async fn get_stats(&self) -> DashboardStats {
        DashboardStats {
            total_blocks: count(&self.pool, "SELECT COUNT(*) FROM blocks WHERE is_active = true")
                .await,
            total_contacts: count(
                &self.pool,
                "SELECT COUNT(*) FROM contacts WHERE is_active = true",
            )
            .await,
            total_curators: count(
                &self.pool,
                "SELECT COUNT(*) FROM users WHERE role = 'curator' AND is_active = true",
            )
            .await,
            total_interactions: count(
                &self.pool,
                "SELECT COUNT(*) FROM interactions WHERE is_active = true",
            )
            .await,
            open_watchlist_items: count(
                &self.pool,
                "SELECT COUNT(*) FROM watchlist_items WHERE is_active = true",
            )
            .await,
        }
    }
}

/// Maps an execute result to "did a row change", logging failures.
fn execute_bool(
    result: Result<sqlx::postgres::PgQueryResult, sqlx::Error>,
    op: &str,
) -> bool {
    match result {
        Ok(res) => res.rows_affected() > 0,
        Err(e) => {
            tracing::error!("{op} error: {:?}", e);
            false
        }
    }
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("count error: {:?}", e);
            0
        })
}

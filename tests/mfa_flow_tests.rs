use async_trait::async_trait;
use chrono::Utc;
use curator_crm::{
    error::ApiError,
    mfa::{self, LoginOutcome},
    models::{
        AuditEntry, Block, BlockAssignment, Contact, DashboardStats, Interaction, UpdateBlockRequest,
        User, WatchlistItem,
    },
    password::hash_password,
    repository::{
        ContactUpdate, NewAuditEntry, NewContact, NewInteraction, NewUser, NewWatchlistItem,
        Repository, WatchlistUpdate,
    },
    scope::AccessScope,
    totp,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// --- Stateful Mock Repository ---

// The MFA state machine is all about transitions on the user row, so this
// mock keeps real mutable user state behind a Mutex and implements the
// user-facing methods faithfully. Everything else is a placeholder.
#[derive(Default)]
struct MockUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MockUserStore {
    fn with_user(user: User) -> Self {
        let store = MockUserStore::default();
        store.users.lock().unwrap().insert(user.id, user);
        store
    }

    fn snapshot(&self, id: Uuid) -> User {
        self.users.lock().unwrap().get(&id).cloned().unwrap()
    }
}

#[async_trait]
impl Repository for MockUserStore {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
    async fn find_user_by_login(&self, login: &str) -> Option<User> {
        // Exact match, mirroring the `login = $1` lookup.
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.login == login)
            .cloned()
    }
    async fn create_user(&self, _new: NewUser) -> Option<User> {
        None
    }
    async fn list_users(&self) -> Vec<User> {
        self.users.lock().unwrap().values().cloned().collect()
    }
    async fn deactivate_user(&self, id: Uuid) -> bool {
        match self.users.lock().unwrap().get_mut(&id) {
            Some(user) => {
                user.is_active = false;
                true
            }
            None => false,
        }
    }
    async fn store_mfa_secret(&self, id: Uuid, secret: &str) -> bool {
        match self.users.lock().unwrap().get_mut(&id) {
            Some(user) => {
                user.mfa_secret = Some(secret.to_string());
                user.mfa_enabled = false;
                user.first_login = false;
                true
            }
            None => false,
        }
    }
    async fn enable_mfa(&self, id: Uuid) -> bool {
        match self.users.lock().unwrap().get_mut(&id) {
            Some(user) if user.mfa_secret.is_some() => {
                user.mfa_enabled = true;
                user.last_login_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }
    async fn update_last_login(&self, id: Uuid) -> bool {
        match self.users.lock().unwrap().get_mut(&id) {
            Some(user) => {
                user.last_login_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    // Placeholders for the domains this suite never touches.
    async fn create_block(&self, _name: &str, _description: Option<&str>) -> Option<Block> {
        None
    }
    async fn get_block(&self, _id: Uuid) -> Option<Block> {
        None
    }
    async fn list_blocks(&self, _scope: &AccessScope) -> Vec<Block> {
        vec![]
    }
    async fn update_block(&self, _id: Uuid, _req: UpdateBlockRequest) -> Option<Block> {
        None
    }
    async fn deactivate_block(&self, _id: Uuid) -> bool {
        false
    }
    async fn get_assignments_for_user(&self, _user_id: Uuid) -> Vec<BlockAssignment> {
        vec![]
    }
    async fn list_block_assignments(&self, _block_id: Uuid) -> Vec<BlockAssignment> {
        vec![]
    }
    async fn add_assignment(&self, _block_id: Uuid, _user_id: Uuid, _kind: &str) -> bool {
        false
    }
    async fn remove_assignment(&self, _block_id: Uuid, _user_id: Uuid, _kind: &str) -> bool {
        false
    }
    async fn create_contact(&self, _new: NewContact) -> Option<Contact> {
        None
    }
    async fn get_contact(&self, _id: Uuid) -> Option<Contact> {
        None
    }
    async fn list_contacts(&self, _scope: &AccessScope, _block_id: Option<Uuid>) -> Vec<Contact> {
        vec![]
    }
    async fn update_contact(&self, _id: Uuid, _update: ContactUpdate) -> Option<Contact> {
        None
    }
    async fn deactivate_contact(&self, _id: Uuid) -> bool {
        false
    }
    async fn add_interaction(&self, _new: NewInteraction) -> Option<Interaction> {
        None
    }
    async fn get_interaction(&self, _id: Uuid) -> Option<Interaction> {
        None
    }
    async fn list_interactions(&self, _contact_id: Uuid) -> Vec<Interaction> {
        vec![]
    }
    async fn deactivate_interaction(&self, _id: Uuid) -> bool {
        false
    }
    async fn create_watchlist_item(&self, _new: NewWatchlistItem) -> Option<WatchlistItem> {
        None
    }
    async fn get_watchlist_item(&self, _id: Uuid) -> Option<WatchlistItem> {
        None
    }
    async fn list_watchlist(&self) -> Vec<WatchlistItem> {
        vec![]
    }
    async fn update_watchlist_item(
        &self,
        _id: Uuid,
        _update: WatchlistUpdate,
    ) -> Option<WatchlistItem> {
        None
    }
    async fn deactivate_watchlist_item(&self, _id: Uuid) -> bool {
        false
    }
    async fn record_audit(&self, _entry: NewAuditEntry) {}
    async fn list_audit(&self, _limit: i64) -> Vec<AuditEntry> {
        vec![]
    }
    async fn get_stats(&self) -> DashboardStats {
        DashboardStats::default()
    }
}

// --- Test Utilities ---

const TEST_JWT_SECRET: &str = "mfa-flow-test-secret";
const PASSWORD: &str = "correct-password";

fn fresh_user(login: &str) -> User {
    User {
        id: Uuid::new_v4(),
        login: login.to_string(),
        password_hash: hash_password(PASSWORD).unwrap(),
        first_login: true,
        mfa_enabled: false,
        mfa_secret: None,
        is_active: true,
        ..User::default()
    }
}

fn current_code(secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    totp::code_at(secret, now).unwrap()
}

/// A six-digit code guaranteed to differ from `valid` in its last digit,
/// so it cannot accidentally match the current or adjacent time step.
fn wrong_code(valid: &str) -> String {
    let mut chars: Vec<char> = valid.chars().collect();
    let last = chars[5].to_digit(10).unwrap();
    chars[5] = char::from_digit((last + 5) % 10, 10).unwrap();
    chars.into_iter().collect()
}

// --- Login Branching ---

#[tokio::test]
async fn test_first_login_requires_setup() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let outcome = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", PASSWORD)
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::SetupRequired { user_id: user.id });
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let repo = MockUserStore::with_user(fresh_user("jdoe"));

    let result = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", "wrong").await;
    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_login_rejects_empty_password() {
    // Rejected before any hash comparison runs.
    let repo = MockUserStore::with_user(fresh_user("jdoe"));

    let result = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", "").await;
    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_login_rejects_unknown_account() {
    let repo = MockUserStore::default();

    let result = mfa::login(&repo, TEST_JWT_SECRET, "nobody", PASSWORD).await;
    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_login_lookup_is_case_sensitive() {
    let repo = MockUserStore::with_user(fresh_user("JDoe"));

    let result = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", PASSWORD).await;
    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_login_rejects_deactivated_account() {
    let mut user = fresh_user("jdoe");
    user.is_active = false;
    let repo = MockUserStore::with_user(user);

    let result = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", PASSWORD).await;
    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_enrolled_user_must_verify_on_login() {
    let mut user = fresh_user("jdoe");
    user.first_login = false;
    user.mfa_enabled = true;
    user.mfa_secret = Some(totp::generate_secret());
    let repo = MockUserStore::with_user(user.clone());

    let outcome = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", PASSWORD)
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::MfaRequired { user_id: user.id });
}

#[tokio::test]
async fn test_pending_user_logs_in_directly() {
    // Enrolled but never verified: no MFA step pending, so login goes
    // straight to a token and stamps last_login_at.
    let mut user = fresh_user("jdoe");
    user.first_login = false;
    user.mfa_enabled = false;
    user.mfa_secret = Some(totp::generate_secret());
    let repo = MockUserStore::with_user(user.clone());

    let outcome = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", PASSWORD)
        .await
        .unwrap();
    match outcome {
        LoginOutcome::LoggedIn { user_id, token } => {
            assert_eq!(user_id, user.id);
            assert!(!token.is_empty());
        }
        other => panic!("expected LoggedIn, got {other:?}"),
    }
    assert!(repo.snapshot(user.id).last_login_at.is_some());
}

#[tokio::test]
async fn test_setup_required_wins_over_mfa_required() {
    // An admin-reset account can have a stale secret with first_login
    // re-raised; enrollment must start over rather than verify against
    // the old secret.
    let mut user = fresh_user("jdoe");
    user.mfa_enabled = true;
    user.mfa_secret = Some(totp::generate_secret());
    let repo = MockUserStore::with_user(user.clone());

    let outcome = mfa::login(&repo, TEST_JWT_SECRET, "jdoe", PASSWORD)
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::SetupRequired { user_id: user.id });
}

// --- Enrollment (setup) ---

#[tokio::test]
async fn test_setup_stores_secret_and_clears_first_login() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let enrollment = mfa::setup(&repo, &user.id.to_string(), PASSWORD)
        .await
        .unwrap();
    assert_eq!(enrollment.user_id, user.id);
    assert!(enrollment.otpauth_url.contains("jdoe"));
    assert!(enrollment.otpauth_url.contains(&enrollment.secret));

    let stored = repo.snapshot(user.id);
    assert_eq!(stored.mfa_secret.as_deref(), Some(enrollment.secret.as_str()));
    assert!(!stored.first_login);
    // Enabled only flips at first successful verification.
    assert!(!stored.mfa_enabled);
}

#[tokio::test]
async fn test_setup_rejects_malformed_user_id() {
    let repo = MockUserStore::with_user(fresh_user("jdoe"));

    let result = mfa::setup(&repo, "not-a-uuid", PASSWORD).await;
    assert_eq!(result.unwrap_err(), ApiError::NotFound);
}

#[tokio::test]
async fn test_setup_rejects_unknown_user_id() {
    let repo = MockUserStore::with_user(fresh_user("jdoe"));

    let result = mfa::setup(&repo, &Uuid::new_v4().to_string(), PASSWORD).await;
    assert_eq!(result.unwrap_err(), ApiError::NotFound);
}

#[tokio::test]
async fn test_setup_rejects_wrong_password() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let result = mfa::setup(&repo, &user.id.to_string(), "wrong").await;
    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);

    // Nothing changed on a failed setup.
    assert!(repo.snapshot(user.id).mfa_secret.is_none());
}

#[tokio::test]
async fn test_re_setup_replaces_the_secret() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let first = mfa::setup(&repo, &user.id.to_string(), PASSWORD)
        .await
        .unwrap();
    let second = mfa::setup(&repo, &user.id.to_string(), PASSWORD)
        .await
        .unwrap();

    assert_ne!(first.secret, second.secret);
    assert_eq!(
        repo.snapshot(user.id).mfa_secret.as_deref(),
        Some(second.secret.as_str())
    );
}

// --- Verification ---

#[tokio::test]
async fn test_verify_without_setup_is_bad_request() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let result = mfa::verify(&repo, TEST_JWT_SECRET, &user.id.to_string(), "123456").await;
    assert_eq!(
        result.unwrap_err(),
        ApiError::BadRequest("mfa has not been set up")
    );
}

#[tokio::test]
async fn test_verify_rejects_malformed_user_id() {
    let repo = MockUserStore::default();

    let result = mfa::verify(&repo, TEST_JWT_SECRET, "42", "123456").await;
    assert_eq!(result.unwrap_err(), ApiError::NotFound);
}

#[tokio::test]
async fn test_full_enrollment_flow_enables_mfa_and_issues_token() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let enrollment = mfa::setup(&repo, &user.id.to_string(), PASSWORD)
        .await
        .unwrap();

    let token = mfa::verify(
        &repo,
        TEST_JWT_SECRET,
        &user.id.to_string(),
        &current_code(&enrollment.secret),
    )
    .await
    .unwrap();
    assert!(!token.is_empty());

    let stored = repo.snapshot(user.id);
    assert!(stored.mfa_enabled);
    assert!(stored.last_login_at.is_some());
}

#[tokio::test]
async fn test_verify_rejects_wrong_code() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let enrollment = mfa::setup(&repo, &user.id.to_string(), PASSWORD)
        .await
        .unwrap();
    let bad = wrong_code(&current_code(&enrollment.secret));

    let result = mfa::verify(&repo, TEST_JWT_SECRET, &user.id.to_string(), &bad).await;
    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
    assert!(!repo.snapshot(user.id).mfa_enabled);
}

#[tokio::test]
async fn test_verify_rejects_malformed_code() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    mfa::setup(&repo, &user.id.to_string(), PASSWORD)
        .await
        .unwrap();

    for code in ["", "12345", "1234567", "abcdef"] {
        let result = mfa::verify(&repo, TEST_JWT_SECRET, &user.id.to_string(), code).await;
        assert_eq!(result.unwrap_err(), ApiError::Unauthorized, "code {code:?}");
    }
}

#[tokio::test]
async fn test_verify_is_idempotent_once_enabled() {
    let user = fresh_user("jdoe");
    let repo = MockUserStore::with_user(user.clone());

    let enrollment = mfa::setup(&repo, &user.id.to_string(), PASSWORD)
        .await
        .unwrap();

    let code = current_code(&enrollment.secret);
    mfa::verify(&repo, TEST_JWT_SECRET, &user.id.to_string(), &code)
        .await
        .unwrap();
    // Verifying again with a valid code is still a success, not an error.
    let token = mfa::verify(&repo, TEST_JWT_SECRET, &user.id.to_string(), &code)
        .await
        .unwrap();
    assert!(!token.is_empty());
    assert!(repo.snapshot(user.id).mfa_enabled);
}

use async_trait::async_trait;
use curator_crm::{
    AppState, FieldCipher, create_router,
    config::AppConfig,
    models::{
        AuditEntry, Block, BlockAssignment, Contact, DashboardStats, Interaction,
        UpdateBlockRequest, User, WatchlistItem,
    },
    password::hash_password,
    repository::{
        ContactUpdate, NewAuditEntry, NewContact, NewInteraction, NewUser, NewWatchlistItem,
        Repository, WatchlistUpdate,
    },
    scope::AccessScope,
    totp,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- In-Memory Repository ---

// End-to-end smoke tests run the real router (middleware, extractors,
// JSON codecs) over an in-memory user store, so they pass without a
// database. The MFA columns behave like the Postgres implementation.
#[derive(Default)]
struct InMemoryRepo {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
    async fn find_user_by_login(&self, login: &str) -> Option<User> {
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
        vec![]
    }
    async fn deactivate_user(&self, _id: Uuid) -> bool {
        false
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

// --- Test App ---

const PASSWORD: &str = "service-test-password";

pub struct TestApp {
    pub address: String,
    pub user_id: Uuid,
}

/// Spins up the full router on an ephemeral port with one fresh (never
/// logged in) curator account seeded.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepo::default());
    let user_id = Uuid::new_v4();
    repo.users.lock().unwrap().insert(
        user_id,
        User {
            id: user_id,
            login: "jdoe".to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role: "curator".to_string(),
            first_login: true,
            is_active: true,
            ..User::default()
        },
    );

    let config = AppConfig::default();
    let state = AppState {
        repo,
        cipher: Arc::new(FieldCipher::new(&config.field_key)),
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, user_id }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_protected_route_rejects_anonymous_requests() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/contacts", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_admin_route_rejects_anonymous_requests() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/admin/stats", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_full_login_enrollment_and_session_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // 1. First login reports that enrollment is pending; no token yet.
    let response = client
        .post(format!("{}/auth/login", app.address))
        .json(&serde_json::json!({ "login": "jdoe", "password": PASSWORD }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "setup_required");
    assert_eq!(body["user_id"], app.user_id.to_string());
    assert!(body["token"].is_null());

    // 2. Enroll: password is re-verified, the secret comes back.
    let response = client
        .post(format!("{}/auth/mfa/setup", app.address))
        .json(&serde_json::json!({
            "user_id": app.user_id.to_string(),
            "password": PASSWORD,
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let secret = body["secret"].as_str().unwrap().to_string();
    assert!(body["otpauth_url"].as_str().unwrap().contains("jdoe"));

    // 3. Verify a current code; this is where the session token is minted.
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let code = totp::code_at(&secret, now).unwrap();
    let response = client
        .post(format!("{}/auth/mfa/verify", app.address))
        .json(&serde_json::json!({
            "user_id": app.user_id.to_string(),
            "code": code,
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    // 4. The token opens the authenticated surface.
    let response = client
        .get(format!("{}/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["login"], "jdoe");
    assert_eq!(body["mfa_enabled"], true);
    // The hash and secret never leave the server.
    assert!(body.get("password_hash").is_none());
    assert!(body.get("mfa_secret").is_none());

    // 5. Subsequent logins demand a code instead of handing out tokens.
    let response = client
        .post(format!("{}/auth/login", app.address))
        .json(&serde_json::json!({ "login": "jdoe", "password": PASSWORD }))
        .send()
        .await
        .expect("req fail");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "mfa_required");
}

#[tokio::test]
async fn test_login_failures_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Wrong password.
    let response = client
        .post(format!("{}/auth/login", app.address))
        .json(&serde_json::json!({ "login": "jdoe", "password": "nope" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);

    // Malformed user id on the MFA endpoints resolves to 404.
    let response = client
        .post(format!("{}/auth/mfa/setup", app.address))
        .json(&serde_json::json!({ "user_id": "42", "password": PASSWORD }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 404);

    // Verifying before setup is a state error, not a credential error.
    let response = client
        .post(format!("{}/auth/mfa/verify", app.address))
        .json(&serde_json::json!({
            "user_id": app.user_id.to_string(),
            "code": "123456",
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api-docs/openapi.json", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod mfa;
pub mod models;
pub mod password;
pub mod repository;
pub mod scope;
pub mod totp;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::Principal; // The resolved authenticated user identity.
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use crypto::{CipherState, FieldCipher};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application. It aggregates all API paths and data schemas decorated with
/// the `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::login, handlers::mfa_setup, handlers::mfa_verify,
        handlers::get_me, handlers::list_blocks, handlers::get_block_details,
        handlers::list_contacts, handlers::get_contact_details, handlers::create_contact,
        handlers::update_contact, handlers::deactivate_contact,
        handlers::list_contact_interactions, handlers::add_interaction,
        handlers::deactivate_interaction,
        handlers::list_watchlist, handlers::create_watchlist_item,
        handlers::update_watchlist_item, handlers::deactivate_watchlist_item,
        handlers::get_admin_stats, handlers::list_users, handlers::create_user,
        handlers::deactivate_user, handlers::create_block, handlers::update_block,
        handlers::deactivate_block, handlers::list_block_assignments,
        handlers::add_assignment, handlers::remove_assignment, handlers::list_audit
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::LoginRequest, models::LoginResponse,
            models::MfaSetupRequest, models::MfaSetupResponse,
            models::MfaVerifyRequest, models::MfaVerifyResponse,
            models::Block, models::BlockAssignment, models::AuditEntry,
            models::CreateUserRequest, models::CreateBlockRequest, models::UpdateBlockRequest,
            models::AssignmentRequest, models::CreateContactRequest, models::UpdateContactRequest,
            models::CreateInteractionRequest, models::CreateWatchlistItemRequest,
            models::UpdateWatchlistItemRequest,
            models::UserResponse, models::ContactResponse, models::InteractionResponse,
            models::WatchlistItemResponse, models::DashboardStats,
            models::Role, models::AssignmentKind,
        )
    ),
    tags(
        (name = "curator-crm", description = "Curator Contact Management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all essential
/// application services and configuration, shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Field Cipher: Encrypts/decrypts sensitive columns at the API boundary.
    pub cipher: CipherState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These allow handlers and extractors to selectively pull components from
// the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for CipherState {
    fn from_ref(app_state: &AppState) -> CipherState {
        app_state.cipher.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes`.
///
/// *Mechanism*: It attempts to extract `Principal` from the request. Since
/// `Principal` implements `FromRequestParts`, if authentication (JWT
/// validation, DB lookup, is_active check) fails, the extractor rejects the
/// request with 401 Unauthorized before the handler runs.
async fn auth_middleware(_principal: Principal, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the `auth_middleware`.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin Routes: Nested under '/admin'. The 'admin' role check is
        // performed *inside* the handlers after authentication.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: Wraps the request/response lifecycle in
                // a tracing span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: return x-request-id to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation. It extracts the
/// `x-request-id` header (if present) and includes it in the structured
/// logging metadata alongside the HTTP method and URI, so every log line
/// for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the 'admin' role:
/// account provisioning, block management, curator assignments and the
/// audit trail.
///
/// Access Control:
/// This entire router is nested under '/admin' behind the authentication
/// layer; each handler then explicitly checks for `role='admin'` before
/// doing any work. The double check keeps a routing mistake from ever
/// exposing a moderation endpoint.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Dashboard counters (blocks, contacts, curators, interactions,
        // open watchlist items).
        .route("/stats", get(handlers::get_admin_stats))
        // GET/POST /admin/users
        // Lists every account (active and deactivated) / provisions a new one.
        // New accounts start with first_login=true, forcing MFA enrollment.
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // DELETE /admin/users/{id}
        // Soft delete; outstanding session tokens die at the extractor.
        .route("/users/{id}", delete(handlers::deactivate_user))
        // POST /admin/blocks
        // Creates an organizational block.
        .route("/blocks", post(handlers::create_block))
        // PUT/DELETE /admin/blocks/{id}
        // Renames/re-describes or soft-deletes a block.
        .route(
            "/blocks/{id}",
            put(handlers::update_block).delete(handlers::deactivate_block),
        )
        // GET /admin/blocks/{id}/assignments
        // Lists who is assigned to a block and in which capacity.
        .route(
            "/blocks/{id}/assignments",
            get(handlers::list_block_assignments),
        )
        // POST/DELETE /admin/assignments
        // Links or unlinks a curator and a block. Assignments never expire;
        // they are removed only through this endpoint.
        .route(
            "/assignments",
            post(handlers::add_assignment).delete(handlers::remove_assignment),
        )
        // GET /admin/audit?limit=...
        // The compliance trail, newest first.
        .route("/audit", get(handlers::list_audit))
}

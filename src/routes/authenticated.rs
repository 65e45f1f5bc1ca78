use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user with a valid session. This is
/// the day-to-day working surface: blocks, contacts, interactions and the
/// analyst watchlist.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `Principal` extractor
/// middleware being present on the router layer above this module. The
/// handlers then resolve the principal's block scope and enforce it on
/// every read and write: the router layer authenticates, the handlers
/// authorize.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Retrieves the currently authenticated user's profile.
        .route("/me", get(handlers::get_me))
        // --- Blocks (read-only outside /admin) ---
        // GET /blocks
        // Lists the blocks visible under the caller's scope. Admin sees all,
        // curators see their assignments, threat analysts see none.
        .route("/blocks", get(handlers::list_blocks))
        // GET /blocks/{id}
        // Single block detail. Out-of-scope blocks return 403, missing ones 404.
        .route("/blocks/{id}", get(handlers::get_block_details))
        // --- Contacts ---
        // GET /contacts?block_id=...
        // Scope-filtered listing; an explicit block_id narrows within the scope.
        // POST /contacts
        // Creates a contact in a block the caller can access.
        .route(
            "/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        // GET/PUT/DELETE /contacts/{id}
        // Detail, partial update and soft delete, all under the scope gate.
        .route(
            "/contacts/{id}",
            get(handlers::get_contact_details)
                .put(handlers::update_contact)
                .delete(handlers::deactivate_contact),
        )
        // GET/POST /contacts/{id}/interactions
        // Touchpoint history of one contact; scope is checked on the parent.
        .route(
            "/contacts/{id}/interactions",
            get(handlers::list_contact_interactions).post(handlers::add_interaction),
        )
        // DELETE /interactions/{id}
        // Soft-deletes a single interaction, gated by its inherited block.
        .route("/interactions/{id}", delete(handlers::deactivate_interaction))
        // --- Watchlist (threat analysts and admins only) ---
        // The watchlist is role-gated rather than block-scoped; the handlers
        // reject curators with 403 before touching the repository.
        .route(
            "/watchlist",
            get(handlers::list_watchlist).post(handlers::create_watchlist_item),
        )
        .route(
            "/watchlist/{id}",
            put(handlers::update_watchlist_item).delete(handlers::deactivate_watchlist_item),
        )
}

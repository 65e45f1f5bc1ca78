use crate::{
    auth::Principal,
    models::{BlockAssignment, Role},
    repository::Repository,
};
use std::collections::HashSet;
use uuid::Uuid;

/// BlockScoped
///
/// Shape shared by every record whose visibility is gated by a block
/// association, directly (Contact) or transitively through its parent
/// (Interaction carries the contact's block id denormalized).
pub trait BlockScoped {
    fn block_id(&self) -> Uuid;
}

impl BlockScoped for crate::models::Contact {
    fn block_id(&self) -> Uuid {
        self.block_id
    }
}

impl BlockScoped for crate::models::Interaction {
    fn block_id(&self) -> Uuid {
        self.block_id
    }
}

impl BlockScoped for crate::models::Block {
    fn block_id(&self) -> Uuid {
        self.id
    }
}

/// AccessScope
///
/// The set of block ids a principal may act on, resolved once per request
/// and reused for every check within it. One variant per role family
/// replaces the `if role == ...` branching that would otherwise repeat in
/// every endpoint:
///
/// - Admin resolves to `All`, a sentinel meaning "no filter". Queries stay
///   unfiltered instead of materializing every block id.
/// - Curator resolves to the union of its assignment block ids (primary and
///   backup alike).
/// - ThreatAnalyst resolves to the empty set; the watchlist domain it works
///   is not block-scoped and never consults this resolver.
///
/// Pure data: no I/O, no side effects. Loading the assignments happens in
/// [`resolve_for`], exactly once per request, to keep N+1 lookups out of
/// list-then-detail flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// No filter applied; every block is accessible.
    All,
    /// Access restricted to exactly these block ids (possibly none).
    Blocks(HashSet<Uuid>),
}

impl AccessScope {
    /// Computes the scope from a role and the principal's already-loaded
    /// assignments. Assignments are ignored for Admin and ThreatAnalyst.
    pub fn resolve(role: Role, assignments: &[BlockAssignment]) -> Self {
        match role {
            Role::Admin => AccessScope::All,
            Role::Curator => {
                AccessScope::Blocks(assignments.iter().map(|a| a.block_id).collect())
            }
            Role::ThreatAnalyst => AccessScope::Blocks(HashSet::new()),
        }
    }

    /// Single-entity gate. Callers that get `false` for an entity that
    /// exists must answer Forbidden, never NotFound; the two outcomes are
    /// distinct by contract.
    pub fn can_access(&self, entity_block_id: Uuid) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Blocks(ids) => ids.contains(&entity_block_id),
        }
    }

    /// True for the Admin sentinel.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, AccessScope::All)
    }

    /// True when no block is accessible (a curator with no assignments, or
    /// a threat analyst touching a block-scoped domain).
    pub fn is_empty(&self) -> bool {
        matches!(self, AccessScope::Blocks(ids) if ids.is_empty())
    }

    /// The ids to bind into a `block_id = ANY($n)` clause, or `None` when
    /// the query should stay unfiltered (Admin).
    pub fn block_ids(&self) -> Option<Vec<Uuid>> {
        match self {
            AccessScope::All => None,
            AccessScope::Blocks(ids) => Some(ids.iter().copied().collect()),
        }
    }

    /// Narrows an already-materialized collection to the rows in scope.
    pub fn filter<T: BlockScoped>(&self, items: Vec<T>) -> Vec<T> {
        match self {
            AccessScope::All => items,
            AccessScope::Blocks(_) => items
                .into_iter()
                .filter(|item| self.can_access(item.block_id()))
                .collect(),
        }
    }
}

/// Resolves the scope for a request's principal.
///
/// The assignment lookup is issued only for Curators, the one role whose
/// scope depends on data, and only once; the returned value is then reused
/// for both list filtering and any detail check in the same request.
pub async fn resolve_for(repo: &dyn Repository, principal: &Principal) -> AccessScope {
    match principal.role {
        Role::Curator => {
            let assignments = repo.get_assignments_for_user(principal.id).await;
            AccessScope::resolve(Role::Curator, &assignments)
        }
        role => AccessScope::resolve(role, &[]),
    }
}

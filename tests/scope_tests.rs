use curator_crm::models::{BlockAssignment, Contact, Role};
use curator_crm::scope::AccessScope;
use uuid::Uuid;

fn assignment(block_id: Uuid, user_id: Uuid, kind: &str) -> BlockAssignment {
    BlockAssignment {
        block_id,
        user_id,
        kind: kind.to_string(),
    }
}

fn contact_in(block_id: Uuid) -> Contact {
    Contact {
        id: Uuid::new_v4(),
        block_id,
        ..Contact::default()
    }
}

#[test]
fn test_admin_scope_is_unbounded() {
    let scope = AccessScope::resolve(Role::Admin, &[]);
    assert!(scope.is_unbounded());
    assert!(!scope.is_empty());
    // Admin passes the gate for any block, assignments or not.
    assert!(scope.can_access(Uuid::new_v4()));
    // No filter clause should be generated at all.
    assert_eq!(scope.block_ids(), None);
}

#[test]
fn test_curator_scope_is_exactly_the_assigned_blocks() {
    let user = Uuid::new_v4();
    let block_a = Uuid::new_v4();
    let block_b = Uuid::new_v4();
    let other = Uuid::new_v4();

    let scope = AccessScope::resolve(
        Role::Curator,
        &[
            assignment(block_a, user, "primary"),
            assignment(block_b, user, "backup"),
        ],
    );

    assert!(scope.can_access(block_a));
    assert!(scope.can_access(block_b));
    assert!(!scope.can_access(other));
    assert!(!scope.is_unbounded());
}

#[test]
fn test_curator_scope_unions_primary_and_backup() {
    // The same block assigned twice in different capacities collapses to
    // one entry; kind never narrows access.
    let user = Uuid::new_v4();
    let block = Uuid::new_v4();

    let scope = AccessScope::resolve(
        Role::Curator,
        &[
            assignment(block, user, "primary"),
            assignment(block, user, "backup"),
        ],
    );

    assert!(scope.can_access(block));
    assert_eq!(scope.block_ids().unwrap().len(), 1);
}

#[test]
fn test_curator_without_assignments_sees_nothing() {
    let scope = AccessScope::resolve(Role::Curator, &[]);
    assert!(scope.is_empty());
    assert!(!scope.can_access(Uuid::new_v4()));
    assert_eq!(scope.block_ids(), Some(vec![]));
}

#[test]
fn test_threat_analyst_has_no_block_scope() {
    // Assignments are ignored for analysts even if present in the data.
    let user = Uuid::new_v4();
    let block = Uuid::new_v4();
    let scope = AccessScope::resolve(Role::ThreatAnalyst, &[assignment(block, user, "primary")]);

    assert!(scope.is_empty());
    assert!(!scope.can_access(block));
}

#[test]
fn test_filter_narrows_to_in_scope_rows() {
    let user = Uuid::new_v4();
    let visible = Uuid::new_v4();
    let hidden = Uuid::new_v4();

    let scope = AccessScope::resolve(Role::Curator, &[assignment(visible, user, "primary")]);

    let contacts = vec![contact_in(visible), contact_in(hidden), contact_in(visible)];
    let filtered = scope.filter(contacts);

    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|c| c.block_id == visible));
}

#[test]
fn test_filter_is_identity_for_admin() {
    let scope = AccessScope::resolve(Role::Admin, &[]);
    let contacts = vec![contact_in(Uuid::new_v4()), contact_in(Uuid::new_v4())];
    assert_eq!(scope.filter(contacts).len(), 2);
}

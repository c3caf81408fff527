//! Local reconciliation of server answers into cached lists

use gatekeeper_core::{EntityId, Resource};

/// Append a newly created entity; its id ends up in the list exactly once, at the end
pub fn append<R: Resource>(items: &mut Vec<R>, entity: R) {
    let id = entity.id();
    items.retain(|item| item.id() != id);
    items.push(entity);
}

/// Replace the element with the same id in place. Returns false if there was none.
pub fn replace<R: Resource>(items: &mut [R], entity: R) -> bool {
    match items.iter_mut().find(|item| item.id() == entity.id()) {
        Some(slot) => {
            *slot = entity;
            true
        }
        None => false,
    }
}

pub fn remove<R: Resource>(items: &mut Vec<R>, id: EntityId) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

/// Add a relation edge unless one with the same id exists
pub fn add_if_absent<R: Resource>(relation: &mut Vec<R>, entry: R) -> bool {
    if relation.iter().any(|existing| existing.id() == entry.id()) {
        return false;
    }
    relation.push(entry);
    true
}

pub fn remove_if_present<R: Resource>(relation: &mut Vec<R>, id: EntityId) -> bool {
    remove(relation, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::{Permission, Role};

    fn role(id: EntityId, name: &str) -> Role {
        let mut role = Role::reference(id);
        role.name = name.to_string();
        role
    }

    #[test]
    fn append_keeps_ids_unique() {
        let mut items = vec![role(1, "Admin"), role(2, "Viewer")];
        append(&mut items, role(3, "Auditor"));
        append(&mut items, role(1, "Admin v2"));

        let ids: Vec<_> = items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn replace_preserves_order_and_length() {
        let mut items = vec![role(1, "Admin"), role(2, "Viewer"), role(3, "Ops")];
        assert!(replace(&mut items, role(2, "Reader")));
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].name, "Reader");
        assert_eq!(items[0].name, "Admin");
        assert_eq!(items[2].name, "Ops");

        assert!(!replace(&mut items, role(9, "Ghost")));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn remove_missing_id_is_a_no_op() {
        let mut items = vec![role(1, "Admin")];
        assert!(!remove(&mut items, 42));
        assert_eq!(items.len(), 1);
        assert!(remove(&mut items, 1));
        assert!(items.is_empty());
    }

    #[test]
    fn relation_edges_are_idempotent() {
        let mut permissions = vec![Permission::reference(3)];
        assert!(add_if_absent(&mut permissions, Permission::reference(5)));
        assert!(!add_if_absent(&mut permissions, Permission::reference(5)));
        let ids: Vec<_> = permissions.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 5]);

        assert!(!remove_if_present(&mut permissions, 8));
        assert_eq!(permissions.len(), 2);
    }
}

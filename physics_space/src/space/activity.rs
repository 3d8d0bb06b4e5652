//! Activity lists: per-category membership sets with O(1) add and remove
//!
//! Each object records the slot it holds in every list, so membership
//! checks never search.

use crate::object::ObjectId;
use slab::Slab;

/// The six lists a space keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Rigid bodies simulated this step
    ActiveBody,
    /// Bodies whose mass properties must be recomputed
    InertiaUpdate,
    /// Bodies with a pending state notification
    StateQuery,
    /// Areas with pending enter/exit notifications
    MonitorQuery,
    /// Areas whose overlaps must be re-evaluated
    AreaMoved,
    /// Soft bodies simulated this step
    ActiveSoftBody,
}

impl ListKind {
    pub const COUNT: usize = 6;

    pub const ALL: [ListKind; ListKind::COUNT] = [
        ListKind::ActiveBody,
        ListKind::InertiaUpdate,
        ListKind::StateQuery,
        ListKind::MonitorQuery,
        ListKind::AreaMoved,
        ListKind::ActiveSoftBody,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Slots an object occupies in each list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListMembership {
    slots: [Option<usize>; ListKind::COUNT],
}

impl ListMembership {
    pub fn contains(&self, kind: ListKind) -> bool {
        self.slots[kind.slot()].is_some()
    }
}

/// One membership list
#[derive(Debug)]
pub struct ActivityList {
    kind: ListKind,
    entries: Slab<ObjectId>,
}

impl ActivityList {
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            entries: Slab::new(),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Insert `id`; returns false if it was already a member
    pub(crate) fn add(&mut self, id: ObjectId, membership: &mut ListMembership) -> bool {
        let slot = &mut membership.slots[self.kind.slot()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(self.entries.insert(id));
        true
    }

    /// Remove the member; returns false if it was not in the list
    pub(crate) fn remove(&mut self, membership: &mut ListMembership) -> bool {
        match membership.slots[self.kind.slot()].take() {
            Some(key) => {
                self.entries.try_remove(key);
                true
            }
            None => false,
        }
    }

    /// Append every member to `out` without allocating a new buffer
    pub(crate) fn collect_into(&self, out: &mut Vec<ObjectId>) {
        out.extend(self.entries.iter().map(|(_, id)| *id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().map(|(_, id)| *id)
    }

    /// Members in slot order
    pub fn to_vec(&self) -> Vec<ObjectId> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut list = ActivityList::new(ListKind::ActiveBody);
        let mut membership = ListMembership::default();
        let id = ObjectId::from_raw_parts(7, 0);

        assert!(list.add(id, &mut membership));
        assert!(!list.add(id, &mut membership));
        assert_eq!(list.len(), 1);
        assert!(membership.contains(ListKind::ActiveBody));
        assert!(!membership.contains(ListKind::StateQuery));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut list = ActivityList::new(ListKind::StateQuery);
        let mut membership = ListMembership::default();
        assert!(!list.remove(&mut membership));

        let id = ObjectId::from_raw_parts(1, 0);
        list.add(id, &mut membership);
        assert!(list.remove(&mut membership));
        assert!(!list.remove(&mut membership));
        assert!(list.is_empty());
    }

    #[test]
    fn test_lists_are_independent() {
        let mut active = ActivityList::new(ListKind::ActiveBody);
        let mut inertia = ActivityList::new(ListKind::InertiaUpdate);
        let mut membership = ListMembership::default();
        let id = ObjectId::from_raw_parts(2, 0);

        active.add(id, &mut membership);
        inertia.add(id, &mut membership);
        active.remove(&mut membership);
        assert!(membership.contains(ListKind::InertiaUpdate));
        assert_eq!(inertia.to_vec(), vec![id]);
    }
}

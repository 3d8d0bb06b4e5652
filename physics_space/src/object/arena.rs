//! Storage for collision objects, addressed by generational ids

use super::{CollisionObject, ObjectId};
use crate::error::SpaceError;
use slab::Slab;
use tracing::debug;

/// Owns every collision object. Ids of removed objects never resolve again,
/// even after their slot is reused.
#[derive(Debug, Default)]
pub struct ObjectArena {
    objects: Slab<CollisionObject>,
    generations: Vec<u32>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: CollisionObject) -> ObjectId {
        let index = self.objects.insert(object);
        if index >= self.generations.len() {
            self.generations.resize(index + 1, 0);
        }
        let id = ObjectId::from_raw_parts(index as u32, self.generations[index]);
        debug!(object = ?id, "Object created");
        id
    }

    /// Destroy an object. It must have been removed from its space first.
    pub fn remove(&mut self, id: ObjectId) -> Result<CollisionObject, SpaceError> {
        let object = self.get(id).ok_or(SpaceError::UnknownObject(id))?;
        if object.space.is_some() {
            return Err(SpaceError::StillRegistered(id));
        }

        let index = id.index() as usize;
        self.generations[index] = self.generations[index].wrapping_add(1);
        debug!(object = ?id, "Object destroyed");
        Ok(self.objects.remove(index))
    }

    pub fn get(&self, id: ObjectId) -> Option<&CollisionObject> {
        let index = id.index() as usize;
        if self.generations.get(index) != Some(&id.generation()) {
            return None;
        }
        self.objects.get(index)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut CollisionObject> {
        let index = id.index() as usize;
        if self.generations.get(index) != Some(&id.generation()) {
            return None;
        }
        self.objects.get_mut(index)
    }

    /// Two distinct objects mutably at once
    pub fn get2_mut(
        &mut self,
        a: ObjectId,
        b: ObjectId,
    ) -> Option<(&mut CollisionObject, &mut CollisionObject)> {
        if a == b || !self.contains(a) || !self.contains(b) {
            return None;
        }
        self.objects
            .get2_mut(a.index() as usize, b.index() as usize)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &CollisionObject)> + '_ {
        self.objects.iter().map(|(index, object)| {
            (
                ObjectId::from_raw_parts(index as u32, self.generations[index]),
                object,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RigidBody;

    #[test]
    fn test_stale_ids_do_not_resolve() {
        let mut arena = ObjectArena::new();
        let first = arena.insert(CollisionObject::rigid_body(RigidBody::default()));
        arena.remove(first).unwrap();
        let second = arena.insert(CollisionObject::rigid_body(RigidBody::default()));

        assert_eq!(first.index(), second.index());
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
        assert!(matches!(arena.remove(first), Err(SpaceError::UnknownObject(_))));
    }

    #[test]
    fn test_get2_mut_rejects_aliasing() {
        let mut arena = ObjectArena::new();
        let a = arena.insert(CollisionObject::rigid_body(RigidBody::default()));
        let b = arena.insert(CollisionObject::rigid_body(RigidBody::default()));
        assert!(arena.get2_mut(a, a).is_none());
        assert!(arena.get2_mut(a, b).is_some());
    }
}

//! Island generation: groups of dynamic bodies connected by contact pairs

use super::activity::ListKind;
use super::pairs::{PairKey, PairState};
use super::Space;
use crate::object::{BodyMode, ObjectArena, ObjectId};
use tracing::trace;

/// Bodies that must be solved together, and the body pairs between them
#[derive(Debug, Default, Clone)]
pub(crate) struct Island {
    pub bodies: Vec<ObjectId>,
    pub pairs: Vec<PairKey>,
}

/// Reusable island storage; islands keep their allocations across steps
#[derive(Debug, Default)]
pub(crate) struct IslandBuffer {
    islands: Vec<Island>,
    len: usize,
}

impl IslandBuffer {
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Start a new, empty island
    pub fn next(&mut self) -> &mut Island {
        if self.len == self.islands.len() {
            self.islands.push(Island::default());
        }
        let island = &mut self.islands[self.len];
        island.bodies.clear();
        island.pairs.clear();
        self.len += 1;
        island
    }

    pub fn as_slice(&self) -> &[Island] {
        &self.islands[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl Space {
    /// Flood-fill islands from every active body.
    ///
    /// Static and kinematic bodies end an island instead of joining the two
    /// sides. Sleeping bodies reached through a contact join the island and
    /// are woken later if the island stays awake. Area pairs met along the
    /// way are collected for the area update pass.
    pub(crate) fn generate_islands(&mut self, objects: &mut ObjectArena) {
        let stamp = self.step_count;
        let mut roots = std::mem::take(&mut self.scratch.ids);
        let mut stack = std::mem::take(&mut self.scratch.stack);
        roots.clear();
        stack.clear();
        self.scratch.islands.clear();
        self.scratch.area_pairs.clear();

        self.lists[ListKind::ActiveBody as usize].collect_into(&mut roots);

        for &root in &roots {
            match objects.get_mut(root).and_then(|object| object.body_mut()) {
                Some(body) if body.mode() != BodyMode::Static && body.island_stamp != stamp => {
                    body.island_stamp = stamp;
                }
                _ => continue,
            }

            let island = self.scratch.islands.next();
            island.bodies.push(root);
            stack.push(root);

            while let Some(id) = stack.pop() {
                let count = objects.get(id).map_or(0, |object| object.constraints.len());
                for i in 0..count {
                    let Some(key) = objects.get(id).and_then(|object| object.constraints.get(i).copied())
                    else {
                        break;
                    };
                    let Some(pair) = self.pairs.get_mut(&key) else {
                        continue;
                    };
                    let first_visit = pair.island_stamp != stamp;
                    pair.island_stamp = stamp;

                    match pair.state {
                        PairState::Body { .. } => {
                            if first_visit {
                                island.pairs.push(key);
                            }
                            // Kinematic roots still pull in the dynamic bodies they touch
                            let other = key.other(id);
                            if let Some(body) = objects.get_mut(other).and_then(|object| object.body_mut()) {
                                if body.mode() == BodyMode::Rigid && body.island_stamp != stamp {
                                    body.island_stamp = stamp;
                                    island.bodies.push(other);
                                    stack.push(other);
                                }
                            }
                        }
                        PairState::AreaBody { .. } if first_visit => self.scratch.area_pairs.push(key),
                        _ => {}
                    }
                }
            }
        }

        // Areas that moved re-test all of their pairs
        roots.clear();
        self.lists[ListKind::AreaMoved as usize].collect_into(&mut roots);
        for &area in &roots {
            let count = objects.get(area).map_or(0, |object| object.constraints.len());
            for i in 0..count {
                let Some(key) = objects.get(area).and_then(|object| object.constraints.get(i).copied())
                else {
                    break;
                };
                let Some(pair) = self.pairs.get_mut(&key) else {
                    continue;
                };
                if pair.island_stamp == stamp {
                    continue;
                }
                pair.island_stamp = stamp;
                if matches!(
                    pair.state,
                    PairState::AreaBody { .. } | PairState::AreaArea { .. }
                ) {
                    self.scratch.area_pairs.push(key);
                }
            }
            self.list_remove(objects, ListKind::AreaMoved, area);
        }

        self.island_count = self.scratch.islands.len();
        trace!(
            islands = self.island_count,
            area_pairs = self.scratch.area_pairs.len(),
            "Islands generated"
        );

        self.scratch.ids = roots;
        self.scratch.stack = stack;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_island_buffer_reuses_storage() {
        let mut buffer = IslandBuffer::default();
        buffer.next().bodies.push(ObjectId::from_raw_parts(1, 0));
        buffer.next();
        assert_eq!(buffer.len(), 2);

        buffer.clear();
        assert_eq!(buffer.len(), 0);
        let island = buffer.next();
        assert!(island.bodies.is_empty(), "reused island must start empty");
        assert_eq!(buffer.as_slice().len(), 1);
    }
}

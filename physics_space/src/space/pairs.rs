//! Pair table: the constraint record kept for every overlapping shape pair

use super::activity::ListKind;
use super::Space;
use crate::collision::narrow_phase;
use crate::collision::{PairEvent, ProxyOwner};
use crate::object::{AreaSpaceOverride, MonitorKey, ObjectArena, ObjectId, ObjectKind};
use glam::Vec3;
use tracing::trace;

/// Identity of a pair: lower object kind first (area, body, soft body), then proxy order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub a: ProxyOwner,
    pub b: ProxyOwner,
}

impl PairKey {
    /// Build the canonical key for two proxies, or `None` if either object is gone
    pub(crate) fn canonical(objects: &ObjectArena, a: ProxyOwner, b: ProxyOwner) -> Option<Self> {
        let order_a = objects.get(a.object)?.kind().pair_order();
        let order_b = objects.get(b.object)?.kind().pair_order();
        let swap = match order_a.cmp(&order_b) {
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => b < a,
        };
        Some(if swap {
            PairKey { a: b, b: a }
        } else {
            PairKey { a, b }
        })
    }

    /// The object on the other side of the pair from `id`
    pub fn other(&self, id: ObjectId) -> ObjectId {
        if self.a.object == id {
            self.b.object
        } else {
            self.a.object
        }
    }
}

/// Contact remembered between steps for warm starting
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct CachedContact {
    /// Contact point in A's local space
    pub local_a: Vec3,
    /// Contact point in B's local space
    pub local_b: Vec3,
    pub normal_impulse: f32,
    /// Accumulated friction impulse, perpendicular to the normal
    pub tangent_impulse: Vec3,
}

#[derive(Debug, Clone)]
pub(crate) enum PairState {
    /// Two rigid bodies
    Body { contacts: Vec<CachedContact> },
    /// An area (A) and a rigid body (B)
    AreaBody { colliding: bool },
    /// Two areas
    AreaArea { colliding: bool },
    /// A rigid body (A) and a soft body (B)
    BodySoft,
}

#[derive(Debug, Clone)]
pub(crate) struct Pair {
    pub state: PairState,
    pub island_stamp: u64,
}

impl Space {
    pub(crate) fn process_pair_events(&mut self, objects: &mut ObjectArena, events: &[PairEvent]) {
        for event in events {
            match *event {
                PairEvent::Created { a, b } => self.pair_created(objects, a, b),
                PairEvent::Removed { a, b } => self.pair_removed(objects, a, b),
            }
        }
    }

    fn pair_created(&mut self, objects: &mut ObjectArena, a: ProxyOwner, b: ProxyOwner) {
        let Some(key) = PairKey::canonical(objects, a, b) else {
            return;
        };
        if self.pairs.contains_key(&key) {
            return;
        }
        let (Some(first), Some(second)) = (objects.get(key.a.object), objects.get(key.b.object))
        else {
            return;
        };
        if !first.interacts_with(second) {
            return;
        }

        let state = match (first.kind(), second.kind()) {
            (ObjectKind::Area(_), ObjectKind::Area(_)) => PairState::AreaArea { colliding: false },
            (ObjectKind::Area(_), ObjectKind::RigidBody(_)) => {
                PairState::AreaBody { colliding: false }
            }
            (ObjectKind::RigidBody(_), ObjectKind::RigidBody(_)) => PairState::Body {
                contacts: Vec::new(),
            },
            (ObjectKind::RigidBody(_), ObjectKind::SoftBody(_)) => PairState::BodySoft,
            // Areas do not monitor soft bodies and soft bodies do not collide with each other
            _ => return,
        };
        let involves_area = matches!(
            state,
            PairState::AreaArea { .. } | PairState::AreaBody { .. }
        );

        self.pairs.insert(
            key,
            Pair {
                state,
                island_stamp: 0,
            },
        );
        self.collision_pairs += 1;

        for id in [key.a.object, key.b.object] {
            if let Some(object) = objects.get_mut(id) {
                object.constraints.push(key);
            }
        }

        // New area overlaps are evaluated on the next step
        if involves_area {
            for id in [key.a.object, key.b.object] {
                if objects.get(id).is_some_and(|object| object.is_area()) {
                    self.list_add(objects, ListKind::AreaMoved, id);
                }
            }
        }

        trace!(a = ?key.a, b = ?key.b, "Pair created");
    }

    fn pair_removed(&mut self, objects: &mut ObjectArena, a: ProxyOwner, b: ProxyOwner) {
        let key = PairKey::canonical(objects, a, b).unwrap_or(PairKey { a, b });
        let Some(pair) = self
            .pairs
            .remove(&key)
            .or_else(|| self.pairs.remove(&PairKey { a: key.b, b: key.a }))
        else {
            return;
        };
        self.collision_pairs = self.collision_pairs.saturating_sub(1);

        for id in [key.a.object, key.b.object] {
            if let Some(object) = objects.get_mut(id) {
                object.constraints.retain(|k| *k != key);
            }
        }

        match pair.state {
            PairState::AreaBody { colliding: true } => {
                self.set_area_body_overlap(objects, &key, false)
            }
            PairState::AreaArea { colliding: true } => {
                self.set_area_area_overlap(objects, &key, false)
            }
            PairState::Body { .. } => {
                // Bodies resting on a removed support must fall
                for id in [key.a.object, key.b.object] {
                    if objects.get(id).is_some_and(|object| object.is_dynamic_body()) {
                        self.activate_body(objects, id);
                    }
                }
            }
            _ => {}
        }

        trace!(a = ?key.a, b = ?key.b, "Pair removed");
    }

    /// Re-test an area pair and apply enter/exit effects when its state changes
    pub(crate) fn update_area_pair(&mut self, objects: &mut ObjectArena, key: &PairKey) {
        let Some(pair) = self.pairs.get(key) else {
            return;
        };
        let colliding = match pair.state {
            PairState::AreaBody { colliding } | PairState::AreaArea { colliding } => colliding,
            _ => return,
        };

        let overlapping = match (objects.get(key.a.object), objects.get(key.b.object)) {
            (Some(first), Some(second)) if first.interacts_with(second) => {
                match (
                    first.placed_shape(key.a.subindex),
                    second.placed_shape(key.b.subindex),
                ) {
                    (Some(shape_a), Some(shape_b)) => narrow_phase::intersects(&shape_a, &shape_b),
                    _ => false,
                }
            }
            _ => false,
        };

        if overlapping == colliding {
            return;
        }

        let is_area_area = match self.pairs.get_mut(key).map(|pair| &mut pair.state) {
            Some(PairState::AreaBody { colliding }) => {
                *colliding = overlapping;
                false
            }
            Some(PairState::AreaArea { colliding }) => {
                *colliding = overlapping;
                true
            }
            _ => return,
        };

        if is_area_area {
            self.set_area_area_overlap(objects, key, overlapping);
        } else {
            self.set_area_body_overlap(objects, key, overlapping);
        }
    }

    /// Apply (or undo) an area's medium and monitoring for a body shape pair
    fn set_area_body_overlap(&mut self, objects: &mut ObjectArena, key: &PairKey, entered: bool) {
        let area_id = key.a.object;
        let body_id = key.b.object;
        let Some(area) = objects.get(area_id).and_then(|object| object.as_area()) else {
            return;
        };
        let space_override = area.space_override;
        let priority = area.priority;
        let monitoring = area.monitoring;

        if space_override != AreaSpaceOverride::Disabled {
            if let Some(body) = objects.get_mut(body_id).and_then(|object| object.body_mut()) {
                if entered {
                    body.add_area(area_id, priority);
                } else {
                    body.remove_area(area_id);
                }
            }
        }

        if monitoring {
            if let Some(area) = objects.get_mut(area_id).and_then(|object| object.as_area_mut()) {
                let monitor_key = MonitorKey {
                    other: body_id,
                    other_shape: key.b.subindex,
                    area_shape: key.a.subindex,
                };
                area.add_monitor_delta(monitor_key, false, if entered { 1 } else { -1 });
            }
            self.list_add(objects, ListKind::MonitorQuery, area_id);
        }
    }

    /// Report an area-area overlap change to whichever side monitors the other
    fn set_area_area_overlap(&mut self, objects: &mut ObjectArena, key: &PairKey, entered: bool) {
        let delta = if entered { 1 } else { -1 };
        for (watcher, watched) in [(key.a, key.b), (key.b, key.a)] {
            let watched_monitorable = objects
                .get(watched.object)
                .and_then(|object| object.as_area())
                .is_some_and(|area| area.monitorable);
            let Some(area) = objects
                .get_mut(watcher.object)
                .and_then(|object| object.as_area_mut())
            else {
                continue;
            };
            if !(area.monitoring_areas && watched_monitorable) {
                continue;
            }
            area.add_monitor_delta(
                MonitorKey {
                    other: watched.object,
                    other_shape: watched.subindex,
                    area_shape: watcher.subindex,
                },
                true,
                delta,
            );
            self.list_add(objects, ListKind::MonitorQuery, watcher.object);
        }
    }
}

//! Notifications delivered after a step
//!
//! Bodies with `report_state` queue a state update when they move or change
//! sleep state, and monitoring areas queue enter/exit events. Both are
//! drained by [`Space::call_queries`], outside the space lock, so observers
//! may run direct queries against the space.

use super::activity::ListKind;
use super::Space;
use crate::error::SpaceError;
use crate::math::Transform;
use crate::object::{MonitorKey, ObjectArena, ObjectId};
use crate::query::DirectSpaceState;
use glam::Vec3;
use std::collections::BTreeMap;
use tracing::{error, trace};

/// New state of a body that moved or changed sleep state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStateUpdate {
    pub body: ObjectId,
    pub instance_id: u64,
    pub transform: Transform,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub sleeping: bool,
}

/// A body or area shape entering or leaving a monitoring area's shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorEvent {
    pub area: ObjectId,
    pub other: ObjectId,
    pub other_instance_id: u64,
    pub other_is_area: bool,
    pub other_shape: usize,
    pub area_shape: usize,
    /// False when the shapes stopped overlapping
    pub entered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpaceEvent {
    BodyState(BodyStateUpdate),
    Monitor(MonitorEvent),
}

/// Receives the notifications of [`Space::call_queries`]
pub trait SpaceObserver {
    fn body_state_changed(&mut self, update: &BodyStateUpdate, space: &DirectSpaceState<'_>) {
        let _ = (update, space);
    }

    fn area_monitor_event(&mut self, event: &MonitorEvent, space: &DirectSpaceState<'_>) {
        let _ = (event, space);
    }
}

/// Collects every notification in delivery order
impl SpaceObserver for Vec<SpaceEvent> {
    fn body_state_changed(&mut self, update: &BodyStateUpdate, _space: &DirectSpaceState<'_>) {
        self.push(SpaceEvent::BodyState(*update));
    }

    fn area_monitor_event(&mut self, event: &MonitorEvent, _space: &DirectSpaceState<'_>) {
        self.push(SpaceEvent::Monitor(*event));
    }
}

impl Space {
    /// Deliver queued body state updates, then area monitor events.
    /// Returns the number of notifications delivered.
    pub fn call_queries(
        &mut self,
        objects: &mut ObjectArena,
        observer: &mut dyn SpaceObserver,
    ) -> Result<usize, SpaceError> {
        if self.is_locked() {
            error!(space = ?self.id(), "call_queries cannot run while the space is locked");
            return Err(SpaceError::Locked);
        }

        let mut ids = std::mem::take(&mut self.scratch.ids);
        let mut events = std::mem::take(&mut self.scratch.events);
        ids.clear();
        events.clear();

        self.lists[ListKind::StateQuery as usize].collect_into(&mut ids);
        for &id in &ids {
            self.list_remove(objects, ListKind::StateQuery, id);
            let Some(object) = objects.get(id) else {
                continue;
            };
            if let Some(body) = object.body() {
                events.push(SpaceEvent::BodyState(BodyStateUpdate {
                    body: id,
                    instance_id: object.instance_id,
                    transform: *object.transform(),
                    linear_velocity: body.linear_velocity,
                    angular_velocity: body.angular_velocity,
                    sleeping: body.is_sleeping(),
                }));
            }
        }

        ids.clear();
        self.lists[ListKind::MonitorQuery as usize].collect_into(&mut ids);
        for &area_id in &ids {
            self.list_remove(objects, ListKind::MonitorQuery, area_id);
            let Some(area) = objects.get_mut(area_id).and_then(|object| object.as_area_mut()) else {
                continue;
            };
            let bodies = std::mem::take(&mut area.pending_bodies);
            let areas = std::mem::take(&mut area.pending_areas);
            push_monitor_events(&mut events, objects, area_id, &bodies, false);
            push_monitor_events(&mut events, objects, area_id, &areas, true);
        }

        let state = DirectSpaceState::new(self, objects);
        for event in &events {
            match event {
                SpaceEvent::BodyState(update) => observer.body_state_changed(update, &state),
                SpaceEvent::Monitor(monitor) => observer.area_monitor_event(monitor, &state),
            }
        }

        let delivered = events.len();
        trace!(space = ?self.id(), delivered, "Queries called");
        self.scratch.ids = ids;
        self.scratch.events = events;
        Ok(delivered)
    }
}

fn push_monitor_events(
    events: &mut Vec<SpaceEvent>,
    objects: &ObjectArena,
    area: ObjectId,
    pending: &BTreeMap<MonitorKey, i32>,
    other_is_area: bool,
) {
    for (key, &delta) in pending {
        if delta == 0 {
            continue;
        }
        events.push(SpaceEvent::Monitor(MonitorEvent {
            area,
            other: key.other,
            other_instance_id: objects.get(key.other).map_or(0, |object| object.instance_id),
            other_is_area,
            other_shape: key.other_shape,
            area_shape: key.area_shape,
            entered: delta > 0,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Shape;
    use crate::object::{Area, CollisionObject, RigidBody};

    #[test]
    fn test_call_queries_rejected_while_locked() {
        let mut objects = ObjectArena::new();
        let mut space = Space::new();
        let mut events: Vec<SpaceEvent> = Vec::new();
        space.lock().unwrap();
        assert!(matches!(
            space.call_queries(&mut objects, &mut events),
            Err(SpaceError::Locked)
        ));
    }

    #[test]
    fn test_monitoring_area_reports_enter_and_exit() {
        let mut objects = ObjectArena::new();
        let mut space = Space::new();
        let area = objects.insert(
            CollisionObject::area(Area {
                monitoring: true,
                ..Default::default()
            })
            .with_shape(Shape::Sphere { radius: 2.0 }, Transform::IDENTITY),
        );
        let body = objects.insert(
            CollisionObject::rigid_body(RigidBody::new(1.0))
                .with_shape(Shape::Sphere { radius: 0.5 }, Transform::IDENTITY)
                .with_instance_id(42),
        );
        space.add_object(&mut objects, area).unwrap();
        space.add_object(&mut objects, body).unwrap();

        let mut events: Vec<SpaceEvent> = Vec::new();
        for _ in 0..2 {
            space.step(&mut objects, 1.0 / 60.0).unwrap();
            space.call_queries(&mut objects, &mut events).unwrap();
        }
        assert_eq!(
            events,
            vec![SpaceEvent::Monitor(MonitorEvent {
                area,
                other: body,
                other_instance_id: 42,
                other_is_area: false,
                other_shape: 0,
                area_shape: 0,
                entered: true,
            })]
        );

        events.clear();
        space.remove_object(&mut objects, body).unwrap();
        space.call_queries(&mut objects, &mut events).unwrap();
        assert!(matches!(
            events.as_slice(),
            [SpaceEvent::Monitor(MonitorEvent { entered: false, .. })]
        ));
    }

    #[test]
    fn test_state_reported_for_moving_bodies() {
        let mut objects = ObjectArena::new();
        let mut space = Space::new();
        let mut body = RigidBody::new(1.0).with_velocity(Vec3::X, Vec3::ZERO);
        body.report_state = true;
        let body = objects.insert(
            CollisionObject::rigid_body(body)
                .with_shape(Shape::Sphere { radius: 0.5 }, Transform::IDENTITY),
        );
        space.add_object(&mut objects, body).unwrap();
        space.step(&mut objects, 0.5).unwrap();

        let mut events: Vec<SpaceEvent> = Vec::new();
        assert_eq!(space.call_queries(&mut objects, &mut events).unwrap(), 1);
        match &events[0] {
            SpaceEvent::BodyState(update) => {
                assert_eq!(update.body, body);
                assert!(update.transform.position.x > 0.0);
                assert!(!update.sleeping);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

//! Headless demo: drops a few bodies onto the ground and logs what the space reports

use physics_space::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

const STEPS: usize = 240;
const DT: f32 = 1.0 / 60.0;

/// Logs every notification delivered after a step
struct LoggingObserver {
    delivered: usize,
}

impl SpaceObserver for LoggingObserver {
    fn body_state_changed(&mut self, update: &BodyStateUpdate, _space: &DirectSpaceState<'_>) {
        self.delivered += 1;
        debug!(
            body = update.instance_id,
            position = ?update.transform.position,
            sleeping = update.sleeping,
            "Body state changed"
        );
    }

    fn area_monitor_event(&mut self, event: &MonitorEvent, _space: &DirectSpaceState<'_>) {
        self.delivered += 1;
        info!(
            area = ?event.area,
            other = event.other_instance_id,
            entered = event.entered,
            "Area monitor event"
        );
    }
}

fn main() -> Result<(), SpaceError> {
    physics_space::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => SpaceConfig::load(path)?,
        None => SpaceConfig::default(),
    };

    let mut objects = ObjectArena::new();
    let mut space = Space::with_defaults(&mut objects, &config)?;
    space.set_debug_contacts(256);

    let ground = objects.insert(
        CollisionObject::rigid_body(RigidBody::new_static())
            .with_shape(
                Shape::WorldBoundary {
                    normal: Vec3::Y,
                    distance: 0.0,
                },
                Transform::IDENTITY,
            )
            .with_instance_id(1),
    );
    space.add_object(&mut objects, ground)?;

    for i in 0..3 {
        let mut body = RigidBody::new(1.0);
        body.report_state = true;
        let crate_box = objects.insert(
            CollisionObject::rigid_body(body)
                .with_transform(Transform::from_position(Vec3::new(0.0, 0.5 + i as f32 * 1.1, 0.0)))
                .with_shape(
                    Shape::Box {
                        half_extents: Vec3::splat(0.5),
                    },
                    Transform::IDENTITY,
                )
                .with_instance_id(10 + i),
        );
        space.add_object(&mut objects, crate_box)?;
    }

    let ball = objects.insert(
        CollisionObject::rigid_body(RigidBody::new(0.5))
            .with_transform(Transform::from_position(Vec3::new(3.0, 4.0, 0.0)))
            .with_shape(Shape::Sphere { radius: 0.4 }, Transform::IDENTITY)
            .with_instance_id(20),
    );
    space.add_object(&mut objects, ball)?;

    let sensor = objects.insert(
        CollisionObject::area(Area::default().with_monitoring(false))
        .with_transform(Transform::from_position(Vec3::new(3.0, 1.0, 0.0)))
        .with_shape(
            Shape::Box {
                half_extents: Vec3::splat(1.0),
            },
            Transform::IDENTITY,
        )
        .with_instance_id(30),
    );
    space.add_object(&mut objects, sensor)?;

    let rope = objects.insert(
        CollisionObject::soft_body(SoftBody::rope(
            Vec3::new(-3.0, 5.0, 0.0),
            Vec3::new(-1.0, 5.0, 0.0),
            8,
            1.0,
        ))
        .with_instance_id(40),
    );
    if let Some(soft_body) = objects.get_mut(rope).and_then(|object| object.as_soft_body_mut()) {
        soft_body.pin_node(0);
    }
    space.add_object(&mut objects, rope)?;

    info!(objects = space.object_count(), "Scene ready");

    let mut observer = LoggingObserver { delivered: 0 };
    for step in 0..STEPS {
        space.step(&mut objects, DT)?;
        space.call_queries(&mut objects, &mut observer)?;

        if step % 60 == 59 {
            info!(
                step = space.step_count(),
                islands = space.island_count(),
                active = space.active_objects(),
                pairs = space.collision_pairs(),
                contacts = space.debug_contact_count(),
                "Space stats"
            );
            for phase in ElapsedTime::ALL {
                debug!(phase = phase.name(), elapsed = ?space.elapsed_time(phase), "Phase timing");
            }
        }
    }

    let state = space.direct_state(&objects)?;
    let from = objects
        .get(ball)
        .map(|object| *object.transform())
        .unwrap_or_default();
    let result =
        state.test_body_motion(ball, &from, Vec3::new(0.0, -2.0, 0.0), 0.001, &BTreeSet::new(), false)?;
    info!(
        safe = result.safe_fraction,
        travel = ?result.travel,
        colliding = ?result.collision.map(|collision| collision.collider_instance_id),
        "Ball motion test"
    );

    if let Some(hit) = state.intersect_ray(
        Vec3::new(0.0, 10.0, 0.0),
        Vec3::new(0.0, -10.0, 0.0),
        &QueryFilter::default(),
        false,
    ) {
        info!(position = ?hit.position, collider = hit.collider_instance_id, "Ray hit");
    }

    info!(delivered = observer.delivered, "Simulation finished");
    Ok(())
}

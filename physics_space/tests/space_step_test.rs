//! Stepping: gravity, resting contact, sleeping and waking

use physics_space::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn ground(objects: &mut ObjectArena) -> ObjectId {
    objects.insert(
        CollisionObject::rigid_body(RigidBody::new_static()).with_shape(
            Shape::WorldBoundary {
                normal: Vec3::Y,
                distance: 0.0,
            },
            Transform::IDENTITY,
        ),
    )
}

fn sphere(objects: &mut ObjectArena, position: Vec3) -> ObjectId {
    objects.insert(
        CollisionObject::rigid_body(RigidBody::new(1.0))
            .with_transform(Transform::from_position(position))
            .with_shape(Shape::Sphere { radius: 0.5 }, Transform::IDENTITY),
    )
}

fn is_active(space: &Space, id: ObjectId) -> bool {
    space.list(ListKind::ActiveBody).iter().any(|member| member == id)
}

#[test]
fn test_default_area_gravity_pulls_bodies_down() {
    let mut objects = ObjectArena::new();
    let config = SpaceConfig {
        gravity: Vec3::new(0.0, -10.0, 0.0),
        linear_damp: 0.0,
        ..Default::default()
    };
    let mut space = Space::with_defaults(&mut objects, &config).unwrap();
    let body = sphere(&mut objects, Vec3::new(0.0, 100.0, 0.0));
    space.add_object(&mut objects, body).unwrap();

    for _ in 0..60 {
        space.step(&mut objects, DT).unwrap();
    }

    let object = objects.get(body).unwrap();
    let velocity = object.body().unwrap().linear_velocity;
    assert!(
        (velocity.y + 10.0).abs() < 0.5,
        "Expected roughly -10 m/s after one second, got {}",
        velocity.y
    );
    assert!(object.transform().position.y < 96.0);
    assert_eq!(space.step_count(), 60);
    assert_eq!(space.last_step(), DT);
}

#[test]
fn test_space_without_default_area_has_no_gravity() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let body = sphere(&mut objects, Vec3::new(0.0, 10.0, 0.0));
    space.add_object(&mut objects, body).unwrap();

    for _ in 0..10 {
        space.step(&mut objects, DT).unwrap();
    }
    assert_eq!(objects.get(body).unwrap().transform().position, Vec3::new(0.0, 10.0, 0.0));
}

#[test]
fn test_sphere_comes_to_rest_on_ground() {
    let mut objects = ObjectArena::new();
    let mut space = Space::with_defaults(&mut objects, &SpaceConfig::default()).unwrap();
    let floor = ground(&mut objects);
    space.add_object(&mut objects, floor).unwrap();
    let body = sphere(&mut objects, Vec3::new(0.0, 2.0, 0.0));
    space.add_object(&mut objects, body).unwrap();
    space.set_debug_contacts(16);

    let mut saw_contact = false;
    for _ in 0..180 {
        space.step(&mut objects, DT).unwrap();
        saw_contact |= space.debug_contact_count() > 0;
    }

    let height = objects.get(body).unwrap().transform().position.y;
    assert!(
        height > 0.3 && height < 0.6,
        "Sphere should rest on the ground, ended at {}",
        height
    );
    assert!(saw_contact);
    assert!(space.collision_pairs() >= 1);
}

#[test]
fn test_still_body_sleeps_and_wakes_on_impulse() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let body = sphere(&mut objects, Vec3::ZERO);
    space.add_object(&mut objects, body).unwrap();
    assert!(is_active(&space, body));

    let time_to_sleep = space.get_param(SpaceParameter::BodyTimeToSleep);
    let steps = (time_to_sleep / DT).ceil() as usize + 2;
    for _ in 0..steps {
        space.step(&mut objects, DT).unwrap();
    }
    assert!(!is_active(&space, body));
    assert!(objects.get(body).unwrap().body().unwrap().is_sleeping());
    assert_eq!(space.proxy_count(), 1);

    space
        .body_apply_central_impulse(&mut objects, body, Vec3::new(5.0, 0.0, 0.0))
        .unwrap();
    assert!(is_active(&space, body));
    assert!(!objects.get(body).unwrap().body().unwrap().is_sleeping());

    space.step(&mut objects, DT).unwrap();
    assert!(objects.get(body).unwrap().transform().position.x > 0.0);
}

#[test]
fn test_elapsed_times_are_recorded_per_phase() {
    let mut objects = ObjectArena::new();
    let mut space = Space::with_defaults(&mut objects, &SpaceConfig::default()).unwrap();
    let body = sphere(&mut objects, Vec3::new(0.0, 1.0, 0.0));
    space.add_object(&mut objects, body).unwrap();
    space.step(&mut objects, DT).unwrap();

    let total: std::time::Duration = ElapsedTime::ALL
        .iter()
        .map(|&phase| space.elapsed_time(phase))
        .sum();
    assert!(total > std::time::Duration::ZERO);
    assert_eq!(space.island_count(), 1);
}

#[test]
fn test_invalid_step_is_rejected() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    assert!(space.step(&mut objects, 0.0).is_err());
    assert!(space.step(&mut objects, f32::NAN).is_err());
    assert!(!space.is_locked());
    assert_eq!(space.step_count(), 0);
}

#[test]
fn test_rope_falls_onto_ground() {
    let mut objects = ObjectArena::new();
    let mut space = Space::with_defaults(&mut objects, &SpaceConfig::default()).unwrap();
    let floor = ground(&mut objects);
    space.add_object(&mut objects, floor).unwrap();
    let rope = objects.insert(CollisionObject::soft_body(SoftBody::rope(
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        4,
        1.0,
    )));
    space.add_object(&mut objects, rope).unwrap();
    assert_eq!(space.list(ListKind::ActiveSoftBody).to_vec(), vec![rope]);

    for _ in 0..120 {
        space.step(&mut objects, DT).unwrap();
    }

    // The rope and the ground become a body/soft pair
    assert_eq!(space.collision_pairs(), 1);
    let soft_body = objects.get(rope).unwrap().as_soft_body().unwrap();
    for node in soft_body.nodes() {
        assert!(
            node.position.y > 0.0 && node.position.y < 0.5,
            "rope node ended at {}",
            node.position.y
        );
    }
}

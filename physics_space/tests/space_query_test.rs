//! Direct queries against a populated space

use physics_space::prelude::*;
use std::collections::BTreeSet;

fn ground(objects: &mut ObjectArena, space: &mut Space) -> ObjectId {
    let id = objects.insert(
        CollisionObject::rigid_body(RigidBody::new_static())
            .with_shape(
                Shape::WorldBoundary {
                    normal: Vec3::Y,
                    distance: 0.0,
                },
                Transform::IDENTITY,
            )
            .with_instance_id(7),
    );
    space.add_object(objects, id).unwrap();
    id
}

fn sphere_body(objects: &mut ObjectArena, space: &mut Space, position: Vec3) -> ObjectId {
    let id = objects.insert(
        CollisionObject::rigid_body(RigidBody::new(1.0))
            .with_transform(Transform::from_position(position))
            .with_shape(Shape::Sphere { radius: 0.5 }, Transform::IDENTITY),
    );
    space.add_object(objects, id).unwrap();
    id
}

#[test]
fn test_cast_motion_against_plane() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let plane = ground(&mut objects, &mut space);
    let state = space.direct_state(&objects).unwrap();

    let point = Shape::Sphere { radius: 0.0 };
    let start = Transform::from_position(Vec3::new(0.0, 4.0, 0.0));
    let motion = Vec3::new(0.0, -10.0, 0.0);
    let filter = QueryFilter::default();

    let cast = state
        .cast_motion(&point, &start, motion, 0.0, &filter)
        .expect("the plane blocks the motion");
    assert!((cast.closest_safe - 0.4).abs() < 1e-4, "safe = {}", cast.closest_safe);
    assert!((cast.closest_unsafe - 0.4).abs() < 1e-4, "unsafe = {}", cast.closest_unsafe);
    assert!(cast.closest_safe <= cast.closest_unsafe);

    let mut hits = Vec::new();
    let beyond = start.translated(motion * cast.closest_unsafe);
    assert_eq!(state.intersect_shape(&point, &beyond, 0.0, &mut hits, 16, &filter), 1);
    assert_eq!(hits[0].collider, plane);
    assert_eq!(hits[0].collider_instance_id, 7);

    let short = Vec3::new(0.0, -2.0, 0.0);
    assert!(state.cast_motion(&point, &start, short, 0.0, &filter).is_none());
}

#[test]
fn test_body_motion_blocked_at_start() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    ground(&mut objects, &mut space);
    let body = sphere_body(&mut objects, &mut space, Vec3::new(0.0, 0.5, 0.0));
    let state = space.direct_state(&objects).unwrap();

    let from = Transform::from_position(Vec3::new(0.0, 0.5, 0.0));
    let result = state
        .test_body_motion(body, &from, Vec3::new(0.0, -1.0, 0.0), 0.0, &BTreeSet::new(), false)
        .unwrap();

    assert_eq!(result.safe_fraction, 0.0);
    assert!(result.is_blocked());
    assert_eq!(result.body_transform, from);
    assert_eq!(result.travel, Vec3::ZERO);
    assert_eq!(result.remainder, Vec3::new(0.0, -1.0, 0.0));
}

#[test]
fn test_body_motion_stops_on_ground() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let plane = ground(&mut objects, &mut space);
    let body = sphere_body(&mut objects, &mut space, Vec3::new(0.0, 5.0, 0.0));
    let state = space.direct_state(&objects).unwrap();

    let from = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
    let free = state
        .test_body_motion(body, &from, Vec3::new(0.0, -2.0, 0.0), 0.01, &BTreeSet::new(), false)
        .unwrap();
    assert!(!free.is_blocked());
    assert!(free.collision.is_none());
    assert!((free.body_transform.position.y - 3.0).abs() < 1e-5);

    let blocked = state
        .test_body_motion(body, &from, Vec3::new(0.0, -10.0, 0.0), 0.01, &BTreeSet::new(), false)
        .unwrap();
    assert!((blocked.safe_fraction - 0.45).abs() < 1e-3);
    assert!(blocked.body_transform.position.y >= 0.5 - 1e-3);
    let collision = blocked.collision.expect("resting contact with the ground");
    assert_eq!(collision.collider, plane);
    assert!((collision.normal - Vec3::Y).length() < 1e-3);
    assert!(collision.depth > 0.0);

    let mut exclude = BTreeSet::new();
    exclude.insert(plane);
    let ignored = state
        .test_body_motion(body, &from, Vec3::new(0.0, -10.0, 0.0), 0.01, &exclude, false)
        .unwrap();
    assert!(!ignored.is_blocked());
}

#[test]
fn test_body_motion_rejects_non_bodies() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let area = objects.insert(
        CollisionObject::area(Area::default())
            .with_shape(Shape::Sphere { radius: 1.0 }, Transform::IDENTITY),
    );
    space.add_object(&mut objects, area).unwrap();
    let outsider = objects.insert(CollisionObject::rigid_body(RigidBody::new(1.0)));
    let state = space.direct_state(&objects).unwrap();

    assert!(matches!(
        state.test_body_motion(area, &Transform::IDENTITY, Vec3::X, 0.0, &BTreeSet::new(), false),
        Err(SpaceError::WrongObjectKind { .. })
    ));
    assert!(matches!(
        state.test_body_motion(outsider, &Transform::IDENTITY, Vec3::X, 0.0, &BTreeSet::new(), false),
        Err(SpaceError::UnknownObject(_))
    ));
}

#[test]
fn test_overlap_queries_are_repeatable() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let mut expected = BTreeSet::new();
    for i in 0..6 {
        expected.insert(sphere_body(&mut objects, &mut space, Vec3::new(i as f32 * 0.4, 0.0, 0.0)));
    }
    sphere_body(&mut objects, &mut space, Vec3::new(20.0, 0.0, 0.0));

    let state = space.direct_state(&objects).unwrap();
    let query_box = Shape::Box {
        half_extents: Vec3::new(2.5, 1.0, 1.0),
    };
    let at = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
    let filter = QueryFilter::default();

    let mut first = Vec::new();
    let mut second = Vec::new();
    state.intersect_shape(&query_box, &at, 0.0, &mut first, 32, &filter);
    state.intersect_shape(&query_box, &at, 0.0, &mut second, 32, &filter);

    let first: BTreeSet<ObjectId> = first.iter().map(|hit| hit.collider).collect();
    let second: BTreeSet<ObjectId> = second.iter().map(|hit| hit.collider).collect();
    assert_eq!(first, second);
    assert_eq!(first, expected);

    let mut points = Vec::new();
    let found = state.intersect_point(Vec3::new(0.2, 0.0, 0.0), &mut points, 32, &filter);
    assert_eq!(found, 2);
}

#[test]
fn test_areas_only_reported_when_requested() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let area = objects.insert(
        CollisionObject::area(Area::default())
            .with_shape(Shape::Sphere { radius: 1.0 }, Transform::IDENTITY),
    );
    space.add_object(&mut objects, area).unwrap();
    let state = space.direct_state(&objects).unwrap();

    let mut hits = Vec::new();
    assert_eq!(state.intersect_point(Vec3::ZERO, &mut hits, 8, &QueryFilter::default()), 0);
    let with_areas = QueryFilter::default().with_areas(true);
    assert_eq!(state.intersect_point(Vec3::ZERO, &mut hits, 8, &with_areas), 1);
    assert_eq!(hits[0].collider, area);
}

#[test]
fn test_body_motion_recovers_from_deep_penetration() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    ground(&mut objects, &mut space);
    let max_allowed = space.get_param(SpaceParameter::ContactMaxAllowedPenetration);

    for start_height in [0.2, 0.0] {
        let body = sphere_body(&mut objects, &mut space, Vec3::new(0.0, start_height, 0.0));
        let state = space.direct_state(&objects).unwrap();
        let from = Transform::from_position(Vec3::new(0.0, start_height, 0.0));
        let result = state
            .test_body_motion(body, &from, Vec3::X, 0.01, &BTreeSet::new(), false)
            .unwrap();

        let penetration = 0.5 - result.body_transform.position.y;
        assert!(
            penetration <= max_allowed + 1e-4,
            "started at {start_height}, still {penetration} deep"
        );
        assert!(result.travel.y > 0.0);
        space.remove_object(&mut objects, body).unwrap();
    }
}

#[test]
fn test_body_motion_separation_ray_only_when_requested() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    ground(&mut objects, &mut space);

    // Ray pointing straight down, reaching 0.5 below the plane
    let pointing_down = Transform::from_position_rotation(
        Vec3::ZERO,
        Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
    );
    let body = objects.insert(
        CollisionObject::rigid_body(RigidBody::new(1.0))
            .with_transform(Transform::from_position(Vec3::new(0.0, 0.5, 0.0)))
            .with_shape(Shape::SeparationRay { length: 1.0 }, pointing_down),
    );
    space.add_object(&mut objects, body).unwrap();
    let state = space.direct_state(&objects).unwrap();
    let from = Transform::from_position(Vec3::new(0.0, 0.5, 0.0));

    let ignored = state
        .test_body_motion(body, &from, Vec3::X, 0.0, &BTreeSet::new(), false)
        .unwrap();
    assert!(!ignored.is_blocked());
    assert_eq!(ignored.body_transform.position, Vec3::new(1.0, 0.5, 0.0));

    let separated = state
        .test_body_motion(body, &from, Vec3::X, 0.0, &BTreeSet::new(), true)
        .unwrap();
    let height = separated.body_transform.position.y;
    assert!(height > 0.98 && height <= 1.0 + 1e-4, "ray lifted the body to {height}");
}

#[test]
fn test_pick_rays_follow_pickable_and_one_way_rules() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let cube = Shape::Box {
        half_extents: Vec3::splat(1.0),
    };

    let mut one_way = CollisionObject::rigid_body(RigidBody::new_static())
        .with_transform(Transform::from_position(Vec3::new(5.0, 0.0, 0.0)))
        .with_shape(cube, Transform::IDENTITY);
    one_way.shapes_mut()[0].one_way = true;
    let one_way = objects.insert(one_way);
    space.add_object(&mut objects, one_way).unwrap();

    let mut hidden = CollisionObject::rigid_body(RigidBody::new_static())
        .with_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)))
        .with_shape(cube, Transform::IDENTITY);
    hidden.ray_pickable = false;
    let hidden = objects.insert(hidden);
    space.add_object(&mut objects, hidden).unwrap();

    let state = space.direct_state(&objects).unwrap();
    let to = Vec3::new(20.0, 0.0, 0.0);
    let filter = QueryFilter::default();

    let regular = state.intersect_ray(Vec3::ZERO, to, &filter, false).unwrap();
    assert_eq!(regular.collider, hidden);
    assert!((regular.position.x - 9.0).abs() < 1e-4);

    let picked = state.intersect_ray(Vec3::ZERO, to, &filter, true).unwrap();
    assert_eq!(picked.collider, one_way);
    assert!((picked.position.x - 4.0).abs() < 1e-4);

    let without_one_way = QueryFilter::default().excluding(one_way);
    assert!(state.intersect_ray(Vec3::ZERO, to, &without_one_way, true).is_none());
}

//! Registry, activity list and lock behaviour of a space

use physics_space::prelude::*;

fn ball(objects: &mut ObjectArena, position: Vec3) -> ObjectId {
    objects.insert(
        CollisionObject::rigid_body(RigidBody::new(1.0))
            .with_transform(Transform::from_position(position))
            .with_shape(Shape::Sphere { radius: 0.5 }, Transform::IDENTITY),
    )
}

#[test]
fn test_add_and_remove_are_not_repeatable() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let id = ball(&mut objects, Vec3::ZERO);

    space.add_object(&mut objects, id).unwrap();
    assert!(matches!(
        space.add_object(&mut objects, id),
        Err(SpaceError::AlreadyRegistered(_))
    ));
    assert_eq!(space.object_count(), 1);

    space.remove_object(&mut objects, id).unwrap();
    assert!(matches!(
        space.remove_object(&mut objects, id),
        Err(SpaceError::NotRegistered(_))
    ));
    assert_eq!(space.object_count(), 0);
    assert_eq!(space.proxy_count(), 0);
}

#[test]
fn test_object_cannot_join_two_spaces() {
    let mut objects = ObjectArena::new();
    let mut first = Space::new();
    let mut second = Space::new();
    let id = ball(&mut objects, Vec3::ZERO);

    first.add_object(&mut objects, id).unwrap();
    assert!(second.add_object(&mut objects, id).is_err());
    assert!(!second.contains_object(id));
}

#[test]
fn test_activity_lists_are_idempotent() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let id = ball(&mut objects, Vec3::ZERO);
    space.add_object(&mut objects, id).unwrap();

    assert!(space.body_add_to_state_query_list(&mut objects, id).unwrap());
    assert!(!space.body_add_to_state_query_list(&mut objects, id).unwrap());
    assert_eq!(space.list(ListKind::StateQuery).len(), 1);

    assert!(space.body_remove_from_state_query_list(&mut objects, id).unwrap());
    assert!(!space.body_remove_from_state_query_list(&mut objects, id).unwrap());
    assert!(space.list(ListKind::StateQuery).is_empty());

    // Membership in one list does not affect the others
    assert_eq!(space.list(ListKind::ActiveBody).to_vec(), vec![id]);
}

#[test]
fn test_lists_reject_wrong_object_kind() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let area = objects.insert(CollisionObject::area(Area::default().with_monitoring(true)));
    space.add_object(&mut objects, area).unwrap();
    let monitor = objects.get(area).unwrap().as_area().unwrap();
    assert!(monitor.monitoring && monitor.monitoring_areas);

    assert!(matches!(
        space.body_add_to_active_list(&mut objects, area),
        Err(SpaceError::WrongObjectKind { .. })
    ));
    assert!(space.area_add_to_monitor_query_list(&mut objects, area).unwrap());
}

#[test]
fn test_locked_space_rejects_registry_changes() {
    let mut objects = ObjectArena::new();
    let mut space = Space::new();
    let a = ball(&mut objects, Vec3::ZERO);
    let b = ball(&mut objects, Vec3::new(0.5, 0.0, 0.0));
    let c = ball(&mut objects, Vec3::new(5.0, 0.0, 0.0));
    space.add_object(&mut objects, a).unwrap();
    space.add_object(&mut objects, b).unwrap();
    space.step(&mut objects, 1.0 / 60.0).unwrap();

    let count = space.object_count();
    let proxies = space.proxy_count();
    let pairs = space.collision_pairs();

    space.lock().unwrap();
    assert!(matches!(space.add_object(&mut objects, c), Err(SpaceError::Locked)));
    assert!(matches!(space.remove_object(&mut objects, a), Err(SpaceError::Locked)));
    assert!(matches!(
        space.body_add_to_state_query_list(&mut objects, a),
        Err(SpaceError::Locked)
    ));
    assert!(matches!(space.lock(), Err(SpaceError::AlreadyLocked)));
    assert!(matches!(space.step(&mut objects, 1.0 / 60.0), Err(SpaceError::AlreadyLocked)));
    space.unlock().unwrap();

    assert_eq!(space.object_count(), count);
    assert_eq!(space.proxy_count(), proxies);
    assert_eq!(space.collision_pairs(), pairs);
    assert!(!space.contains_object(c));
}

#[test]
fn test_parameters_are_frozen_while_locked() {
    let mut space = Space::new();
    let before = space.get_param(SpaceParameter::BodyTimeToSleep);

    space.lock().unwrap();
    assert!(matches!(
        space.set_param(SpaceParameter::BodyTimeToSleep, 3.0),
        Err(SpaceError::Locked)
    ));
    assert_eq!(space.get_param(SpaceParameter::BodyTimeToSleep), before);
    space.unlock().unwrap();

    space.set_param(SpaceParameter::BodyTimeToSleep, 3.0).unwrap();
    assert_eq!(space.get_param(SpaceParameter::BodyTimeToSleep), 3.0);
    assert!(matches!(
        space.set_param(SpaceParameter::BodyTimeToSleep, -1.0),
        Err(SpaceError::InvalidParameterValue { .. })
    ));
    assert_eq!(space.get_param(SpaceParameter::BodyTimeToSleep), 3.0);
}

#[test]
fn test_body_mode_changes_keep_lists_in_sync() {
    let mut objects = ObjectArena::new();
    let mut space = Space::with_defaults(&mut objects, &SpaceConfig::default()).unwrap();
    let id = ball(&mut objects, Vec3::new(0.0, 10.0, 0.0));
    space.add_object(&mut objects, id).unwrap();
    assert_eq!(space.list(ListKind::ActiveBody).to_vec(), vec![id]);

    space.body_set_mode(&mut objects, id, BodyMode::Static).unwrap();
    assert!(space.list(ListKind::ActiveBody).is_empty());
    for _ in 0..10 {
        space.step(&mut objects, 1.0 / 60.0).unwrap();
    }
    assert_eq!(objects.get(id).unwrap().transform().position.y, 10.0);

    space.body_set_mode(&mut objects, id, BodyMode::Rigid).unwrap();
    assert_eq!(space.list(ListKind::ActiveBody).to_vec(), vec![id]);
    for _ in 0..10 {
        space.step(&mut objects, 1.0 / 60.0).unwrap();
    }
    assert!(objects.get(id).unwrap().transform().position.y < 10.0);

    let area = objects.insert(CollisionObject::area(Area::default()));
    space.add_object(&mut objects, area).unwrap();
    assert!(matches!(
        space.body_set_mode(&mut objects, area, BodyMode::Static),
        Err(SpaceError::WrongObjectKind { .. })
    ));
}

#[test]
fn test_default_objects_are_protected() {
    let mut objects = ObjectArena::new();
    let mut space = Space::with_defaults(&mut objects, &SpaceConfig::default()).unwrap();
    let area = space.default_area().unwrap();
    let body = space.static_global_body().unwrap();

    assert!(matches!(
        space.remove_object(&mut objects, area),
        Err(SpaceError::ProtectedObject(_))
    ));
    assert!(matches!(
        space.remove_object(&mut objects, body),
        Err(SpaceError::ProtectedObject(_))
    ));
    assert_eq!(space.object_count(), 2);

    space.clear(&mut objects).unwrap();
    assert_eq!(space.object_count(), 0);
    assert!(space.default_area().is_none());
}

#[test]
fn test_debug_contact_buffer_is_bounded() {
    let mut space = Space::new();
    space.set_debug_contacts(3);
    for i in 0..10 {
        space.add_debug_contact(Vec3::splat(i as f32));
    }
    assert_eq!(space.debug_contact_count(), 3);
    assert_eq!(space.debug_contacts().len(), 3);
    assert_eq!(space.debug_contacts_flat().len(), 9);
    assert_eq!(space.debug_contacts()[2], Vec3::splat(2.0));
}

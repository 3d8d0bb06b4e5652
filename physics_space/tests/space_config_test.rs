//! Loading and saving space configuration files

use physics_space::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("space.json");

    let mut config = SpaceConfig {
        gravity: Vec3::new(0.0, -1.62, 0.0),
        solver_iterations: 12,
        ..Default::default()
    };
    config
        .params
        .set(SpaceParameter::BodyTimeToSleep, 2.0)
        .unwrap();
    config.save(&path).unwrap();

    let loaded = SpaceConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_loaded_config_drives_the_space() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("space.json");
    std::fs::write(
        &path,
        r#"{ "gravity": [0.0, -3.0, 0.0], "linear_damp": 0.0, "params": { "constraint_default_bias": 0.2 } }"#,
    )
    .unwrap();

    let config = SpaceConfig::load(&path).unwrap();
    let mut objects = ObjectArena::new();
    let mut space = Space::with_defaults(&mut objects, &config).unwrap();
    assert_eq!(space.get_param(SpaceParameter::ConstraintDefaultBias), 0.2);
    assert_eq!(
        space.get_param(SpaceParameter::BodyTimeToSleep),
        SpaceParams::default().body_time_to_sleep
    );

    let body = objects.insert(
        CollisionObject::rigid_body(RigidBody::new(1.0))
            .with_shape(Shape::Sphere { radius: 0.5 }, Transform::IDENTITY),
    );
    space.add_object(&mut objects, body).unwrap();
    space.step(&mut objects, 0.5).unwrap();

    let velocity = objects.get(body).unwrap().body().unwrap().linear_velocity;
    assert!((velocity.y + 1.5).abs() < 1e-4);
}

#[test]
fn test_missing_or_broken_config_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        SpaceConfig::load(dir.path().join("missing.json")),
        Err(SpaceError::Io(_))
    ));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(SpaceConfig::load(&path), Err(SpaceError::Json(_))));
}

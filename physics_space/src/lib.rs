//! Simulation space for a software 3D physics engine
//!
//! A [`Space`](space::Space) registers collision objects owned by an
//! [`ObjectArena`](object::ObjectArena), steps them through broad phase
//! pairing, island building, contact solving and integration, and answers
//! direct spatial queries between steps.

pub mod collision;
pub mod error;
pub mod math;
pub mod object;
pub mod params;
pub mod profiling;
pub mod query;
pub mod space;

// Re-export commonly used types
pub mod prelude {
    pub use crate::collision::{BroadPhase, Shape, SweepAndPruneBroadPhase, AABB};
    pub use crate::error::SpaceError;
    pub use crate::math::Transform;
    pub use crate::object::{
        Area, AreaSpaceOverride, BodyMode, CollisionObject, ObjectArena, ObjectId, RigidBody,
        ShapeInstance, SoftBody, SpaceObject,
    };
    pub use crate::params::{SpaceConfig, SpaceParameter, SpaceParams};
    pub use crate::query::{
        DirectSpaceState, MotionCast, MotionCollision, MotionResult, QueryFilter, RayResult,
        ShapeRestInfo, ShapeResult,
    };
    pub use crate::space::activity::ListKind;
    pub use crate::space::callbacks::SpaceEvent;
    pub use crate::space::{
        BodyStateUpdate, ElapsedTime, MonitorEvent, Space, SpaceId, SpaceObserver,
    };

    pub use glam::{Quat, Vec3};
}

/// Initialize logging for the physics space
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,physics_space=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

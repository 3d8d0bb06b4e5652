//! Error types for space operations

use crate::object::ObjectId;

/// Errors reported by the space, its registry and its configuration loaders.
///
/// Every contract violation leaves the space untouched.
#[derive(Debug, thiserror::Error)]
pub enum SpaceError {
    #[error("space is locked while stepping")]
    Locked,

    #[error("space is already locked")]
    AlreadyLocked,

    #[error("space is not locked")]
    NotLocked,

    #[error("object {0:?} is already registered with a space")]
    AlreadyRegistered(ObjectId),

    #[error("object {0:?} is not registered with this space")]
    NotRegistered(ObjectId),

    #[error("object {0:?} does not exist")]
    UnknownObject(ObjectId),

    #[error("object {0:?} is still registered with a space")]
    StillRegistered(ObjectId),

    #[error("object {0:?} is owned by the space and cannot be removed")]
    ProtectedObject(ObjectId),

    #[error("object {id:?} is not a {expected}")]
    WrongObjectKind { id: ObjectId, expected: &'static str },

    #[error("unknown space parameter: {0}")]
    UnknownParameter(String),

    #[error("invalid value {value} for space parameter {name}")]
    InvalidParameterValue { name: &'static str, value: f32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

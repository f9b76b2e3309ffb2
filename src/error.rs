//! Error type shared by every module of the crate.

use thiserror::Error;

use crate::body::BodyId;

/// Errors reported by world management, configuration and contact resolution.
///
/// Expected control flow (bodies separating, shapes not touching) is never an
/// error; these variants cover misconfiguration and exhausted capacity only.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PhysicsError {
    /// The world already holds as many bodies as its capacity allows.
    #[error("world is full: capacity {capacity}")]
    CapacityExceeded {
        /// Compile-time body capacity of the world.
        capacity: usize,
    },

    /// The id does not name a body in this world.
    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),

    /// A manifold has no rigid-body reference on one of its sides.
    #[error("manifold is missing a rigid body reference")]
    MissingBody,

    /// Mass must be finite and non-negative (zero means infinite mass).
    #[error("invalid mass {0}")]
    InvalidMass(f32),

    /// Inertia must be finite and non-negative (zero means no rotation).
    #[error("invalid inertia {0}")]
    InvalidInertia(f32),

    /// A configuration value is outside its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Too many torques were queued before the next integration step.
    #[error("torque queue is full: capacity {capacity}")]
    TorqueQueueFull {
        /// Number of torques a body can hold between steps.
        capacity: usize,
    },
}

impl PhysicsError {
    /// Returns `true` for errors that only affect a single pair or call and
    /// leave the rest of the simulation untouched.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PhysicsError::MissingBody
                | PhysicsError::UnknownBody(_)
                | PhysicsError::TorqueQueueFull { .. }
        )
    }
}

//! Tunables for bodies and for the simulation loop.
//!
//! Defaults match the values the demo scenes were authored against: unit mass,
//! no bounce, 0.5/0.2 static/dynamic friction, Earth gravity on Y, a 60 Hz
//! fixed step and air drag.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// Per-body physical properties.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyConfig {
    /// Mass in kg. `0.0` means infinite mass (the body never moves).
    pub mass: f32,
    /// Bounciness in `0.0..=1.0`.
    pub restitution: f32,
    /// Friction coefficient used while the contact is sticking.
    pub static_friction: f32,
    /// Friction coefficient used while the contact is sliding.
    pub dynamic_friction: f32,
    /// Kinematic bodies ignore gravity and impulses but still collide.
    pub kinematic: bool,
    /// Gravitational acceleration along world Y.
    pub gravity: f32,
    /// Explicit moment of inertia. `None` derives it from the shape.
    pub inertia: Option<f32>,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            restitution: 0.0,
            static_friction: 0.5,
            dynamic_friction: 0.2,
            kinematic: false,
            gravity: -9.81,
            inertia: None,
        }
    }
}

impl BodyConfig {
    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(PhysicsError::InvalidMass(self.mass));
        }
        if let Some(inertia) = self.inertia {
            if !inertia.is_finite() || inertia < 0.0 {
                return Err(PhysicsError::InvalidInertia(inertia));
            }
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(PhysicsError::InvalidConfig("restitution must be within 0..=1"));
        }
        if !(self.static_friction >= 0.0 && self.dynamic_friction >= 0.0) {
            return Err(PhysicsError::InvalidConfig("friction must be non-negative"));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig("gravity must be finite"));
        }
        Ok(())
    }
}

/// Fixed-step loop and solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Length of one physics step in seconds.
    pub fixed_timestep: f32,
    /// Upper bound on the time carried into a single tick.
    pub max_frame_time: f32,
    /// Penetration tolerated before positional correction kicks in.
    pub penetration_slop: f32,
    /// Fraction of the remaining penetration removed per contact.
    pub correction_percent: f32,
    /// Box pairs further apart than this skip the SAT test.
    pub sat_cull_distance: f32,
    /// Density of the surrounding fluid for drag (1.2 = air, 0 disables drag).
    pub fluid_density: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_frame_time: 0.2,
            penetration_slop: 0.01,
            correction_percent: 0.8,
            sat_cull_distance: 10.0,
            fluid_density: 1.2,
        }
    }
}

impl SimulationConfig {
    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.fixed_timestep > 0.0 && self.fixed_timestep.is_finite()) {
            return Err(PhysicsError::InvalidConfig("fixed_timestep must be positive"));
        }
        if !(self.max_frame_time > 0.0 && self.max_frame_time.is_finite()) {
            return Err(PhysicsError::InvalidConfig("max_frame_time must be positive"));
        }
        if !(self.correction_percent > 0.0 && self.correction_percent <= 1.0) {
            return Err(PhysicsError::InvalidConfig("correction_percent must be within (0, 1]"));
        }
        if !(self.penetration_slop >= 0.0) {
            return Err(PhysicsError::InvalidConfig("penetration_slop must be non-negative"));
        }
        if !(self.sat_cull_distance >= 0.0) {
            return Err(PhysicsError::InvalidConfig("sat_cull_distance must be non-negative"));
        }
        if !(self.fluid_density >= 0.0) {
            return Err(PhysicsError::InvalidConfig("fluid_density must be non-negative"));
        }
        Ok(())
    }

    /// Same settings without air drag.
    pub fn without_drag(mut self) -> Self {
        self.fluid_density = 0.0;
        self
    }
}

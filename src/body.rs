//! Rigid bodies: mass properties, linear and angular state, and the
//! per-step integration halves driven by [`PhysicsWorld`](crate::world::PhysicsWorld).
//!
//! # Units
//! - Orientation is in Euler degrees and angular velocity in degrees per
//!   second, so `orientation += angular_velocity * dt` stays meaningful.
//! - Gravity is a Y-axis acceleration in m/s², set per body.
//!
//! # Infinite mass
//! A mass of `0.0` stands for infinite mass: the inverse mass is `0.0`, the
//! body is never integrated and impulses and corrections leave it alone.

use heapless::Vec;
use nalgebra::Vector3;

// ComplexField provides abs() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

use crate::config::BodyConfig;
use crate::error::PhysicsError;
use crate::history::BodyState;
use crate::pose::Pose;
use crate::shape::{DragProfile, Shape, ShapeGeometry};

/// Number of torques a body can queue between two integration steps.
pub const TORQUE_QUEUE_CAPACITY: usize = 16;

/// Density of air in kg/m³.
pub const AIR_DENSITY: f32 = 1.2;

/// Unique identifier for a rigid body within a [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(usize);

impl BodyId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot of the body in its world.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A rigid body carrying one collision [`Shape`].
#[derive(Debug, Clone)]
pub struct RigidBody {
    // -- Linear state --
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    /// Acceleration computed by the last integration step.
    pub acceleration: Vector3<f32>,
    mass: f32,
    inv_mass: f32,

    // -- Material --
    /// Bounciness (0.0 = fully inelastic, 1.0 = fully elastic).
    pub restitution: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,

    /// Kinematic bodies move only by their own velocity: no gravity, drag,
    /// torques, impulses or position correction.
    pub kinematic: bool,

    /// Y-axis gravitational acceleration.
    pub gravity: f32,

    // -- Angular state --
    /// Euler angles in degrees.
    pub orientation: Vector3<f32>,
    /// Degrees per second.
    pub angular_velocity: Vector3<f32>,
    inertia: f32,
    inv_inertia: f32,
    explicit_inertia: bool,

    shape: Shape,
    drag: DragProfile,

    /// Torques queued since the last step, applied and cleared by the next.
    torques: Vec<Vector3<f32>, TORQUE_QUEUE_CAPACITY>,

    /// Inactive bodies are skipped by integration and collision detection.
    pub active: bool,
}

impl RigidBody {
    /// Create a unit-mass dynamic body with default material and the inertia
    /// of its shape.
    pub fn new(shape: Shape) -> Self {
        let config = BodyConfig::default();
        let drag = shape.drag_profile();
        let mut body = Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            mass: 0.0,
            inv_mass: 0.0,
            restitution: config.restitution,
            static_friction: config.static_friction,
            dynamic_friction: config.dynamic_friction,
            kinematic: config.kinematic,
            gravity: config.gravity,
            orientation: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            inertia: 0.0,
            inv_inertia: 0.0,
            explicit_inertia: false,
            shape,
            drag,
            torques: Vec::new(),
            active: true,
        };
        body.assign_mass(config.mass);
        body
    }

    /// Create an infinite-mass body that never moves.
    pub fn new_static(shape: Shape) -> Self {
        let mut body = Self::new(shape);
        body.assign_mass(0.0);
        body
    }

    /// Create a body from validated configuration.
    pub fn from_config(shape: Shape, config: &BodyConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        let mut body = Self::new(shape);
        body.restitution = config.restitution;
        body.static_friction = config.static_friction;
        body.dynamic_friction = config.dynamic_friction;
        body.kinematic = config.kinematic;
        body.gravity = config.gravity;
        body.assign_mass(config.mass);
        if let Some(inertia) = config.inertia {
            body.set_inertia(inertia)?;
        }
        Ok(body)
    }

    /// Builder: set initial position.
    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    /// Builder: set initial velocity.
    pub fn with_velocity(mut self, velocity: Vector3<f32>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: set initial orientation (Euler degrees).
    pub fn with_orientation(mut self, orientation: Vector3<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Builder: set initial angular velocity (degrees per second).
    pub fn with_angular_velocity(mut self, angular_velocity: Vector3<f32>) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Builder: set mass in kg (`0.0` for infinite mass).
    ///
    /// # Panics
    /// Panics if `mass` is negative or not finite. Use [`RigidBody::set_mass`]
    /// for unchecked input.
    pub fn with_mass(mut self, mass: f32) -> Self {
        assert!(mass >= 0.0 && mass.is_finite(), "mass must be finite and non-negative");
        self.assign_mass(mass);
        self
    }

    /// Builder: set restitution (bounciness, 0.0..=1.0).
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    /// Builder: set static and dynamic friction coefficients.
    pub fn with_friction(mut self, static_friction: f32, dynamic_friction: f32) -> Self {
        self.static_friction = static_friction.max(0.0);
        self.dynamic_friction = dynamic_friction.max(0.0);
        self
    }

    /// Builder: mark the body kinematic.
    pub fn with_kinematic(mut self, kinematic: bool) -> Self {
        self.kinematic = kinematic;
        self
    }

    /// Builder: set the Y-axis gravitational acceleration.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    fn assign_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.inv_mass = if mass == 0.0 { 0.0 } else { 1.0 / mass };
        if !self.explicit_inertia {
            self.assign_inertia(self.shape.inertia(mass));
        }
    }

    fn assign_inertia(&mut self, inertia: f32) {
        self.inertia = inertia;
        self.inv_inertia = if inertia == 0.0 { 0.0 } else { 1.0 / inertia };
    }

    /// Change the mass, keeping the inverse mass (and a shape-derived inertia)
    /// consistent with it.
    pub fn set_mass(&mut self, mass: f32) -> Result<(), PhysicsError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        self.assign_mass(mass);
        Ok(())
    }

    /// Override the moment of inertia. `0.0` disables rotation.
    pub fn set_inertia(&mut self, inertia: f32) -> Result<(), PhysicsError> {
        if !inertia.is_finite() || inertia < 0.0 {
            return Err(PhysicsError::InvalidInertia(inertia));
        }
        self.explicit_inertia = true;
        self.assign_inertia(inertia);
        Ok(())
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    #[inline]
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// `true` for infinite-mass bodies.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    /// Whether contact resolution may change this body's state.
    #[inline]
    pub fn accepts_impulses(&self) -> bool {
        !self.kinematic && self.inv_mass > 0.0
    }

    /// Inverse mass as seen by contact resolution (zero for kinematic bodies).
    #[inline]
    pub fn effective_inv_mass(&self) -> f32 {
        if self.kinematic { 0.0 } else { self.inv_mass }
    }

    /// Inverse inertia as seen by contact resolution.
    #[inline]
    pub fn effective_inv_inertia(&self) -> f32 {
        if self.kinematic || self.inv_mass == 0.0 { 0.0 } else { self.inv_inertia }
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn drag_profile(&self) -> DragProfile {
        self.drag
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    /// Torques waiting for the next step.
    pub fn pending_torques(&self) -> &[Vector3<f32>] {
        &self.torques
    }

    /// Queue a torque for the next step.
    pub fn apply_torque(&mut self, torque: Vector3<f32>) -> Result<(), PhysicsError> {
        self.torques.push(torque).map_err(|_| PhysicsError::TorqueQueueFull {
            capacity: TORQUE_QUEUE_CAPACITY,
        })
    }

    /// Drop every queued torque.
    pub fn clear_torques(&mut self) {
        self.torques.clear();
    }

    /// Queue the torque of a push along `direction` at world `point`.
    ///
    /// The push is scaled by the distance from the body's center to `point`
    /// and remapped onto the Euler axes as `(z, -y, x)`.
    pub fn apply_torque_at(&mut self, point: Vector3<f32>, direction: Vector3<f32>) -> Result<(), PhysicsError> {
        let torque = direction * (self.position - point).norm();
        self.apply_torque(Vector3::new(torque.z, -torque.y, torque.x))
    }

    /// Returns the current speed (magnitude of velocity).
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    /// Returns the kinetic energy of this body: `0.5 * m * v^2`.
    #[inline]
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.velocity.norm_squared()
    }

    /// Quadratic drag opposing the velocity on each axis.
    pub fn drag_force(&self, fluid_density: f32) -> Vector3<f32> {
        let k = -0.5 * fluid_density * self.drag.coefficient * self.drag.area;
        self.velocity.component_mul(&self.velocity.abs()) * k
    }

    /// Copy of the state recorded by history.
    pub fn state(&self) -> BodyState {
        BodyState {
            velocity: self.velocity,
            position: self.position,
            acceleration: self.acceleration,
            angular_velocity: self.angular_velocity,
            orientation: self.orientation,
        }
    }

    /// Overwrite the recorded state and refresh the shape to match.
    pub fn restore(&mut self, state: &BodyState) {
        self.velocity = state.velocity;
        self.position = state.position;
        self.acceleration = state.acceleration;
        self.angular_velocity = state.angular_velocity;
        self.orientation = state.orientation;
        self.sync_shape();
    }

    /// Rebuild the shape's cached geometry from the current pose.
    pub fn sync_shape(&mut self) {
        let pose = self.pose();
        self.shape.refresh(&pose);
    }

    /// First half of a step: forces, torques, orientation and velocity.
    ///
    /// Returns `false` when the body sits the step out (infinite mass or a
    /// non-finite position); the caller then skips detection and
    /// [`RigidBody::finish_step`].
    pub(crate) fn begin_step(&mut self, dt: f32, fluid_density: f32) -> bool {
        if self.mass == 0.0 {
            return false;
        }
        if !self.position.iter().all(|c| c.is_finite()) {
            log::warn!("skipping body with non-finite position {:?}", self.position);
            return false;
        }

        if self.kinematic {
            self.acceleration = Vector3::zeros();
        } else {
            let force = self.drag_force(fluid_density) * dt;
            self.acceleration = force * self.inv_mass + Vector3::new(0.0, self.gravity, 0.0);
            for torque in self.torques.iter() {
                self.angular_velocity += torque * self.inv_inertia;
            }
        }
        self.torques.clear();

        self.orientation += self.angular_velocity * dt;
        self.velocity += self.acceleration * dt;
        self.sync_shape();
        true
    }

    /// Second half of a step: position and angular damping.
    pub(crate) fn finish_step(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        self.angular_velocity *= 1.0 - dt;
        self.sync_shape();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;
    const DT: f32 = 1.0 / 60.0;

    fn ball() -> RigidBody {
        RigidBody::new(Shape::ball(0.5))
    }

    #[test]
    fn test_defaults() {
        let body = ball();
        assert_eq!(body.mass(), 1.0);
        assert_eq!(body.inv_mass(), 1.0);
        assert_eq!(body.restitution, 0.0);
        assert_eq!(body.static_friction, 0.5);
        assert_eq!(body.dynamic_friction, 0.2);
        assert_eq!(body.gravity, -9.81);
        assert!(!body.kinematic);
        assert!(body.active);
        assert_relative_eq!(body.inertia(), 0.1, epsilon = EPSILON);
        assert_relative_eq!(body.inv_inertia(), 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_mass_inverse_stays_consistent() {
        let mut body = ball();
        body.set_mass(4.0).unwrap();
        assert_eq!(body.inv_mass(), 0.25);
        assert_relative_eq!(body.inertia(), 0.4, epsilon = EPSILON);

        body.set_mass(0.0).unwrap();
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inertia(), 0.0);
        assert_eq!(body.inv_inertia(), 0.0);
        assert!(body.is_static());

        assert_eq!(body.set_mass(-2.0), Err(PhysicsError::InvalidMass(-2.0)));
        assert!(body.set_mass(f32::INFINITY).is_err());
    }

    #[test]
    fn test_explicit_inertia_survives_mass_change() {
        let mut body = ball();
        body.set_inertia(2.0).unwrap();
        body.set_mass(3.0).unwrap();
        assert_eq!(body.inertia(), 2.0);
        assert_eq!(body.inv_inertia(), 0.5);
        assert!(body.set_inertia(-1.0).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = BodyConfig {
            mass: 2.0,
            restitution: 0.7,
            kinematic: true,
            inertia: Some(5.0),
            ..BodyConfig::default()
        };
        let body = RigidBody::from_config(Shape::from_scale(ShapeKind::Box, Vector3::repeat(2.0)), &config).unwrap();
        assert_eq!(body.mass(), 2.0);
        assert_eq!(body.restitution, 0.7);
        assert!(body.kinematic);
        assert_eq!(body.inertia(), 5.0);

        let bad = BodyConfig { mass: -1.0, ..BodyConfig::default() };
        assert!(RigidBody::from_config(Shape::ball(1.0), &bad).is_err());
    }

    #[test]
    fn test_effective_inverse_mass() {
        let body = ball().with_kinematic(true);
        assert_eq!(body.effective_inv_mass(), 0.0);
        assert_eq!(body.effective_inv_inertia(), 0.0);
        assert!(!body.accepts_impulses());
        assert!(ball().accepts_impulses());
        assert!(!RigidBody::new_static(Shape::ball(1.0)).accepts_impulses());
    }

    #[test]
    fn test_torque_queue_is_bounded() {
        let mut body = ball();
        for _ in 0..TORQUE_QUEUE_CAPACITY {
            body.apply_torque(Vector3::x()).unwrap();
        }
        assert_eq!(
            body.apply_torque(Vector3::x()),
            Err(PhysicsError::TorqueQueueFull { capacity: TORQUE_QUEUE_CAPACITY })
        );
    }

    #[test]
    fn test_apply_torque_at_remaps_axes() {
        let mut body = ball().with_position(Vector3::new(0.0, 0.0, 0.0));
        body.apply_torque_at(Vector3::new(0.0, 2.0, 0.0), Vector3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(body.pending_torques(), &[Vector3::new(6.0, -4.0, 2.0)]);
    }

    #[test]
    fn test_torques_applied_once_then_cleared() {
        let mut body = ball().with_gravity(0.0);
        body.apply_torque(Vector3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(body.begin_step(DT, 0.0));
        body.finish_step(DT);
        assert!(body.pending_torques().is_empty());
        // omega = 1 * inv_inertia, then damped by (1 - dt)
        assert_relative_eq!(body.angular_velocity.y, 10.0 * (1.0 - DT), epsilon = 1e-3);
        assert_relative_eq!(body.orientation.y, 10.0 * DT, epsilon = 1e-4);
    }

    #[test]
    fn test_free_fall_step() {
        let mut body = ball().with_position(Vector3::new(0.0, 10.0, 0.0));
        assert!(body.begin_step(DT, 0.0));
        body.finish_step(DT);
        assert_relative_eq!(body.acceleration, Vector3::new(0.0, -9.81, 0.0), epsilon = EPSILON);
        assert_relative_eq!(body.velocity.y, -9.81 * DT, epsilon = EPSILON);
        assert_relative_eq!(body.position.y, 10.0 - 9.81 * DT * DT, epsilon = EPSILON);
    }

    #[test]
    fn test_drag_opposes_motion() {
        let body = ball().with_velocity(Vector3::new(2.0, -3.0, 0.0));
        let drag = body.drag_force(AIR_DENSITY);
        assert!(drag.x < 0.0);
        assert!(drag.y > 0.0);
        assert_eq!(drag.z, 0.0);
        let k = 0.5 * AIR_DENSITY * 0.5 * core::f32::consts::PI * 0.25;
        assert_relative_eq!(drag.x, -k * 4.0, epsilon = EPSILON);
        assert_relative_eq!(drag.y, k * 9.0, epsilon = EPSILON);
    }

    #[test]
    fn test_static_body_sits_out() {
        let mut body = RigidBody::new_static(Shape::ball(1.0)).with_velocity(Vector3::new(1.0, 0.0, 0.0));
        assert!(!body.begin_step(DT, AIR_DENSITY));
        assert_eq!(body.velocity, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(body.position, Vector3::zeros());
    }

    #[test]
    fn test_kinematic_ignores_gravity_but_moves() {
        let mut body = ball().with_kinematic(true).with_velocity(Vector3::new(1.0, 0.0, 0.0));
        body.apply_torque(Vector3::y()).unwrap();
        assert!(body.begin_step(DT, AIR_DENSITY));
        body.finish_step(DT);
        assert_eq!(body.velocity, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(body.position.x, DT, epsilon = EPSILON);
        assert_eq!(body.angular_velocity, Vector3::zeros());
        assert!(body.pending_torques().is_empty());
    }

    #[test]
    fn test_non_finite_position_is_skipped() {
        let mut body = ball().with_position(Vector3::new(0.0, f32::INFINITY, 0.0));
        assert!(!body.begin_step(DT, 0.0));
        assert_eq!(body.velocity, Vector3::zeros());
    }

    #[test]
    fn test_state_round_trip_refreshes_shape() {
        let mut body = ball().with_position(Vector3::new(1.0, 2.0, 3.0)).with_velocity(Vector3::x());
        let saved = body.state();
        body.position = Vector3::zeros();
        body.velocity = Vector3::zeros();
        body.restore(&saved);
        assert_eq!(body.state(), saved);
        assert_eq!(body.shape().reference_vertices(), &[Vector3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn test_kinetic_energy() {
        let body = ball().with_mass(2.0).with_velocity(Vector3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(body.speed(), 5.0, epsilon = EPSILON);
        assert_relative_eq!(body.kinetic_energy(), 25.0, epsilon = EPSILON);
    }
}

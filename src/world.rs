//! Fixed-capacity body container and the per-step pipeline.
//!
//! [`PhysicsWorld`] owns every body in a `heapless::Vec`; a [`BodyId`] is the
//! body's slot and stays valid for the life of the world (removal only
//! deactivates). One call to [`PhysicsWorld::step`] integrates each active
//! body in slot order. A dynamic body is tested against every other active
//! body after its velocity update and before its position update, and each
//! manifold found is resolved on the spot.
//!
//! # Example
//! ```
//! use embedded_3dphys::body::RigidBody;
//! use embedded_3dphys::shape::Shape;
//! use embedded_3dphys::world::PhysicsWorld;
//! use nalgebra::Vector3;
//!
//! let mut world = PhysicsWorld::<4>::new();
//! let ball = RigidBody::new(Shape::ball(0.5)).with_position(Vector3::new(0.0, 5.0, 0.0));
//! let id = world.add_body(ball).unwrap();
//!
//! world.step(1.0 / 60.0);
//! assert!(world.body(id).unwrap().velocity.y < 0.0);
//! ```

use heapless::Vec;
use nalgebra::Vector3;

use crate::body::{BodyId, RigidBody, AIR_DENSITY};
use crate::collision::{Manifold, NarrowPhase};
use crate::config::SimulationConfig;
use crate::error::PhysicsError;
use crate::history::Snapshot;
use crate::resolve::{ContactSolver, Resolution};

/// A set of up to `N` rigid bodies with a narrow phase and contact solver.
#[derive(Debug, Clone)]
pub struct PhysicsWorld<const N: usize> {
    bodies: Vec<RigidBody, N>,
    narrow_phase: NarrowPhase,
    solver: ContactSolver,
    /// Density of the surrounding fluid used for drag.
    pub fluid_density: f32,
}

impl<const N: usize> Default for PhysicsWorld<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PhysicsWorld<N> {
    /// Create an empty world in air with default contact parameters.
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            narrow_phase: NarrowPhase::default(),
            solver: ContactSolver::default(),
            fluid_density: AIR_DENSITY,
        }
    }

    /// Create an empty world from validated simulation settings.
    pub fn with_config(config: &SimulationConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            bodies: Vec::new(),
            narrow_phase: NarrowPhase::new(config.sat_cull_distance),
            solver: ContactSolver::new(config.penetration_slop, config.correction_percent),
            fluid_density: config.fluid_density,
        })
    }

    pub fn narrow_phase(&self) -> &NarrowPhase {
        &self.narrow_phase
    }

    pub fn solver(&self) -> &ContactSolver {
        &self.solver
    }

    /// Set the Y-axis gravity of every body currently in the world.
    pub fn set_gravity(&mut self, gravity: f32) {
        for body in self.bodies.iter_mut() {
            body.gravity = gravity;
        }
    }

    /// Add a body and return its id.
    ///
    /// The body's shape is placed at its pose before it joins the world.
    pub fn add_body(&mut self, mut body: RigidBody) -> Result<BodyId, PhysicsError> {
        let id = BodyId::new(self.bodies.len());
        body.sync_shape();
        self.bodies
            .push(body)
            .map_err(|_| PhysicsError::CapacityExceeded { capacity: N })?;
        log::debug!("added body {:?} ({} of {})", id, self.bodies.len(), N);
        Ok(id)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.index())
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.index())
    }

    /// Total number of bodies, including inactive ones.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn active_body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.active).count()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    /// Deactivate a body and zero its motion, keeping its slot.
    ///
    /// Returns `false` if the id is unknown or the body was already inactive.
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        match self.bodies.get_mut(id.index()) {
            Some(body) if body.active => {
                body.active = false;
                body.velocity = Vector3::zeros();
                body.acceleration = Vector3::zeros();
                body.angular_velocity = Vector3::zeros();
                body.clear_torques();
                true
            }
            _ => false,
        }
    }

    /// Returns `false` if the id is unknown.
    pub fn set_active(&mut self, id: BodyId, active: bool) -> bool {
        match self.bodies.get_mut(id.index()) {
            Some(body) => {
                body.active = active;
                true
            }
            None => false,
        }
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId::new(i), b))
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut RigidBody)> {
        self.bodies.iter_mut().enumerate().map(|(i, b)| (BodyId::new(i), b))
    }

    /// Queue the picking torque of a push at `point` along `direction`.
    pub fn apply_torque_at(
        &mut self,
        id: BodyId,
        point: Vector3<f32>,
        direction: Vector3<f32>,
    ) -> Result<(), PhysicsError> {
        self.body_mut(id)
            .ok_or(PhysicsError::UnknownBody(id))?
            .apply_torque_at(point, direction)
    }

    // -- Detection --

    fn lookup(&self, id: BodyId) -> Result<&RigidBody, PhysicsError> {
        self.body(id).ok_or(PhysicsError::UnknownBody(id))
    }

    /// Boolean overlap test between two bodies' shapes.
    pub fn overlaps(&self, a: BodyId, b: BodyId) -> Result<bool, PhysicsError> {
        let (body_a, body_b) = (self.lookup(a)?, self.lookup(b)?);
        Ok(self.narrow_phase.overlaps(body_a.shape(), body_b.shape()))
    }

    /// Manifold between two bodies, for debug overlays.
    ///
    /// A sphere tested against a box comes back with the box as A.
    pub fn manifold(&self, a: BodyId, b: BodyId) -> Result<Manifold, PhysicsError> {
        let (body_a, body_b) = (self.lookup(a)?, self.lookup(b)?);
        Ok(self.narrow_phase.test((a, body_a.shape()), (b, body_b.shape())))
    }

    // -- Resolution --

    fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut RigidBody, &mut RigidBody)> {
        if a == b || a >= self.bodies.len() || b >= self.bodies.len() {
            return None;
        }
        if a < b {
            let (lo, hi) = self.bodies.split_at_mut(b);
            Some((&mut lo[a], &mut hi[0]))
        } else {
            let (lo, hi) = self.bodies.split_at_mut(a);
            Some((&mut hi[0], &mut lo[b]))
        }
    }

    /// Resolve a manifold between the two bodies it names.
    ///
    /// A manifold without a body on either side, or naming the same body
    /// twice or a body outside the world, is reported and left unresolved.
    pub fn resolve(&mut self, manifold: &Manifold, dt: f32) -> Result<Resolution, PhysicsError> {
        let (Some(id_a), Some(id_b)) = (manifold.body_a, manifold.body_b) else {
            log::warn!("manifold between {:?} and {:?} lacks a rigid body", manifold.shape_a, manifold.shape_b);
            return Err(PhysicsError::MissingBody);
        };
        let solver = self.solver;
        let Some((a, b)) = self.pair_mut(id_a.index(), id_b.index()) else {
            log::warn!("cannot resolve manifold between {:?} and {:?}", id_a, id_b);
            return Err(PhysicsError::MissingBody);
        };
        let resolution = solver.resolve(manifold, a, b, dt);
        if resolution == Resolution::Resolved {
            a.sync_shape();
            b.sync_shape();
        }
        Ok(resolution)
    }

    // -- Integration --

    /// Integrate one body over `dt`, resolving its contacts mid-step.
    ///
    /// Kinematic bodies move but never start a collision test; a dynamic body
    /// meeting them still does. Inactive and infinite-mass bodies are left
    /// untouched.
    pub fn integrate_body(&mut self, id: BodyId, dt: f32) -> Result<(), PhysicsError> {
        let index = id.index();
        let fluid_density = self.fluid_density;
        let body = self.bodies.get_mut(index).ok_or(PhysicsError::UnknownBody(id))?;
        if !body.active || !body.begin_step(dt, fluid_density) {
            return Ok(());
        }

        if !self.bodies[index].kinematic {
            for other in 0..self.bodies.len() {
                if other == index || !self.bodies[other].active {
                    continue;
                }
                let manifold = self.narrow_phase.test(
                    (id, self.bodies[index].shape()),
                    (BodyId::new(other), self.bodies[other].shape()),
                );
                if !manifold.collided {
                    continue;
                }
                log::trace!(
                    "contact {:?}/{:?} depth {} normal {:?}",
                    manifold.body_a,
                    manifold.body_b,
                    manifold.penetration,
                    manifold.normal
                );
                if let Err(err) = self.resolve(&manifold, dt) {
                    log::warn!("skipping contact: {}", err);
                }
            }
        }

        self.bodies[index].finish_step(dt);
        Ok(())
    }

    /// Advance every active body by one fixed step.
    pub fn step(&mut self, dt: f32) {
        for index in 0..self.bodies.len() {
            // index is always in range here
            let _ = self.integrate_body(BodyId::new(index), dt);
        }
    }

    // -- History --

    /// Record the state of every body, in slot order.
    pub fn snapshot(&self) -> Snapshot<N> {
        let mut snapshot = Snapshot::<N>::new();
        for body in self.bodies.iter() {
            // same capacity as the body list
            let _ = snapshot.push(body.state());
        }
        snapshot
    }

    /// Restore recorded states onto the bodies they were taken from.
    ///
    /// Bodies added after the snapshot was taken keep their current state.
    pub fn restore(&mut self, snapshot: &Snapshot<N>) {
        for (body, state) in self.bodies.iter_mut().zip(snapshot.iter()) {
            body.restore(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn ball_at(x: f32, y: f32, z: f32) -> RigidBody {
        RigidBody::new(Shape::ball(0.5)).with_position(Vector3::new(x, y, z))
    }

    fn floor() -> RigidBody {
        RigidBody::new(Shape::cuboid(Vector3::new(10.0, 0.5, 10.0)))
            .with_position(Vector3::new(0.0, -0.5, 0.0))
            .with_kinematic(true)
    }

    // -- Container tests --

    #[test]
    fn test_add_until_full() {
        let mut world = PhysicsWorld::<2>::new();
        assert_eq!(world.add_body(ball_at(0.0, 0.0, 0.0)).unwrap(), BodyId::new(0));
        assert_eq!(world.add_body(ball_at(2.0, 0.0, 0.0)).unwrap(), BodyId::new(1));
        assert_eq!(
            world.add_body(ball_at(4.0, 0.0, 0.0)),
            Err(PhysicsError::CapacityExceeded { capacity: 2 })
        );
        assert_eq!(world.body_count(), 2);
        assert_eq!(world.capacity(), 2);
    }

    #[test]
    fn test_add_body_places_shape() {
        let mut world = PhysicsWorld::<2>::new();
        let id = world.add_body(ball_at(1.0, 2.0, 3.0)).unwrap();
        let aabb = crate::shape::ShapeGeometry::aabb(world.body(id).unwrap().shape());
        assert_relative_eq!(aabb.center(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_remove_and_reactivate() {
        let mut world = PhysicsWorld::<2>::new();
        let id = world.add_body(ball_at(0.0, 0.0, 0.0).with_velocity(Vector3::new(1.0, 0.0, 0.0))).unwrap();
        assert!(world.remove_body(id));
        assert!(!world.remove_body(id));
        assert_eq!(world.active_body_count(), 0);
        assert_eq!(world.body(id).unwrap().velocity, Vector3::zeros());

        world.step(DT);
        assert_eq!(world.body(id).unwrap().position, Vector3::zeros());

        assert!(world.set_active(id, true));
        assert!(!world.set_active(BodyId::new(7), true));
        assert_eq!(world.active_body_count(), 1);
    }

    #[test]
    fn test_set_gravity_applies_to_all_bodies() {
        let mut world = PhysicsWorld::<2>::new();
        world.add_body(ball_at(0.0, 0.0, 0.0)).unwrap();
        world.add_body(ball_at(3.0, 0.0, 0.0)).unwrap();
        world.set_gravity(-1.62);
        assert!(world.bodies().all(|(_, b)| b.gravity == -1.62));
    }

    #[test]
    fn test_with_config_rejects_bad_settings() {
        let config = SimulationConfig {
            fixed_timestep: 0.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            PhysicsWorld::<2>::with_config(&config),
            Err(PhysicsError::InvalidConfig(_))
        ));
        let world = PhysicsWorld::<2>::with_config(&SimulationConfig::default().without_drag()).unwrap();
        assert_eq!(world.fluid_density, 0.0);
    }

    #[test]
    fn test_unknown_ids() {
        let mut world = PhysicsWorld::<2>::new();
        let a = world.add_body(ball_at(0.0, 0.0, 0.0)).unwrap();
        let ghost = BodyId::new(5);
        assert_eq!(world.overlaps(a, ghost), Err(PhysicsError::UnknownBody(ghost)));
        assert_eq!(world.manifold(ghost, a), Err(PhysicsError::UnknownBody(ghost)));
        assert_eq!(
            world.apply_torque_at(ghost, Vector3::zeros(), Vector3::x()),
            Err(PhysicsError::UnknownBody(ghost))
        );
        assert_eq!(world.integrate_body(ghost, DT), Err(PhysicsError::UnknownBody(ghost)));
    }

    // -- Detection and resolution tests --

    #[test]
    fn test_manifold_between_bodies() {
        let mut world = PhysicsWorld::<2>::new();
        let a = world.add_body(ball_at(0.0, 0.0, 0.0)).unwrap();
        let b = world.add_body(ball_at(0.0, 0.0, 0.8)).unwrap();
        assert!(world.overlaps(a, b).unwrap());
        let manifold = world.manifold(a, b).unwrap();
        assert!(manifold.collided);
        assert_eq!(manifold.body_a, Some(a));
        assert_eq!(manifold.body_b, Some(b));
        assert_relative_eq!(manifold.normal, Vector3::z(), epsilon = 1e-6);
        assert_relative_eq!(manifold.penetration, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_sphere_box_manifold_puts_box_first() {
        let mut world = PhysicsWorld::<2>::new();
        let ball = world.add_body(ball_at(0.0, 0.4, 0.0)).unwrap();
        let ground = world.add_body(floor()).unwrap();
        let manifold = world.manifold(ball, ground).unwrap();
        assert!(manifold.collided);
        assert_eq!(manifold.body_a, Some(ground));
        assert_eq!(manifold.body_b, Some(ball));
    }

    #[test]
    fn test_resolve_missing_body() {
        let mut world = PhysicsWorld::<2>::new();
        let a = world.add_body(ball_at(0.0, 0.0, 0.0)).unwrap();
        let b = world.add_body(ball_at(0.0, 0.0, 0.8)).unwrap();
        let mut manifold = world.manifold(a, b).unwrap();
        manifold.body_b = None;
        assert_eq!(world.resolve(&manifold, DT), Err(PhysicsError::MissingBody));

        manifold.body_b = Some(a);
        assert_eq!(world.resolve(&manifold, DT), Err(PhysicsError::MissingBody));
        assert!(PhysicsError::MissingBody.is_recoverable());
    }

    #[test]
    fn test_resolve_reversed_ids() {
        let mut world = PhysicsWorld::<2>::new();
        let a = world.add_body(ball_at(0.0, 0.0, 0.8).with_velocity(Vector3::new(0.0, 0.0, -1.0))).unwrap();
        let b = world.add_body(ball_at(0.0, 0.0, 0.0).with_velocity(Vector3::new(0.0, 0.0, 1.0))).unwrap();
        // the manifold's A side is the higher slot
        let manifold = world.manifold(b, a).unwrap();
        assert_eq!(world.resolve(&manifold, DT), Ok(Resolution::Resolved));
        assert!(world.body(a).unwrap().velocity.z >= 0.0);
        assert!(world.body(b).unwrap().velocity.z <= 0.0);
    }

    // -- Step tests --

    #[test]
    fn test_free_fall() {
        let mut world = PhysicsWorld::<1>::new();
        world.fluid_density = 0.0;
        let id = world.add_body(ball_at(0.0, 10.0, 0.0)).unwrap();
        world.step(DT);
        let body = world.body(id).unwrap();
        assert_relative_eq!(body.velocity.y, -9.81 * DT, epsilon = 1e-6);
        assert_relative_eq!(body.position.y, 10.0 - 9.81 * DT * DT, epsilon = 1e-6);
    }

    #[test]
    fn test_ball_bounces_off_kinematic_floor() {
        let mut world = PhysicsWorld::<2>::new();
        world.fluid_density = 0.0;
        let ball = world
            .add_body(ball_at(0.0, 0.45, 0.0).with_velocity(Vector3::new(0.0, -2.0, 0.0)).with_restitution(0.5))
            .unwrap();
        let ground = world.add_body(floor()).unwrap();
        world.step(DT);

        assert!(world.body(ball).unwrap().velocity.y > 0.0);
        let ground = world.body(ground).unwrap();
        assert_eq!(ground.position, Vector3::new(0.0, -0.5, 0.0));
        assert_eq!(ground.velocity, Vector3::zeros());
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut world = PhysicsWorld::<2>::new();
        let anchor = world
            .add_body(RigidBody::new_static(Shape::ball(0.5)).with_position(Vector3::new(0.0, 0.0, 0.0)))
            .unwrap();
        world
            .add_body(ball_at(0.0, 0.9, 0.0).with_velocity(Vector3::new(0.0, -3.0, 0.0)))
            .unwrap();
        for _ in 0..30 {
            world.step(DT);
        }
        let anchor = world.body(anchor).unwrap();
        assert_eq!(anchor.position, Vector3::zeros());
        assert_eq!(anchor.velocity, Vector3::zeros());
    }

    #[test]
    fn test_torque_through_world() {
        let mut world = PhysicsWorld::<1>::new();
        let id = world.add_body(ball_at(0.0, 0.0, 0.0).with_gravity(0.0)).unwrap();
        world
            .apply_torque_at(id, Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 5.0))
            .unwrap();
        world.step(DT);
        let body = world.body(id).unwrap();
        assert!(body.angular_velocity.x > 0.0);
        assert!(body.pending_torques().is_empty());
    }

    // -- Snapshot tests --

    #[test]
    fn test_snapshot_restore() {
        let mut world = PhysicsWorld::<2>::new();
        let a = world.add_body(ball_at(0.0, 5.0, 0.0)).unwrap();
        world.add_body(ball_at(3.0, 5.0, 0.0)).unwrap();
        let snapshot = world.snapshot();
        assert_eq!(snapshot.len(), 2);

        for _ in 0..10 {
            world.step(DT);
        }
        assert!(world.body(a).unwrap().position.y < 5.0);

        world.restore(&snapshot);
        assert_eq!(world.body(a).unwrap().position, Vector3::new(0.0, 5.0, 0.0));
        assert_eq!(world.body(a).unwrap().velocity, Vector3::zeros());
        let aabb = crate::shape::ShapeGeometry::aabb(world.body(a).unwrap().shape());
        assert_relative_eq!(aabb.center(), Vector3::new(0.0, 5.0, 0.0));
    }
}

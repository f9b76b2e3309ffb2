//! Impulse-based contact resolution.
//!
//! [`ContactSolver::resolve`] turns one [`Manifold`] into velocity, angular
//! velocity and position changes on the two bodies it names:
//!
//! 1. Early exit when the bodies already separate along the normal.
//! 2. Normal impulse with restitution, plus rotational terms when the manifold
//!    carries a contact point. When exactly one body is at rest, the moving
//!    body's velocity is instead reflected about the dominant normal axis.
//! 3. Coulomb friction along the sliding tangent, static or dynamic.
//! 4. Linear position correction of the penetration beyond a small slop.
//!
//! Kinematic and infinite-mass bodies enter the math with zero inverse mass
//! and inertia, and their state is never written.

use nalgebra::Vector3;

// ComplexField provides sqrt()/abs() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

use crate::body::RigidBody;
use crate::collision::Manifold;

/// Penetration left uncorrected to avoid jitter.
pub const DEFAULT_PENETRATION_SLOP: f32 = 0.01;

/// Fraction of the remaining penetration removed per contact.
pub const DEFAULT_CORRECTION_PERCENT: f32 = 0.8;

/// Outcome of resolving one manifold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The bodies were already moving apart; nothing changed.
    Separating,
    /// Impulses and position correction were applied.
    Resolved,
}

/// Contact resolution parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSolver {
    pub penetration_slop: f32,
    pub correction_percent: f32,
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self {
            penetration_slop: DEFAULT_PENETRATION_SLOP,
            correction_percent: DEFAULT_CORRECTION_PERCENT,
        }
    }
}

#[inline]
fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// `velocity` with the component on the normal's dominant axis negated.
fn reflect_dominant(velocity: Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    let n = normal.abs();
    let axis = if n.x >= n.y && n.x >= n.z {
        0
    } else if n.y >= n.z {
        1
    } else {
        2
    };
    let mut reflected = velocity;
    reflected[axis] = -reflected[axis];
    reflected
}

impl ContactSolver {
    pub fn new(penetration_slop: f32, correction_percent: f32) -> Self {
        Self {
            penetration_slop,
            correction_percent,
        }
    }

    /// Resolve `manifold` between body `a` (its A side) and body `b`.
    pub fn resolve(&self, manifold: &Manifold, a: &mut RigidBody, b: &mut RigidBody, dt: f32) -> Resolution {
        let normal = manifold.normal;
        let velocity_along_normal = (b.velocity - a.velocity).dot(&normal);
        if velocity_along_normal >= 0.0 {
            return Resolution::Separating;
        }

        let inv_mass_sum = a.effective_inv_mass() + b.effective_inv_mass();
        let zero = Vector3::zeros();
        let a_at_rest = a.velocity == zero;
        let b_at_rest = b.velocity == zero;

        if a_at_rest != b_at_rest {
            let moving_is_a = b_at_rest;
            let restitution = if moving_is_a { a.restitution } else { b.restitution };
            {
                let moving = if moving_is_a { &mut *a } else { &mut *b };
                if moving.accepts_impulses() {
                    moving.velocity = reflect_dominant(moving.velocity * restitution, &normal);
                }
            }

            let j = ratio(-(1.0 + restitution) * velocity_along_normal, inv_mass_sum);
            self.apply_friction(manifold, a, b, j, dt);

            if let Some(contact) = manifold.contact() {
                let moving = if moving_is_a { &mut *a } else { &mut *b };
                let r = contact - moving.position;
                let inv_inertia = moving.effective_inv_inertia();
                let rotational = r.cross(&normal).norm_squared() * inv_inertia;
                let j_rot = ratio(-(1.0 + restitution) * velocity_along_normal, inv_mass_sum + rotational);
                if moving.accepts_impulses() {
                    let spin = r.cross(&(-normal * j_rot)) * (inv_inertia * dt);
                    if moving_is_a {
                        moving.angular_velocity -= spin;
                    } else {
                        moving.angular_velocity += spin;
                    }
                }
            }
        } else {
            let restitution = a.restitution.min(b.restitution);
            let mut j = -(1.0 + restitution) * velocity_along_normal;

            match manifold.contact() {
                Some(contact) => {
                    let ra = contact - a.position;
                    let rb = contact - b.position;
                    let inv_ia = a.effective_inv_inertia();
                    let inv_ib = b.effective_inv_inertia();
                    let rot_a = ra.cross(&-normal).norm_squared() * inv_ia;
                    let rot_b = rb.cross(&-normal).norm_squared() * inv_ib;
                    j = ratio(j, inv_mass_sum + rot_a + rot_b);

                    let push = -normal * j;
                    if a.accepts_impulses() {
                        a.angular_velocity -= ra.cross(&push) * (inv_ia * dt);
                    }
                    if b.accepts_impulses() {
                        b.angular_velocity += rb.cross(&push) * (inv_ib * dt);
                    }
                }
                None => j = ratio(j, inv_mass_sum),
            }

            let impulse = normal * j;
            if a.accepts_impulses() {
                a.velocity -= impulse * a.effective_inv_mass();
            }
            if b.accepts_impulses() {
                b.velocity += impulse * b.effective_inv_mass();
            }

            self.apply_friction(manifold, a, b, j, dt);
        }

        self.correct_positions(manifold, a, b);
        Resolution::Resolved
    }

    fn apply_friction(&self, manifold: &Manifold, a: &mut RigidBody, b: &mut RigidBody, j: f32, dt: f32) {
        let normal = manifold.normal;
        let relative = b.velocity - a.velocity;
        let Some(tangent) = (relative - normal * relative.dot(&normal)).try_normalize(1.0e-6) else {
            return;
        };

        let inv_mass_sum = a.effective_inv_mass() + b.effective_inv_mass();
        let inv_ia = a.effective_inv_inertia();
        let inv_ib = b.effective_inv_inertia();
        let contact = manifold.contact();
        let levers = contact.map(|c| (c - a.position, c - b.position));

        let along_tangent = -relative.dot(&tangent);
        let jt = match levers {
            Some((ra, rb)) => {
                let rot_a = ra.cross(&tangent).norm_squared() * inv_ia;
                let rot_b = rb.cross(&tangent).norm_squared() * inv_ib;
                ratio(along_tangent, inv_mass_sum + rot_a + rot_b)
            }
            None => ratio(along_tangent, inv_mass_sum),
        };

        let static_mu = (a.static_friction * a.static_friction + b.static_friction * b.static_friction).sqrt();
        let impulse = if jt.abs() < j * static_mu {
            tangent * jt
        } else {
            let dynamic_mu =
                (a.dynamic_friction * a.dynamic_friction + b.dynamic_friction * b.dynamic_friction).sqrt();
            -tangent * (j * dynamic_mu)
        };

        if a.accepts_impulses() {
            a.velocity -= impulse * a.effective_inv_mass();
        }
        if b.accepts_impulses() {
            b.velocity += impulse * b.effective_inv_mass();
        }

        if let Some((ra, rb)) = levers {
            if a.accepts_impulses() {
                a.angular_velocity -= ra.cross(&-impulse) * (inv_ia * dt);
            }
            if b.accepts_impulses() {
                b.angular_velocity += rb.cross(&-impulse) * (inv_ib * dt);
            }
        }
    }

    fn correct_positions(&self, manifold: &Manifold, a: &mut RigidBody, b: &mut RigidBody) {
        let inv_a = a.effective_inv_mass();
        let inv_b = b.effective_inv_mass();
        let depth = (manifold.penetration - self.penetration_slop).max(0.0);
        let correction = manifold.normal * (ratio(depth, inv_a + inv_b) * self.correction_percent);
        if a.accepts_impulses() {
            a.position -= correction * inv_a;
        }
        if b.accepts_impulses() {
            b.position += correction * inv_b;
        }
    }
}

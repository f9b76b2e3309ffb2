//! Narrow-phase collision detection.
//!
//! Every supported shape pair has a cheap boolean test and a manifold-producing
//! test. [`NarrowPhase`] picks the right pair of functions from the shapes'
//! variants and poses.
//!
//! # Conventions
//! - The manifold normal is unit length and points from A toward B.
//! - Mixed box/sphere pairs always report the box as A.
//! - Penetration is only meaningful when `collided` is `true`.

use heapless::Vec;
use nalgebra::Vector3;

// ComplexField provides sqrt()/abs() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

use crate::body::BodyId;
use crate::shape::{BoxShape, Shape, ShapeGeometry, ShapeKind, SphereShape};

/// Most contact points a single manifold carries.
///
/// Every test reports a single representative point.
pub const MAX_CONTACTS: usize = 1;

/// Default distance beyond which two oriented boxes are never SAT tested.
pub const DEFAULT_SAT_CULL_DISTANCE: f32 = 10.0;

/// Overlap margin by which an edge-edge axis must beat a face axis.
const EDGE_AXIS_BIAS: f32 = 1.0e-3;

/// Tolerance for incident corners sitting on the reference face.
const CLIP_TOLERANCE: f32 = 1.0e-4;

/// Result of a single pairwise test.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    pub collided: bool,
    /// Body owning shape A, when known.
    pub body_a: Option<BodyId>,
    /// Body owning shape B, when known.
    pub body_b: Option<BodyId>,
    pub shape_a: ShapeKind,
    pub shape_b: ShapeKind,
    /// Unit contact normal from A toward B.
    pub normal: Vector3<f32>,
    /// Penetration depth along `normal`.
    pub penetration: f32,
    /// World-space contact points. Empty for the axis-aligned box path.
    pub contacts: Vec<Vector3<f32>, MAX_CONTACTS>,
}

/// Name used by debug overlays for a manifold.
pub type CollisionData = Manifold;

impl Manifold {
    /// A non-colliding manifold between two shapes.
    pub fn separated(shape_a: ShapeKind, shape_b: ShapeKind) -> Self {
        Self {
            collided: false,
            body_a: None,
            body_b: None,
            shape_a,
            shape_b,
            normal: Vector3::zeros(),
            penetration: 0.0,
            contacts: Vec::new(),
        }
    }

    fn hit(
        shape_a: ShapeKind,
        shape_b: ShapeKind,
        normal: Vector3<f32>,
        penetration: f32,
        contact: Option<Vector3<f32>>,
    ) -> Self {
        let mut contacts = Vec::new();
        if let Some(point) = contact {
            // capacity is at least one
            let _ = contacts.push(point);
        }
        Self {
            collided: true,
            body_a: None,
            body_b: None,
            shape_a,
            shape_b,
            normal,
            penetration,
            contacts,
        }
    }

    /// Builder: attach the owning bodies.
    pub fn with_bodies(mut self, body_a: BodyId, body_b: BodyId) -> Self {
        self.body_a = Some(body_a);
        self.body_b = Some(body_b);
        self
    }

    /// First contact point, if any.
    pub fn contact(&self) -> Option<Vector3<f32>> {
        self.contacts.first().copied()
    }

    #[inline]
    pub fn has_contacts(&self) -> bool {
        !self.contacts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Box vs box
// ---------------------------------------------------------------------------

/// Interval overlap of the two boxes' world bounds on all three axes.
pub fn box_box_overlap(a: &BoxShape, b: &BoxShape) -> bool {
    a.aabb().overlaps(&b.aabb())
}

/// Manifold for two boxes whose local axes line up with the world axes.
///
/// The normal is the world axis of least overlap, signed toward B. Swapping
/// the arguments flips the normal, except when the centers coincide on the
/// chosen axis: both orders then report the positive axis. No contact points
/// are produced.
pub fn box_box_manifold(a: &BoxShape, b: &BoxShape) -> Manifold {
    let miss = Manifold::separated(ShapeKind::Box, ShapeKind::Box);
    if !box_box_overlap(a, b) {
        return miss;
    }

    let (aabb_a, aabb_b) = (a.aabb(), b.aabb());
    let extent_a = aabb_a.half_size();
    let extent_b = aabb_b.half_size();
    let relative = aabb_b.center() - aabb_a.center();

    let x = extent_a.x + extent_b.x - relative.x.abs();
    let y = extent_a.y + extent_b.y - relative.y.abs();
    let z = extent_a.z + extent_b.z - relative.z.abs();
    if x <= 0.0 || y <= 0.0 || z <= 0.0 {
        return miss;
    }

    let axis = if x < y && x < z {
        0
    } else if y <= x && y < z {
        1
    } else {
        2
    };
    let penetration = [x, y, z][axis];
    let mut normal = Vector3::zeros();
    normal[axis] = if relative[axis] < 0.0 { -1.0 } else { 1.0 };

    Manifold::hit(ShapeKind::Box, ShapeKind::Box, normal, penetration, None)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AxisSource {
    FaceA(usize),
    FaceB(usize),
    Edge,
}

fn project(vertices: &[Vector3<f32>], axis: &Vector3<f32>) -> (f32, f32) {
    vertices.iter().fold((f32::MAX, f32::MIN), |(lo, hi), v| {
        let d = v.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

/// Separating-axis test for two oriented boxes.
///
/// Tests each box's [`ShapeGeometry::separating_axes`] and the 9 pairwise
/// edge cross products, skipping degenerate (parallel) crosses, by projecting
/// both boxes' [`ShapeGeometry::reference_vertices`]. Boxes whose centers are
/// further apart than `cull_distance` are rejected without testing.
///
/// On a hit, the axis of least overlap becomes the normal and that overlap the
/// penetration. The single contact point comes from clipping the incident
/// box's penetrating corners into the reference face; edge-edge hits use the
/// midpoint of the two support corners.
pub fn box_box_sat(a: &BoxShape, b: &BoxShape, cull_distance: f32) -> Manifold {
    let miss = Manifold::separated(ShapeKind::Box, ShapeKind::Box);
    let center_a = a.pose().position;
    let center_b = b.pose().position;
    if (center_b - center_a).norm() > cull_distance {
        return miss;
    }

    let axes_a = a.separating_axes();
    let axes_b = b.separating_axes();
    let mut candidates: Vec<(Vector3<f32>, AxisSource), 15> = Vec::new();
    for (i, axis) in axes_a.iter().enumerate() {
        if let Some(n) = axis.try_normalize(1.0e-6) {
            let _ = candidates.push((n, AxisSource::FaceA(i)));
        }
    }
    for (i, axis) in axes_b.iter().enumerate() {
        if let Some(n) = axis.try_normalize(1.0e-6) {
            let _ = candidates.push((n, AxisSource::FaceB(i)));
        }
    }
    for axis_a in axes_a.iter() {
        for axis_b in axes_b.iter() {
            if let Some(n) = axis_a.cross(axis_b).try_normalize(1.0e-6) {
                let _ = candidates.push((n, AxisSource::Edge));
            }
        }
    }

    let mut best: Option<(Vector3<f32>, f32, AxisSource)> = None;
    for (axis, source) in candidates {
        let (min_a, max_a) = project(a.reference_vertices(), &axis);
        let (min_b, max_b) = project(b.reference_vertices(), &axis);
        if max_a < min_b || max_b < min_a {
            return miss;
        }
        let overlap = (max_a - min_b).min(max_b - min_a);
        let better = match best {
            None => true,
            Some((_, current, _)) if source == AxisSource::Edge => overlap + EDGE_AXIS_BIAS < current,
            Some((_, current, _)) => overlap < current,
        };
        if better {
            best = Some((axis, overlap, source));
        }
    }

    let Some((axis, penetration, source)) = best else {
        return miss;
    };
    let normal = if axis.dot(&(center_b - center_a)) < 0.0 { -axis } else { axis };

    let contact = match source {
        AxisSource::FaceA(k) => clip_to_face(a, k, normal, b),
        AxisSource::FaceB(k) => clip_to_face(b, k, -normal, a),
        AxisSource::Edge => None,
    }
    .unwrap_or_else(|| support_midpoint(a, b, &normal));

    Manifold::hit(ShapeKind::Box, ShapeKind::Box, normal, penetration, Some(contact))
}

/// Averaged clip of `incident`'s corners that lie behind the face of
/// `reference` whose outward normal is `face_normal` (local axis `k`).
fn clip_to_face(
    reference: &BoxShape,
    k: usize,
    face_normal: Vector3<f32>,
    incident: &BoxShape,
) -> Option<Vector3<f32>> {
    let h = reference.half_extents();
    let extents = [h.x, h.y, h.z];
    let axes = reference.axes();
    let center = reference.pose().position;
    let face_offset = center.dot(&face_normal) + extents[k];
    let face_center = center + face_normal * extents[k];

    let mut sum = Vector3::zeros();
    let mut count = 0u32;
    for corner in incident.corners() {
        if corner.dot(&face_normal) > face_offset + CLIP_TOLERANCE {
            continue;
        }
        let local = corner - center;
        let mut point = face_center;
        for (i, tangent) in axes.iter().enumerate() {
            if i != k {
                point += tangent * local.dot(tangent).clamp(-extents[i], extents[i]);
            }
        }
        sum += point;
        count += 1;
    }

    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}

/// Midpoint between A's deepest corner along `normal` and B's deepest corner
/// against it.
fn support_midpoint(a: &BoxShape, b: &BoxShape, normal: &Vector3<f32>) -> Vector3<f32> {
    let support = |corners: &[Vector3<f32>], dir: Vector3<f32>| {
        corners
            .iter()
            .copied()
            .fold((f32::MIN, Vector3::zeros()), |(best, point), c| {
                let d = c.dot(&dir);
                if d > best { (d, c) } else { (best, point) }
            })
            .1
    };
    (support(a.corners(), *normal) + support(b.corners(), -normal)) * 0.5
}

// ---------------------------------------------------------------------------
// Sphere vs sphere
// ---------------------------------------------------------------------------

pub fn sphere_sphere_overlap(a: &SphereShape, b: &SphereShape) -> bool {
    (b.center() - a.center()).norm() < a.radius() + b.radius()
}

/// Manifold for two spheres. Coincident centers fall back to an up normal with
/// the contact on A's surface.
pub fn sphere_sphere_manifold(a: &SphereShape, b: &SphereShape) -> Manifold {
    if !sphere_sphere_overlap(a, b) {
        return Manifold::separated(ShapeKind::Sphere, ShapeKind::Sphere);
    }

    let relative = b.center() - a.center();
    let distance = relative.norm();
    let radii = a.radius() + b.radius();

    let (normal, penetration, contact) = if distance != 0.0 {
        (relative / distance, radii - distance, a.center())
    } else {
        let up = Vector3::y();
        (up, radii, a.center() + up * a.radius())
    };

    Manifold::hit(ShapeKind::Sphere, ShapeKind::Sphere, normal, penetration, Some(contact))
}

// ---------------------------------------------------------------------------
// Box vs sphere
// ---------------------------------------------------------------------------

/// Same answer as [`box_sphere_manifold`]'s `collided`.
pub fn box_sphere_overlap(cuboid: &BoxShape, sphere: &SphereShape) -> bool {
    box_sphere_manifold(cuboid, sphere).collided
}

/// Manifold for a box (A) and a sphere (B), using the box's world bounds.
///
/// A sphere center inside the box is snapped to the face on the axis of
/// greatest displacement from the box center (x wins ties, then y) and the
/// normal points through that face. Either way the pair collides only when
/// the center lies closer than the radius to the closest point.
pub fn box_sphere_manifold(cuboid: &BoxShape, sphere: &SphereShape) -> Manifold {
    let bounds = cuboid.aabb();
    let center = sphere.center();
    let radius = sphere.radius();
    let mut closest = bounds.closest_point(&center);

    if closest != center {
        let offset = center - closest;
        let distance = offset.norm();
        if distance >= radius {
            return Manifold::separated(ShapeKind::Box, ShapeKind::Sphere);
        }
        return Manifold::hit(
            ShapeKind::Box,
            ShapeKind::Sphere,
            offset / distance,
            radius - distance,
            Some(closest),
        );
    }

    let relative = center - bounds.center();
    let magnitude = relative.abs();
    let axis = if magnitude.x >= magnitude.y && magnitude.x >= magnitude.z {
        0
    } else if magnitude.y >= magnitude.z {
        1
    } else {
        2
    };
    let sign = if relative[axis] > 0.0 { 1.0 } else { -1.0 };
    closest[axis] = if sign > 0.0 { bounds.max[axis] } else { bounds.min[axis] };

    let mut normal = Vector3::zeros();
    normal[axis] = sign;
    let depth = (closest - center).norm();
    if depth >= radius {
        return Manifold::separated(ShapeKind::Box, ShapeKind::Sphere);
    }

    Manifold::hit(ShapeKind::Box, ShapeKind::Sphere, normal, radius - depth, Some(closest))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Pairwise collision detection over tagged shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrowPhase {
    /// Oriented box pairs further apart than this are rejected before SAT.
    pub sat_cull_distance: f32,
}

impl Default for NarrowPhase {
    fn default() -> Self {
        Self::new(DEFAULT_SAT_CULL_DISTANCE)
    }
}

impl NarrowPhase {
    pub fn new(sat_cull_distance: f32) -> Self {
        Self { sat_cull_distance }
    }

    /// Boolean overlap test.
    pub fn overlaps(&self, a: &Shape, b: &Shape) -> bool {
        match (a, b) {
            (Shape::Box(a), Shape::Box(b)) => {
                if a.pose().is_axis_aligned() && b.pose().is_axis_aligned() {
                    box_box_overlap(a, b)
                } else {
                    box_box_sat(a, b, self.sat_cull_distance).collided
                }
            }
            (Shape::Sphere(a), Shape::Sphere(b)) => sphere_sphere_overlap(a, b),
            (Shape::Box(cuboid), Shape::Sphere(sphere)) | (Shape::Sphere(sphere), Shape::Box(cuboid)) => {
                box_sphere_overlap(cuboid, sphere)
            }
        }
    }

    /// Full manifold for a pair of bodies' shapes, stamped with their ids.
    ///
    /// A sphere paired with a box is reordered so the box body is A.
    pub fn test(&self, (id_a, a): (BodyId, &Shape), (id_b, b): (BodyId, &Shape)) -> Manifold {
        match (a, b) {
            (Shape::Box(box_a), Shape::Box(box_b)) => {
                let manifold = if box_a.pose().is_axis_aligned() && box_b.pose().is_axis_aligned() {
                    box_box_manifold(box_a, box_b)
                } else {
                    box_box_sat(box_a, box_b, self.sat_cull_distance)
                };
                manifold.with_bodies(id_a, id_b)
            }
            (Shape::Sphere(sphere_a), Shape::Sphere(sphere_b)) => {
                sphere_sphere_manifold(sphere_a, sphere_b).with_bodies(id_a, id_b)
            }
            (Shape::Box(cuboid), Shape::Sphere(sphere)) => {
                box_sphere_manifold(cuboid, sphere).with_bodies(id_a, id_b)
            }
            (Shape::Sphere(sphere), Shape::Box(cuboid)) => {
                box_sphere_manifold(cuboid, sphere).with_bodies(id_b, id_a)
            }
        }
    }
}

//! Collision shapes and their cached world-space geometry.
//!
//! Shapes hold no collision logic. Each step the owning body hands its [`Pose`]
//! to [`ShapeGeometry::refresh`], which rebuilds the bounds, vertices and
//! normals that the narrow phase reads.
//!
//! # Box layout
//! A [`BoxShape`] keeps two kinds of polygons:
//! - `origin`: the box center followed by its 8 corners (top ring first,
//!   then bottom ring), with the top face normal in slot 0.
//! - `faces`: one [`Polygon`] per [`BoxFace`], holding the face center, its
//!   4 corners wound so the face normal points outward, and the edge
//!   directions between consecutive corners.

use core::f32::consts::PI;

use heapless::Vec;
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Position every cached vertex holds until the first refresh. Far enough away
/// that a stale shape never reports a hit.
#[inline]
pub fn unset_vertex() -> Vector3<f32> {
    Vector3::new(-1000.0, 1000.0, -1000.0)
}

/// World-space axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Bounds of a box centered at `center` reaching `half_size` along each axis.
    pub fn from_center(center: Vector3<f32>, half_size: Vector3<f32>) -> Self {
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Half of the size along each axis.
    #[inline]
    pub fn half_size(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }

    /// Strict interval test on all three axes: touching bounds do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] < other.max[i] && self.max[i] > other.min[i])
    }

    /// Point of the bounds closest to `point` (the point itself when inside).
    pub fn closest_point(&self, point: &Vector3<f32>) -> Vector3<f32> {
        Vector3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    pub fn contains(&self, point: &Vector3<f32>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

/// A center point followed by a closed ring of corners.
///
/// `normals[0]` is the polygon normal, `normals[i]` for `1 <= i < N - 1` is the
/// direction from corner `i` to corner `i + 1`, and `normals[N - 1]` closes the
/// ring from the last corner back to the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polygon<const N: usize> {
    pub dots: [Vector3<f32>; N],
    pub normals: [Vector3<f32>; N],
}

impl<const N: usize> Polygon<N> {
    fn unset() -> Self {
        Self {
            dots: [unset_vertex(); N],
            normals: [unset_vertex(); N],
        }
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        self.dots[0]
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f32> {
        self.normals[0]
    }

    pub fn corners(&self) -> &[Vector3<f32>] {
        &self.dots[1..]
    }

    fn refresh_normals(&mut self) {
        for j in 1..N - 1 {
            self.normals[j] = direction(self.dots[j + 1] - self.dots[j]);
        }
        let a = self.dots[1] - self.dots[2];
        let b = self.dots[2] - self.dots[3];
        self.normals[0] = direction(a.cross(&b));
        self.normals[N - 1] = direction(self.dots[1] - self.dots[N - 1]);
    }
}

/// Normalized `v`, or zero for a degenerate (zero-size) edge.
fn direction(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(1.0e-12).unwrap_or_else(Vector3::zeros)
}

/// The six sides of a box, named in its local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxFace {
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
}

impl BoxFace {
    pub const ALL: [BoxFace; 6] = [
        BoxFace::Front,
        BoxFace::Back,
        BoxFace::Left,
        BoxFace::Right,
        BoxFace::Top,
        BoxFace::Bottom,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

// Offsets in (forward, right, up) half-extent units.
const ORIGIN_LAYOUT: [[f32; 3]; 9] = [
    [0.0, 0.0, 0.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
];

const FACE_LAYOUT: [[[f32; 3]; 5]; 6] = [
    // front
    [[1.0, 0.0, 0.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]],
    // back
    [[-1.0, 0.0, 0.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0]],
    // left
    [[0.0, -1.0, 0.0], [-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0]],
    // right
    [[0.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0]],
    // top
    [[0.0, 0.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0]],
    // bottom
    [[0.0, 0.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0], [-1.0, -1.0, -1.0]],
];

/// Read access to the geometry the narrow phase needs, whatever the shape.
pub trait ShapeGeometry {
    /// World-space bounds as of the last refresh.
    fn aabb(&self) -> Aabb;

    /// Axes this shape contributes to a separating-axis test.
    fn separating_axes(&self) -> Vec<Vector3<f32>, 3>;

    /// Vertices projected onto candidate axes.
    fn reference_vertices(&self) -> &[Vector3<f32>];

    /// Rebuild the cached geometry for a new pose.
    fn refresh(&mut self, pose: &Pose);
}

/// An oriented box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    half_extents: Vector3<f32>,
    pose: Pose,
    aabb: Aabb,
    origin: Polygon<9>,
    faces: [Polygon<5>; 6],
}

impl BoxShape {
    pub fn new(half_extents: Vector3<f32>) -> Self {
        Self {
            half_extents,
            pose: Pose::from_position(unset_vertex()),
            aabb: Aabb::new(unset_vertex(), unset_vertex()),
            origin: Polygon::unset(),
            faces: [Polygon::unset(); 6],
        }
    }

    /// Box whose full size is `scale`.
    pub fn from_scale(scale: Vector3<f32>) -> Self {
        Self::new(scale / 2.0)
    }

    #[inline]
    pub fn half_extents(&self) -> Vector3<f32> {
        self.half_extents
    }

    /// Pose of the last refresh.
    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Center and 8 corners.
    #[inline]
    pub fn origin(&self) -> &Polygon<9> {
        &self.origin
    }

    #[inline]
    pub fn face(&self, face: BoxFace) -> &Polygon<5> {
        &self.faces[face.index()]
    }

    #[inline]
    pub fn faces(&self) -> &[Polygon<5>; 6] {
        &self.faces
    }

    /// The 8 world-space corners.
    pub fn corners(&self) -> &[Vector3<f32>] {
        self.origin.corners()
    }

    /// The box's local right, up and forward axes in world space.
    pub fn axes(&self) -> [Vector3<f32>; 3] {
        [self.origin.normals[1], self.origin.normals[0], self.faces[0].normals[0]]
    }
}

impl ShapeGeometry for BoxShape {
    fn aabb(&self) -> Aabb {
        self.aabb
    }

    fn separating_axes(&self) -> Vec<Vector3<f32>, 3> {
        Vec::from_slice(&self.axes()).unwrap_or_default()
    }

    fn reference_vertices(&self) -> &[Vector3<f32>] {
        &self.origin.dots
    }

    fn refresh(&mut self, pose: &Pose) {
        self.pose = *pose;
        let h = self.half_extents;
        let right = pose.right();
        let up = pose.up();
        let forward = pose.forward();
        let basis = [forward * h.z, right * h.x, up * h.y];
        let place = |offset: &[f32; 3]| {
            pose.position + basis[0] * offset[0] + basis[1] * offset[1] + basis[2] * offset[2]
        };

        for (dot, offset) in self.origin.dots.iter_mut().zip(ORIGIN_LAYOUT.iter()) {
            *dot = place(offset);
        }
        self.origin.refresh_normals();

        for (face, layout) in self.faces.iter_mut().zip(FACE_LAYOUT.iter()) {
            for (dot, offset) in face.dots.iter_mut().zip(layout.iter()) {
                *dot = place(offset);
            }
            face.refresh_normals();
        }

        let reach = right.abs() * h.x + up.abs() * h.y + forward.abs() * h.z;
        self.aabb = Aabb::from_center(pose.position, reach);
    }
}

/// A sphere centered on its body.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereShape {
    radius: f32,
    center: [Vector3<f32>; 1],
}

impl SphereShape {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            center: [unset_vertex()],
        }
    }

    /// Sphere whose radius is half of `scale.x`.
    pub fn from_scale(scale: Vector3<f32>) -> Self {
        Self::new(scale.x / 2.0)
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        self.center[0]
    }
}

impl ShapeGeometry for SphereShape {
    fn aabb(&self) -> Aabb {
        Aabb::from_center(self.center[0], Vector3::repeat(self.radius))
    }

    fn separating_axes(&self) -> Vec<Vector3<f32>, 3> {
        Vec::new()
    }

    fn reference_vertices(&self) -> &[Vector3<f32>] {
        &self.center
    }

    fn refresh(&mut self, pose: &Pose) {
        self.center[0] = pose.position;
    }
}

/// Shape discriminant, carried on manifolds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeKind {
    Box,
    Sphere,
}

/// Drag coefficient and frontal area used by the quadratic drag model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragProfile {
    pub coefficient: f32,
    pub area: f32,
}

/// The collision shape attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Box(BoxShape),
    Sphere(SphereShape),
}

impl Shape {
    /// Box with the given half-extents.
    pub fn cuboid(half_extents: Vector3<f32>) -> Self {
        Shape::Box(BoxShape::new(half_extents))
    }

    /// Sphere with the given radius.
    pub fn ball(radius: f32) -> Self {
        Shape::Sphere(SphereShape::new(radius))
    }

    /// Shape of `kind` sized to fill an object scaled by `scale`.
    pub fn from_scale(kind: ShapeKind, scale: Vector3<f32>) -> Self {
        match kind {
            ShapeKind::Box => Shape::Box(BoxShape::from_scale(scale)),
            ShapeKind::Sphere => Shape::Sphere(SphereShape::from_scale(scale)),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box(_) => ShapeKind::Box,
            Shape::Sphere(_) => ShapeKind::Sphere,
        }
    }

    /// Drag coefficient and frontal area.
    pub fn drag_profile(&self) -> DragProfile {
        match self {
            Shape::Sphere(s) => DragProfile {
                coefficient: 0.5,
                area: PI * s.radius * s.radius,
            },
            Shape::Box(b) => DragProfile {
                coefficient: 2.1,
                area: b.half_extents.x * b.half_extents.y,
            },
        }
    }

    /// Scalar moment of inertia for a body of `mass`.
    ///
    /// - Sphere: `(2/5) * m * r²`
    /// - Box: `(1/12) * m * (w² + h²)` with full width and height
    pub fn inertia(&self, mass: f32) -> f32 {
        match self {
            Shape::Sphere(s) => 0.4 * mass * s.radius * s.radius,
            Shape::Box(b) => {
                let w = 2.0 * b.half_extents.x;
                let h = 2.0 * b.half_extents.y;
                mass / 12.0 * (w * w + h * h)
            }
        }
    }
}

impl ShapeGeometry for Shape {
    fn aabb(&self) -> Aabb {
        match self {
            Shape::Box(b) => b.aabb(),
            Shape::Sphere(s) => s.aabb(),
        }
    }

    fn separating_axes(&self) -> Vec<Vector3<f32>, 3> {
        match self {
            Shape::Box(b) => b.separating_axes(),
            Shape::Sphere(s) => s.separating_axes(),
        }
    }

    fn reference_vertices(&self) -> &[Vector3<f32>] {
        match self {
            Shape::Box(b) => b.reference_vertices(),
            Shape::Sphere(s) => s.reference_vertices(),
        }
    }

    fn refresh(&mut self, pose: &Pose) {
        match self {
            Shape::Box(b) => b.refresh(pose),
            Shape::Sphere(s) => s.refresh(pose),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    #[allow(unused_imports)]
    use nalgebra::ComplexField;

    fn unit_box_at(position: Vector3<f32>, orientation: Vector3<f32>) -> BoxShape {
        let mut shape = BoxShape::new(Vector3::new(1.0, 1.0, 1.0));
        shape.refresh(&Pose::new(position, orientation));
        shape
    }

    // -- Aabb tests --

    #[test]
    fn test_aabb_strict_overlap() {
        let a = Aabb::from_center(Vector3::zeros(), Vector3::repeat(1.0));
        let b = Aabb::from_center(Vector3::new(1.5, 0.0, 0.0), Vector3::repeat(1.0));
        let touching = Aabb::from_center(Vector3::new(2.0, 0.0, 0.0), Vector3::repeat(1.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&touching));
    }

    #[test]
    fn test_aabb_closest_point() {
        let a = Aabb::from_center(Vector3::zeros(), Vector3::repeat(1.0));
        let p = a.closest_point(&Vector3::new(3.0, 0.5, -2.0));
        assert_eq!(p, Vector3::new(1.0, 0.5, -1.0));
        let inside = Vector3::new(0.2, 0.1, 0.0);
        assert_eq!(a.closest_point(&inside), inside);
        assert!(a.contains(&inside));
    }

    // -- BoxShape tests --

    #[test]
    fn test_box_before_refresh_sits_at_sentinel() {
        let shape = BoxShape::from_scale(Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(shape.half_extents(), Vector3::new(1.0, 1.0, 1.0));
        assert!(shape.reference_vertices().iter().all(|v| *v == unset_vertex()));
        assert_eq!(shape.aabb().min, unset_vertex());
        assert_eq!(shape.aabb().max, unset_vertex());
    }

    #[test]
    fn test_box_refresh_builds_corners_and_bounds() {
        let shape = unit_box_at(Vector3::new(1.0, 2.0, 3.0), Vector3::zeros());
        assert_eq!(shape.origin().center(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(shape.corners().len(), 8);
        for corner in shape.corners() {
            let d = corner - Vector3::new(1.0, 2.0, 3.0);
            assert_relative_eq!(d.x.abs(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(d.y.abs(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(d.z.abs(), 1.0, epsilon = 1e-5);
        }
        assert_relative_eq!(shape.aabb().min, Vector3::new(0.0, 1.0, 2.0), epsilon = 1e-5);
        assert_relative_eq!(shape.aabb().max, Vector3::new(2.0, 3.0, 4.0), epsilon = 1e-5);
    }

    #[test]
    fn test_box_face_normals_point_outward() {
        let shape = unit_box_at(Vector3::zeros(), Vector3::new(10.0, 35.0, -20.0));
        for face in BoxFace::ALL {
            let polygon = shape.face(face);
            let outward = polygon.center() - shape.origin().center();
            assert_relative_eq!(polygon.normal().norm(), 1.0, epsilon = 1e-5);
            assert!(polygon.normal().dot(&outward) > 0.99, "{:?} normal points inward", face);
        }
    }

    #[test]
    fn test_box_edge_normals_follow_the_ring() {
        let shape = unit_box_at(Vector3::zeros(), Vector3::zeros());
        let front = shape.face(BoxFace::Front);
        // First corner is top-left, second is bottom-left: edge points down.
        assert_relative_eq!(front.normals[1], -Vector3::y(), epsilon = 1e-5);
        // Closing edge goes from the last corner back to the first.
        assert_relative_eq!(front.normals[4], -Vector3::x(), epsilon = 1e-5);
    }

    #[test]
    fn test_box_axes_are_unique_local_axes() {
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 30.0, 0.0));
        let shape = unit_box_at(pose.position, pose.orientation);
        let axes = shape.separating_axes();
        assert_eq!(axes.len(), 3);
        assert_relative_eq!(axes[0], pose.right(), epsilon = 1e-5);
        assert_relative_eq!(axes[1], pose.up(), epsilon = 1e-5);
        assert_relative_eq!(axes[2], pose.forward(), epsilon = 1e-5);
    }

    #[test]
    fn test_rotated_box_bounds_grow() {
        let shape = unit_box_at(Vector3::zeros(), Vector3::new(0.0, 45.0, 0.0));
        let half = shape.aabb().half_size();
        assert_relative_eq!(half.x, 2.0f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(half.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(half.z, 2.0f32.sqrt(), epsilon = 1e-5);
    }

    // -- SphereShape / Shape tests --

    #[test]
    fn test_sphere_from_scale_and_refresh() {
        let mut shape = Shape::from_scale(ShapeKind::Sphere, Vector3::new(1.0, 3.0, 3.0));
        assert_eq!(shape.kind(), ShapeKind::Sphere);
        assert_eq!(shape.reference_vertices(), &[unset_vertex()]);
        shape.refresh(&Pose::from_position(Vector3::new(0.0, 4.0, 0.0)));
        let aabb = shape.aabb();
        assert_relative_eq!(aabb.min, Vector3::new(-0.5, 3.5, -0.5), epsilon = 1e-6);
        assert_relative_eq!(aabb.max, Vector3::new(0.5, 4.5, 0.5), epsilon = 1e-6);
        assert!(shape.separating_axes().is_empty());
    }

    #[test]
    fn test_drag_profiles() {
        let sphere = Shape::ball(0.5).drag_profile();
        assert_eq!(sphere.coefficient, 0.5);
        assert_relative_eq!(sphere.area, PI * 0.25, epsilon = 1e-6);

        let cuboid = Shape::cuboid(Vector3::new(2.0, 3.0, 1.0)).drag_profile();
        assert_eq!(cuboid.coefficient, 2.1);
        assert_relative_eq!(cuboid.area, 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inertia() {
        assert_relative_eq!(Shape::ball(0.5).inertia(2.0), 0.2, epsilon = 1e-6);
        // 1x1 half extents -> 2x2 box: 12/12 * (4 + 4)
        assert_relative_eq!(Shape::cuboid(Vector3::repeat(1.0)).inertia(12.0), 8.0, epsilon = 1e-5);
        assert_eq!(Shape::ball(1.0).inertia(0.0), 0.0);
    }
}

//! Spring launcher: compress a spring over several frames, then release it
//! to kick a body along the launch direction.

// ComplexField provides sin()/cos() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;
use nalgebra::Vector3;

use crate::body::RigidBody;
use crate::pose::{Pose, DEG_TO_RAD};

pub const DEFAULT_SPRING_CONSTANT: f32 = 300.0;
pub const DEFAULT_REST_LENGTH: f32 = 1.0;
pub const DEFAULT_INITIAL_LENGTH: f32 = 0.5;
/// Length lost per second while compressing.
pub const DEFAULT_COMPRESS_SPEED: f32 = 10.0;
pub const DEFAULT_POWER: f32 = 2.0;

/// A compressible spring anchored at a pose.
///
/// The spring's forward axis is the dominant axis of its scale. Compressing
/// shortens it (and moves its visual scale and position along that axis);
/// releasing adds a Hooke's law kick to a body and restores the rest state.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringLauncher {
    pub spring_constant: f32,
    pub rest_length: f32,
    pub compress_speed: f32,
    pub power: f32,
    initial_length: f32,
    length: f32,
    /// Launch tilt in degrees about the spring's Z axis.
    angle: f32,
    forward: Vector3<f32>,
    pose: Pose,
    scale: Vector3<f32>,
}

/// Unit axis of the largest scale component; Z unless X or Y strictly wins.
fn dominant_axis(scale: &Vector3<f32>) -> Vector3<f32> {
    if scale.x > scale.y && scale.x > scale.z {
        Vector3::x()
    } else if scale.y > scale.x && scale.y > scale.z {
        Vector3::y()
    } else {
        Vector3::z()
    }
}

impl SpringLauncher {
    pub fn new(pose: Pose, scale: Vector3<f32>) -> Self {
        Self {
            spring_constant: DEFAULT_SPRING_CONSTANT,
            rest_length: DEFAULT_REST_LENGTH,
            compress_speed: DEFAULT_COMPRESS_SPEED,
            power: DEFAULT_POWER,
            initial_length: DEFAULT_INITIAL_LENGTH,
            length: DEFAULT_INITIAL_LENGTH,
            angle: 0.0,
            forward: dominant_axis(&scale),
            pose,
            scale,
        }
    }

    /// Builder: change the spring constant.
    pub fn with_spring_constant(mut self, k: f32) -> Self {
        self.spring_constant = k;
        self
    }

    /// Builder: start (and reset to) a different length.
    pub fn with_length(mut self, length: f32) -> Self {
        self.initial_length = length;
        self.length = length;
        self
    }

    #[inline]
    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Signed displacement from rest; negative while compressed.
    #[inline]
    pub fn extension(&self) -> f32 {
        self.length - self.rest_length
    }

    /// Hooke's law force magnitude.
    #[inline]
    pub fn force(&self) -> f32 {
        -self.spring_constant * self.extension()
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Tilt the launch direction by `degrees` about the spring's Z axis.
    pub fn set_angle(&mut self, degrees: f32) {
        if degrees.is_finite() {
            self.angle = degrees;
        } else {
            log::warn!("ignoring non-finite launch angle {}", degrees);
        }
    }

    /// Pose including the launch tilt.
    pub fn pose(&self) -> Pose {
        Pose::new(
            self.position(),
            self.pose.orientation + Vector3::new(0.0, 0.0, self.angle),
        )
    }

    /// Visual position, shifted along the forward axis by the extension.
    pub fn position(&self) -> Vector3<f32> {
        self.pose.position + self.forward * self.extension()
    }

    /// Visual scale, stretched along the forward axis by the extension.
    pub fn scale(&self) -> Vector3<f32> {
        self.scale + self.forward * self.extension()
    }

    /// Unit launch direction: forward tilted toward the tilted pose's up.
    pub fn direction(&self) -> Vector3<f32> {
        let radians = self.angle * DEG_TO_RAD;
        self.forward * radians.cos() + self.pose().up() * radians.sin()
    }

    /// Shorten the spring for one frame of `dt` seconds. The length never
    /// drops below zero.
    pub fn compress(&mut self, dt: f32) {
        self.length = (self.length - self.compress_speed * dt).max(0.0);
        log::trace!("spring compressed to {}", self.length);
    }

    /// Velocity change a release over `dt` gives a body.
    pub fn launch_velocity(&self, dt: f32) -> Vector3<f32> {
        self.direction() * (self.force() * self.power * dt)
    }

    /// Kick `body` and return the spring to its starting length.
    ///
    /// Kinematic and infinite-mass bodies are not launched; the spring still
    /// resets. Returns whether the body was launched.
    pub fn release(&mut self, body: &mut RigidBody, dt: f32) -> bool {
        let launched = body.accepts_impulses();
        if launched {
            let kick = self.launch_velocity(dt);
            body.velocity += kick;
            log::debug!("spring released with force {}: kick {:?}", self.force(), kick);
        }
        self.length = self.initial_length;
        launched
    }
}
